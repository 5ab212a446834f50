use tokio::sync::mpsc;
use uuid::Uuid;

/// Invoice notification for a finalized order. Delivery is a deployment
/// concern; the worker renders and logs the message so a failure can never
/// reach the request path.
#[derive(Debug)]
pub struct InvoiceEmail {
    pub order_id: Uuid,
    pub recipient: String,
    pub recipient_name: String,
    pub total_amount: i64,
}

#[derive(Clone)]
pub struct Mailer {
    tx: mpsc::UnboundedSender<InvoiceEmail>,
}

impl Mailer {
    /// Spawn the background worker and return a handle for queueing.
    pub fn spawn() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<InvoiceEmail>();
        tokio::spawn(async move {
            while let Some(email) = rx.recv().await {
                deliver(email).await;
            }
            tracing::debug!("mailer channel closed, worker exiting");
        });
        Self { tx }
    }

    /// Queue an invoice email. Never blocks and never fails the caller;
    /// a dropped worker is logged and the order proceeds regardless.
    pub fn queue_invoice(&self, email: InvoiceEmail) {
        if let Err(err) = self.tx.send(email) {
            tracing::warn!(error = %err, "invoice email dropped, mailer unavailable");
        }
    }
}

async fn deliver(email: InvoiceEmail) {
    let reference = email
        .order_id
        .simple()
        .to_string()
        .chars()
        .take(8)
        .collect::<String>()
        .to_uppercase();
    tracing::info!(
        order_id = %email.order_id,
        recipient = %email.recipient,
        reference = %reference,
        amount = email.total_amount,
        "invoice email for {} queued for delivery",
        email.recipient_name
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn queueing_never_fails_even_after_worker_exit() {
        let mailer = Mailer::spawn();
        mailer.queue_invoice(InvoiceEmail {
            order_id: Uuid::new_v4(),
            recipient: "user@example.com".into(),
            recipient_name: "User".into(),
            total_amount: 1000,
        });
        // Second handle dropped mid-flight still must not panic the caller.
        let clone = mailer.clone();
        drop(mailer);
        clone.queue_invoice(InvoiceEmail {
            order_id: Uuid::new_v4(),
            recipient: "user@example.com".into(),
            recipient_name: "User".into(),
            total_amount: 2000,
        });
    }
}
