use chrono::{Duration, Utc};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::{
        orders::OrderWithItems,
        payment::{CheckoutRequest, CheckoutResponse, PaymentCallback},
    },
    entity::{
        order_items::ActiveModel as OrderItemActive,
        orders::ActiveModel as OrderActive,
        pending_orders::{
            ActiveModel as PendingActive, Column as PendingCol, Entity as PendingOrders,
            Model as PendingModel,
        },
        products::Entity as Products,
    },
    error::{AppError, AppResult},
    gateway,
    mailer::InvoiceEmail,
    middleware::auth::AuthUser,
    models::{CartLines, OrderStatus, PaymentRecord},
    response::{ApiResponse, Meta},
    services::{cart_service, order_service},
    state::AppState,
};

/// Unconfirmed checkouts are unreachable after this window and swept away.
pub const PENDING_ORDER_TTL_MINUTES: i64 = 30;

const DETAILS_NOT_FOUND: &str =
    "Order details not found. Please contact support with your transaction ID";

pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<CheckoutResponse>> {
    if payload.payment_method != "Online" {
        return Err(AppError::UnsupportedPaymentMethod);
    }
    if payload.items.is_empty() {
        return Err(AppError::BadRequest("cart is empty".to_string()));
    }
    if payload.total_amount <= 0 {
        return Err(AppError::BadRequest("invalid total amount".to_string()));
    }
    if let Some(field) = payload.billing_address.missing_field() {
        return Err(AppError::BadRequest(format!(
            "billing address is missing {field}"
        )));
    }
    if let Some(field) = payload
        .delivery_address
        .as_ref()
        .and_then(|a| a.missing_field())
    {
        return Err(AppError::BadRequest(format!(
            "delivery address is missing {field}"
        )));
    }

    let txnid = gateway::new_txnid();
    let now = Utc::now();
    let pending = PendingActive {
        txnid: Set(txnid.clone()),
        user_id: Set(user.user_id),
        items: Set(CartLines(payload.items)),
        total_amount: Set(payload.total_amount),
        billing_address: Set(payload.billing_address.clone()),
        delivery_address: Set(payload.delivery_address),
        order_notes: Set(payload.order_notes),
        created_at: Set(now.into()),
        expires_at: Set((now + Duration::minutes(PENDING_ORDER_TTL_MINUTES)).into()),
    };
    pending.insert(&state.orm).await?;

    let payu_data = gateway::build_redirect(
        &state.gateway,
        &txnid,
        payload.total_amount,
        &payload.billing_address,
    );

    log_audit(
        &state.pool,
        Some(user.user_id),
        "checkout_initiated",
        Some("pending_orders"),
        Some(serde_json::json!({ "txnid": txnid, "amount": payload.total_amount })),
    )
    .await;

    Ok(ApiResponse::success(
        "Checkout initiated",
        CheckoutResponse { txnid, payu_data },
        Some(Meta::empty()),
    ))
}

/// Gateway confirmation callback. At-most-once finalization: the pending
/// order is consumed by a compare-and-delete keyed on txnid, so of any
/// number of replayed success callbacks exactly one can build the order;
/// the rest see "order details not found".
pub async fn confirm_payment(
    state: &AppState,
    payload: PaymentCallback,
) -> AppResult<ApiResponse<OrderWithItems>> {
    if payload.status != "success" {
        log_audit(
            &state.pool,
            None,
            "payment_failed",
            Some("pending_orders"),
            Some(serde_json::json!({ "txnid": payload.txnid, "status": payload.status })),
        )
        .await;
        // The pending order is left to expire on its own TTL.
        return Err(AppError::BadRequest(
            "Payment failed. Please try again or contact support.".to_string(),
        ));
    }

    let pending = PendingOrders::find_by_id(payload.txnid.clone())
        .filter(PendingCol::ExpiresAt.gt(Utc::now()))
        .one(&state.orm)
        .await?;
    let Some(pending) = pending else {
        tracing::info!(txnid = %payload.txnid, "{DETAILS_NOT_FOUND}");
        return Err(AppError::NotFound);
    };

    // Compare-and-delete inside the order transaction: only the caller that
    // actually removes the row may materialize the order, and an insert
    // failure rolls the consumption back so a replayed callback can still
    // finalize the paid checkout.
    let txn = state.orm.begin().await?;
    let deleted = PendingOrders::delete_by_id(payload.txnid.clone())
        .exec(&txn)
        .await?;
    if deleted.rows_affected == 0 {
        txn.rollback().await?;
        tracing::info!(txnid = %payload.txnid, "{DETAILS_NOT_FOUND}");
        return Err(AppError::NotFound);
    }

    let response = materialize_order(&txn, &pending, &payload).await?;
    txn.commit().await?;

    state.mailer.queue_invoice(InvoiceEmail {
        order_id: response.order.id,
        recipient: pending.billing_address.email.clone(),
        recipient_name: pending.billing_address.full_name.clone(),
        total_amount: pending.total_amount,
    });

    // The order is the source of truth from here on; a failed cart clear is
    // logged, never propagated.
    if let Err(err) = cart_service::clear_cart(state, pending.user_id).await {
        tracing::warn!(error = %err, user_id = %pending.user_id, "cart clear after checkout failed");
    }

    log_audit(
        &state.pool,
        Some(pending.user_id),
        "order_finalized",
        Some("orders"),
        Some(serde_json::json!({
            "order_id": response.order.id,
            "txnid": payload.txnid,
            "mihpayid": payload.mihpayid,
        })),
    )
    .await;

    Ok(ApiResponse::success(
        "Order Confirmation",
        response,
        Some(Meta::empty()),
    ))
}

/// Build and persist the durable order from the pending snapshot, inside
/// the caller's transaction alongside the pending-order consumption.
/// Display fields are refreshed from the live product when it still
/// exists; prices are always the snapshot's, never re-resolved.
async fn materialize_order(
    txn: &DatabaseTransaction,
    pending: &PendingModel,
    payload: &PaymentCallback,
) -> AppResult<OrderWithItems> {
    let order_id = Uuid::new_v4();
    let now = Utc::now();

    let payment = PaymentRecord {
        method: "Online".to_string(),
        transaction_id: payload.mihpayid.clone(),
        status: "Completed".to_string(),
        amount: pending.total_amount,
        gateway: gateway::GATEWAY_NAME.to_string(),
    };

    let delivery = pending
        .delivery_address
        .clone()
        .unwrap_or_else(|| pending.billing_address.clone());

    let order = OrderActive {
        id: Set(order_id),
        user_id: Set(pending.user_id),
        total_amount: Set(pending.total_amount),
        status: Set(OrderStatus::Processing.to_string()),
        billing_address: Set(pending.billing_address.clone()),
        delivery_address: Set(delivery),
        payment: Set(Some(payment)),
        order_notes: Set(pending.order_notes.clone()),
        tracking_number: Set(None),
        estimated_delivery: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(txn)
    .await?;

    let mut items = Vec::with_capacity(pending.items.0.len());
    for line in &pending.items.0 {
        let live = Products::find_by_id(line.product_id).one(txn).await?;
        let (title, image) = match live {
            Some(product) => (
                product.title.clone(),
                product.images.0.first().cloned().or_else(|| line.image.clone()),
            ),
            None => (line.title.clone(), line.image.clone()),
        };

        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            product_id: Set(line.product_id),
            title: Set(title),
            image: Set(image),
            selected_measurement: Set(line.selected_measurement.clone()),
            selected_color: Set(line.selected_color.clone()),
            quantity: Set(line.quantity),
            price: Set(line.price),
            offer_price: Set(line.offer_price),
            price_source: Set(line.price_source.as_str().to_string()),
            created_at: NotSet,
        }
        .insert(txn)
        .await?;

        items.push(order_service::order_item_from_entity(item));
    }

    Ok(OrderWithItems {
        order: order_service::order_from_entity(order)?,
        items,
    })
}

/// Delete pending orders whose TTL has elapsed. Driven by the sweeper task.
pub async fn purge_expired(orm: &sea_orm::DatabaseConnection) -> AppResult<u64> {
    let result = PendingOrders::delete_many()
        .filter(PendingCol::ExpiresAt.lte(Utc::now()))
        .exec(orm)
        .await?;
    Ok(result.rows_affected)
}
