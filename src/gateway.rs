use serde::Serialize;
use sha2::{Digest, Sha512};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{config::GatewayConfig, models::Address};

pub const GATEWAY_NAME: &str = "PayU";
pub const PRODUCT_INFO: &str = "Product Purchase";

/// Everything the storefront needs to POST the customer to the hosted
/// payment page.
#[derive(Debug, Serialize, ToSchema)]
pub struct GatewayRedirect {
    pub key: String,
    pub txnid: String,
    pub amount: i64,
    pub productinfo: String,
    pub firstname: String,
    pub email: String,
    pub phone: String,
    pub surl: String,
    pub furl: String,
    pub hash: String,
    pub service_provider: String,
}

pub fn new_txnid() -> String {
    format!("txn{}", Uuid::new_v4().simple())
}

pub fn build_redirect(
    config: &GatewayConfig,
    txnid: &str,
    amount: i64,
    billing: &Address,
) -> GatewayRedirect {
    let hash = integrity_hash(config, txnid, amount, &billing.full_name, &billing.email);
    GatewayRedirect {
        key: config.merchant_key.clone(),
        txnid: txnid.to_string(),
        amount,
        productinfo: PRODUCT_INFO.to_string(),
        firstname: billing.full_name.clone(),
        email: billing.email.clone(),
        phone: billing.phone.clone(),
        surl: config.success_url.clone(),
        furl: config.failure_url.clone(),
        hash,
        service_provider: "payu_paisa".to_string(),
    }
}

/// SHA-512 over the gateway's fixed pipe-separated field layout. The eleven
/// empty positions are the unused udf fields the protocol reserves.
fn integrity_hash(
    config: &GatewayConfig,
    txnid: &str,
    amount: i64,
    payer_name: &str,
    payer_email: &str,
) -> String {
    let input = format!(
        "{}|{}|{}|{}|{}|{}|||||||||||{}",
        config.merchant_key, txnid, amount, PRODUCT_INFO, payer_name, payer_email,
        config.merchant_salt
    );
    let digest = Sha512::digest(input.as_bytes());
    hex::encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GatewayConfig {
        GatewayConfig {
            merchant_key: "merchant-key".into(),
            merchant_salt: "merchant-salt".into(),
            success_url: "http://localhost/s".into(),
            failure_url: "http://localhost/f".into(),
        }
    }

    fn billing() -> Address {
        Address {
            full_name: "Asha Rao".into(),
            phone: "5550100".into(),
            email: "asha@example.com".into(),
            address: "1 Market St".into(),
            city: "Pune".into(),
            state: None,
            zip_code: "411001".into(),
            country: "IN".into(),
        }
    }

    #[test]
    fn txnids_are_unique_and_prefixed() {
        let a = new_txnid();
        let b = new_txnid();
        assert!(a.starts_with("txn"));
        assert_ne!(a, b);
    }

    #[test]
    fn hash_is_deterministic_sha512_hex() {
        let redirect = build_redirect(&config(), "txn1", 1000, &billing());
        let again = build_redirect(&config(), "txn1", 1000, &billing());
        assert_eq!(redirect.hash, again.hash);
        assert_eq!(redirect.hash.len(), 128);
        assert!(redirect.hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn hash_covers_amount_and_txnid() {
        let base = build_redirect(&config(), "txn1", 1000, &billing());
        let other_amount = build_redirect(&config(), "txn1", 1001, &billing());
        let other_txn = build_redirect(&config(), "txn2", 1000, &billing());
        assert_ne!(base.hash, other_amount.hash);
        assert_ne!(base.hash, other_txn.hash);
    }

    #[test]
    fn redirect_carries_gateway_fields() {
        let redirect = build_redirect(&config(), "txn1", 1000, &billing());
        assert_eq!(redirect.key, "merchant-key");
        assert_eq!(redirect.productinfo, PRODUCT_INFO);
        assert_eq!(redirect.firstname, "Asha Rao");
        assert_eq!(redirect.service_provider, "payu_paisa");
    }
}
