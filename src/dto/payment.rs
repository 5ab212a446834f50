use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    gateway::GatewayRedirect,
    models::{Address, CartLine},
};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub items: Vec<CartLine>,
    pub total_amount: i64,
    pub billing_address: Address,
    pub delivery_address: Option<Address>,
    pub payment_method: String,
    #[serde(default)]
    pub order_notes: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutResponse {
    pub txnid: String,
    pub payu_data: GatewayRedirect,
}

/// Asynchronous confirmation posted back by the gateway.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PaymentCallback {
    pub txnid: String,
    /// Gateway-side payment id, recorded on the order's payment sub-record.
    pub mihpayid: String,
    pub status: String,
}
