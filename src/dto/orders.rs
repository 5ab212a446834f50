use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Address, CartLine, Order, OrderItem};

/// Legacy direct order placement, bypassing the gateway.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub items: Vec<CartLine>,
    pub total_amount: i64,
    pub billing_address: Address,
    pub delivery_address: Address,
    pub payment_method: String,
    #[serde(default)]
    pub order_notes: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}
