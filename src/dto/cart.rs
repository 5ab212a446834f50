use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{models::CartLine, pricing::Selection};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    #[serde(flatten)]
    pub selection: Selection,
    pub quantity: i32,
}

/// Response to an add: logged-in users get the persisted line, guests get
/// the resolved line back to store client-side.
#[derive(Debug, Serialize, ToSchema)]
pub struct AddToCartResponse {
    pub is_guest: bool,
    pub line: CartLine,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCartItemRequest {
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartView {
    pub items: Vec<CartLine>,
    pub total: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartItemUpdated {
    pub line: CartLine,
    pub line_total: i64,
    pub cart_total: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartItemRemoved {
    pub cart_total: i64,
}
