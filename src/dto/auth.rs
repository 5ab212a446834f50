use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::CartLine;

#[derive(Deserialize, Debug, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Client-held guest cart, merged into the server cart exactly once at
    /// this login when non-empty.
    #[serde(default, rename = "guestCart")]
    pub guest_cart: Vec<CartLine>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    /// Number of guest lines folded into the server cart during this login.
    pub merged_lines: usize,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
}
