use axum::{Json, Router, extract::State, routing::post};

use crate::{
    dto::{
        orders::OrderWithItems,
        payment::{CheckoutRequest, CheckoutResponse, PaymentCallback},
    },
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::payment_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/checkout", post(checkout))
        .route("/callback", post(payment_callback))
}

#[utoipa::path(
    post,
    path = "/api/payments/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Pending order created; gateway redirect payload returned", body = ApiResponse<CheckoutResponse>),
        (status = 400, description = "Unsupported payment method or missing address fields"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn checkout(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CheckoutRequest>,
) -> AppResult<Json<ApiResponse<CheckoutResponse>>> {
    let resp = payment_service::checkout(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/payments/callback",
    request_body = PaymentCallback,
    responses(
        (status = 200, description = "Payment confirmed, order finalized", body = ApiResponse<OrderWithItems>),
        (status = 400, description = "Gateway reported failure"),
        (status = 404, description = "Pending order already consumed or expired"),
    ),
    tag = "Payments"
)]
pub async fn payment_callback(
    State(state): State<AppState>,
    Json(payload): Json<PaymentCallback>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let resp = payment_service::confirm_payment(&state, payload).await?;
    Ok(Json(resp))
}
