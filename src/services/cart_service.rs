use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::cart::{
        AddToCartRequest, AddToCartResponse, CartItemRemoved, CartItemUpdated, CartView,
        UpdateCartItemRequest,
    },
    entity::{
        carts::{ActiveModel as CartActive, Column as CartCol, Entity as Carts, Model as CartModel},
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, MaybeUser},
    models::{CartLine, CartLines},
    pricing::{cart_total, resolve_price},
    response::{ApiResponse, Meta},
    services::product_service::product_from_entity,
    state::AppState,
};

/// Saving a cart is a compare-and-swap on its version column; concurrent
/// writers for the same owner retry from a fresh read.
const SAVE_ATTEMPTS: usize = 3;

pub async fn add_to_cart(
    state: &AppState,
    user: &MaybeUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<AddToCartResponse>> {
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let product = Products::find_by_id(payload.product_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if !product.enabled {
        return Err(AppError::BadRequest("product is not available".to_string()));
    }
    let product = product_from_entity(product);

    let resolved = resolve_price(&product, &payload.selection)?;
    let line = CartLine {
        id: Uuid::new_v4(),
        product_id: product.id,
        title: product.title.clone(),
        image: product.images.first().cloned(),
        price: resolved.price,
        offer_price: resolved.offer_price,
        selected_measurement: payload.selection.measurement.clone(),
        selected_color: payload.selection.color.clone(),
        quantity: payload.quantity,
        price_source: resolved.source,
    };

    let Some(user) = user.0.as_ref() else {
        // Guests hold their cart client-side; hand the resolved line back.
        return Ok(ApiResponse::success(
            "Guest cart line",
            AddToCartResponse {
                is_guest: true,
                line,
            },
            None,
        ));
    };

    let line = upsert_line(state, user.user_id, line).await?;

    log_audit(
        &state.pool,
        Some(user.user_id),
        "cart_add",
        Some("carts"),
        Some(serde_json::json!({
            "product_id": payload.product_id,
            "quantity": payload.quantity,
        })),
    )
    .await;

    Ok(ApiResponse::success(
        "Cart updated",
        AddToCartResponse {
            is_guest: false,
            line,
        },
        None,
    ))
}

/// Fold a guest cart into the user's stored cart. Lines whose product no
/// longer exists are dropped without error; surviving lines merge by the
/// product + selection-marker rule, summing quantities on match. Invoked at
/// most once per login and deliberately not idempotent.
pub async fn merge_guest_cart(
    state: &AppState,
    user_id: Uuid,
    guest_lines: Vec<CartLine>,
) -> AppResult<usize> {
    if guest_lines.is_empty() {
        return Ok(0);
    }

    let ids: Vec<Uuid> = guest_lines.iter().map(|l| l.product_id).collect();
    let live: std::collections::HashSet<Uuid> = Products::find()
        .filter(ProdCol::Id.is_in(ids))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|p| p.id)
        .collect();

    let surviving: Vec<CartLine> = guest_lines
        .into_iter()
        .filter(|l| live.contains(&l.product_id))
        .collect();
    let merged = surviving.len();

    for line in surviving {
        upsert_line(state, user_id, line).await?;
    }

    Ok(merged)
}

pub async fn list_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    let lines = match find_cart(state, user.user_id).await? {
        Some(cart) => cart.items.0,
        None => Vec::new(),
    };
    let total = cart_total(&lines);
    Ok(ApiResponse::success(
        "OK",
        CartView {
            items: lines,
            total,
        },
        Some(Meta::empty()),
    ))
}

pub async fn update_cart_item(
    state: &AppState,
    user: &AuthUser,
    line_id: Uuid,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<CartItemUpdated>> {
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be a positive integer".to_string(),
        ));
    }

    for _ in 0..SAVE_ATTEMPTS {
        let cart = find_cart(state, user.user_id)
            .await?
            .ok_or(AppError::NotFound)?;
        let mut lines = cart.items.0.clone();
        let line = lines
            .iter_mut()
            .find(|l| l.id == line_id)
            .ok_or(AppError::NotFound)?;
        line.quantity = payload.quantity;
        let updated = line.clone();

        if save_cart(state, &cart, lines.clone()).await? {
            let line_total = updated.effective_price() * updated.quantity as i64;
            let total = cart_total(&lines);
            return Ok(ApiResponse::success(
                "Cart updated",
                CartItemUpdated {
                    line: updated,
                    line_total,
                    cart_total: total,
                },
                None,
            ));
        }
    }

    Err(AppError::Internal(anyhow::anyhow!(
        "cart save contention exceeded retry budget"
    )))
}

pub async fn remove_cart_item(
    state: &AppState,
    user: &AuthUser,
    line_id: Uuid,
) -> AppResult<ApiResponse<CartItemRemoved>> {
    for _ in 0..SAVE_ATTEMPTS {
        let cart = find_cart(state, user.user_id)
            .await?
            .ok_or(AppError::NotFound)?;
        let before = cart.items.0.len();
        let lines: Vec<CartLine> = cart
            .items
            .0
            .iter()
            .filter(|l| l.id != line_id)
            .cloned()
            .collect();
        if lines.len() == before {
            return Err(AppError::NotFound);
        }

        if save_cart(state, &cart, lines.clone()).await? {
            log_audit(
                &state.pool,
                Some(user.user_id),
                "cart_remove",
                Some("carts"),
                Some(serde_json::json!({ "line_id": line_id })),
            )
            .await;

            return Ok(ApiResponse::success(
                "Removed from cart",
                CartItemRemoved {
                    cart_total: cart_total(&lines),
                },
                Some(Meta::empty()),
            ));
        }
    }

    Err(AppError::Internal(anyhow::anyhow!(
        "cart save contention exceeded retry budget"
    )))
}

/// Delete the owner's whole cart document. Used after checkout finalizes.
pub async fn clear_cart(state: &AppState, user_id: Uuid) -> AppResult<()> {
    Carts::delete_many()
        .filter(CartCol::UserId.eq(user_id))
        .exec(&state.orm)
        .await?;
    Ok(())
}

async fn find_cart(state: &AppState, user_id: Uuid) -> AppResult<Option<CartModel>> {
    let cart = Carts::find()
        .filter(CartCol::UserId.eq(user_id))
        .one(&state.orm)
        .await?;
    Ok(cart)
}

/// Match-then-increment or append, retried under optimistic concurrency.
async fn upsert_line(state: &AppState, user_id: Uuid, line: CartLine) -> AppResult<CartLine> {
    for _ in 0..SAVE_ATTEMPTS {
        let existing = find_cart(state, user_id).await?;

        match existing {
            None => {
                let active = CartActive {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(user_id),
                    items: Set(CartLines(vec![line.clone()])),
                    version: Set(0),
                    created_at: NotSet,
                    updated_at: NotSet,
                };
                match active.insert(&state.orm).await {
                    Ok(_) => return Ok(line),
                    // Unique user_id: a concurrent writer created the cart
                    // first; fall through and retry against it.
                    Err(err) => {
                        tracing::debug!(error = %err, "cart insert lost race, retrying");
                        continue;
                    }
                }
            }
            Some(cart) => {
                let mut lines = cart.items.0.clone();
                let merged = merge_line(&mut lines, line.clone());

                if save_cart(state, &cart, lines).await? {
                    return Ok(merged);
                }
            }
        }
    }

    Err(AppError::Internal(anyhow::anyhow!(
        "cart save contention exceeded retry budget"
    )))
}

/// An incoming line folds into an existing one only when the product and
/// both selection markers match exactly; otherwise it is appended as its own
/// line. Returns the line as it ends up in the cart.
fn merge_line(lines: &mut Vec<CartLine>, line: CartLine) -> CartLine {
    match lines.iter_mut().find(|l| {
        l.matches(
            line.product_id,
            &line.selected_measurement,
            &line.selected_color,
        )
    }) {
        Some(found) => {
            found.quantity += line.quantity;
            found.clone()
        }
        None => {
            lines.push(line.clone());
            line
        }
    }
}

/// Returns false when another writer bumped the version first.
async fn save_cart(state: &AppState, cart: &CartModel, lines: Vec<CartLine>) -> AppResult<bool> {
    let result = Carts::update_many()
        .col_expr(CartCol::Items, Expr::value(serde_json::to_value(CartLines(lines)).map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?))
        .col_expr(CartCol::Version, Expr::col(CartCol::Version).add(1))
        .col_expr(CartCol::UpdatedAt, Expr::value(Utc::now()))
        .filter(CartCol::Id.eq(cart.id))
        .filter(CartCol::Version.eq(cart.version))
        .exec(&state.orm)
        .await?;
    Ok(result.rows_affected == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PriceSource;

    fn sample_line(product_id: Uuid, measurement: Option<&str>, quantity: i32) -> CartLine {
        CartLine {
            id: Uuid::new_v4(),
            product_id,
            title: "Oak Shelf".into(),
            image: None,
            price: 100,
            offer_price: Some(90),
            selected_measurement: measurement.map(str::to_string),
            selected_color: None,
            quantity,
            price_source: PriceSource::Measurement,
        }
    }

    #[test]
    fn matching_selection_sums_quantities_on_the_existing_line() {
        let product_id = Uuid::new_v4();
        let mut lines = vec![sample_line(product_id, Some("120cm"), 2)];
        let kept_id = lines[0].id;

        let merged = merge_line(&mut lines, sample_line(product_id, Some("120cm"), 3));

        assert_eq!(lines.len(), 1);
        assert_eq!(merged.id, kept_id);
        assert_eq!(merged.quantity, 5);
    }

    #[test]
    fn differing_selection_markers_append_a_new_line() {
        let product_id = Uuid::new_v4();
        let mut lines = vec![sample_line(product_id, Some("120cm"), 2)];

        merge_line(&mut lines, sample_line(product_id, Some("180cm"), 1));
        merge_line(&mut lines, sample_line(product_id, None, 1));
        merge_line(&mut lines, sample_line(Uuid::new_v4(), Some("120cm"), 1));

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0].quantity, 2);
    }

    #[test]
    fn merging_the_same_payload_twice_double_counts() {
        let product_id = Uuid::new_v4();
        let mut lines = Vec::new();

        merge_line(&mut lines, sample_line(product_id, Some("120cm"), 2));
        let merged = merge_line(&mut lines, sample_line(product_id, Some("120cm"), 2));

        assert_eq!(lines.len(), 1);
        assert_eq!(merged.quantity, 4);
    }
}
