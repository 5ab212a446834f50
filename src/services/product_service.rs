use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::products::{AddReviewRequest, CreateProductRequest, ProductList, UpdateProductRequest},
    entity::products::{ActiveModel, Column, Entity as Products, Model as ProductModel},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{
        ColorVariants, DescriptionPoints, Images, Measurements, Product, Review, Reviews,
    },
    response::{ApiResponse, Meta},
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
    state::AppState,
};

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all();

    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Title).ilike(pattern.clone()))
                .add(Expr::col(Column::Category).ilike(pattern)),
        );
    }

    if let Some(category) = query.category.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(Column::Category.eq(category.clone()));
    }

    if !query.include_disabled.unwrap_or(false) {
        condition = condition.add(Column::Enabled.eq(true));
    }

    let sort_by = query.sort_by.unwrap_or(ProductSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let sort_col = match sort_by {
        ProductSortBy::CreatedAt => Column::CreatedAt,
        ProductSortBy::Title => Column::Title,
        ProductSortBy::Category => Column::Category,
    };

    let mut finder = Products::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(product_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(meta),
    ))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Product>> {
    let result = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .map(product_from_entity);
    let result = match result {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };
    Ok(ApiResponse::success("Product", result, None))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    validate_catalog_shape(
        &payload.description_points,
        &payload.images,
        payload.base_price,
        payload.measurements.as_deref(),
        payload.color_variants.as_deref(),
    )?;

    let id = Uuid::new_v4();
    let active = ActiveModel {
        id: Set(id),
        category: Set(payload.category),
        title: Set(payload.title),
        description_points: Set(DescriptionPoints(payload.description_points)),
        images: Set(Images(payload.images)),
        base_price: Set(payload.base_price),
        base_offer_price: Set(payload.base_offer_price),
        base_stocks: Set(payload.base_stocks),
        measurements: Set(payload.measurements.map(Measurements)),
        color_variants: Set(payload.color_variants.map(ColorVariants)),
        enabled: Set(true),
        reviews: Set(Reviews(Vec::new())),
        created_at: NotSet,
    };
    let product = active.insert(&state.orm).await?;

    log_audit(
        &state.pool,
        Some(user.user_id),
        "product_create",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await;

    Ok(ApiResponse::success(
        "Product created",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    let existing = Products::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    // Apply the patch to a scratch copy so the pricing-path invariant can be
    // checked against the final shape before anything is written.
    let mut next = existing.clone();
    if let Some(category) = payload.category {
        next.category = category;
    }
    if let Some(title) = payload.title {
        next.title = title;
    }
    if let Some(points) = payload.description_points {
        next.description_points = DescriptionPoints(points);
    }
    if let Some(images) = payload.images {
        next.images = Images(images);
    }
    if let Some(base_price) = payload.base_price {
        next.base_price = base_price;
    }
    if let Some(base_offer_price) = payload.base_offer_price {
        next.base_offer_price = base_offer_price;
    }
    if let Some(base_stocks) = payload.base_stocks {
        next.base_stocks = base_stocks;
    }
    if let Some(measurements) = payload.measurements {
        next.measurements = measurements.map(Measurements);
    }
    if let Some(color_variants) = payload.color_variants {
        next.color_variants = color_variants.map(ColorVariants);
    }

    validate_catalog_shape(
        &next.description_points.0,
        &next.images.0,
        next.base_price,
        next.measurements.as_ref().map(|m| m.0.as_slice()),
        next.color_variants.as_ref().map(|c| c.0.as_slice()),
    )?;

    let mut active: ActiveModel = existing.into();
    active.category = Set(next.category);
    active.title = Set(next.title);
    active.description_points = Set(next.description_points);
    active.images = Set(next.images);
    active.base_price = Set(next.base_price);
    active.base_offer_price = Set(next.base_offer_price);
    active.base_stocks = Set(next.base_stocks);
    active.measurements = Set(next.measurements);
    active.color_variants = Set(next.color_variants);
    let product = active.update(&state.orm).await?;

    log_audit(
        &state.pool,
        Some(user.user_id),
        "product_update",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

pub async fn toggle_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    let existing = Products::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let enabled = !existing.enabled;
    let mut active: ActiveModel = existing.into();
    active.enabled = Set(enabled);
    let product = active.update(&state.orm).await?;

    log_audit(
        &state.pool,
        Some(user.user_id),
        "product_toggle",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id, "enabled": product.enabled })),
    )
    .await;

    Ok(ApiResponse::success(
        "Toggled",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = Products::delete_by_id(id).exec(&state.orm).await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    log_audit(
        &state.pool,
        Some(user.user_id),
        "product_delete",
        Some("products"),
        Some(serde_json::json!({ "product_id": id })),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Append a customer review to the product's review list.
pub async fn add_review(
    state: &AppState,
    id: Uuid,
    payload: AddReviewRequest,
) -> AppResult<ApiResponse<Product>> {
    if payload.title.as_deref().unwrap_or("").trim().is_empty()
        && payload.description.as_deref().unwrap_or("").trim().is_empty()
    {
        return Err(AppError::BadRequest("review is empty".to_string()));
    }

    let existing = Products::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let mut reviews = existing.reviews.0.clone();
    reviews.push(Review {
        title: payload.title,
        description: payload.description,
        date: Utc::now(),
    });

    let mut active: ActiveModel = existing.into();
    active.reviews = Set(Reviews(reviews));
    let product = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Review added",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

/// At least one pricing path must resolve for every product: a base price,
/// a measurement, or a color variant. Description points and image counts
/// follow the catalog's fixed bounds.
fn validate_catalog_shape(
    description_points: &[String],
    images: &[String],
    base_price: Option<i64>,
    measurements: Option<&[crate::models::MeasurementOption]>,
    color_variants: Option<&[crate::models::ColorVariant]>,
) -> AppResult<()> {
    if description_points.is_empty() {
        return Err(AppError::BadRequest(
            "product description must have at least one point".to_string(),
        ));
    }
    if images.is_empty() || images.len() > 4 {
        return Err(AppError::BadRequest(
            "images should be between 1 and 4".to_string(),
        ));
    }
    let has_measurements = measurements.is_some_and(|m| !m.is_empty());
    let has_colors = color_variants.is_some_and(|c| !c.is_empty());
    if base_price.is_none() && !has_measurements && !has_colors {
        return Err(AppError::BadRequest(
            "product must carry a base price, a measurement, or a color variant".to_string(),
        ));
    }
    Ok(())
}

pub fn product_from_entity(model: ProductModel) -> Product {
    Product {
        id: model.id,
        category: model.category,
        title: model.title,
        description_points: model.description_points.0,
        images: model.images.0,
        base_price: model.base_price,
        base_offer_price: model.base_offer_price,
        base_stocks: model.base_stocks,
        measurements: model.measurements.map(|m| m.0),
        color_variants: model.color_variants.map(|c| c.0),
        enabled: model.enabled,
        reviews: model.reviews.0,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MeasurementOption;

    #[test]
    fn catalog_shape_requires_a_pricing_path() {
        let points = vec!["Wool".to_string()];
        let images = vec!["/img/a.png".to_string()];

        assert!(validate_catalog_shape(&points, &images, Some(100), None, None).is_ok());
        assert!(validate_catalog_shape(&points, &images, None, None, None).is_err());

        let measurements = vec![MeasurementOption {
            measurement: "4x6".into(),
            price: 700,
            offer_price: None,
            stocks: Some(1),
        }];
        assert!(
            validate_catalog_shape(&points, &images, None, Some(&measurements), None).is_ok()
        );
        // An explicitly empty variant list is not a pricing path.
        assert!(validate_catalog_shape(&points, &images, None, Some(&[]), None).is_err());
    }

    #[test]
    fn catalog_shape_bounds_images() {
        let points = vec!["Wool".to_string()];
        assert!(validate_catalog_shape(&points, &[], Some(100), None, None).is_err());
        let five = vec!["a".into(), "b".into(), "c".into(), "d".into(), "e".into()];
        assert!(validate_catalog_shape(&points, &five, Some(100), None, None).is_err());
    }
}
