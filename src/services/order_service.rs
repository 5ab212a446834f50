use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::orders::{OrderList, OrderWithItems, PlaceOrderRequest},
    entity::{
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{
            ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel,
        },
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Order, OrderItem, OrderStatus, PaymentRecord, PriceSource},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    state::AppState,
};

pub async fn list_my_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all().add(OrderCol::UserId.eq(user.user_id));
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(OrderCol::Status.eq(status.clone()));
    }

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let mut finder = Orders::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect::<AppResult<Vec<Order>>>()?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Orders",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .one(&state.orm)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_item_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems {
            order: order_from_entity(order)?,
            items,
        },
        Some(Meta::empty()),
    ))
}

/// Legacy direct placement that bypasses the gateway; the order starts in
/// `Pending` with a method-only payment record.
pub async fn place_order(
    state: &AppState,
    user: &AuthUser,
    payload: PlaceOrderRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    if payload.items.is_empty() {
        return Err(AppError::BadRequest("invalid order details".to_string()));
    }
    if payload.total_amount <= 0 {
        return Err(AppError::BadRequest("invalid total amount".to_string()));
    }
    if let Some(field) = payload.billing_address.missing_field() {
        return Err(AppError::BadRequest(format!(
            "billing address is missing {field}"
        )));
    }
    if let Some(field) = payload.delivery_address.missing_field() {
        return Err(AppError::BadRequest(format!(
            "delivery address is missing {field}"
        )));
    }

    let order_id = Uuid::new_v4();
    let now = Utc::now();
    let txn = state.orm.begin().await?;

    // No gateway is involved on this path; the record only carries the
    // caller's chosen method until payment is settled out of band.
    let payment = PaymentRecord {
        method: payload.payment_method,
        transaction_id: String::new(),
        status: "Pending".to_string(),
        amount: payload.total_amount,
        gateway: String::new(),
    };

    let order = OrderActive {
        id: Set(order_id),
        user_id: Set(user.user_id),
        total_amount: Set(payload.total_amount),
        status: Set(OrderStatus::Pending.to_string()),
        billing_address: Set(payload.billing_address),
        delivery_address: Set(payload.delivery_address),
        payment: Set(Some(payment)),
        order_notes: Set(payload.order_notes),
        tracking_number: Set(None),
        estimated_delivery: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    let mut items = Vec::with_capacity(payload.items.len());
    for line in payload.items {
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            product_id: Set(line.product_id),
            title: Set(line.title),
            image: Set(line.image),
            selected_measurement: Set(line.selected_measurement),
            selected_color: Set(line.selected_color),
            quantity: Set(line.quantity),
            price: Set(line.price),
            offer_price: Set(line.offer_price),
            price_source: Set(line.price_source.as_str().to_string()),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;
        items.push(order_item_from_entity(item));
    }

    txn.commit().await?;

    log_audit(
        &state.pool,
        Some(user.user_id),
        "order_placed",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order_id })),
    )
    .await;

    Ok(ApiResponse::success(
        "Order placed successfully",
        OrderWithItems {
            order: order_from_entity(order)?,
            items,
        },
        Some(Meta::empty()),
    ))
}

/// User-initiated cancellation; refused once the order has shipped.
pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .one(&state.orm)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let status = parse_status(&order.status)?;
    if !status.user_cancellable() {
        return Err(AppError::CancellationNotAllowed);
    }

    let mut active: OrderActive = order.into();
    active.status = Set(OrderStatus::Cancelled.to_string());
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&state.orm).await?;

    log_audit(
        &state.pool,
        Some(user.user_id),
        "order_cancelled",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id })),
    )
    .await;

    Ok(ApiResponse::success(
        "Order cancelled successfully",
        order_from_entity(order)?,
        Some(Meta::empty()),
    ))
}

pub fn order_from_entity(model: OrderModel) -> AppResult<Order> {
    let status = parse_status(&model.status)?;
    Ok(Order {
        id: model.id,
        user_id: model.user_id,
        total_amount: model.total_amount,
        status,
        billing_address: model.billing_address,
        delivery_address: model.delivery_address,
        payment: model.payment,
        order_notes: model.order_notes,
        tracking_number: model.tracking_number,
        estimated_delivery: model.estimated_delivery.map(|dt| dt.with_timezone(&Utc)),
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

pub fn order_item_from_entity(model: OrderItemModel) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        title: model.title,
        image: model.image,
        selected_measurement: model.selected_measurement,
        selected_color: model.selected_color,
        quantity: model.quantity,
        price: model.price,
        offer_price: model.offer_price,
        price_source: PriceSource::parse(&model.price_source),
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn parse_status(raw: &str) -> AppResult<OrderStatus> {
    raw.parse::<OrderStatus>()
        .map_err(|err| AppError::Internal(anyhow::anyhow!(err)))
}
