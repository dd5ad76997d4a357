use crate::{
    entities::{order, order_item},
    errors::ServiceError,
    services::orders::{OrderListResponse, OrderStatus},
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ListOrdersQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
    /// Filter by fulfillment status.
    pub status: Option<String>,
}

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    20
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct OrderDetailResponse {
    #[schema(value_type = Object)]
    pub order: order::Model,
    #[schema(value_type = Vec<Object>)]
    pub items: Vec<order_item::Model>,
}

/// List orders, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    params(ListOrdersQuery),
    responses(
        (status = 200, description = "Orders page"),
        (status = 400, description = "Invalid status filter", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
#[instrument(skip(state))]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<OrderListResponse>, ServiceError> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<OrderStatus>)
        .transpose()?;

    let response = state
        .services
        .orders
        .list_orders(query.page, query.per_page.min(100), status)
        .await?;
    Ok(Json(response))
}

/// Fetch one order with its line items by order number.
#[utoipa::path(
    get,
    path = "/api/v1/orders/{order_number}",
    params(("order_number" = String, Path, description = "Human-facing order number")),
    responses(
        (status = 200, description = "Order detail", body = OrderDetailResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
#[instrument(skip(state))]
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_number): Path<String>,
) -> Result<Json<OrderDetailResponse>, ServiceError> {
    let order = state
        .services
        .orders
        .get_by_order_number(&order_number)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_number)))?;

    let items = state.services.orders.get_order_items(order.id).await?;

    Ok(Json(OrderDetailResponse { order, items }))
}

/// List one customer's orders, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/customers/{customer_id}/orders",
    params(("customer_id" = Uuid, Path, description = "Customer id")),
    responses((status = 200, description = "Customer's orders")),
    tag = "orders"
)]
#[instrument(skip(state))]
pub async fn get_customer_orders(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
) -> Result<Json<Vec<order::Model>>, ServiceError> {
    let orders = state
        .services
        .orders
        .get_orders_for_customer(customer_id)
        .await?;
    Ok(Json(orders))
}
