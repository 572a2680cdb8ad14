use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    entities::order,
    errors::ServiceError,
    services::orders::OrderDetail,
    AppState,
};

#[derive(Debug, Serialize)]
pub struct OrderListResponse {
    pub orders: Vec<OrderDetail>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatusRequest {
    #[serde(rename = "orderId", default)]
    pub order_id: Option<String>,
    #[serde(rename = "newStatus", default)]
    pub new_status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UpdateOrderStatusResponse {
    pub success: bool,
    pub message: String,
    pub order: order::Model,
}

#[derive(Debug, Deserialize)]
pub struct DeliveredOrdersQuery {
    pub q: Option<String>,
}

// GET /api/orders
pub async fn list_orders(
    State(state): State<AppState>,
) -> Result<Json<OrderListResponse>, ServiceError> {
    let orders = state.services.orders.list_orders().await?;
    Ok(Json(OrderListResponse { orders }))
}

// POST /api/orders/update-status
pub async fn update_order_status(
    State(state): State<AppState>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> Result<Json<UpdateOrderStatusResponse>, ServiceError> {
    let order_id = payload
        .order_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            ServiceError::ValidationError("order id and new status are required".to_string())
        })?;
    let new_status = payload
        .new_status
        .as_deref()
        .filter(|status| !status.is_empty())
        .ok_or_else(|| {
            ServiceError::ValidationError("order id and new status are required".to_string())
        })?;

    let order_id = Uuid::parse_str(order_id)
        .map_err(|_| ServiceError::NotFound("Order not found".to_string()))?;

    let updated = state
        .services
        .orders
        .update_status(order_id, new_status)
        .await?;

    Ok(Json(UpdateOrderStatusResponse {
        success: true,
        message: format!("Order {} status updated to {}", updated.id, updated.status),
        order: updated,
    }))
}

// GET /api/delivered-orders
pub async fn delivered_orders(
    State(state): State<AppState>,
    Query(query): Query<DeliveredOrdersQuery>,
) -> Result<Json<Vec<OrderDetail>>, ServiceError> {
    let orders = state
        .services
        .orders
        .delivered_orders(query.q.as_deref())
        .await?;
    Ok(Json(orders))
}
