use axum::{
    extract::{Path, Query as QueryParams, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use std::str::FromStr;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    entities::OrderStatus,
    errors::ServiceError,
    queries::{
        GetOrderItemsQuery, GetOrderQuery, GetOrderStatusHistoryQuery, ListOrdersQuery,
        OrderDetail, Query,
    },
    repositories::OrderFilter,
    services::CreateOrderRequest,
    ApiResponse, AppState,
};

/// Body of `PATCH /orders/:id/status`
#[derive(Debug, Deserialize)]
pub struct UpdateStatusBody {
    pub new_status: String,
    pub changed_by: Option<String>,
    pub reason: Option<String>,
}

/// Query parameters accepted by the order listing
#[derive(Debug, Default, Deserialize)]
pub struct OrderListParams {
    pub order_number: Option<String>,
    #[serde(alias = "customer")]
    pub customer_id: Option<Uuid>,
    pub status: Option<String>,
}

fn parse_status(raw: &str) -> Result<OrderStatus, ServiceError> {
    OrderStatus::from_str(raw.trim())
        .map_err(|_| ServiceError::ValidationError(format!("Unknown order status: {}", raw)))
}

/// Blank actor labels fall back to the configured default.
fn actor(state: &AppState, changed_by: Option<String>) -> String {
    changed_by
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| state.config.default_changed_by.clone())
}

/// Create an order; 201 when created, 200 when the idempotency key was already used.
#[instrument(skip(state, payload))]
pub async fn create_order(
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let outcome = state.services.order.create_order(payload).await?;
    let status = if outcome.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };

    let detail = OrderDetail::load(&state.db, outcome.order).await?;
    Ok((status, Json(ApiResponse::success(detail))))
}

pub async fn list_orders(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<OrderListParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let status = params.status.as_deref().map(parse_status).transpose()?;
    let query = ListOrdersQuery {
        filter: OrderFilter {
            order_number: params.order_number,
            customer_id: params.customer_id,
            status,
        },
    };

    let orders = query.execute(&state.db).await?;
    Ok(Json(ApiResponse::success(orders)))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = GetOrderQuery { order_id }.execute(&state.db).await?;
    Ok(Json(ApiResponse::success(order)))
}

pub async fn get_order_items(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let items = GetOrderItemsQuery { order_id }.execute(&state.db).await?;
    Ok(Json(ApiResponse::success(items)))
}

pub async fn get_order_status_history(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let history = GetOrderStatusHistoryQuery { order_id }
        .execute(&state.db)
        .await?;
    Ok(Json(ApiResponse::success(history)))
}

#[instrument(skip(state, body))]
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(body): Json<UpdateStatusBody>,
) -> Result<impl IntoResponse, ServiceError> {
    let new_status = parse_status(&body.new_status)?;
    let changed_by = actor(&state, body.changed_by);

    let updated = state
        .services
        .order_status
        .transition(order_id, new_status, &changed_by, body.reason.as_deref())
        .await?;

    let detail = OrderDetail::load(&state.db, updated).await?;
    Ok(Json(ApiResponse::success(detail)))
}

/// Cancels the order and returns its stock; the order row itself stays.
#[instrument(skip(state))]
pub async fn cancel_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .services
        .order_status
        .cancel_order(order_id, &state.config.default_changed_by, None)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn status_text_is_case_insensitive() {
        assert_eq!(parse_status("confirmed").ok(), Some(OrderStatus::Confirmed));
        assert_eq!(parse_status(" SHIPPED ").ok(), Some(OrderStatus::Shipped));
        assert_matches!(parse_status("LOST"), Err(ServiceError::ValidationError(_)));
    }
}
