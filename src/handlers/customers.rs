use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    errors::ServiceError,
    repositories::CustomerFilter,
    services::customers::{CreateCustomerRequest, UpdateCustomerRequest},
    ApiResponse, AppState,
};

pub async fn create_customer(
    State(state): State<AppState>,
    Json(payload): Json<CreateCustomerRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let created = state.services.customer.create_customer(payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

pub async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let customer = state.services.customer.get_customer(id).await?;
    Ok(Json(ApiResponse::success(customer)))
}

pub async fn list_customers(
    State(state): State<AppState>,
    Query(filter): Query<CustomerFilter>,
) -> Result<impl IntoResponse, ServiceError> {
    let customers = state.services.customer.list_customers(filter).await?;
    Ok(Json(ApiResponse::success(customers)))
}

pub async fn update_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCustomerRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let customer = state.services.customer.update_customer(id, payload).await?;
    Ok(Json(ApiResponse::success(customer)))
}

pub async fn delete_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.customer.delete_customer(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
