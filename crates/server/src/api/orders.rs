use axum::{
    extract::{Path, State},
    response::Json,
};
use smartcrm_core::domain::customer::CustomerId;
use smartcrm_core::domain::order::OrderRecord;

use super::{persistence_failure, ApiError, ApiState};

pub async fn list_orders(State(state): State<ApiState>) -> Result<Json<Vec<OrderRecord>>, ApiError> {
    let orders =
        state.orders.list().await.map_err(|error| persistence_failure("orders.list", error))?;
    Ok(Json(orders))
}

/// Unknown customers get an empty list, not a 404.
pub async fn list_customer_orders(
    Path(customer_id): Path<i64>,
    State(state): State<ApiState>,
) -> Result<Json<Vec<OrderRecord>>, ApiError> {
    let orders = state
        .orders
        .list_for_customer(CustomerId(customer_id))
        .await
        .map_err(|error| persistence_failure("orders.list_for_customer", error))?;
    Ok(Json(orders))
}
