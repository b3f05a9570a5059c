use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;
use smartcrm_core::domain::customer::{Customer, CustomerId};
use tracing::info;

use super::{not_found, persistence_failure, ApiError, ApiState};

#[derive(Debug, Deserialize)]
pub struct LeadStatusQuery {
    pub lead_status: String,
}

pub async fn list_customers(
    State(state): State<ApiState>,
) -> Result<Json<Vec<Customer>>, ApiError> {
    let customers = state
        .customers
        .list()
        .await
        .map_err(|error| persistence_failure("customers.list", error))?;
    Ok(Json(customers))
}

pub async fn get_customer(
    Path(id): Path<i64>,
    State(state): State<ApiState>,
) -> Result<Json<Customer>, ApiError> {
    state
        .customers
        .find_by_id(CustomerId(id))
        .await
        .map_err(|error| persistence_failure("customers.get", error))?
        .map(Json)
        .ok_or_else(|| not_found("Customer"))
}

pub async fn update_lead_status(
    Path(id): Path<i64>,
    Query(query): Query<LeadStatusQuery>,
    State(state): State<ApiState>,
) -> Result<Json<Customer>, ApiError> {
    let updated = state
        .customers
        .update_lead_status(CustomerId(id), &query.lead_status)
        .await
        .map_err(|error| persistence_failure("customers.update_lead_status", error))?
        .ok_or_else(|| not_found("Customer"))?;

    info!(
        event_name = "api.customer.lead_status_updated",
        customer_id = id,
        lead_status = %query.lead_status,
        "customer lead status updated"
    );
    Ok(Json(updated))
}
