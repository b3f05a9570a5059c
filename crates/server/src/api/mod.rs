//! CRM REST surface consumed by the scoring agent.
//!
//! Wire names are PascalCase (`CustomerID`, `LeadStatus`, ...) and every path
//! ends in a slash. Errors are `{"error": "..."}` with the status taken from
//! the core error mapping.

use std::sync::Arc;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;
use smartcrm_core::errors::{ApplicationError, DomainError, InterfaceError};
use smartcrm_db::repositories::{
    CustomerRepository, OrderRepository, RepositoryError, SqlCustomerRepository,
    SqlOrderRepository, SqlTaskRepository, TaskRepository,
};
use smartcrm_db::DbPool;
use tracing::{error, warn};
use uuid::Uuid;

mod customers;
mod orders;
mod reports;
mod tasks;

#[derive(Clone)]
pub struct ApiState {
    customers: Arc<dyn CustomerRepository>,
    orders: Arc<dyn OrderRepository>,
    tasks: Arc<dyn TaskRepository>,
}

impl ApiState {
    pub fn new(db_pool: DbPool) -> Self {
        Self {
            customers: Arc::new(SqlCustomerRepository::new(db_pool.clone())),
            orders: Arc::new(SqlOrderRepository::new(db_pool.clone())),
            tasks: Arc::new(SqlTaskRepository::new(db_pool)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn router(db_pool: DbPool) -> Router {
    Router::new()
        .route("/api/customers/", get(customers::list_customers))
        .route(
            "/api/customers/{id}/",
            get(customers::get_customer).put(customers::update_lead_status),
        )
        .route("/api/orders/", get(orders::list_orders))
        .route("/api/orders/customer/{id}/", get(orders::list_customer_orders))
        .route("/api/tasks/", get(tasks::list_tasks).post(tasks::create_task))
        .route(
            "/api/tasks/{id}/",
            get(tasks::get_task).put(tasks::update_task).delete(tasks::delete_task),
        )
        .route("/api/report/leads/", get(reports::lead_report))
        .with_state(ApiState::new(db_pool))
}

pub(crate) fn not_found(entity: &'static str) -> ApiError {
    let correlation_id = Uuid::new_v4().to_string();
    let interface =
        ApplicationError::from(DomainError::NotFound { entity }).into_interface(correlation_id);
    warn!(
        event_name = "api.request.not_found",
        correlation_id = interface.correlation_id(),
        entity,
        "requested record does not exist"
    );
    into_response(interface)
}

pub(crate) fn persistence_failure(operation: &'static str, source: RepositoryError) -> ApiError {
    let correlation_id = Uuid::new_v4().to_string();
    error!(
        event_name = "api.request.persistence_failed",
        correlation_id = %correlation_id,
        operation,
        error = %source,
        "repository call failed"
    );
    into_response(ApplicationError::Persistence(source.to_string()).into_interface(correlation_id))
}

/// Undecodable request bodies (missing fields, a `DueDate` that is not
/// `YYYY-MM-DD`, non-JSON content) become a 400 with the generic message.
pub(crate) fn invalid_body(rejection: JsonRejection) -> ApiError {
    let correlation_id = Uuid::new_v4().to_string();
    let interface = ApplicationError::from(DomainError::InvalidInput(rejection.body_text()))
        .into_interface(correlation_id);
    warn!(
        event_name = "api.request.invalid_body",
        correlation_id = interface.correlation_id(),
        error = %interface,
        "request body rejected"
    );
    into_response(interface)
}

fn into_response(error: InterfaceError) -> ApiError {
    let status = match error {
        InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(ErrorResponse { error: error.user_message() }))
}
