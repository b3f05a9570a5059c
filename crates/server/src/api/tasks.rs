use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::Json,
};
use smartcrm_core::domain::task::{LeadTask, NewLeadTask, TaskId};
use tracing::info;

use super::{invalid_body, not_found, persistence_failure, ApiError, ApiState, MessageResponse};

pub async fn list_tasks(State(state): State<ApiState>) -> Result<Json<Vec<LeadTask>>, ApiError> {
    let tasks = state.tasks.list().await.map_err(|error| persistence_failure("tasks.list", error))?;
    Ok(Json(tasks))
}

pub async fn get_task(
    Path(id): Path<i64>,
    State(state): State<ApiState>,
) -> Result<Json<LeadTask>, ApiError> {
    state
        .tasks
        .find_by_id(TaskId(id))
        .await
        .map_err(|error| persistence_failure("tasks.get", error))?
        .map(Json)
        .ok_or_else(|| not_found("Task"))
}

pub async fn create_task(
    State(state): State<ApiState>,
    payload: Result<Json<NewLeadTask>, JsonRejection>,
) -> Result<Json<LeadTask>, ApiError> {
    let Json(task) = payload.map_err(invalid_body)?;
    ensure_customer_exists(&state, &task).await?;

    let created = state
        .tasks
        .create(task)
        .await
        .map_err(|error| persistence_failure("tasks.create", error))?;

    info!(
        event_name = "api.task.created",
        task_id = created.id.0,
        customer_id = created.customer_id.0,
        assigned_to = %created.assigned_to,
        "lead task created"
    );
    Ok(Json(created))
}

pub async fn update_task(
    Path(id): Path<i64>,
    State(state): State<ApiState>,
    payload: Result<Json<NewLeadTask>, JsonRejection>,
) -> Result<Json<LeadTask>, ApiError> {
    let Json(task) = payload.map_err(invalid_body)?;
    ensure_customer_exists(&state, &task).await?;

    state
        .tasks
        .update(TaskId(id), task)
        .await
        .map_err(|error| persistence_failure("tasks.update", error))?
        .map(Json)
        .ok_or_else(|| not_found("Task"))
}

pub async fn delete_task(
    Path(id): Path<i64>,
    State(state): State<ApiState>,
) -> Result<Json<MessageResponse>, ApiError> {
    let deleted = state
        .tasks
        .delete(TaskId(id))
        .await
        .map_err(|error| persistence_failure("tasks.delete", error))?;

    if !deleted {
        return Err(not_found("Task"));
    }
    info!(event_name = "api.task.deleted", task_id = id, "lead task deleted");
    Ok(Json(MessageResponse { message: "Task deleted".to_string() }))
}

async fn ensure_customer_exists(state: &ApiState, task: &NewLeadTask) -> Result<(), ApiError> {
    let customer = state
        .customers
        .find_by_id(task.customer_id)
        .await
        .map_err(|error| persistence_failure("customers.get", error))?;
    customer.map(|_| ()).ok_or_else(|| not_found("Customer"))
}
