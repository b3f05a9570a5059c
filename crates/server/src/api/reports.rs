use axum::{extract::State, response::Json};
use smartcrm_core::domain::customer::HIGH_PRIORITY_LEAD_STATUS;
use smartcrm_core::domain::task::LeadReport;

use super::{persistence_failure, ApiError, ApiState};

/// High-priority leads and the total number of open follow-up tasks.
pub async fn lead_report(State(state): State<ApiState>) -> Result<Json<LeadReport>, ApiError> {
    let leads = state
        .customers
        .count_by_lead_status(HIGH_PRIORITY_LEAD_STATUS)
        .await
        .map_err(|error| persistence_failure("report.leads", error))?;
    let tasks =
        state.tasks.count().await.map_err(|error| persistence_failure("report.tasks", error))?;

    Ok(Json(LeadReport { leads, tasks }))
}
