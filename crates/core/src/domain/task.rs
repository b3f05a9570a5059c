use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::customer::CustomerId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub i64);

/// Payload for creating or replacing a sales follow-up task.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLeadTask {
    #[serde(rename = "CustomerID")]
    pub customer_id: CustomerId,
    #[serde(rename = "TaskDescription")]
    pub description: String,
    #[serde(rename = "AssignedTo")]
    pub assigned_to: String,
    #[serde(rename = "DueDate")]
    pub due_date: NaiveDate,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadTask {
    #[serde(rename = "TaskID")]
    pub id: TaskId,
    #[serde(rename = "CustomerID")]
    pub customer_id: CustomerId,
    #[serde(rename = "TaskDescription")]
    pub description: String,
    #[serde(rename = "AssignedTo")]
    pub assigned_to: String,
    #[serde(rename = "DueDate")]
    pub due_date: NaiveDate,
}

impl LeadTask {
    pub fn from_new(id: TaskId, task: NewLeadTask) -> Self {
        Self {
            id,
            customer_id: task.customer_id,
            description: task.description,
            assigned_to: task.assigned_to,
            due_date: task.due_date,
        }
    }
}

/// Aggregate counts served by the leads report endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadReport {
    pub leads: i64,
    pub tasks: i64,
}
