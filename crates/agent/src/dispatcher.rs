use std::sync::Arc;

use chrono::{Days, Local, NaiveDate};
use tracing::{info, warn};

use smartcrm_core::config::AgentConfig;
use smartcrm_core::domain::customer::CustomerId;
use smartcrm_core::domain::task::NewLeadTask;

use crate::crm::CrmApi;

/// Side effects for high-priority customers. Each action reports success as a
/// bool; failures are logged and never retried or compensated.
pub struct ActionDispatcher {
    crm: Arc<dyn CrmApi>,
    assignee: String,
    due_days: u32,
}

impl ActionDispatcher {
    pub fn new(crm: Arc<dyn CrmApi>, assignee: impl Into<String>, due_days: u32) -> Self {
        Self { crm, assignee: assignee.into(), due_days }
    }

    pub fn from_config(crm: Arc<dyn CrmApi>, config: &AgentConfig) -> Self {
        Self::new(crm, config.follow_up_assignee.clone(), config.follow_up_due_days)
    }

    pub async fn update_lead_status(&self, customer_id: CustomerId, status: &str) -> bool {
        match self.crm.update_lead_status(customer_id, status).await {
            Ok(Some(_)) => {
                info!(
                    event_name = "agent.action.lead_status_updated",
                    customer_id = customer_id.0,
                    lead_status = status,
                    "lead status updated"
                );
                true
            }
            Ok(None) => {
                warn!(
                    event_name = "agent.action.lead_status_missing",
                    customer_id = customer_id.0,
                    "crm returned no customer for lead status update"
                );
                false
            }
            Err(error) => {
                warn!(
                    event_name = "agent.action.lead_status_failed",
                    customer_id = customer_id.0,
                    error = %error,
                    "lead status update failed"
                );
                false
            }
        }
    }

    pub async fn create_follow_up_task(&self, customer_id: CustomerId, description: &str) -> bool {
        self.create_follow_up_task_from(customer_id, description, Local::now().date_naive()).await
    }

    pub async fn create_follow_up_task_from(
        &self,
        customer_id: CustomerId,
        description: &str,
        today: NaiveDate,
    ) -> bool {
        let Some(due_date) = today.checked_add_days(Days::new(u64::from(self.due_days))) else {
            warn!(
                event_name = "agent.action.task_due_date_overflow",
                customer_id = customer_id.0,
                due_days = self.due_days,
                "follow-up due date is out of range"
            );
            return false;
        };

        let task = NewLeadTask {
            customer_id,
            description: description.to_string(),
            assigned_to: self.assignee.clone(),
            due_date,
        };

        match self.crm.create_task(&task).await {
            Ok(Some(created)) => {
                info!(
                    event_name = "agent.action.task_created",
                    customer_id = customer_id.0,
                    task_id = created.id.0,
                    due_date = %due_date,
                    "follow-up task created"
                );
                true
            }
            Ok(None) => false,
            Err(error) => {
                warn!(
                    event_name = "agent.action.task_failed",
                    customer_id = customer_id.0,
                    error = %error,
                    "follow-up task creation failed"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;

    use smartcrm_core::domain::customer::CustomerId;

    use super::ActionDispatcher;
    use crate::analyzer::tests::{customer, FakeCrm};

    #[tokio::test]
    async fn follow_up_task_is_assigned_and_due_in_a_week() {
        let crm = Arc::new(FakeCrm { customers: vec![customer(12632)], ..FakeCrm::default() });
        let dispatcher = ActionDispatcher::new(crm.clone(), "SalesRep1", 7);
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).expect("date");

        let created = dispatcher
            .create_follow_up_task_from(
                CustomerId(12632),
                "Follow up with customer #12632 about new products",
                today,
            )
            .await;

        assert!(created);
        let tasks = crm.created_tasks.lock().expect("tasks");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].assigned_to, "SalesRep1");
        assert_eq!(tasks[0].due_date, NaiveDate::from_ymd_opt(2026, 10, 25).expect("date"));
    }

    #[tokio::test]
    async fn lead_status_for_unknown_customer_is_false() {
        let crm = Arc::new(FakeCrm::default());
        let dispatcher = ActionDispatcher::new(crm.clone(), "SalesRep1", 7);

        assert!(!dispatcher.update_lead_status(CustomerId(5), "High Priority").await);
        assert_eq!(crm.status_updates.lock().expect("updates").len(), 1);
    }

    #[tokio::test]
    async fn lead_status_for_known_customer_is_true() {
        let crm = Arc::new(FakeCrm { customers: vec![customer(12632)], ..FakeCrm::default() });
        let dispatcher = ActionDispatcher::new(crm, "SalesRep1", 7);

        assert!(dispatcher.update_lead_status(CustomerId(12632), "High Priority").await);
    }
}
