use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use smartcrm_core::domain::customer::{Customer, CustomerId};
use smartcrm_core::scoring::Priority;

use crate::analyzer::{AnalysisStatus, CustomerAnalyzer};
use crate::crm::CrmApi;
use crate::dispatcher::ActionDispatcher;

/// Errors shown in the end-of-run report; the rest are only counted.
pub const DISPLAYED_ERROR_LIMIT: usize = 5;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub correlation_id: String,
    pub total_customers: usize,
    pub processed_count: usize,
    pub high_priority_count: usize,
    pub errors: Vec<String>,
}

impl RunSummary {
    pub fn displayed_errors(&self) -> &[String] {
        &self.errors[..self.errors.len().min(DISPLAYED_ERROR_LIMIT)]
    }
}

pub struct BatchRunner {
    crm: Arc<dyn CrmApi>,
    analyzer: CustomerAnalyzer,
    dispatcher: ActionDispatcher,
    high_priority_status: String,
}

impl BatchRunner {
    pub fn new(
        crm: Arc<dyn CrmApi>,
        analyzer: CustomerAnalyzer,
        dispatcher: ActionDispatcher,
        high_priority_status: impl Into<String>,
    ) -> Self {
        Self { crm, analyzer, dispatcher, high_priority_status: high_priority_status.into() }
    }

    /// One sequential pass over every customer. A panic while handling a
    /// customer is recorded in the summary and the pass moves on.
    pub async fn run(&self) -> RunSummary {
        let correlation_id = Uuid::new_v4().to_string();
        let mut summary = RunSummary { correlation_id: correlation_id.clone(), ..RunSummary::default() };

        info!(event_name = "agent.run.started", correlation_id = %correlation_id, "RFM run started");

        let customers = match self.crm.list_customers().await {
            Ok(customers) => customers,
            Err(err) => {
                error!(
                    event_name = "agent.run.customer_fetch_failed",
                    correlation_id = %correlation_id,
                    error = %err,
                    "could not fetch customers"
                );
                summary.errors.push(format!("Failed to fetch customers: {err}"));
                self.report(&summary);
                return summary;
            }
        };
        summary.total_customers = customers.len();

        for customer in &customers {
            let processed = AssertUnwindSafe(self.process_customer(customer, &correlation_id))
                .catch_unwind()
                .await;

            match processed {
                Ok(priority) => {
                    if priority == Priority::High {
                        summary.high_priority_count += 1;
                    }
                    summary.processed_count += 1;
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    error!(
                        event_name = "agent.run.customer_failed",
                        correlation_id = %correlation_id,
                        customer_id = customer.id.0,
                        error = %message,
                        "customer processing panicked"
                    );
                    summary.errors.push(format!("Customer {}: {message}", customer.id));
                }
            }
        }

        self.report(&summary);
        summary
    }

    async fn process_customer(&self, customer: &Customer, correlation_id: &str) -> Priority {
        let outcome = self.analyzer.analyze(customer.id).await;

        if outcome.status == AnalysisStatus::Success {
            if let Some(rfm) = &outcome.rfm {
                info!(
                    event_name = "agent.customer.scored",
                    correlation_id,
                    customer_id = customer.id.0,
                    recency = rfm.recency,
                    frequency = rfm.frequency,
                    monetary = %format!("{:.2}", rfm.monetary),
                    priority = %outcome.priority,
                    "CustomerID: {} | R: {} | F: {} | M: ${:.2} | Priority: {}",
                    customer.id,
                    rfm.recency,
                    rfm.frequency,
                    rfm.monetary,
                    outcome.priority
                );
            }
        } else {
            warn!(
                event_name = "agent.customer.not_scored",
                correlation_id,
                customer_id = customer.id.0,
                status = %outcome.status,
                message = %outcome.message,
                "customer not scored"
            );
        }

        if outcome.is_high_priority() {
            self.act_on_high_priority(customer.id).await;
        }

        outcome.priority
    }

    async fn act_on_high_priority(&self, customer_id: CustomerId) {
        let _ = self.dispatcher.update_lead_status(customer_id, &self.high_priority_status).await;
        let description = format!("Follow up with customer #{customer_id} about new products");
        let _ = self.dispatcher.create_follow_up_task(customer_id, &description).await;
    }

    fn report(&self, summary: &RunSummary) {
        info!(
            event_name = "agent.run.completed",
            correlation_id = %summary.correlation_id,
            processed = summary.processed_count,
            total = summary.total_customers,
            high_priority = summary.high_priority_count,
            error_count = summary.errors.len(),
            "Completed: {}/{} customers, high priority: {}",
            summary.processed_count,
            summary.total_customers,
            summary.high_priority_count
        );
        for message in summary.displayed_errors() {
            warn!(
                event_name = "agent.run.error",
                correlation_id = %summary.correlation_id,
                error = %message,
                "run error"
            );
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use smartcrm_core::domain::customer::CustomerId;

    use super::{BatchRunner, RunSummary};
    use crate::analyzer::tests::{customer, fast_settings, order, FakeCrm, ScriptedLlm};
    use crate::analyzer::CustomerAnalyzer;
    use crate::dispatcher::ActionDispatcher;

    fn runner(crm: Arc<FakeCrm>, llm: Arc<ScriptedLlm>) -> BatchRunner {
        let analyzer = CustomerAnalyzer::new(crm.clone(), llm, fast_settings());
        let dispatcher = ActionDispatcher::new(crm.clone(), "SalesRep1", 7);
        BatchRunner::new(crm, analyzer, dispatcher, "High Priority")
    }

    #[tokio::test]
    async fn high_priority_customers_get_status_and_task() {
        let mut orders = HashMap::new();
        orders.insert(12632, vec![order(1, 12632, (2026, 9, 30), 620_000)]);
        orders.insert(13581, vec![order(2, 13581, (2026, 7, 9), 8_997)]);
        let crm = Arc::new(FakeCrm {
            customers: vec![customer(12632), customer(13581), customer(22435)],
            orders,
            ..FakeCrm::default()
        });
        // 13581 and 22435: first is Low by the rule, second has no orders
        let llm = Arc::new(ScriptedLlm::new(vec![
            Some("Recency: 18 days, Frequency: 4 orders, Monetary: $6,200.00, Priority: High"),
            Some("Recency: 101 days, Frequency: 1 order, Monetary: $89.97, Priority: High"),
        ]));

        let summary = runner(crm.clone(), llm).run().await;

        assert_eq!(summary.total_customers, 3);
        assert_eq!(summary.processed_count, 3);
        assert_eq!(summary.high_priority_count, 1);
        assert!(summary.errors.is_empty());
        assert_eq!(
            *crm.status_updates.lock().expect("updates"),
            vec![(12632, "High Priority".to_string())]
        );
        let tasks = crm.created_tasks.lock().expect("tasks");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].customer_id, CustomerId(12632));
        assert_eq!(tasks[0].description, "Follow up with customer #12632 about new products");
    }

    #[tokio::test]
    async fn panic_in_one_customer_does_not_stop_the_batch() {
        let mut orders = HashMap::new();
        orders.insert(27842, vec![order(3, 27842, (2026, 9, 25), 972_580)]);
        let crm = Arc::new(FakeCrm {
            customers: vec![customer(14429), customer(27842)],
            orders,
            panic_on: vec![14429],
            ..FakeCrm::default()
        });
        let llm = Arc::new(ScriptedLlm::always(
            "Recency: 23 days, Frequency: 2 orders, Monetary: $9,725.80, Priority: High",
        ));

        let summary = runner(crm, llm).run().await;

        assert_eq!(summary.total_customers, 2);
        assert_eq!(summary.processed_count, 1);
        assert_eq!(summary.errors.len(), 1);
        assert!(summary.errors[0].starts_with("Customer 14429: order store corrupted"));
        // frequency 2 fails the rule even though the model said High
        assert_eq!(summary.high_priority_count, 0);
    }

    #[tokio::test]
    async fn customer_fetch_failure_ends_run_with_an_error() {
        let crm = Arc::new(FakeCrm { fail_listing: true, ..FakeCrm::default() });
        let llm = Arc::new(ScriptedLlm::always("unused"));

        let summary = runner(crm, llm).run().await;

        assert_eq!(summary.total_customers, 0);
        assert_eq!(summary.processed_count, 0);
        assert_eq!(summary.errors.len(), 1);
        assert!(summary.errors[0].starts_with("Failed to fetch customers"));
        assert!(!summary.correlation_id.is_empty());
    }

    #[test]
    fn only_first_five_errors_are_displayed() {
        let summary = RunSummary {
            errors: (1..=7).map(|i| format!("Customer {i}: boom")).collect(),
            ..RunSummary::default()
        };

        assert_eq!(summary.displayed_errors().len(), 5);
        assert_eq!(summary.displayed_errors()[4], "Customer 5: boom");
        assert!(RunSummary::default().displayed_errors().is_empty());
    }
}
