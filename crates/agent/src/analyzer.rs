use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use smartcrm_core::config::AppConfig;
use smartcrm_core::domain::customer::CustomerId;
use smartcrm_core::scoring::{reconcile, Priority, RfmResult};

use crate::crm::{CrmApi, CrmApiError};
use crate::llm::{CompletionRequest, LlmClient, LlmError};
use crate::parser::parse_rfm_response;
use crate::prompt::build_rfm_prompt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Success,
    NoOrders,
    ParseError,
    ApiError,
    UnexpectedError,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::NoOrders => "no_orders",
            Self::ParseError => "parse_error",
            Self::ApiError => "api_error",
            Self::UnexpectedError => "unexpected_error",
        }
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of analysing one customer. `priority` is always the rule-engine
/// value; every status other than `Success` resolves to `Low`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnalysisOutcome {
    pub customer_id: CustomerId,
    pub status: AnalysisStatus,
    pub rfm: Option<RfmResult>,
    pub priority: Priority,
    pub message: String,
    pub attempt: Option<u32>,
    pub raw_response: Option<String>,
}

impl AnalysisOutcome {
    fn success(customer_id: CustomerId, rfm: RfmResult, priority: Priority, attempt: u32) -> Self {
        Self {
            customer_id,
            status: AnalysisStatus::Success,
            rfm: Some(rfm),
            priority,
            message: format!("Successfully analyzed customer - Priority: {priority}"),
            attempt: Some(attempt),
            raw_response: None,
        }
    }

    fn no_orders(customer_id: CustomerId) -> Self {
        Self::low(customer_id, AnalysisStatus::NoOrders, "Customer has no order history".to_string())
    }

    fn parse_error(customer_id: CustomerId, raw_response: String) -> Self {
        Self {
            raw_response: Some(raw_response),
            ..Self::low(
                customer_id,
                AnalysisStatus::ParseError,
                "Failed to parse RFM data after multiple attempts".to_string(),
            )
        }
    }

    fn api_error(customer_id: CustomerId, attempts: u32, error: &LlmError) -> Self {
        Self::low(
            customer_id,
            AnalysisStatus::ApiError,
            format!("LLM API error after {attempts} attempts: {error}"),
        )
    }

    fn unexpected(customer_id: CustomerId, error: &AgentError) -> Self {
        Self::low(
            customer_id,
            AnalysisStatus::UnexpectedError,
            format!("Unexpected error analyzing customer {customer_id}: {error}"),
        )
    }

    fn low(customer_id: CustomerId, status: AnalysisStatus, message: String) -> Self {
        Self {
            customer_id,
            status,
            rfm: None,
            priority: Priority::Low,
            message,
            attempt: None,
            raw_response: None,
        }
    }

    pub fn is_high_priority(&self) -> bool {
        self.priority == Priority::High
    }
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("order lookup failed: {0}")]
    Crm(#[from] CrmApiError),
    #[error("prompt serialization failed: {0}")]
    Prompt(#[from] serde_json::Error),
}

#[derive(Clone, Debug, PartialEq)]
pub struct AnalyzerSettings {
    pub max_attempts: u32,
    pub retry_backoff: Duration,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

impl AnalyzerSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_attempts: config.agent.max_attempts,
            retry_backoff: Duration::from_millis(config.agent.retry_backoff_ms),
            max_output_tokens: config.llm.max_output_tokens,
            temperature: config.llm.temperature,
        }
    }
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

enum AttemptFailure {
    Llm(LlmError),
    Unparseable(String),
}

pub struct CustomerAnalyzer {
    crm: Arc<dyn CrmApi>,
    llm: Arc<dyn LlmClient>,
    settings: AnalyzerSettings,
}

impl CustomerAnalyzer {
    pub fn new(crm: Arc<dyn CrmApi>, llm: Arc<dyn LlmClient>, settings: AnalyzerSettings) -> Self {
        Self { crm, llm, settings }
    }

    pub async fn analyze(&self, customer_id: CustomerId) -> AnalysisOutcome {
        self.analyze_on(customer_id, Local::now().date_naive()).await
    }

    /// Never fails: errors outside the retry loop become `UnexpectedError`.
    pub async fn analyze_on(
        &self,
        customer_id: CustomerId,
        reference_date: NaiveDate,
    ) -> AnalysisOutcome {
        match self.try_analyze(customer_id, reference_date).await {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(
                    event_name = "agent.analysis.unexpected_error",
                    customer_id = customer_id.0,
                    error = %error,
                    "customer analysis failed"
                );
                AnalysisOutcome::unexpected(customer_id, &error)
            }
        }
    }

    async fn try_analyze(
        &self,
        customer_id: CustomerId,
        reference_date: NaiveDate,
    ) -> Result<AnalysisOutcome, AgentError> {
        let orders = self.crm.orders_for_customer(customer_id).await?;
        if orders.is_empty() {
            info!(
                event_name = "agent.analysis.no_orders",
                customer_id = customer_id.0,
                "customer has no order history"
            );
            return Ok(AnalysisOutcome::no_orders(customer_id));
        }

        let request = CompletionRequest {
            prompt: build_rfm_prompt(customer_id, &orders, reference_date)?,
            max_output_tokens: self.settings.max_output_tokens,
            temperature: self.settings.temperature,
        };

        let max_attempts = self.settings.max_attempts.max(1);
        let mut last_failure = None;

        for attempt in 1..=max_attempts {
            match self.llm.complete(&request).await {
                Ok(text) => match parse_rfm_response(&text) {
                    Some(mut rfm) => {
                        let reconciliation = reconcile(&mut rfm);
                        if reconciliation.is_discrepancy() {
                            warn!(
                                event_name = "agent.priority.discrepancy",
                                customer_id = customer_id.0,
                                claimed = %reconciliation.claimed,
                                computed = %reconciliation.computed,
                                "model priority overridden by rule engine"
                            );
                        }
                        info!(
                            event_name = "agent.analysis.completed",
                            customer_id = customer_id.0,
                            attempt,
                            priority = %reconciliation.computed,
                            "customer analyzed"
                        );
                        return Ok(AnalysisOutcome::success(
                            customer_id,
                            rfm,
                            reconciliation.computed,
                            attempt,
                        ));
                    }
                    None => {
                        warn!(
                            event_name = "agent.analysis.parse_failed",
                            customer_id = customer_id.0,
                            attempt,
                            max_attempts,
                            "could not parse RFM response"
                        );
                        last_failure = Some(AttemptFailure::Unparseable(text));
                    }
                },
                Err(error) => {
                    warn!(
                        event_name = "agent.analysis.llm_failed",
                        customer_id = customer_id.0,
                        attempt,
                        max_attempts,
                        error = %error,
                        "llm call failed"
                    );
                    last_failure = Some(AttemptFailure::Llm(error));
                    if attempt < max_attempts {
                        tokio::time::sleep(self.settings.retry_backoff).await;
                    }
                }
            }
        }

        Ok(match last_failure {
            Some(AttemptFailure::Llm(error)) => {
                AnalysisOutcome::api_error(customer_id, max_attempts, &error)
            }
            Some(AttemptFailure::Unparseable(raw)) => AnalysisOutcome::parse_error(customer_id, raw),
            None => AnalysisOutcome::parse_error(customer_id, String::new()),
        })
    }
}
