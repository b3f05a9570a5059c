//! RFM lead-scoring agent.
//!
//! One run walks every customer in the CRM, asks a language model for the
//! customer's Recency/Frequency/Monetary figures and acts on the result:
//!
//! 1. **Analysis** (`analyzer`) - fetch orders, prompt the model with retry,
//!    parse the reply (`parser`) and reconcile the priority.
//! 2. **Dispatch** (`dispatcher`) - mark high-priority customers and open a
//!    follow-up task for a sales rep.
//! 3. **Batch** (`runner`) - sequential pass with per-customer isolation and
//!    an end-of-run summary.
//!
//! # Safety Principle
//!
//! The model only extracts numbers. Lead priority is always recomputed by
//! `smartcrm_core::scoring::compute_priority`, whatever the model claimed.

pub mod analyzer;
pub mod crm;
pub mod dispatcher;
pub mod llm;
pub mod parser;
pub mod prompt;
pub mod runner;

pub use analyzer::{AgentError, AnalysisOutcome, AnalysisStatus, AnalyzerSettings, CustomerAnalyzer};
pub use crm::{CrmApi, CrmApiError, HttpCrmApi};
pub use dispatcher::ActionDispatcher;
pub use llm::{build_llm_client, AnthropicClient, CompletionRequest, LlmClient, LlmError, OllamaClient};
pub use parser::{parse_rfm_response, ParseFailure};
pub use runner::{BatchRunner, RunSummary};
