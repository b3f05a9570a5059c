use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde::Serialize;
use smartcrm_agent::{
    build_llm_client, ActionDispatcher, AnalyzerSettings, BatchRunner, CustomerAnalyzer,
    HttpCrmApi, RunSummary,
};
use smartcrm_core::config::{AppConfig, LogFormat};

use crate::commands::{build_runtime, load_config, CommandResult};

/// What the command prints: counts plus the first few errors of the run.
#[derive(Debug, Serialize)]
struct RunReport<'a> {
    correlation_id: &'a str,
    total_customers: usize,
    processed_count: usize,
    high_priority_count: usize,
    error_count: usize,
    errors: &'a [String],
}

impl<'a> From<&'a RunSummary> for RunReport<'a> {
    fn from(summary: &'a RunSummary) -> Self {
        Self {
            correlation_id: &summary.correlation_id,
            total_customers: summary.total_customers,
            processed_count: summary.processed_count,
            high_priority_count: summary.high_priority_count,
            error_count: summary.errors.len(),
            errors: summary.displayed_errors(),
        }
    }
}

pub fn run() -> CommandResult {
    let config = match load_config("agent") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    init_logging(&config);

    let runner = match build_runner(&config) {
        Ok(runner) => runner,
        Err(error) => {
            return CommandResult::failure("agent", "runtime_init", format!("{error:#}"), 3);
        }
    };
    let runtime = match build_runtime("agent") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let summary = runtime.block_on(runner.run());
    let message = serde_json::to_string(&RunReport::from(&summary))
        .unwrap_or_else(|error| format!("run finished but the summary did not serialize: {error}"));

    if summary.total_customers == 0 && !summary.errors.is_empty() {
        return CommandResult::failure("agent", "crm_unavailable", message, 5);
    }
    CommandResult::success("agent", message)
}

fn build_runner(config: &AppConfig) -> anyhow::Result<BatchRunner> {
    let crm = Arc::new(
        HttpCrmApi::new(&config.agent.api_base_url, Duration::from_secs(config.llm.timeout_secs))
            .context("failed to build crm api client")?,
    );
    let llm = build_llm_client(&config.llm).context("failed to build llm client")?;

    let analyzer = CustomerAnalyzer::new(crm.clone(), llm, AnalyzerSettings::from_config(config));
    let dispatcher = ActionDispatcher::from_config(crm.clone(), &config.agent);

    Ok(BatchRunner::new(crm, analyzer, dispatcher, config.agent.high_priority_status.clone()))
}

/// Logs go to stderr so stdout stays a single JSON outcome line.
fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    // A subscriber may already be installed when the command runs more than once in a process
    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
