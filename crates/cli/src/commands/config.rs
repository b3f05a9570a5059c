use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use smartcrm_core::config::{AppConfig, LoadOptions};
use toml::Value;

struct ConfigRow {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for row in rows(&config) {
        let source = field_source(
            row.key,
            row.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(row.key, &row.value, source));
    }

    lines.join("\n")
}

fn rows(config: &AppConfig) -> Vec<ConfigRow> {
    let row = |key: &'static str, value: String, env_keys: &'static [&'static str]| ConfigRow {
        key,
        value,
        env_keys,
    };
    let api_key = config
        .llm
        .api_key
        .as_ref()
        .map(|key| redact_secret(key.expose_secret()))
        .unwrap_or_else(|| "<unset>".to_string());

    vec![
        row("database.url", config.database.url.clone(), &["SMARTCRM_DATABASE_URL"]),
        row(
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["SMARTCRM_DATABASE_MAX_CONNECTIONS"],
        ),
        row(
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["SMARTCRM_DATABASE_TIMEOUT_SECS"],
        ),
        row("llm.provider", format!("{:?}", config.llm.provider), &["SMARTCRM_LLM_PROVIDER"]),
        row("llm.api_key", api_key, &["SMARTCRM_LLM_API_KEY", "CLAUDE_API_KEY"]),
        row(
            "llm.base_url",
            config.llm.effective_base_url().to_string(),
            &["SMARTCRM_LLM_BASE_URL"],
        ),
        row("llm.model", config.llm.model.clone(), &["SMARTCRM_LLM_MODEL"]),
        row("llm.timeout_secs", config.llm.timeout_secs.to_string(), &["SMARTCRM_LLM_TIMEOUT_SECS"]),
        row(
            "llm.max_output_tokens",
            config.llm.max_output_tokens.to_string(),
            &["SMARTCRM_LLM_MAX_OUTPUT_TOKENS"],
        ),
        row("llm.temperature", config.llm.temperature.to_string(), &["SMARTCRM_LLM_TEMPERATURE"]),
        row(
            "server.bind_address",
            config.server.bind_address.clone(),
            &["SMARTCRM_SERVER_BIND_ADDRESS"],
        ),
        row("server.port", config.server.port.to_string(), &["SMARTCRM_SERVER_PORT"]),
        row(
            "agent.api_base_url",
            config.agent.api_base_url.clone(),
            &["SMARTCRM_AGENT_API_BASE_URL", "FASTAPI_URL"],
        ),
        row(
            "agent.max_attempts",
            config.agent.max_attempts.to_string(),
            &["SMARTCRM_AGENT_MAX_ATTEMPTS"],
        ),
        row(
            "agent.retry_backoff_ms",
            config.agent.retry_backoff_ms.to_string(),
            &["SMARTCRM_AGENT_RETRY_BACKOFF_MS"],
        ),
        row(
            "agent.follow_up_assignee",
            config.agent.follow_up_assignee.clone(),
            &["SMARTCRM_AGENT_FOLLOW_UP_ASSIGNEE"],
        ),
        row(
            "agent.follow_up_due_days",
            config.agent.follow_up_due_days.to_string(),
            &["SMARTCRM_AGENT_FOLLOW_UP_DUE_DAYS"],
        ),
        row(
            "logging.level",
            config.logging.level.clone(),
            &["SMARTCRM_LOGGING_LEVEL", "SMARTCRM_LOG_LEVEL"],
        ),
        row(
            "logging.format",
            format!("{:?}", config.logging.format),
            &["SMARTCRM_LOGGING_FORMAT", "SMARTCRM_LOG_FORMAT"],
        ),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("smartcrm.toml"), PathBuf::from("config/smartcrm.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps a recognisable key prefix (`sk-ant-***`) and hides the rest.
fn redact_secret(secret: &str) -> String {
    let trimmed = secret.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    match trimmed.match_indices('-').nth(1) {
        Some((index, _)) => format!("{}-***", &trimmed[..index]),
        None => "<redacted>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use toml::Value;

    use super::{contains_path, redact_secret};

    #[test]
    fn anthropic_keys_keep_only_their_prefix() {
        assert_eq!(redact_secret("sk-ant-api03-abcdef"), "sk-ant-***");
        assert_eq!(redact_secret("opaque"), "<redacted>");
        assert_eq!(redact_secret("  "), "<empty>");
    }

    #[test]
    fn nested_keys_are_found_in_the_config_document() {
        let doc: Value =
            "[agent]\nmax_attempts = 5\n".parse().expect("toml document should parse");

        assert!(contains_path(&doc, "agent.max_attempts"));
        assert!(!contains_path(&doc, "agent.retry_backoff_ms"));
        assert!(!contains_path(&doc, "llm.model"));
    }
}
