use std::env;
use std::sync::{Mutex, OnceLock};

use serde_json::{json, Value};
use smartcrm_cli::commands::{agent, doctor, migrate, seed};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const IN_MEMORY_DB: &[(&str, &str)] = &[
    ("SMARTCRM_DATABASE_URL", "sqlite::memory:"),
    ("SMARTCRM_DATABASE_MAX_CONNECTIONS", "1"),
    ("SMARTCRM_LLM_PROVIDER", "ollama"),
];

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(IN_MEMORY_DB, || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_without_llm_key() {
    with_env(&[("SMARTCRM_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn seed_reports_demo_dataset_counts() {
    with_env(IN_MEMORY_DB, || {
        let result = seed::run();
        assert_eq!(result.exit_code, 0, "expected seed success");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "seed");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["message"], "demo dataset ready: 8 customers, 21 orders");
    });
}

#[test]
fn seed_is_idempotent_across_runs_on_one_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}", dir.path().join("crm.db").display());

    with_env(&[("SMARTCRM_DATABASE_URL", url.as_str()), ("SMARTCRM_LLM_PROVIDER", "ollama")], || {
        let first = seed::run();
        let second = seed::run();

        assert_eq!(first.exit_code, 0, "expected first seed invocation success");
        assert_eq!(second.exit_code, 0, "expected second seed invocation success");
        assert_eq!(parse_payload(&first.output)["message"], parse_payload(&second.output)["message"]);
    });
}

#[test]
fn doctor_passes_for_ollama_with_reachable_database() {
    with_env(IN_MEMORY_DB, || {
        let result = doctor::run(true);
        assert_eq!(result.exit_code, 0);

        let report = parse_payload(&result.output);
        assert_eq!(report["overall_status"], "pass");
        assert_eq!(report["checks"].as_array().map(Vec::len), Some(3));
    });
}

#[test]
fn doctor_skips_dependent_checks_when_config_is_invalid() {
    with_env(&[("SMARTCRM_LLM_TEMPERATURE", "3.5")], || {
        let result = doctor::run(true);
        assert_eq!(result.exit_code, 6);

        let report = parse_payload(&result.output);
        assert_eq!(report["overall_status"], "fail");
        assert_eq!(report["checks"][0]["status"], "fail");
        assert_eq!(report["checks"][1]["status"], "skipped");
        assert_eq!(report["checks"][2]["status"], "skipped");
    });
}

#[test]
fn agent_scores_customers_and_acts_on_high_priority() {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let server = runtime.block_on(async {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/customers/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"CustomerID": 12632, "FirstName": "Emma", "LastName": "Brown"}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/orders/customer/12632/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"SalesOrderID": 71001, "CustomerID": 12632, "OrderDate": "2026-02-14", "TotalDue": 2150.4},
                {"SalesOrderID": 71002, "CustomerID": 12632, "OrderDate": "2026-05-03", "TotalDue": 1874.99},
                {"SalesOrderID": 71004, "CustomerID": 12632, "OrderDate": "2026-09-30", "TotalDue": 1320.75}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": "Recency: 18 days, Frequency: 3 orders, Monetary: $5,346.14, Priority: High"
            })))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/api/customers/12632/"))
            .and(query_param("lead_status", "High Priority"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(
                {"CustomerID": 12632, "FirstName": "Emma", "LastName": "Brown", "LeadStatus": "High Priority"}
            )))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/tasks/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "TaskID": 1, "CustomerID": 12632,
                "TaskDescription": "Follow up with customer #12632 about new products",
                "AssignedTo": "SalesRep1", "DueDate": "2026-10-25"
            })))
            .expect(1)
            .mount(&server)
            .await;
        server
    });

    let api_base = format!("{}/api", server.uri());
    with_env(
        &[
            ("SMARTCRM_LLM_PROVIDER", "ollama"),
            ("SMARTCRM_LLM_BASE_URL", server.uri().as_str()),
            ("SMARTCRM_AGENT_API_BASE_URL", api_base.as_str()),
            ("SMARTCRM_LOGGING_LEVEL", "error"),
        ],
        || {
            let result = agent::run();
            assert_eq!(result.exit_code, 0, "unexpected output: {}", result.output);

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "agent");
            let report: Value = serde_json::from_str(payload["message"].as_str().unwrap_or("{}"))
                .expect("message should carry the run report");
            assert_eq!(report["total_customers"], 1);
            assert_eq!(report["processed_count"], 1);
            assert_eq!(report["high_priority_count"], 1);
            assert_eq!(report["error_count"], 0);
        },
    );

    // Verifies the `.expect(1)` mounts before the server shuts down
    runtime.block_on(server.verify());
}

#[test]
fn agent_fails_when_crm_is_unreachable() {
    with_env(
        &[
            ("SMARTCRM_LLM_PROVIDER", "ollama"),
            ("SMARTCRM_AGENT_API_BASE_URL", "http://127.0.0.1:9/api"),
            ("SMARTCRM_LOGGING_LEVEL", "error"),
        ],
        || {
            let result = agent::run();
            assert_eq!(result.exit_code, 5);

            let payload = parse_payload(&result.output);
            assert_eq!(payload["error_class"], "crm_unavailable");
            assert!(payload["message"].as_str().unwrap_or_default().contains("Failed to fetch customers"));
        },
    );
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "SMARTCRM_DATABASE_URL",
        "SMARTCRM_DATABASE_MAX_CONNECTIONS",
        "SMARTCRM_DATABASE_TIMEOUT_SECS",
        "SMARTCRM_LLM_PROVIDER",
        "SMARTCRM_LLM_API_KEY",
        "CLAUDE_API_KEY",
        "SMARTCRM_LLM_BASE_URL",
        "SMARTCRM_LLM_MODEL",
        "SMARTCRM_LLM_TIMEOUT_SECS",
        "SMARTCRM_LLM_MAX_OUTPUT_TOKENS",
        "SMARTCRM_LLM_TEMPERATURE",
        "SMARTCRM_SERVER_BIND_ADDRESS",
        "SMARTCRM_SERVER_PORT",
        "SMARTCRM_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "SMARTCRM_AGENT_API_BASE_URL",
        "FASTAPI_URL",
        "SMARTCRM_AGENT_MAX_ATTEMPTS",
        "SMARTCRM_AGENT_RETRY_BACKOFF_MS",
        "SMARTCRM_AGENT_FOLLOW_UP_ASSIGNEE",
        "SMARTCRM_AGENT_FOLLOW_UP_DUE_DAYS",
        "SMARTCRM_AGENT_HIGH_PRIORITY_STATUS",
        "SMARTCRM_LOGGING_LEVEL",
        "SMARTCRM_LOGGING_FORMAT",
        "SMARTCRM_LOG_LEVEL",
        "SMARTCRM_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
