use axum::Router;
use smartcrm_core::config::{AppConfig, ConfigError, LoadOptions};
use smartcrm_db::{connect_with_settings, migrations, DbPool};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::info;

use crate::{api, health};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

#[allow(dead_code)]
pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    Ok(Application { config, db_pool })
}

impl Application {
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.server.bind_address, self.config.server.port)
    }

    pub async fn bind(&self) -> Result<TcpListener, BootstrapError> {
        let address = self.address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| BootstrapError::Bind { address: address.clone(), source })?;
        info!(
            event_name = "system.bootstrap.listening",
            correlation_id = "bootstrap",
            bind_address = %address,
            "http listener bound"
        );
        Ok(listener)
    }

    /// CRM routes and the health probe on one router.
    pub fn router(&self) -> Router {
        api::router(self.db_pool.clone()).merge(health::router(self.db_pool.clone()))
    }
}

#[cfg(test)]
mod tests {
    use smartcrm_core::config::{ConfigOverrides, LlmProvider, LoadOptions};

    use crate::bootstrap::bootstrap;

    fn overrides(database_url: &str) -> ConfigOverrides {
        ConfigOverrides {
            database_url: Some(database_url.to_string()),
            llm_provider: Some(LlmProvider::Ollama),
            ..ConfigOverrides::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_rejects_non_sqlite_database_url() {
        let result = bootstrap(LoadOptions {
            overrides: overrides("postgres://localhost/crm"),
            ..LoadOptions::default()
        })
        .await;

        let message = result.err().expect("bootstrap should fail").to_string();
        assert!(message.contains("database.url"), "unexpected error: {message}");
    }

    #[tokio::test]
    async fn bootstrap_applies_crm_schema() {
        let dir = tempfile::tempdir().expect("tempdir");
        let url = format!("sqlite://{}", dir.path().join("crm.db").display());
        let app = bootstrap(LoadOptions { overrides: overrides(&url), ..LoadOptions::default() })
            .await
            .expect("bootstrap should create and migrate a fresh database file");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('customer', 'sales_order', 'lead_task')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("count crm tables");
        assert_eq!(table_count, 3);

        app.db_pool.close().await;
    }
}
