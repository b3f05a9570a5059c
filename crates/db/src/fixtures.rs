use tracing::info;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Verification contract for the demo customers: every customer must exist with
/// exactly this many order headers.
const SEED_CUSTOMERS: &[SeedCustomerContract] = &[
    SeedCustomerContract { customer_id: 12632, expected_order_count: 4, label: "customer-12632" },
    SeedCustomerContract { customer_id: 13581, expected_order_count: 1, label: "customer-13581" },
    SeedCustomerContract { customer_id: 14429, expected_order_count: 3, label: "customer-14429" },
    SeedCustomerContract { customer_id: 15691, expected_order_count: 5, label: "customer-15691" },
    SeedCustomerContract { customer_id: 21113, expected_order_count: 3, label: "customer-21113" },
    SeedCustomerContract { customer_id: 22435, expected_order_count: 0, label: "customer-22435" },
    SeedCustomerContract { customer_id: 27748, expected_order_count: 3, label: "customer-27748" },
    SeedCustomerContract { customer_id: 27842, expected_order_count: 2, label: "customer-27842" },
];

/// Deterministic demo data for local runs of the API and the scoring agent.
///
/// Customer 22435 intentionally has no orders so the agent's no-history path
/// is exercised, and 27748 only has orders older than a year.
pub struct DemoDataset;

impl DemoDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_seed_data.sql");

    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        sqlx::raw_sql(Self::SQL).execute(&mut *tx).await?;
        tx.commit().await?;

        let customers_seeded = SEED_CUSTOMERS.len();
        let orders_seeded =
            SEED_CUSTOMERS.iter().map(|customer| customer.expected_order_count as usize).sum();

        info!(
            event_name = "db.seed.loaded",
            customers_seeded,
            orders_seeded,
            "demo dataset loaded"
        );

        Ok(SeedResult { customers_seeded, orders_seeded })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::with_capacity(SEED_CUSTOMERS.len() + 1);

        let ids = sql_array_from_ids(SEED_CUSTOMERS);
        let customer_count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(1) FROM customer WHERE customer_id IN {ids}"
        ))
        .fetch_one(pool)
        .await?;
        checks.push(("customer-count", customer_count == SEED_CUSTOMERS.len() as i64));

        for customer in SEED_CUSTOMERS {
            let exists: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM customer WHERE customer_id = ?1)",
            )
            .bind(customer.customer_id)
            .fetch_one(pool)
            .await?;

            let order_count: i64 =
                sqlx::query_scalar("SELECT COUNT(1) FROM sales_order WHERE customer_id = ?1")
                    .bind(customer.customer_id)
                    .fetch_one(pool)
                    .await?;

            checks.push((customer.label, exists == 1 && order_count == customer.expected_order_count));
        }

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }

    /// Removes the demo customers along with their orders and tasks.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let ids = sql_array_from_ids(SEED_CUSTOMERS);
        let mut tx = pool.begin().await?;

        sqlx::query(&format!("DELETE FROM lead_task WHERE customer_id IN {ids}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM sales_order WHERE customer_id IN {ids}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM customer WHERE customer_id IN {ids}"))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedCustomerContract {
    customer_id: i64,
    expected_order_count: i64,
    label: &'static str,
}

fn sql_array_from_ids(customers: &[SeedCustomerContract]) -> String {
    let joined = customers
        .iter()
        .map(|customer| customer.customer_id.to_string())
        .collect::<Vec<_>>()
        .join(",");
    format!("({joined})")
}

#[derive(Debug)]
pub struct SeedResult {
    pub customers_seeded: usize,
    pub orders_seeded: usize,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .expect("connect to test database");
        migrations::run_pending(&pool).await.expect("run migrations");
        pool
    }

    #[test]
    fn sql_fixture_mentions_every_seed_customer() {
        for customer in SEED_CUSTOMERS {
            assert!(DemoDataset::SQL.contains(&customer.customer_id.to_string()));
        }
    }

    #[tokio::test]
    async fn verify_seed_contract_and_idempotency() {
        let pool = setup().await;

        let first = DemoDataset::load(&pool).await.expect("load seed fixtures");
        let first_verification = DemoDataset::verify(&pool).await.expect("verify seed fixtures");
        assert!(first_verification.all_present, "{:?}", first_verification.checks);
        assert_eq!(first.customers_seeded, 8);
        assert_eq!(first.orders_seeded, 21);

        let second = DemoDataset::load(&pool).await.expect("reload seed fixtures");
        let second_verification =
            DemoDataset::verify(&pool).await.expect("re-verify seed fixtures");
        assert!(second_verification.all_present);
        assert_eq!(second.orders_seeded, first.orders_seeded);
        assert_eq!(first_verification.checks, second_verification.checks);
    }

    #[tokio::test]
    async fn reload_keeps_lead_status_written_by_the_agent() {
        let pool = setup().await;
        DemoDataset::load(&pool).await.expect("load");

        sqlx::query("UPDATE customer SET lead_status = 'High Priority' WHERE customer_id = 12632")
            .execute(&pool)
            .await
            .expect("update lead status");
        DemoDataset::load(&pool).await.expect("reload");

        let status: Option<String> =
            sqlx::query_scalar("SELECT lead_status FROM customer WHERE customer_id = 12632")
                .fetch_one(&pool)
                .await
                .expect("query lead status");
        assert_eq!(status.as_deref(), Some("High Priority"));
    }

    #[tokio::test]
    async fn clean_removes_seeded_rows() {
        let pool = setup().await;
        DemoDataset::load(&pool).await.expect("load");

        DemoDataset::clean(&pool).await.expect("clean");

        let verification = DemoDataset::verify(&pool).await.expect("verify");
        assert!(!verification.all_present);
        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM sales_order")
            .fetch_one(&pool)
            .await
            .expect("count orders");
        assert_eq!(remaining, 0);
    }
}
