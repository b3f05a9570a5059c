use sqlx::Row;

use smartcrm_core::domain::customer::{Customer, CustomerId};

use super::{CustomerRepository, RepositoryError};
use crate::DbPool;

const CUSTOMER_COLUMNS: &str =
    "customer_id, first_name, last_name, email_address, lead_status";

pub struct SqlCustomerRepository {
    pool: DbPool,
}

impl SqlCustomerRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_customer(row: &sqlx::sqlite::SqliteRow) -> Result<Customer, RepositoryError> {
    let id: i64 =
        row.try_get("customer_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let first_name: String =
        row.try_get("first_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let last_name: String =
        row.try_get("last_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let email_address: Option<String> =
        row.try_get("email_address").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let lead_status: Option<String> =
        row.try_get("lead_status").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(Customer { id: CustomerId(id), first_name, last_name, email_address, lead_status })
}

#[async_trait::async_trait]
impl CustomerRepository for SqlCustomerRepository {
    async fn list(&self) -> Result<Vec<Customer>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customer ORDER BY customer_id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_customer).collect::<Result<Vec<_>, _>>()
    }

    async fn find_by_id(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let row =
            sqlx::query(&format!("SELECT {CUSTOMER_COLUMNS} FROM customer WHERE customer_id = ?"))
                .bind(id.0)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_customer(r)?)),
            None => Ok(None),
        }
    }

    async fn update_lead_status(
        &self,
        id: CustomerId,
        lead_status: &str,
    ) -> Result<Option<Customer>, RepositoryError> {
        let result = sqlx::query("UPDATE customer SET lead_status = ? WHERE customer_id = ?")
            .bind(lead_status)
            .bind(id.0)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.find_by_id(id).await
    }

    async fn count_by_lead_status(&self, lead_status: &str) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customer WHERE lead_status = ?")
            .bind(lead_status)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
