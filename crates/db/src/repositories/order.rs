use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::Row;

use smartcrm_core::domain::customer::CustomerId;
use smartcrm_core::domain::order::{OrderId, OrderRecord};

use super::{decode_date, OrderRepository, RepositoryError};
use crate::DbPool;

pub struct SqlOrderRepository {
    pool: DbPool,
}

impl SqlOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_order(row: &sqlx::sqlite::SqliteRow) -> Result<OrderRecord, RepositoryError> {
    let id: i64 =
        row.try_get("sales_order_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let customer_id: i64 =
        row.try_get("customer_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let order_date: String =
        row.try_get("order_date").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let total_due: String =
        row.try_get("total_due").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let total_due = Decimal::from_str(&total_due).map_err(|e| {
        RepositoryError::Decode(format!("invalid total_due `{total_due}` for order {id}: {e}"))
    })?;

    Ok(OrderRecord {
        id: OrderId(id),
        customer_id: CustomerId(customer_id),
        order_date: decode_date(&order_date)?,
        total_due,
    })
}

#[async_trait::async_trait]
impl OrderRepository for SqlOrderRepository {
    async fn list(&self) -> Result<Vec<OrderRecord>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT sales_order_id, customer_id, order_date, total_due
             FROM sales_order
             ORDER BY customer_id ASC, order_date ASC, sales_order_id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_order).collect::<Result<Vec<_>, _>>()
    }

    async fn list_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<OrderRecord>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT sales_order_id, customer_id, order_date, total_due
             FROM sales_order
             WHERE customer_id = ?
             ORDER BY order_date ASC, sales_order_id ASC",
        )
        .bind(customer_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_order).collect::<Result<Vec<_>, _>>()
    }
}
