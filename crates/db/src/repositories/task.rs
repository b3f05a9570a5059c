use sqlx::Row;

use smartcrm_core::domain::customer::CustomerId;
use smartcrm_core::domain::task::{LeadTask, NewLeadTask, TaskId};

use super::{decode_date, encode_date, RepositoryError, TaskRepository};
use crate::DbPool;

const TASK_COLUMNS: &str = "task_id, customer_id, task_description, assigned_to, due_date";

pub struct SqlTaskRepository {
    pool: DbPool,
}

impl SqlTaskRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_task(row: &sqlx::sqlite::SqliteRow) -> Result<LeadTask, RepositoryError> {
    let id: i64 = row.try_get("task_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let customer_id: i64 =
        row.try_get("customer_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let description: String =
        row.try_get("task_description").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let assigned_to: String =
        row.try_get("assigned_to").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let due_date: String =
        row.try_get("due_date").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(LeadTask {
        id: TaskId(id),
        customer_id: CustomerId(customer_id),
        description,
        assigned_to,
        due_date: decode_date(&due_date)?,
    })
}

#[async_trait::async_trait]
impl TaskRepository for SqlTaskRepository {
    async fn list(&self) -> Result<Vec<LeadTask>, RepositoryError> {
        let rows = sqlx::query(&format!("SELECT {TASK_COLUMNS} FROM lead_task ORDER BY task_id"))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_task).collect::<Result<Vec<_>, _>>()
    }

    async fn find_by_id(&self, id: TaskId) -> Result<Option<LeadTask>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {TASK_COLUMNS} FROM lead_task WHERE task_id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_task(r)?)),
            None => Ok(None),
        }
    }

    async fn create(&self, task: NewLeadTask) -> Result<LeadTask, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO lead_task (customer_id, task_description, assigned_to, due_date)
             VALUES (?, ?, ?, ?)",
        )
        .bind(task.customer_id.0)
        .bind(&task.description)
        .bind(&task.assigned_to)
        .bind(encode_date(task.due_date))
        .execute(&self.pool)
        .await?;

        Ok(LeadTask::from_new(TaskId(result.last_insert_rowid()), task))
    }

    async fn update(
        &self,
        id: TaskId,
        task: NewLeadTask,
    ) -> Result<Option<LeadTask>, RepositoryError> {
        let result = sqlx::query(
            "UPDATE lead_task
             SET customer_id = ?, task_description = ?, assigned_to = ?, due_date = ?
             WHERE task_id = ?",
        )
        .bind(task.customer_id.0)
        .bind(&task.description)
        .bind(&task.assigned_to)
        .bind(encode_date(task.due_date))
        .bind(id.0)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.find_by_id(id).await
    }

    async fn delete(&self, id: TaskId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM lead_task WHERE task_id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM lead_task").fetch_one(&self.pool).await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use smartcrm_core::domain::customer::CustomerId;
    use smartcrm_core::domain::task::{NewLeadTask, TaskId};

    use super::SqlTaskRepository;
    use crate::repositories::{RepositoryError, TaskRepository};
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        sqlx::query(
            "INSERT INTO customer (customer_id, first_name, last_name) VALUES (12632, 'Emma', 'Brown')",
        )
        .execute(&pool)
        .await
        .expect("insert customer");
        pool
    }

    fn follow_up(description: &str) -> NewLeadTask {
        NewLeadTask {
            customer_id: CustomerId(12632),
            description: description.to_string(),
            assigned_to: "SalesRep1".to_string(),
            due_date: NaiveDate::from_ymd_opt(2026, 10, 25).expect("date"),
        }
    }

    #[tokio::test]
    async fn create_assigns_id_and_round_trips() {
        let pool = setup().await;
        let repo = SqlTaskRepository::new(pool);

        let created = repo
            .create(follow_up("Follow up with customer #12632 about new products"))
            .await
            .expect("create");
        let found = repo.find_by_id(created.id).await.expect("find").expect("task should exist");

        assert_eq!(found, created);
        assert_eq!(repo.count().await.expect("count"), 1);
    }

    #[tokio::test]
    async fn update_replaces_fields_and_misses_unknown_ids() {
        let pool = setup().await;
        let repo = SqlTaskRepository::new(pool);
        let created = repo.create(follow_up("first call")).await.expect("create");

        let mut replacement = follow_up("second call");
        replacement.assigned_to = "SalesRep2".to_string();
        let updated = repo
            .update(created.id, replacement.clone())
            .await
            .expect("update")
            .expect("task should exist");
        assert_eq!(updated.description, "second call");
        assert_eq!(updated.assigned_to, "SalesRep2");

        let missing = repo.update(TaskId(9999), replacement).await.expect("update missing");
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn delete_reports_whether_a_row_was_removed() {
        let pool = setup().await;
        let repo = SqlTaskRepository::new(pool);
        let created = repo.create(follow_up("call")).await.expect("create");

        assert!(repo.delete(created.id).await.expect("delete"));
        assert!(!repo.delete(created.id).await.expect("delete again"));
        assert!(repo.list().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn create_for_unknown_customer_violates_foreign_key() {
        let pool = setup().await;
        let repo = SqlTaskRepository::new(pool);
        let mut orphan = follow_up("nobody");
        orphan.customer_id = CustomerId(1);

        let result = repo.create(orphan).await;

        assert!(matches!(result, Err(RepositoryError::Database(_))));
    }
}
