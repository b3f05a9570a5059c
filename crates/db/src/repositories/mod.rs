use async_trait::async_trait;
use thiserror::Error;

use smartcrm_core::domain::customer::{Customer, CustomerId};
use smartcrm_core::domain::order::OrderRecord;
use smartcrm_core::domain::task::{LeadTask, NewLeadTask, TaskId};

pub mod customer;
pub mod order;
pub mod task;

pub use customer::SqlCustomerRepository;
pub use order::SqlOrderRepository;
pub use task::SqlTaskRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Customer>, RepositoryError>;
    async fn find_by_id(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError>;
    /// Returns the updated customer, or `None` when no row matched `id`.
    async fn update_lead_status(
        &self,
        id: CustomerId,
        lead_status: &str,
    ) -> Result<Option<Customer>, RepositoryError>;
    async fn count_by_lead_status(&self, lead_status: &str) -> Result<i64, RepositoryError>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<OrderRecord>, RepositoryError>;
    async fn list_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<OrderRecord>, RepositoryError>;
}

#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<LeadTask>, RepositoryError>;
    async fn find_by_id(&self, id: TaskId) -> Result<Option<LeadTask>, RepositoryError>;
    async fn create(&self, task: NewLeadTask) -> Result<LeadTask, RepositoryError>;
    async fn update(
        &self,
        id: TaskId,
        task: NewLeadTask,
    ) -> Result<Option<LeadTask>, RepositoryError>;
    async fn delete(&self, id: TaskId) -> Result<bool, RepositoryError>;
    async fn count(&self) -> Result<i64, RepositoryError>;
}

pub(crate) fn decode_date(raw: &str) -> Result<chrono::NaiveDate, RepositoryError> {
    chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|error| RepositoryError::Decode(format!("invalid date `{raw}`: {error}")))
}

pub(crate) fn encode_date(date: chrono::NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
