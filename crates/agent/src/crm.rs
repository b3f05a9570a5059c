use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;

use smartcrm_core::domain::customer::{Customer, CustomerId};
use smartcrm_core::domain::order::OrderRecord;
use smartcrm_core::domain::task::{LeadTask, NewLeadTask};

#[derive(Debug, Error)]
pub enum CrmApiError {
    #[error("crm transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("crm api returned {status} for {url}: {body}")]
    Status { status: u16, url: String, body: String },
}

/// The CRM operations the scoring agent depends on.
#[async_trait]
pub trait CrmApi: Send + Sync {
    async fn list_customers(&self) -> Result<Vec<Customer>, CrmApiError>;

    async fn orders_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<OrderRecord>, CrmApiError>;

    /// `None` when the CRM does not know the customer.
    async fn update_lead_status(
        &self,
        customer_id: CustomerId,
        lead_status: &str,
    ) -> Result<Option<Customer>, CrmApiError>;

    async fn create_task(&self, task: &NewLeadTask) -> Result<Option<LeadTask>, CrmApiError>;
}

/// REST client for the `/api` routes served by `smartcrm-server`.
#[derive(Clone)]
pub struct HttpCrmApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCrmApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CrmApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string() })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn read_json<T: DeserializeOwned>(
        url: String,
        response: reqwest::Response,
    ) -> Result<T, CrmApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CrmApiError::Status { status: status.as_u16(), url, body });
        }
        Ok(response.json::<T>().await?)
    }

    async fn read_optional_json<T: DeserializeOwned>(
        url: String,
        response: reqwest::Response,
    ) -> Result<Option<T>, CrmApiError> {
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::read_json(url, response).await.map(Some)
    }
}

#[async_trait]
impl CrmApi for HttpCrmApi {
    async fn list_customers(&self) -> Result<Vec<Customer>, CrmApiError> {
        let url = self.url("/customers/");
        let response = self.client.get(&url).send().await?;
        Self::read_json(url, response).await
    }

    async fn orders_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<OrderRecord>, CrmApiError> {
        let url = self.url(&format!("/orders/customer/{customer_id}/"));
        let response = self.client.get(&url).send().await?;
        Self::read_json(url, response).await
    }

    async fn update_lead_status(
        &self,
        customer_id: CustomerId,
        lead_status: &str,
    ) -> Result<Option<Customer>, CrmApiError> {
        let url = self.url(&format!("/customers/{customer_id}/"));
        let response =
            self.client.put(&url).query(&[("lead_status", lead_status)]).send().await?;
        Self::read_optional_json(url, response).await
    }

    async fn create_task(&self, task: &NewLeadTask) -> Result<Option<LeadTask>, CrmApiError> {
        let url = self.url("/tasks/");
        let response = self.client.post(&url).json(task).send().await?;
        Self::read_optional_json(url, response).await
    }
}
