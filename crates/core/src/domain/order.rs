use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::customer::CustomerId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub i64);

/// A sales order header. Read-only for the scoring pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    #[serde(rename = "SalesOrderID")]
    pub id: OrderId,
    #[serde(rename = "CustomerID")]
    pub customer_id: CustomerId,
    #[serde(rename = "OrderDate")]
    pub order_date: NaiveDate,
    #[serde(rename = "TotalDue", with = "rust_decimal::serde::float")]
    pub total_due: Decimal,
}
