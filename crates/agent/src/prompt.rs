use chrono::NaiveDate;

use smartcrm_core::domain::customer::CustomerId;
use smartcrm_core::domain::order::OrderRecord;

/// Output template the parser's strict strategy expects.
pub const RFM_RESPONSE_TEMPLATE: &str =
    "Recency: X days, Frequency: Y orders, Monetary: $Z, Priority: High/Low";

/// Builds the RFM analysis prompt.
///
/// The criteria stated to the model use a 30-day recency window while
/// [`smartcrm_core::scoring::compute_priority`] uses 365 days. The model's
/// priority claim is always overwritten, so only the extracted figures matter.
pub fn build_rfm_prompt(
    customer_id: CustomerId,
    orders: &[OrderRecord],
    reference_date: NaiveDate,
) -> Result<String, serde_json::Error> {
    let order_data = serde_json::to_string(orders)?;
    let date = reference_date.format("%Y-%m-%d");

    Ok(format!(
        "Analyze the order history for CustomerID {customer_id}. Reference date: {date}\n\
         High-priority criteria: Recency < 30 days AND Frequency >= 3 orders AND Monetary > $5000\n\
         Calculate:\n\
         - Recency: Days between {date} and customer's most recent order\n\
         - Frequency: Total number of orders for this customer\n\
         - Monetary: Sum of all TotalDue amounts for this customer\n\
         - Priority: High if meets criteria, otherwise Low\n\
         Return EXACTLY in this format: {RFM_RESPONSE_TEMPLATE}\n\
         Order data: {order_data}"
    ))
}
