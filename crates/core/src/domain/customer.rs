use std::fmt;

use serde::{Deserialize, Serialize};

/// Lead status written by the agent for customers that pass the priority rule.
pub const HIGH_PRIORITY_LEAD_STATUS: &str = "High Priority";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CustomerId(pub i64);

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    #[serde(rename = "CustomerID")]
    pub id: CustomerId,
    #[serde(rename = "FirstName")]
    pub first_name: String,
    #[serde(rename = "LastName")]
    pub last_name: String,
    #[serde(rename = "EmailAddress", default)]
    pub email_address: Option<String>,
    #[serde(rename = "LeadStatus", default)]
    pub lead_status: Option<String>,
}

impl Customer {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }

    pub fn is_high_priority_lead(&self) -> bool {
        self.lead_status.as_deref() == Some(HIGH_PRIORITY_LEAD_STATUS)
    }
}

#[cfg(test)]
mod tests {
    use super::{Customer, CustomerId, HIGH_PRIORITY_LEAD_STATUS};

    #[test]
    fn customer_uses_pascal_case_wire_names() {
        let customer = Customer {
            id: CustomerId(12632),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email_address: None,
            lead_status: Some(HIGH_PRIORITY_LEAD_STATUS.to_string()),
        };

        let value = serde_json::to_value(&customer).expect("serialize customer");
        assert_eq!(value["CustomerID"], 12632);
        assert_eq!(value["FirstName"], "Ada");
        assert_eq!(value["LeadStatus"], "High Priority");
        assert!(customer.is_high_priority_lead());
    }

    #[test]
    fn missing_optional_fields_deserialize_as_none() {
        let customer: Customer = serde_json::from_str(
            r#"{"CustomerID": 7, "FirstName": "Grace", "LastName": "Hopper"}"#,
        )
        .expect("deserialize customer");

        assert_eq!(customer.id, CustomerId(7));
        assert_eq!(customer.email_address, None);
        assert!(!customer.is_high_priority_lead());
        assert_eq!(customer.display_name(), "Grace Hopper");
    }
}
