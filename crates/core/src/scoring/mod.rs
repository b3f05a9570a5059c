//! RFM scoring types and the deterministic lead-priority rule.
//!
//! An [`RfmResult`] carries whatever priority the language model *claimed*.
//! The claim is advisory: [`priority::reconcile`] recomputes the priority with
//! [`priority::compute_priority`] and overwrites it before anything acts on it.

pub mod priority;

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub use priority::{compute_priority, reconcile, Reconciliation};

/// Authoritative lead priority.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    High,
    #[default]
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Low => "Low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Priority as stated in model output. `Unknown` when the text never named one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriorityClaim {
    High,
    Low,
    Unknown,
}

impl PriorityClaim {
    /// Case-insensitive match on `high` / `low`; anything else is `Unknown`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "high" => Self::High,
            "low" => Self::Low,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Low => "Low",
            Self::Unknown => "Unknown",
        }
    }

    pub fn agrees_with(&self, priority: Priority) -> bool {
        matches!(
            (self, priority),
            (Self::High, Priority::High) | (Self::Low, Priority::Low)
        )
    }
}

impl From<Priority> for PriorityClaim {
    fn from(priority: Priority) -> Self {
        match priority {
            Priority::High => Self::High,
            Priority::Low => Self::Low,
        }
    }
}

impl fmt::Display for PriorityClaim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recency (days since last order), frequency (order count) and monetary
/// (currency total) extracted from a completion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RfmResult {
    pub recency: u32,
    pub frequency: u32,
    pub monetary: Decimal,
    pub priority: PriorityClaim,
}
