pub mod config;
pub mod domain;
pub mod errors;
pub mod scoring;

pub use domain::customer::{Customer, CustomerId, HIGH_PRIORITY_LEAD_STATUS};
pub use domain::order::{OrderId, OrderRecord};
pub use domain::task::{LeadReport, LeadTask, NewLeadTask, TaskId};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use scoring::{compute_priority, reconcile, Priority, PriorityClaim, Reconciliation, RfmResult};
