use rust_decimal::Decimal;

use super::{Priority, PriorityClaim, RfmResult};

/// A customer must have ordered within this many days to qualify.
pub const RECENCY_WINDOW_DAYS: u32 = 365;
/// Minimum number of orders to qualify.
pub const MIN_FREQUENCY: u32 = 3;
/// Lifetime spend must be strictly above this amount.
pub const MONETARY_THRESHOLD: Decimal = Decimal::from_parts(5000, 0, 0, false, 0);

/// High only when all three conditions hold. The claim inside `rfm` is ignored.
pub fn compute_priority(rfm: &RfmResult) -> Priority {
    let recent = rfm.recency < RECENCY_WINDOW_DAYS;
    let frequent = rfm.frequency >= MIN_FREQUENCY;
    let valuable = rfm.monetary > MONETARY_THRESHOLD;

    if recent && frequent && valuable {
        Priority::High
    } else {
        Priority::Low
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reconciliation {
    pub claimed: PriorityClaim,
    pub computed: Priority,
}

impl Reconciliation {
    pub fn is_discrepancy(&self) -> bool {
        !self.claimed.agrees_with(self.computed)
    }
}

/// Recomputes the priority and overwrites the claim carried by `rfm`.
pub fn reconcile(rfm: &mut RfmResult) -> Reconciliation {
    let claimed = rfm.priority;
    let computed = compute_priority(rfm);
    rfm.priority = PriorityClaim::from(computed);
    Reconciliation { claimed, computed }
}
