//! Membership renewal: pure date arithmetic plus the transactional flows around it.

pub mod plan;
pub mod service;

pub use plan::{compute_renewal, RenewalPlan, RenewalPolicy};
pub use service::{list_renewals, renew_member, request_paid_renewal, PaidRenewal, RenewalOutcome};
