//! Service layer providing business operations on top of models.
//! - Separates business logic from data access.
//! - Reuses validation and entity definitions in `models` crate.
//! - Every multi-row mutation runs in its own database transaction.

pub mod errors;
pub mod crypto;
pub mod audit_service;
pub mod tenant_service;
pub mod member_service;
pub mod renewal;
pub mod course_service;
pub mod booking_service;
pub mod payment;
#[cfg(test)]
pub mod test_support;

pub use common::pagination::Pagination;
