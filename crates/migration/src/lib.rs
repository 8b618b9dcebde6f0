//! Migrator registering entity-specific migrations in dependency order.
//! Indexes are applied last.
pub use sea_orm_migration::prelude::*;

mod m20240301_000001_create_tenant;
mod m20240301_000002_create_member;
mod m20240301_000003_create_payment_order;
mod m20240301_000004_create_renewal_record;
mod m20240301_000005_create_course;
mod m20240301_000006_create_booking;
mod m20240301_000007_create_processed_webhook_event;
mod m20240301_000008_create_audit_log;
mod m20240301_000009_add_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_tenant::Migration),
            Box::new(m20240301_000002_create_member::Migration),
            Box::new(m20240301_000003_create_payment_order::Migration),
            Box::new(m20240301_000004_create_renewal_record::Migration),
            Box::new(m20240301_000005_create_course::Migration),
            Box::new(m20240301_000006_create_booking::Migration),
            Box::new(m20240301_000007_create_processed_webhook_event::Migration),
            Box::new(m20240301_000008_create_audit_log::Migration),
            // Indexes should always be applied last
            Box::new(m20240301_000009_add_indexes::Migration),
        ]
    }
}
