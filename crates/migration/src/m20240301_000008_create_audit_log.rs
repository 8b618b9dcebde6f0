//! Create `audit_log` table. Append-only; no FKs so entries survive hard deletes.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AuditLog::Table)
                    .if_not_exists()
                    .col(uuid(AuditLog::Id).primary_key())
                    .col(uuid_null(AuditLog::TenantId))
                    .col(string_len(AuditLog::Actor, 64).not_null())
                    .col(string_len(AuditLog::Action, 64).not_null())
                    .col(string_len(AuditLog::Entity, 32).not_null())
                    .col(uuid(AuditLog::EntityId).not_null())
                    .col(text_null(AuditLog::Detail))
                    .col(timestamp_with_time_zone(AuditLog::CreatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(AuditLog::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum AuditLog { Table, Id, TenantId, Actor, Action, Entity, EntityId, Detail, CreatedAt }
