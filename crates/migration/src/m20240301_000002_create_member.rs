//! Create `member` table with FK to `tenant`.
//!
//! Validity window is `[validity_start, validity_end)`; includes soft-delete timestamp.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Member::Table)
                    .if_not_exists()
                    .col(uuid(Member::Id).primary_key())
                    .col(uuid(Member::TenantId).not_null())
                    .col(string_len(Member::Phone, 20).not_null())
                    .col(string_len_null(Member::CardNo, 32))
                    .col(string_len(Member::Name, 128).not_null())
                    .col(text_null(Member::IdCardEncrypted))
                    .col(timestamp_with_time_zone(Member::ValidityStart).not_null())
                    .col(timestamp_with_time_zone(Member::ValidityEnd).not_null())
                    .col(timestamp_with_time_zone(Member::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Member::UpdatedAt).not_null())
                    .col(
                        ColumnDef::new(Member::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_member_tenant")
                            .from(Member::Table, Member::TenantId)
                            .to(Tenant::Table, Tenant::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Member::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Member {
    Table,
    Id,
    TenantId,
    Phone,
    CardNo,
    Name,
    IdCardEncrypted,
    ValidityStart,
    ValidityEnd,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum Tenant { Table, Id }
