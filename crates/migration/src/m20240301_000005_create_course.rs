//! Create `course` table.
//! `version` is bumped on every booking change and checked by the booking update.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Course::Table)
                    .if_not_exists()
                    .col(uuid(Course::Id).primary_key())
                    .col(uuid(Course::TenantId).not_null())
                    .col(string_len(Course::Name, 128).not_null())
                    .col(timestamp_with_time_zone(Course::StartsAt).not_null())
                    .col(integer(Course::MaxCapacity).not_null())
                    .col(integer(Course::CurrentBookings).not_null().default(0))
                    .col(integer(Course::Version).not_null().default(0))
                    .col(timestamp_with_time_zone(Course::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Course::UpdatedAt).not_null())
                    .check(Expr::col(Course::CurrentBookings).gte(0))
                    .check(Expr::col(Course::CurrentBookings).lte(Expr::col(Course::MaxCapacity)))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_course_tenant")
                            .from(Course::Table, Course::TenantId)
                            .to(Tenant::Table, Tenant::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Course::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Course {
    Table,
    Id,
    TenantId,
    Name,
    StartsAt,
    MaxCapacity,
    CurrentBookings,
    Version,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Tenant { Table, Id }
