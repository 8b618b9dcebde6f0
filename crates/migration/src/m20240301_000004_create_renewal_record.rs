//! Create `renewal_record` table: one row per renewal attempt, paid or direct.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RenewalRecord::Table)
                    .if_not_exists()
                    .col(uuid(RenewalRecord::Id).primary_key())
                    .col(uuid(RenewalRecord::MemberId).not_null())
                    .col(timestamp_with_time_zone(RenewalRecord::PreviousEnd).not_null())
                    .col(timestamp_with_time_zone(RenewalRecord::NewEnd).not_null())
                    .col(integer(RenewalRecord::DaysAdded).not_null())
                    .col(integer(RenewalRecord::BonusDays).not_null())
                    .col(big_integer(RenewalRecord::AmountCents).not_null())
                    .col(string_len(RenewalRecord::PaymentStatus, 16).not_null())
                    .col(uuid_null(RenewalRecord::PaymentOrderId))
                    .col(timestamp_with_time_zone(RenewalRecord::CreatedAt).not_null())
                    .col(timestamp_with_time_zone_null(RenewalRecord::AppliedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_renewal_member")
                            .from(RenewalRecord::Table, RenewalRecord::MemberId)
                            .to(Member::Table, Member::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_renewal_payment_order")
                            .from(RenewalRecord::Table, RenewalRecord::PaymentOrderId)
                            .to(PaymentOrder::Table, PaymentOrder::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(RenewalRecord::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum RenewalRecord {
    Table,
    Id,
    MemberId,
    PreviousEnd,
    NewEnd,
    DaysAdded,
    BonusDays,
    AmountCents,
    PaymentStatus,
    PaymentOrderId,
    CreatedAt,
    AppliedAt,
}

#[derive(DeriveIden)]
enum Member { Table, Id }

#[derive(DeriveIden)]
enum PaymentOrder { Table, Id }
