//! Create `payment_order` table.
//! One row per charge sent to a (mock) payment gateway; `status` follows the payment state machine.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PaymentOrder::Table)
                    .if_not_exists()
                    .col(uuid(PaymentOrder::Id).primary_key())
                    .col(uuid(PaymentOrder::TenantId).not_null())
                    .col(uuid(PaymentOrder::MemberId).not_null())
                    .col(string_len(PaymentOrder::OrderNo, 40).unique_key().not_null())
                    .col(big_integer(PaymentOrder::AmountCents).not_null())
                    .col(string_len(PaymentOrder::Provider, 16).not_null())
                    .col(string_len(PaymentOrder::Status, 16).not_null())
                    .col(string_len_null(PaymentOrder::GatewayTxnId, 128))
                    .col(string_len_null(PaymentOrder::FailureReason, 255))
                    .col(timestamp_with_time_zone(PaymentOrder::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(PaymentOrder::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payment_order_tenant")
                            .from(PaymentOrder::Table, PaymentOrder::TenantId)
                            .to(Tenant::Table, Tenant::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payment_order_member")
                            .from(PaymentOrder::Table, PaymentOrder::MemberId)
                            .to(Member::Table, Member::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(PaymentOrder::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum PaymentOrder {
    Table,
    Id,
    TenantId,
    MemberId,
    OrderNo,
    AmountCents,
    Provider,
    Status,
    GatewayTxnId,
    FailureReason,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Tenant { Table, Id }

#[derive(DeriveIden)]
enum Member { Table, Id }
