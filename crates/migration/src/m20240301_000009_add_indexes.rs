use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Member: phone unique per tenant
        manager
            .create_index(
                Index::create()
                    .name("uniq_member_tenant_phone")
                    .table(Member::Table)
                    .col(Member::TenantId)
                    .col(Member::Phone)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Member: card number unique per tenant (NULLs never collide)
        manager
            .create_index(
                Index::create()
                    .name("uniq_member_tenant_card")
                    .table(Member::Table)
                    .col(Member::TenantId)
                    .col(Member::CardNo)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_member_validity_end")
                    .table(Member::Table)
                    .col(Member::ValidityEnd)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_renewal_member")
                    .table(RenewalRecord::Table)
                    .col(RenewalRecord::MemberId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_course_tenant_starts")
                    .table(Course::Table)
                    .col(Course::TenantId)
                    .col(Course::StartsAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_payment_order_member")
                    .table(PaymentOrder::Table)
                    .col(PaymentOrder::MemberId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_audit_entity")
                    .table(AuditLog::Table)
                    .col(AuditLog::EntityId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_audit_tenant_created")
                    .table(AuditLog::Table)
                    .col(AuditLog::TenantId)
                    .col(AuditLog::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("uniq_member_tenant_phone").table(Member::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("uniq_member_tenant_card").table(Member::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_member_validity_end").table(Member::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_renewal_member").table(RenewalRecord::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_course_tenant_starts").table(Course::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_payment_order_member").table(PaymentOrder::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_audit_entity").table(AuditLog::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_audit_tenant_created").table(AuditLog::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Member { Table, TenantId, Phone, CardNo, ValidityEnd }

#[derive(DeriveIden)]
enum RenewalRecord { Table, MemberId }

#[derive(DeriveIden)]
enum Course { Table, TenantId, StartsAt }

#[derive(DeriveIden)]
enum PaymentOrder { Table, MemberId }

#[derive(DeriveIden)]
enum AuditLog { Table, EntityId, CreatedAt, TenantId }
