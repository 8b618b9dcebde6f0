//! Create `processed_webhook_event` table.
//! Insert-first dedup of gateway callbacks, keyed by (provider, event id).
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProcessedWebhookEvent::Table)
                    .if_not_exists()
                    .col(string_len(ProcessedWebhookEvent::Provider, 16).not_null())
                    .col(string_len(ProcessedWebhookEvent::EventId, 128).not_null())
                    .col(string_len(ProcessedWebhookEvent::OrderNo, 40).not_null())
                    .col(timestamp_with_time_zone(ProcessedWebhookEvent::ProcessedAt).not_null())
                    .primary_key(
                        Index::create()
                            .name("pk_processed_webhook_event")
                            .col(ProcessedWebhookEvent::Provider)
                            .col(ProcessedWebhookEvent::EventId),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(ProcessedWebhookEvent::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum ProcessedWebhookEvent { Table, EventId, Provider, OrderNo, ProcessedAt }
