//! Create `booking` table with FKs to `course` and `member`.
//! A member holds at most one booking row per course (unique index below).
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Booking::Table)
                    .if_not_exists()
                    .col(uuid(Booking::Id).primary_key())
                    .col(uuid(Booking::CourseId).not_null())
                    .col(uuid(Booking::MemberId).not_null())
                    .col(string_len(Booking::Status, 16).not_null())
                    .col(timestamp_with_time_zone(Booking::CreatedAt).not_null())
                    .col(timestamp_with_time_zone_null(Booking::CancelledAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_booking_course")
                            .from(Booking::Table, Booking::CourseId)
                            .to(Course::Table, Course::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_booking_member")
                            .from(Booking::Table, Booking::MemberId)
                            .to(Member::Table, Member::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uniq_booking_member_course")
                    .table(Booking::Table)
                    .col(Booking::MemberId)
                    .col(Booking::CourseId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Booking::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Booking { Table, Id, CourseId, MemberId, Status, CreatedAt, CancelledAt }

#[derive(DeriveIden)]
enum Course { Table, Id }

#[derive(DeriveIden)]
enum Member { Table, Id }
