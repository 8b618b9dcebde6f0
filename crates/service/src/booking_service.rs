//! Seat booking with capacity control.
//!
//! Every booking change locks the course row (`SELECT ... FOR UPDATE`) and then
//! moves `current_bookings` with an update guarded by the `version` column, so
//! backends without row locks still cannot oversell.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    Set, TransactionTrait,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use models::enums::BookingStatus;
use models::{booking, course, member};
use crate::audit_service::{self, actions, AuditEntry};
use crate::errors::ServiceError;

async fn lock_course<C: ConnectionTrait>(conn: &C, course_id: Uuid) -> Result<course::Model, ServiceError> {
    course::Entity::find_by_id(course_id)
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("course"))
}

/// `current_bookings += delta` if nobody touched the row since `seen` was read.
async fn shift_bookings<C: ConnectionTrait>(conn: &C, seen: &course::Model, delta: i32) -> Result<(), ServiceError> {
    let res = course::Entity::update_many()
        .col_expr(course::Column::CurrentBookings, Expr::col(course::Column::CurrentBookings).add(delta))
        .col_expr(course::Column::Version, Expr::col(course::Column::Version).add(1))
        .col_expr(course::Column::UpdatedAt, Expr::value(sea_orm::prelude::DateTimeWithTimeZone::from(Utc::now())))
        .filter(course::Column::Id.eq(seen.id))
        .filter(course::Column::Version.eq(seen.version))
        .exec(conn)
        .await?;
    if res.rows_affected == 0 {
        warn!(course_id = %seen.id, version = seen.version, "booking_version_conflict");
        return Err(ServiceError::Conflict("concurrent modification of course, retry".into()));
    }
    Ok(())
}

/// Give one seat back on a course; the count never drops below zero.
pub(crate) async fn release_seat<C: ConnectionTrait>(conn: &C, course_id: Uuid) -> Result<(), ServiceError> {
    let c = lock_course(conn, course_id).await?;
    if c.current_bookings <= 0 {
        warn!(course_id = %course_id, "release_seat_on_empty_course");
        return Ok(());
    }
    shift_bookings(conn, &c, -1).await
}

/// Book one seat for an active member of the course's tenant.
#[instrument(skip(db), fields(course_id = %course_id, member_id = %member_id))]
pub async fn book_course(db: &DatabaseConnection, course_id: Uuid, member_id: Uuid, actor: &str) -> Result<booking::Model, ServiceError> {
    let txn = db.begin().await?;
    let c = lock_course(&txn, course_id).await?;

    let m = member::Entity::find_by_id(member_id).one(&txn).await?.ok_or_else(|| ServiceError::not_found("member"))?;
    if m.tenant_id != c.tenant_id {
        return Err(ServiceError::BusinessRule("member belongs to another tenant".into()));
    }
    let now = Utc::now();
    if !m.is_active(now) {
        return Err(ServiceError::BusinessRule("membership is not active".into()));
    }

    let existing = booking::Entity::find()
        .filter(booking::Column::CourseId.eq(course_id))
        .filter(booking::Column::MemberId.eq(member_id))
        .one(&txn)
        .await?;
    if matches!(&existing, Some(b) if b.status == BookingStatus::Confirmed) {
        return Err(ServiceError::Conflict("member already booked this course".into()));
    }
    if c.is_full() {
        return Err(ServiceError::Conflict("course full".into()));
    }
    shift_bookings(&txn, &c, 1).await?;

    let booked = match existing {
        Some(cancelled) => {
            let mut am: booking::ActiveModel = cancelled.into();
            am.status = Set(BookingStatus::Confirmed);
            am.cancelled_at = Set(None);
            am.update(&txn).await?
        }
        None => booking::ActiveModel {
            id: Set(Uuid::new_v4()),
            course_id: Set(course_id),
            member_id: Set(member_id),
            status: Set(BookingStatus::Confirmed),
            created_at: Set(now.into()),
            cancelled_at: Set(None),
        }
        .insert(&txn)
        .await?,
    };

    audit_service::record(&txn, AuditEntry {
        tenant_id: Some(c.tenant_id),
        actor,
        action: actions::BOOKING_CREATED,
        entity: "booking",
        entity_id: booked.id,
        detail: Some(serde_json::json!({ "course_id": course_id, "member_id": member_id })),
    })
    .await?;
    txn.commit().await?;

    info!(booking_id = %booked.id, seats_left = c.remaining_seats() - 1, "course_booked");
    Ok(booked)
}

#[instrument(skip(db), fields(booking_id = %booking_id))]
pub async fn cancel_booking(db: &DatabaseConnection, booking_id: Uuid, actor: &str) -> Result<booking::Model, ServiceError> {
    let txn = db.begin().await?;
    let b = booking::Entity::find_by_id(booking_id).one(&txn).await?.ok_or_else(|| ServiceError::not_found("booking"))?;
    let c = lock_course(&txn, b.course_id).await?;
    // re-read under the course lock
    let b = booking::Entity::find_by_id(booking_id).one(&txn).await?.ok_or_else(|| ServiceError::not_found("booking"))?;
    if b.status == BookingStatus::Cancelled {
        return Err(ServiceError::Conflict("booking already cancelled".into()));
    }
    if c.current_bookings > 0 {
        shift_bookings(&txn, &c, -1).await?;
    }

    let mut am: booking::ActiveModel = b.into();
    am.status = Set(BookingStatus::Cancelled);
    am.cancelled_at = Set(Some(Utc::now().into()));
    let cancelled = am.update(&txn).await?;

    audit_service::record(&txn, AuditEntry {
        tenant_id: Some(c.tenant_id),
        actor,
        action: actions::BOOKING_CANCELLED,
        entity: "booking",
        entity_id: booking_id,
        detail: Some(serde_json::json!({ "course_id": c.id, "member_id": cancelled.member_id })),
    })
    .await?;
    txn.commit().await?;
    info!(booking_id = %booking_id, course_id = %c.id, "booking_cancelled");
    Ok(cancelled)
}

pub async fn list_bookings_for_course(db: &DatabaseConnection, course_id: Uuid) -> Result<Vec<booking::Model>, ServiceError> {
    course::Entity::find_by_id(course_id).one(db).await?.ok_or_else(|| ServiceError::not_found("course"))?;
    Ok(booking::Entity::find()
        .filter(booking::Column::CourseId.eq(course_id))
        .order_by_asc(booking::Column::CreatedAt)
        .all(db)
        .await?)
}

pub async fn list_bookings_for_member(db: &DatabaseConnection, member_id: Uuid) -> Result<Vec<booking::Model>, ServiceError> {
    member::Entity::find_by_id(member_id).one(db).await?.ok_or_else(|| ServiceError::not_found("member"))?;
    Ok(booking::Entity::find()
        .filter(booking::Column::MemberId.eq(member_id))
        .order_by_desc(booking::Column::CreatedAt)
        .all(db)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use sea_orm::PaginatorTrait;
    use crate::course_service::{self, CreateCourse, UpdateCourse};
    use crate::member_service;
    use crate::test_support::{get_db, random_phone, seed_member};

    async fn course_for(db: &DatabaseConnection, tenant_id: Uuid, capacity: i32) -> Result<course::Model, anyhow::Error> {
        Ok(course_service::create_course(db, tenant_id, CreateCourse {
            name: "HIIT".into(),
            starts_at: Utc::now() + Duration::days(1),
            max_capacity: capacity,
        }, "admin").await?)
    }

    async fn extra_member(db: &DatabaseConnection, tenant_id: Uuid, days: i64) -> Result<member::Model, anyhow::Error> {
        let now = Utc::now();
        Ok(member::create(db, member::NewMember {
            tenant_id,
            phone: random_phone(),
            card_no: None,
            name: "Extra".into(),
            id_card_encrypted: None,
            validity_start: now - Duration::days(1),
            validity_end: now + Duration::days(days),
        }).await?)
    }

    async fn confirmed_count(db: &DatabaseConnection, course_id: Uuid) -> Result<u64, anyhow::Error> {
        Ok(booking::Entity::find()
            .filter(booking::Column::CourseId.eq(course_id))
            .filter(booking::Column::Status.eq(BookingStatus::Confirmed))
            .count(db)
            .await?)
    }

    #[tokio::test]
    async fn book_cancel_rebook() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let (t, m) = seed_member(&db, 30).await?;
        let c = course_for(&db, t.id, 2).await?;

        let b = book_course(&db, c.id, m.id, "app").await?;
        assert_eq!(b.status, BookingStatus::Confirmed);
        assert!(matches!(book_course(&db, c.id, m.id, "app").await, Err(ServiceError::Conflict(_))));

        let after = course_service::require_course(&db, c.id).await?;
        assert_eq!((after.current_bookings, after.version), (1, 1));

        let cancelled = cancel_booking(&db, b.id, "app").await?;
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert!(matches!(cancel_booking(&db, b.id, "app").await, Err(ServiceError::Conflict(_))));
        assert_eq!(course_service::require_course(&db, c.id).await?.current_bookings, 0);

        // the cancelled row is reused
        let again = book_course(&db, c.id, m.id, "app").await?;
        assert_eq!(again.id, b.id);
        assert!(again.cancelled_at.is_none());
        assert_eq!(confirmed_count(&db, c.id).await?, 1);
        assert_eq!(list_bookings_for_member(&db, m.id).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn full_course_and_ineligible_members() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let (t, m) = seed_member(&db, 30).await?;
        let c = course_for(&db, t.id, 1).await?;
        book_course(&db, c.id, m.id, "app").await?;

        let late = extra_member(&db, t.id, 30).await?;
        assert!(matches!(book_course(&db, c.id, late.id, "app").await, Err(ServiceError::Conflict(_))));

        let expired = extra_member(&db, t.id, -1).await?;
        assert!(matches!(book_course(&db, c.id, expired.id, "app").await, Err(ServiceError::BusinessRule(_))));

        let (_, stranger) = seed_member(&db, 30).await?;
        assert!(matches!(book_course(&db, c.id, stranger.id, "app").await, Err(ServiceError::BusinessRule(_))));
        assert!(matches!(book_course(&db, c.id, Uuid::new_v4(), "app").await, Err(ServiceError::NotFound(_))));
        assert!(matches!(book_course(&db, Uuid::new_v4(), m.id, "app").await, Err(ServiceError::NotFound(_))));

        // capacity cannot shrink below taken seats and booked courses cannot be deleted
        let grown = course_service::update_course(&db, c.id, UpdateCourse { max_capacity: Some(3), ..Default::default() }, "admin").await?;
        assert_eq!(grown.max_capacity, 3);
        let two = extra_member(&db, t.id, 30).await?;
        book_course(&db, c.id, two.id, "app").await?;
        assert!(matches!(
            course_service::update_course(&db, c.id, UpdateCourse { max_capacity: Some(1), ..Default::default() }, "admin").await,
            Err(ServiceError::BusinessRule(_))
        ));
        assert!(matches!(course_service::delete_course(&db, c.id, "admin").await, Err(ServiceError::Conflict(_))));
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_bookings_never_oversell() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let (t, _) = seed_member(&db, 30).await?;
        let c = course_for(&db, t.id, 3).await?;
        let mut members = Vec::new();
        for _ in 0..8 {
            members.push(extra_member(&db, t.id, 30).await?);
        }

        let mut handles = Vec::new();
        for m in members {
            let db = db.clone();
            let course_id = c.id;
            handles.push(tokio::spawn(async move { book_course(&db, course_id, m.id, "race").await }));
        }
        let mut ok = 0;
        for h in handles {
            match h.await? {
                Ok(_) => ok += 1,
                Err(ServiceError::Conflict(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }
        assert_eq!(ok, 3);
        let after = course_service::require_course(&db, c.id).await?;
        assert_eq!(after.current_bookings, 3);
        assert_eq!(confirmed_count(&db, c.id).await?, 3);
        Ok(())
    }

    #[tokio::test]
    async fn hard_delete_member_releases_seats() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let (t, m) = seed_member(&db, 30).await?;
        let c = course_for(&db, t.id, 5).await?;
        book_course(&db, c.id, m.id, "app").await?;

        member_service::hard_delete_member(&db, m.id, "admin").await?;
        let after = course_service::require_course(&db, c.id).await?;
        assert_eq!(after.current_bookings, 0);
        assert_eq!(confirmed_count(&db, c.id).await?, 0);
        assert!(list_bookings_for_course(&db, c.id).await?.is_empty());
        Ok(())
    }
}
