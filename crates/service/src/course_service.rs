use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    Set, TransactionTrait,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use common::types::Page;
use models::enums::BookingStatus;
use models::{booking, course, tenant};
use crate::audit_service::{self, actions, AuditEntry};
use crate::errors::ServiceError;
use crate::Pagination;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCourse {
    pub name: String,
    pub starts_at: DateTime<Utc>,
    pub max_capacity: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCourse {
    pub name: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub max_capacity: Option<i32>,
}

/// Create a course under a tenant.
pub async fn create_course(db: &DatabaseConnection, tenant_id: Uuid, input: CreateCourse, actor: &str) -> Result<course::Model, ServiceError> {
    let txn = db.begin().await?;
    tenant::Entity::find_by_id(tenant_id).one(&txn).await?.ok_or_else(|| ServiceError::not_found("tenant"))?;
    let created = course::create(&txn, tenant_id, &input.name, input.starts_at, input.max_capacity).await?;
    audit_service::record(&txn, AuditEntry {
        tenant_id: Some(tenant_id),
        actor,
        action: actions::COURSE_CREATED,
        entity: "course",
        entity_id: created.id,
        detail: Some(serde_json::json!({ "name": created.name, "max_capacity": created.max_capacity })),
    })
    .await?;
    txn.commit().await?;
    info!(course_id = %created.id, tenant_id = %tenant_id, "course_created");
    Ok(created)
}

pub async fn get_course(db: &DatabaseConnection, id: Uuid) -> Result<Option<course::Model>, ServiceError> {
    Ok(course::Entity::find_by_id(id).one(db).await?)
}

pub async fn require_course(db: &DatabaseConnection, id: Uuid) -> Result<course::Model, ServiceError> {
    get_course(db, id).await?.ok_or_else(|| ServiceError::not_found("course"))
}

/// Courses of a tenant by start time.
pub async fn list_courses(db: &DatabaseConnection, tenant_id: Uuid, opts: Pagination) -> Result<Page<course::Model>, ServiceError> {
    let (page_idx, per_page) = opts.normalize();
    let paginator = course::Entity::find()
        .filter(course::Column::TenantId.eq(tenant_id))
        .order_by_asc(course::Column::StartsAt)
        .order_by_asc(course::Column::Id)
        .paginate(db, per_page);
    let total = paginator.num_items().await?;
    let items = paginator.fetch_page(page_idx).await?;
    let (page, per_page) = opts.echo();
    Ok(Page { items, page, per_page, total })
}

/// Capacity may shrink only down to the seats already taken.
pub async fn update_course(db: &DatabaseConnection, id: Uuid, input: UpdateCourse, actor: &str) -> Result<course::Model, ServiceError> {
    if let Some(name) = &input.name { course::validate_name(name)?; }
    if let Some(cap) = input.max_capacity { course::validate_capacity(cap)?; }

    let txn = db.begin().await?;
    let existing = course::Entity::find_by_id(id)
        .lock_exclusive()
        .one(&txn)
        .await?
        .ok_or_else(|| ServiceError::not_found("course"))?;
    if let Some(cap) = input.max_capacity {
        if cap < existing.current_bookings {
            return Err(ServiceError::BusinessRule(format!(
                "max_capacity {cap} is below the {} seats already booked",
                existing.current_bookings
            )));
        }
    }
    let version = existing.version;
    let before = serde_json::json!({ "name": existing.name, "starts_at": existing.starts_at, "max_capacity": existing.max_capacity });
    let mut am: course::ActiveModel = existing.into();
    if let Some(name) = input.name { am.name = Set(name.trim().to_string()); }
    if let Some(at) = input.starts_at { am.starts_at = Set(at.into()); }
    if let Some(cap) = input.max_capacity { am.max_capacity = Set(cap); }
    am.version = Set(version + 1);
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(&txn).await?;
    audit_service::record(&txn, AuditEntry {
        tenant_id: Some(updated.tenant_id),
        actor,
        action: actions::COURSE_UPDATED,
        entity: "course",
        entity_id: updated.id,
        detail: Some(serde_json::json!({
            "before": before,
            "after": { "name": updated.name, "starts_at": updated.starts_at, "max_capacity": updated.max_capacity },
        })),
    })
    .await?;
    txn.commit().await?;
    info!(course_id = %updated.id, version = updated.version, "course_updated");
    Ok(updated)
}

/// Delete a course that nobody is booked on.
pub async fn delete_course(db: &DatabaseConnection, id: Uuid, actor: &str) -> Result<(), ServiceError> {
    let txn = db.begin().await?;
    let existing = course::Entity::find_by_id(id)
        .lock_exclusive()
        .one(&txn)
        .await?
        .ok_or_else(|| ServiceError::not_found("course"))?;
    let confirmed = booking::Entity::find()
        .filter(booking::Column::CourseId.eq(id))
        .filter(booking::Column::Status.eq(BookingStatus::Confirmed))
        .count(&txn)
        .await?;
    if confirmed > 0 {
        return Err(ServiceError::Conflict(format!("course still has {confirmed} confirmed bookings")));
    }
    course::Entity::delete_by_id(id).exec(&txn).await?;
    audit_service::record(&txn, AuditEntry {
        tenant_id: Some(existing.tenant_id),
        actor,
        action: actions::COURSE_DELETED,
        entity: "course",
        entity_id: id,
        detail: Some(serde_json::json!({ "name": existing.name })),
    })
    .await?;
    txn.commit().await?;
    info!(course_id = %id, "course_deleted");
    Ok(())
}
