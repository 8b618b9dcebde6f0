use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set};
use uuid::Uuid;

use common::types::Page;
use models::audit_log;
use crate::{errors::ServiceError, Pagination};

/// Action names written to `audit_log.action`.
pub mod actions {
    pub const MEMBER_REGISTERED: &str = "member.registered";
    pub const MEMBER_UPDATED: &str = "member.updated";
    pub const MEMBER_DELETED: &str = "member.deleted";
    pub const MEMBER_RENEWED: &str = "member.renewed";
    pub const RENEWAL_REQUESTED: &str = "renewal.requested";
    pub const BOOKING_CREATED: &str = "booking.created";
    pub const BOOKING_CANCELLED: &str = "booking.cancelled";
    pub const COURSE_CREATED: &str = "course.created";
    pub const COURSE_UPDATED: &str = "course.updated";
    pub const COURSE_DELETED: &str = "course.deleted";
    pub const PAYMENT_CREATED: &str = "payment.created";
    pub const PAYMENT_TRANSITION: &str = "payment.transition";
}

#[derive(Debug, Clone)]
pub struct AuditEntry<'a> {
    pub tenant_id: Option<Uuid>,
    pub actor: &'a str,
    pub action: &'a str,
    pub entity: &'a str,
    pub entity_id: Uuid,
    pub detail: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AuditFilter {
    pub tenant_id: Option<Uuid>,
    pub entity_id: Option<Uuid>,
}

/// Write one audit row. Runs on whatever connection or transaction the caller holds.
pub async fn record<C: ConnectionTrait>(conn: &C, entry: AuditEntry<'_>) -> Result<audit_log::Model, ServiceError> {
    let am = audit_log::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(entry.tenant_id),
        actor: Set(entry.actor.to_string()),
        action: Set(entry.action.to_string()),
        entity: Set(entry.entity.to_string()),
        entity_id: Set(entry.entity_id),
        detail: Set(entry.detail.map(|d| d.to_string())),
        created_at: Set(Utc::now().into()),
    };
    let saved = am.insert(conn).await?;
    tracing::debug!(action = entry.action, entity = entry.entity, entity_id = %entry.entity_id, actor = entry.actor, "audit");
    Ok(saved)
}

/// Newest first.
pub async fn list_audit(db: &DatabaseConnection, filter: AuditFilter, opts: Pagination) -> Result<Page<audit_log::Model>, ServiceError> {
    let mut q = audit_log::Entity::find();
    if let Some(t) = filter.tenant_id { q = q.filter(audit_log::Column::TenantId.eq(t)); }
    if let Some(e) = filter.entity_id { q = q.filter(audit_log::Column::EntityId.eq(e)); }
    let (page_idx, per_page) = opts.normalize();
    let paginator = q
        .order_by_desc(audit_log::Column::CreatedAt)
        .order_by_desc(audit_log::Column::Id)
        .paginate(db, per_page);
    let total = paginator.num_items().await?;
    let items = paginator.fetch_page(page_idx).await?;
    let (page, per_page) = opts.echo();
    Ok(Page { items, page, per_page, total })
}
