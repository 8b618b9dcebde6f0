use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use common::types::Page;
use models::enums::BookingStatus;
use models::{booking, member};
use crate::audit_service::{self, actions, AuditEntry};
use crate::booking_service::release_seat;
use crate::crypto::{mask_id_card, PiiCipher};
use crate::errors::ServiceError;
use crate::Pagination;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberFilter {
    #[default]
    All,
    Active,
    Expired,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterMember {
    pub phone: String,
    pub name: String,
    #[serde(default)]
    pub card_no: Option<String>,
    #[serde(default)]
    pub id_card: Option<String>,
    /// length of the first validity window; 0 registers an already expired member
    #[serde(default)]
    pub initial_days: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMember {
    pub name: Option<String>,
    pub card_no: Option<String>,
    pub id_card: Option<String>,
}

/// What callers get to see of a member: derived status, masked PII, no ciphertext.
#[derive(Debug, Clone, Serialize)]
pub struct MemberView {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub phone: String,
    pub card_no: Option<String>,
    pub name: String,
    pub id_card_masked: Option<String>,
    pub validity_start: DateTime<Utc>,
    pub validity_end: DateTime<Utc>,
    pub is_active: bool,
    pub is_expired: bool,
    pub remaining_days: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl MemberView {
    pub fn build(m: &member::Model, cipher: Option<&PiiCipher>, now: DateTime<Utc>) -> Self {
        // undecryptable blobs (rotated key) still show that a value exists
        let id_card_masked = m.id_card_encrypted.as_deref().map(|blob| match cipher.map(|c| c.decrypt_str(blob)) {
            Some(Ok(plain)) => mask_id_card(&plain),
            _ => "********".to_string(),
        });
        Self {
            id: m.id,
            tenant_id: m.tenant_id,
            phone: m.phone.clone(),
            card_no: m.card_no.clone(),
            name: m.name.clone(),
            id_card_masked,
            validity_start: m.validity_start.with_timezone(&Utc),
            validity_end: m.validity_end_utc(),
            is_active: m.is_active(now),
            is_expired: m.is_expired(now),
            remaining_days: m.remaining_days(now),
            created_at: m.created_at.with_timezone(&Utc),
            updated_at: m.updated_at.with_timezone(&Utc),
            deleted_at: m.deleted_at.map(|d| d.with_timezone(&Utc)),
        }
    }
}

pub fn validate_id_card(id_card: &str) -> Result<(), ServiceError> {
    if !(8..=32).contains(&id_card.len()) || !id_card.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ServiceError::Validation("id_card must be 8-32 alphanumeric characters".into()));
    }
    Ok(())
}

fn encrypt_id_card(cipher: Option<&PiiCipher>, id_card: &str) -> Result<String, ServiceError> {
    validate_id_card(id_card)?;
    let cipher = cipher.ok_or_else(|| ServiceError::Validation("id_card storage disabled: no PII key configured".into()))?;
    cipher.encrypt_str(id_card)
}

async fn ensure_card_free(db: &impl sea_orm::ConnectionTrait, tenant_id: Uuid, card_no: &str, except: Option<Uuid>) -> Result<(), ServiceError> {
    let mut q = member::Entity::find()
        .filter(member::Column::TenantId.eq(tenant_id))
        .filter(member::Column::CardNo.eq(card_no));
    if let Some(id) = except { q = q.filter(member::Column::Id.ne(id)); }
    if q.one(db).await?.is_some() {
        return Err(ServiceError::Conflict(format!("card_no {card_no} already in use")));
    }
    Ok(())
}

/// Register a member under a tenant. Phone numbers of soft-deleted members stay taken.
#[instrument(skip(db, cipher, input), fields(tenant_id = %tenant_id))]
pub async fn register_member(
    db: &DatabaseConnection,
    cipher: Option<&PiiCipher>,
    tenant_id: Uuid,
    input: RegisterMember,
    max_initial_days: i64,
    actor: &str,
) -> Result<member::Model, ServiceError> {
    if !(0..=max_initial_days).contains(&input.initial_days) {
        return Err(ServiceError::Validation(format!("initial_days must be within 0..={max_initial_days}")));
    }
    member::validate_phone(&input.phone)?;
    member::validate_name(&input.name)?;
    if let Some(card) = &input.card_no { member::validate_card_no(card)?; }
    let id_card_encrypted = input.id_card.as_deref().map(|c| encrypt_id_card(cipher, c)).transpose()?;

    let txn = db.begin().await?;
    models::tenant::Entity::find_by_id(tenant_id).one(&txn).await?.ok_or_else(|| ServiceError::not_found("tenant"))?;
    let taken = member::Entity::find()
        .filter(member::Column::TenantId.eq(tenant_id))
        .filter(member::Column::Phone.eq(input.phone.as_str()))
        .one(&txn)
        .await?;
    if taken.is_some() {
        return Err(ServiceError::Conflict(format!("phone {} already registered", input.phone)));
    }
    if let Some(card) = &input.card_no { ensure_card_free(&txn, tenant_id, card, None).await?; }

    let now = Utc::now();
    let created = member::create(&txn, member::NewMember {
        tenant_id,
        phone: input.phone,
        card_no: input.card_no,
        name: input.name,
        id_card_encrypted,
        validity_start: now,
        validity_end: now + Duration::days(input.initial_days),
    })
    .await?;
    audit_service::record(&txn, AuditEntry {
        tenant_id: Some(tenant_id),
        actor,
        action: actions::MEMBER_REGISTERED,
        entity: "member",
        entity_id: created.id,
        detail: Some(serde_json::json!({ "initial_days": input.initial_days })),
    })
    .await?;
    txn.commit().await?;

    info!(member_id = %created.id, tenant_id = %tenant_id, "member_registered");
    Ok(created)
}

/// Get a member by id, soft-deleted ones included.
pub async fn get_member(db: &DatabaseConnection, id: Uuid) -> Result<Option<member::Model>, ServiceError> {
    Ok(member::Entity::find_by_id(id).one(db).await?)
}

pub async fn require_member(db: &DatabaseConnection, id: Uuid) -> Result<member::Model, ServiceError> {
    get_member(db, id).await?.ok_or_else(|| ServiceError::not_found("member"))
}

/// Live member with this phone in the tenant.
pub async fn get_member_by_phone(db: &DatabaseConnection, tenant_id: Uuid, phone: &str) -> Result<Option<member::Model>, ServiceError> {
    Ok(member::Entity::find()
        .filter(member::Column::TenantId.eq(tenant_id))
        .filter(member::Column::Phone.eq(phone))
        .filter(member::Column::DeletedAt.is_null())
        .one(db)
        .await?)
}

/// Live members of a tenant, newest first.
pub async fn list_members(
    db: &DatabaseConnection,
    tenant_id: Uuid,
    filter: MemberFilter,
    opts: Pagination,
) -> Result<Page<member::Model>, ServiceError> {
    let now: sea_orm::prelude::DateTimeWithTimeZone = Utc::now().into();
    let mut cond = Condition::all()
        .add(member::Column::TenantId.eq(tenant_id))
        .add(member::Column::DeletedAt.is_null());
    cond = match filter {
        MemberFilter::All => cond,
        MemberFilter::Active => cond.add(member::Column::ValidityStart.lte(now)).add(member::Column::ValidityEnd.gt(now)),
        MemberFilter::Expired => cond.add(member::Column::ValidityEnd.lte(now)),
    };
    let (page_idx, per_page) = opts.normalize();
    let paginator = member::Entity::find()
        .filter(cond)
        .order_by_desc(member::Column::CreatedAt)
        .order_by_asc(member::Column::Id)
        .paginate(db, per_page);
    let total = paginator.num_items().await?;
    let items = paginator.fetch_page(page_idx).await?;
    let (page, per_page) = opts.echo();
    Ok(Page { items, page, per_page, total })
}

/// Update name, card number or id card; phone is immutable.
#[instrument(skip(db, cipher, input), fields(member_id = %id))]
pub async fn update_member(
    db: &DatabaseConnection,
    cipher: Option<&PiiCipher>,
    id: Uuid,
    input: UpdateMember,
    actor: &str,
) -> Result<member::Model, ServiceError> {
    if let Some(name) = &input.name { member::validate_name(name)?; }
    if let Some(card) = &input.card_no { member::validate_card_no(card)?; }
    let id_card_encrypted = input.id_card.as_deref().map(|c| encrypt_id_card(cipher, c)).transpose()?;

    let txn = db.begin().await?;
    let existing = member::Entity::find_by_id(id)
        .one(&txn)
        .await?
        .filter(|m| m.deleted_at.is_none())
        .ok_or_else(|| ServiceError::not_found("member"))?;
    if let Some(card) = &input.card_no { ensure_card_free(&txn, existing.tenant_id, card, Some(id)).await?; }

    let mut changed = Vec::new();
    let tenant_id = existing.tenant_id;
    let mut am: member::ActiveModel = existing.into();
    if let Some(name) = input.name { am.name = Set(name.trim().to_string()); changed.push("name"); }
    if let Some(card) = input.card_no { am.card_no = Set(Some(card)); changed.push("card_no"); }
    if let Some(blob) = id_card_encrypted { am.id_card_encrypted = Set(Some(blob)); changed.push("id_card"); }
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(&txn).await?;

    audit_service::record(&txn, AuditEntry {
        tenant_id: Some(tenant_id),
        actor,
        action: actions::MEMBER_UPDATED,
        entity: "member",
        entity_id: id,
        detail: Some(serde_json::json!({ "fields": changed })),
    })
    .await?;
    txn.commit().await?;
    Ok(updated)
}

/// Mark deleted; repeated calls keep the first deletion time.
pub async fn soft_delete_member(db: &DatabaseConnection, id: Uuid, actor: &str) -> Result<member::Model, ServiceError> {
    let txn = db.begin().await?;
    let existing = member::Entity::find_by_id(id).one(&txn).await?.ok_or_else(|| ServiceError::not_found("member"))?;
    if existing.deleted_at.is_some() {
        return Ok(existing);
    }
    let deleted = member::soft_delete(&txn, id).await?;
    audit_service::record(&txn, AuditEntry {
        tenant_id: Some(deleted.tenant_id),
        actor,
        action: actions::MEMBER_DELETED,
        entity: "member",
        entity_id: id,
        detail: Some(serde_json::json!({ "hard": false })),
    })
    .await?;
    txn.commit().await?;
    info!(member_id = %id, "member_soft_deleted");
    Ok(deleted)
}

/// Remove the member row and everything hanging off it, giving back booked seats first.
pub async fn hard_delete_member(db: &DatabaseConnection, id: Uuid, actor: &str) -> Result<(), ServiceError> {
    let txn = db.begin().await?;
    let existing = member::Entity::find_by_id(id).one(&txn).await?.ok_or_else(|| ServiceError::not_found("member"))?;
    let confirmed = booking::Entity::find()
        .filter(booking::Column::MemberId.eq(id))
        .filter(booking::Column::Status.eq(BookingStatus::Confirmed))
        .all(&txn)
        .await?;
    for b in &confirmed {
        release_seat(&txn, b.course_id).await?;
    }
    member::hard_delete(&txn, id).await?;
    audit_service::record(&txn, AuditEntry {
        tenant_id: Some(existing.tenant_id),
        actor,
        action: actions::MEMBER_DELETED,
        entity: "member",
        entity_id: id,
        detail: Some(serde_json::json!({ "hard": true, "released_seats": confirmed.len() })),
    })
    .await?;
    txn.commit().await?;
    info!(member_id = %id, released_seats = confirmed.len(), "member_hard_deleted");
    Ok(())
}

/// Decrypted id card, for callers allowed to see it.
pub async fn reveal_id_card(db: &DatabaseConnection, cipher: Option<&PiiCipher>, id: Uuid) -> Result<Option<String>, ServiceError> {
    let m = require_member(db, id).await?;
    let Some(blob) = m.id_card_encrypted else { return Ok(None) };
    let cipher = cipher.ok_or_else(|| ServiceError::Crypto("no PII key configured".into()))?;
    cipher.decrypt_str(&blob).map(Some)
}
