use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    Set, TransactionTrait,
};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use models::enums::{PaymentProvider, PaymentStatus};
use models::{member, payment_order, renewal_record};
use crate::audit_service::{self, actions, AuditEntry};
use crate::errors::ServiceError;
use crate::payment::service::insert_order;
use super::plan::{compute_renewal, plan_accepted, RenewalPlan, RenewalPolicy};

#[derive(Debug, Clone, Serialize)]
pub struct RenewalOutcome {
    pub member: member::Model,
    pub record: renewal_record::Model,
    pub plan: RenewalPlan,
}

/// A renewal waiting for its payment order to succeed.
#[derive(Debug, Clone, Serialize)]
pub struct PaidRenewal {
    pub order: payment_order::Model,
    pub record: renewal_record::Model,
    /// Plan as of request time; recomputed when the payment lands.
    pub preview: RenewalPlan,
}

/// Row-locked member, ignoring soft-deleted ones.
pub(crate) async fn lock_live_member<C: ConnectionTrait>(conn: &C, member_id: Uuid) -> Result<member::Model, ServiceError> {
    member::Entity::find_by_id(member_id)
        .lock_exclusive()
        .one(conn)
        .await?
        .filter(|m| m.deleted_at.is_none())
        .ok_or_else(|| ServiceError::not_found("member"))
}

fn days_i32(days: i64) -> Result<i32, ServiceError> {
    i32::try_from(days).map_err(|_| ServiceError::Validation("days out of range".into()))
}

async fn extend_validity<C: ConnectionTrait>(conn: &C, m: member::Model, new_end: DateTime<Utc>, now: DateTime<Utc>) -> Result<member::Model, ServiceError> {
    let mut am: member::ActiveModel = m.into();
    am.validity_end = Set(new_end.into());
    am.updated_at = Set(now.into());
    Ok(am.update(conn).await?)
}

/// Direct renewal (cash desk, admin grant). Applied immediately.
#[instrument(skip(db, policy), fields(member_id = %member_id))]
pub async fn renew_member(
    db: &DatabaseConnection,
    policy: &RenewalPolicy,
    member_id: Uuid,
    days: i64,
    amount_cents: i64,
    actor: &str,
) -> Result<RenewalOutcome, ServiceError> {
    if !(0..=payment_order::MAX_AMOUNT_CENTS).contains(&amount_cents) {
        return Err(ServiceError::Validation(format!("amount_cents must be within 0..={}", payment_order::MAX_AMOUNT_CENTS)));
    }
    policy.validate_days(days)?;

    let txn = db.begin().await?;
    let m = lock_live_member(&txn, member_id).await?;
    let now = Utc::now();
    let plan = compute_renewal(m.validity_end_utc(), now, days, policy)?;

    let record = renewal_record::ActiveModel {
        id: Set(Uuid::new_v4()),
        member_id: Set(m.id),
        previous_end: Set(plan.previous_end.into()),
        new_end: Set(plan.new_end.into()),
        days_added: Set(days_i32(plan.days)?),
        bonus_days: Set(days_i32(plan.bonus_days)?),
        amount_cents: Set(amount_cents),
        payment_status: Set(PaymentStatus::Success),
        payment_order_id: Set(None),
        created_at: Set(now.into()),
        applied_at: Set(Some(now.into())),
    }
    .insert(&txn)
    .await?;
    let tenant_id = m.tenant_id;
    let member = extend_validity(&txn, m, plan.new_end, now).await?;

    audit_service::record(&txn, AuditEntry {
        tenant_id: Some(tenant_id),
        actor,
        action: actions::MEMBER_RENEWED,
        entity: "member",
        entity_id: member.id,
        detail: Some(serde_json::json!({
            "renewal_id": record.id,
            "days": plan.days,
            "bonus_days": plan.bonus_days,
            "previous_end": plan.previous_end,
            "new_end": plan.new_end,
        })),
    })
    .await?;
    txn.commit().await?;

    info!(member_id = %member.id, days = plan.days, bonus = plan.bonus_days, new_end = %plan.new_end, "member_renewed");
    Ok(RenewalOutcome { member, record, plan })
}

/// Open a pending payment order for a renewal; validity changes only once it succeeds.
#[instrument(skip(db, policy), fields(member_id = %member_id, provider = %provider))]
pub async fn request_paid_renewal(
    db: &DatabaseConnection,
    policy: &RenewalPolicy,
    member_id: Uuid,
    days: i64,
    amount_cents: i64,
    provider: PaymentProvider,
    actor: &str,
) -> Result<PaidRenewal, ServiceError> {
    payment_order::validate_amount(amount_cents)?;
    policy.validate_days(days)?;

    let txn = db.begin().await?;
    let m = member::Entity::find_by_id(member_id)
        .one(&txn)
        .await?
        .filter(|m| m.deleted_at.is_none())
        .ok_or_else(|| ServiceError::not_found("member"))?;
    let now = Utc::now();
    let preview = compute_renewal(m.validity_end_utc(), now, days, policy)?;

    let order = insert_order(&txn, m.tenant_id, m.id, amount_cents, provider, actor).await?;
    let record = renewal_record::ActiveModel {
        id: Set(Uuid::new_v4()),
        member_id: Set(m.id),
        previous_end: Set(preview.previous_end.into()),
        new_end: Set(preview.new_end.into()),
        days_added: Set(days_i32(preview.days)?),
        bonus_days: Set(days_i32(preview.bonus_days)?),
        amount_cents: Set(amount_cents),
        payment_status: Set(PaymentStatus::Pending),
        payment_order_id: Set(Some(order.id)),
        created_at: Set(now.into()),
        applied_at: Set(None),
    }
    .insert(&txn)
    .await?;

    audit_service::record(&txn, AuditEntry {
        tenant_id: Some(m.tenant_id),
        actor,
        action: actions::RENEWAL_REQUESTED,
        entity: "member",
        entity_id: m.id,
        detail: Some(serde_json::json!({ "renewal_id": record.id, "order_no": order.order_no, "days": days })),
    })
    .await?;
    txn.commit().await?;

    info!(member_id = %m.id, order_no = %order.order_no, days, "renewal_requested");
    Ok(PaidRenewal { order, record, preview })
}

/// Extend the member for the renewal paid by `order_id`, if any.
///
/// Recomputes from the member's current end so renewals that landed in the
/// meantime stack. A record that already has `applied_at` is returned untouched.
pub(crate) async fn apply_for_order<C: ConnectionTrait>(
    conn: &C,
    policy: &RenewalPolicy,
    order: &payment_order::Model,
    actor: &str,
) -> Result<Option<renewal_record::Model>, ServiceError> {
    let Some(rec) = renewal_record::Entity::find()
        .filter(renewal_record::Column::PaymentOrderId.eq(order.id))
        .lock_exclusive()
        .one(conn)
        .await?
    else {
        return Ok(None);
    };
    if rec.is_applied() {
        return Ok(Some(rec));
    }

    let m = member::Entity::find_by_id(rec.member_id)
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("member"))?;
    let now = Utc::now();
    let plan = plan_accepted(m.validity_end_utc(), now, rec.days_added as i64, policy)?;
    let member = extend_validity(conn, m, plan.new_end, now).await?;

    let mut am: renewal_record::ActiveModel = rec.into();
    am.previous_end = Set(plan.previous_end.into());
    am.new_end = Set(plan.new_end.into());
    am.bonus_days = Set(days_i32(plan.bonus_days)?);
    am.payment_status = Set(PaymentStatus::Success);
    am.applied_at = Set(Some(now.into()));
    let rec = am.update(conn).await?;

    audit_service::record(conn, AuditEntry {
        tenant_id: Some(member.tenant_id),
        actor,
        action: actions::MEMBER_RENEWED,
        entity: "member",
        entity_id: member.id,
        detail: Some(serde_json::json!({
            "renewal_id": rec.id,
            "order_no": order.order_no,
            "days": plan.days,
            "bonus_days": plan.bonus_days,
            "new_end": plan.new_end,
        })),
    })
    .await?;
    info!(member_id = %member.id, order_no = %order.order_no, new_end = %plan.new_end, "paid_renewal_applied");
    Ok(Some(rec))
}

/// Copy a non-success order status onto its unapplied renewal record.
pub(crate) async fn mirror_order_status<C: ConnectionTrait>(conn: &C, order_id: Uuid, status: PaymentStatus) -> Result<(), ServiceError> {
    renewal_record::Entity::update_many()
        .col_expr(renewal_record::Column::PaymentStatus, Expr::value(status))
        .filter(renewal_record::Column::PaymentOrderId.eq(order_id))
        .filter(renewal_record::Column::AppliedAt.is_null())
        .exec(conn)
        .await?;
    Ok(())
}

/// Renewal history, newest first.
pub async fn list_renewals(db: &DatabaseConnection, member_id: Uuid) -> Result<Vec<renewal_record::Model>, ServiceError> {
    member::Entity::find_by_id(member_id).one(db).await?.ok_or_else(|| ServiceError::not_found("member"))?;
    Ok(renewal_record::Entity::find()
        .filter(renewal_record::Column::MemberId.eq(member_id))
        .order_by_desc(renewal_record::Column::CreatedAt)
        .all(db)
        .await?)
}
