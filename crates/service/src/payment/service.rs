use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    Set, TransactionTrait,
};
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use models::enums::{PaymentProvider, PaymentStatus};
use models::{member, payment_order, renewal_record};
use crate::audit_service::{self, actions, AuditEntry};
use crate::errors::ServiceError;
use crate::renewal::service::{apply_for_order, mirror_order_status};
use crate::renewal::RenewalPolicy;
use super::gateway::{GatewayError, GatewayRegistry};

#[derive(Debug, Clone, Serialize)]
pub struct SubmitOutcome {
    pub order: payment_order::Model,
    /// Where the payer completes the charge; absent when the gateway declined.
    pub pay_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransitionOutcome {
    pub order: payment_order::Model,
    pub previous: PaymentStatus,
    /// false when the order already was in the target state
    pub changed: bool,
    /// renewal applied by this transition, if the order paid for one
    pub renewal: Option<renewal_record::Model>,
}

/// `PO` + yyyymmddHHMMSS + 6 random hex chars
pub fn generate_order_no(now: DateTime<Utc>) -> String {
    format!("PO{}{}", now.format("%Y%m%d%H%M%S"), hex::encode(rand::random::<[u8; 3]>()))
}

/// Insert a pending order and its audit row on the caller's connection.
pub(crate) async fn insert_order<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    member_id: Uuid,
    amount_cents: i64,
    provider: PaymentProvider,
    actor: &str,
) -> Result<payment_order::Model, ServiceError> {
    payment_order::validate_amount(amount_cents)?;
    let now = Utc::now();
    let order = payment_order::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(tenant_id),
        member_id: Set(member_id),
        order_no: Set(generate_order_no(now)),
        amount_cents: Set(amount_cents),
        provider: Set(provider),
        status: Set(PaymentStatus::Pending),
        gateway_txn_id: Set(None),
        failure_reason: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(conn)
    .await?;
    audit_service::record(conn, AuditEntry {
        tenant_id: Some(tenant_id),
        actor,
        action: actions::PAYMENT_CREATED,
        entity: "payment_order",
        entity_id: order.id,
        detail: Some(serde_json::json!({ "order_no": order.order_no, "amount_cents": amount_cents, "provider": provider })),
    })
    .await?;
    Ok(order)
}

async fn lock_order<C: ConnectionTrait>(conn: &C, order_id: Uuid) -> Result<payment_order::Model, ServiceError> {
    payment_order::Entity::find_by_id(order_id)
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("payment order"))
}

/// Move an already locked order to `target`.
///
/// Same-state requests are a no-op. Entering `success` applies the linked renewal;
/// `failed` and `cancelled` are mirrored onto it.
pub(crate) async fn transition_locked<C: ConnectionTrait>(
    conn: &C,
    policy: &RenewalPolicy,
    order: payment_order::Model,
    target: PaymentStatus,
    reason: Option<String>,
    txn_id: Option<&str>,
    actor: &str,
) -> Result<TransitionOutcome, ServiceError> {
    let previous = order.status;
    if previous == target {
        return Ok(TransitionOutcome { order, previous, changed: false, renewal: None });
    }
    if !previous.can_transition_to(target) {
        return Err(ServiceError::Payment(format!("illegal transition {previous} -> {target}")));
    }

    let mut am: payment_order::ActiveModel = order.into();
    am.status = Set(target);
    if let Some(txn) = txn_id {
        am.gateway_txn_id = Set(Some(txn.to_string()));
    }
    if matches!(target, PaymentStatus::Failed | PaymentStatus::Cancelled) {
        am.failure_reason = Set(reason.clone());
    }
    am.updated_at = Set(Utc::now().into());
    let order = am.update(conn).await?;

    let renewal = match target {
        PaymentStatus::Success => apply_for_order(conn, policy, &order, actor).await?,
        PaymentStatus::Failed | PaymentStatus::Cancelled => {
            mirror_order_status(conn, order.id, target).await?;
            None
        }
        _ => None,
    };

    audit_service::record(conn, AuditEntry {
        tenant_id: Some(order.tenant_id),
        actor,
        action: actions::PAYMENT_TRANSITION,
        entity: "payment_order",
        entity_id: order.id,
        detail: Some(serde_json::json!({ "from": previous, "to": target, "reason": reason })),
    })
    .await?;
    info!(order_no = %order.order_no, from = %previous, to = %target, "payment_transition");
    Ok(TransitionOutcome { order, previous, changed: true, renewal })
}

/// Order lifecycle on top of the configured gateways.
#[derive(Clone)]
pub struct PaymentService {
    db: DatabaseConnection,
    gateways: Arc<GatewayRegistry>,
    policy: Arc<RenewalPolicy>,
}

impl PaymentService {
    pub fn new(db: DatabaseConnection, gateways: Arc<GatewayRegistry>, policy: Arc<RenewalPolicy>) -> Self {
        Self { db, gateways, policy }
    }

    pub fn db(&self) -> &DatabaseConnection { &self.db }

    pub fn policy(&self) -> &RenewalPolicy { &self.policy }

    #[instrument(skip(self), fields(member_id = %member_id))]
    pub async fn create_order(
        &self,
        tenant_id: Uuid,
        member_id: Uuid,
        amount_cents: i64,
        provider: PaymentProvider,
        actor: &str,
    ) -> Result<payment_order::Model, ServiceError> {
        payment_order::validate_amount(amount_cents)?;
        let txn = self.db.begin().await?;
        let m = member::Entity::find_by_id(member_id)
            .one(&txn)
            .await?
            .filter(|m| m.deleted_at.is_none())
            .ok_or_else(|| ServiceError::not_found("member"))?;
        if m.tenant_id != tenant_id {
            return Err(ServiceError::BusinessRule("member belongs to another tenant".into()));
        }
        let order = insert_order(&txn, tenant_id, member_id, amount_cents, provider, actor).await?;
        txn.commit().await?;
        info!(order_no = %order.order_no, amount_cents, provider = %provider, "payment_order_created");
        Ok(order)
    }

    /// Hand a pending order to its gateway: `processing` on acceptance, `failed` on decline.
    ///
    /// The order row stays locked while the gateway is called, so concurrent
    /// submits charge once; the losers see a non-pending order.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn submit(&self, order_id: Uuid, actor: &str) -> Result<SubmitOutcome, ServiceError> {
        let txn = self.db.begin().await?;
        let order = lock_order(&txn, order_id).await?;
        if order.status != PaymentStatus::Pending {
            return Err(ServiceError::Payment(format!("order is {}, only pending orders can be submitted", order.status)));
        }
        let gateway = self.gateways.get(order.provider)?;
        let out = match gateway.create_charge(&order).await {
            Ok(charge) => {
                let out = transition_locked(&txn, &self.policy, order, PaymentStatus::Processing, None, Some(&charge.txn_id), actor).await?;
                SubmitOutcome { order: out.order, pay_url: Some(charge.pay_url) }
            }
            Err(GatewayError::Declined(reason)) => {
                warn!(order_no = %order.order_no, reason = %reason, "charge_declined");
                let out = transition_locked(&txn, &self.policy, order, PaymentStatus::Failed, Some(reason), None, actor).await?;
                SubmitOutcome { order: out.order, pay_url: None }
            }
            Err(e) => return Err(ServiceError::Payment(e.to_string())),
        };
        txn.commit().await?;
        Ok(out)
    }

    /// Manual transition, checked against the transition table.
    #[instrument(skip(self), fields(order_id = %order_id, target = %target))]
    pub async fn transition(
        &self,
        order_id: Uuid,
        target: PaymentStatus,
        reason: Option<String>,
        actor: &str,
    ) -> Result<TransitionOutcome, ServiceError> {
        self.transition_with(order_id, target, reason, None, actor).await
    }

    pub async fn cancel(&self, order_id: Uuid, reason: Option<String>, actor: &str) -> Result<TransitionOutcome, ServiceError> {
        self.transition_with(order_id, PaymentStatus::Cancelled, reason.or_else(|| Some("cancelled by request".into())), None, actor).await
    }

    async fn transition_with(
        &self,
        order_id: Uuid,
        target: PaymentStatus,
        reason: Option<String>,
        txn_id: Option<&str>,
        actor: &str,
    ) -> Result<TransitionOutcome, ServiceError> {
        let txn = self.db.begin().await?;
        let order = lock_order(&txn, order_id).await?;
        let out = transition_locked(&txn, &self.policy, order, target, reason, txn_id, actor).await?;
        txn.commit().await?;
        Ok(out)
    }

    /// Ask the gateway about a processing order and apply whatever it reports.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn sync(&self, order_id: Uuid, actor: &str) -> Result<TransitionOutcome, ServiceError> {
        let order = self.require_order(order_id).await?;
        if order.status != PaymentStatus::Processing {
            let previous = order.status;
            return Ok(TransitionOutcome { order, previous, changed: false, renewal: None });
        }
        let txn_id = order
            .gateway_txn_id
            .clone()
            .ok_or_else(|| ServiceError::Payment("processing order has no gateway transaction".into()))?;
        let reported = self
            .gateways
            .get(order.provider)?
            .query(&txn_id)
            .await
            .map_err(|e| ServiceError::Payment(e.to_string()))?;
        let reason = matches!(reported, PaymentStatus::Failed | PaymentStatus::Cancelled).then(|| "reported by gateway sync".to_string());
        self.transition_with(order_id, reported, reason, None, actor).await
    }

    pub async fn get_order(&self, id: Uuid) -> Result<Option<payment_order::Model>, ServiceError> {
        Ok(payment_order::Entity::find_by_id(id).one(&self.db).await?)
    }

    pub async fn require_order(&self, id: Uuid) -> Result<payment_order::Model, ServiceError> {
        self.get_order(id).await?.ok_or_else(|| ServiceError::not_found("payment order"))
    }

    pub async fn get_order_by_no(&self, order_no: &str) -> Result<Option<payment_order::Model>, ServiceError> {
        Ok(payment_order::Entity::find()
            .filter(payment_order::Column::OrderNo.eq(order_no))
            .one(&self.db)
            .await?)
    }

    /// Orders of one member, newest first.
    pub async fn list_orders(&self, member_id: Uuid) -> Result<Vec<payment_order::Model>, ServiceError> {
        Ok(payment_order::Entity::find()
            .filter(payment_order::Column::MemberId.eq(member_id))
            .order_by_desc(payment_order::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }
}
