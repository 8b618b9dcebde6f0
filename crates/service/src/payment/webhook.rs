//! Gateway callbacks: signature check, idempotency, then the state machine.

use std::time::Duration;

use chrono::Utc;
use hmac::{Hmac, Mac};
use moka::future::Cache;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QuerySelect, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{info, instrument, warn};

use configs::PaymentConfig;
use models::enums::{PaymentProvider, PaymentStatus};
use models::{payment_order, processed_webhook_event};
use crate::errors::ServiceError;
use super::service::{transition_locked, PaymentService};

pub const SIGNATURE_HEADER: &str = "X-Signature";
const WEBHOOK_ACTOR: &str = "gateway";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebhookEvent {
    pub event_id: String,
    pub order_no: String,
    pub status: String,
    #[serde(default)]
    pub gateway_txn_id: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WebhookOutcome {
    pub duplicate: bool,
    pub order_no: String,
    pub status: Option<PaymentStatus>,
}

fn mac_for(secret: &str, timestamp: &str, body: &[u8]) -> Result<HmacSha256, ServiceError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| ServiceError::Crypto("hmac key error".into()))?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(body);
    Ok(mac)
}

/// Header value `t=<unix>,v1=<hex hmac-sha256("t.body")>`.
pub fn sign(secret: &str, timestamp: i64, body: &[u8]) -> Result<String, ServiceError> {
    let ts = timestamp.to_string();
    let sig = hex::encode(mac_for(secret, &ts, body)?.finalize().into_bytes());
    Ok(format!("t={ts},v1={sig}"))
}

pub fn verify_signature(secret: &str, header: &str, body: &[u8], now: i64, tolerance_secs: i64) -> Result<(), ServiceError> {
    let mut timestamp = "";
    let mut signature = "";
    for part in header.split(',') {
        let part = part.trim();
        if let Some(t) = part.strip_prefix("t=") {
            timestamp = t;
        } else if let Some(v) = part.strip_prefix("v1=") {
            signature = v;
        }
    }
    if timestamp.is_empty() || signature.is_empty() {
        return Err(ServiceError::Validation("malformed signature header".into()));
    }

    let sig_bytes = hex::decode(signature).map_err(|_| ServiceError::Validation("signature is not hex".into()))?;
    mac_for(secret, timestamp, body)?
        .verify_slice(&sig_bytes)
        .map_err(|_| ServiceError::Validation("signature mismatch".into()))?;

    let ts: i64 = timestamp.parse().map_err(|_| ServiceError::Validation("invalid signature timestamp".into()))?;
    if (now - ts).abs() > tolerance_secs {
        return Err(ServiceError::Validation("signature timestamp outside tolerance".into()));
    }
    Ok(())
}

/// Verifies and applies gateway callbacks exactly once per event id.
#[derive(Clone)]
pub struct WebhookProcessor {
    secret: String,
    tolerance_secs: i64,
    seen: Cache<String, ()>,
}

impl WebhookProcessor {
    pub fn new(cfg: &PaymentConfig) -> Self {
        let seen = Cache::builder()
            .max_capacity(cfg.idempotency_capacity)
            .time_to_live(Duration::from_secs(cfg.idempotency_ttl_secs))
            .build();
        Self { secret: cfg.webhook_secret.clone(), tolerance_secs: cfg.signature_tolerance_secs, seen }
    }

    fn cache_key(provider: PaymentProvider, event_id: &str) -> String {
        format!("webhook:{provider}:{event_id}")
    }

    #[instrument(skip(self, payments, signature, body), fields(provider = %provider))]
    pub async fn handle(
        &self,
        payments: &PaymentService,
        provider: PaymentProvider,
        signature: Option<&str>,
        body: &[u8],
    ) -> Result<WebhookOutcome, ServiceError> {
        if self.secret.is_empty() {
            return Err(ServiceError::Validation("webhook secret not configured".into()));
        }
        let header = signature.ok_or_else(|| ServiceError::Validation(format!("missing {SIGNATURE_HEADER} header")))?;
        if let Err(e) = verify_signature(&self.secret, header, body, Utc::now().timestamp(), self.tolerance_secs) {
            warn!(provider = %provider, error = %e, "webhook_signature_rejected");
            return Err(e);
        }

        let event: WebhookEvent = serde_json::from_slice(body).map_err(|e| ServiceError::Validation(format!("invalid webhook body: {e}")))?;
        if event.event_id.trim().is_empty() || event.event_id.len() > 128 {
            return Err(ServiceError::Validation("event_id must be 1-128 characters".into()));
        }
        let target: PaymentStatus = event.status.parse()?;

        let key = Self::cache_key(provider, &event.event_id);
        if self.seen.contains_key(&key) {
            return self.duplicate(payments, &event).await;
        }

        let txn = payments.db().begin().await?;
        let marker = processed_webhook_event::ActiveModel {
            event_id: Set(event.event_id.clone()),
            provider: Set(provider.to_string()),
            order_no: Set(event.order_no.clone()),
            processed_at: Set(Utc::now().into()),
        };
        match marker.insert(&txn).await.map_err(ServiceError::from) {
            Ok(_) => {}
            Err(ServiceError::Conflict(_)) => {
                txn.rollback().await?;
                self.seen.insert(key, ()).await;
                return self.duplicate(payments, &event).await;
            }
            Err(e) => return Err(e),
        }

        let order = payment_order::Entity::find()
            .filter(payment_order::Column::OrderNo.eq(event.order_no.as_str()))
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("payment order"))?;
        if order.provider != provider {
            return Err(ServiceError::BusinessRule(format!("order {} belongs to {}, not {}", order.order_no, order.provider, provider)));
        }

        let policy = payments.policy();
        let txn_id = event.gateway_txn_id.as_deref();
        // a success callback implies the charge was submitted
        let order = if target == PaymentStatus::Success && order.status == PaymentStatus::Pending {
            transition_locked(&txn, policy, order, PaymentStatus::Processing, None, txn_id, WEBHOOK_ACTOR).await?.order
        } else {
            order
        };
        let out = transition_locked(&txn, policy, order, target, event.reason.clone(), txn_id, WEBHOOK_ACTOR).await?;
        txn.commit().await?;
        self.seen.insert(key, ()).await;

        info!(event_id = %event.event_id, order_no = %out.order.order_no, status = %out.order.status, changed = out.changed, "webhook_applied");
        Ok(WebhookOutcome { duplicate: false, order_no: out.order.order_no, status: Some(out.order.status) })
    }

    async fn duplicate(&self, payments: &PaymentService, event: &WebhookEvent) -> Result<WebhookOutcome, ServiceError> {
        info!(event_id = %event.event_id, order_no = %event.order_no, "webhook_duplicate");
        let status = payments.get_order_by_no(&event.order_no).await?.map(|o| o.status);
        Ok(WebhookOutcome { duplicate: true, order_no: event.order_no.clone(), status })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use sea_orm::{DatabaseConnection, EntityTrait};
    use models::member;
    use crate::payment::GatewayRegistry;
    use crate::renewal::{request_paid_renewal, RenewalPolicy};
    use crate::test_support::{get_db, seed_member};

    const SECRET: &str = "whsec_test";

    fn processor() -> WebhookProcessor {
        WebhookProcessor::new(&PaymentConfig { webhook_secret: SECRET.into(), ..PaymentConfig::default() })
    }

    fn payments(db: &DatabaseConnection) -> PaymentService {
        PaymentService::new(db.clone(), Arc::new(GatewayRegistry::mock_all()), Arc::new(RenewalPolicy::default()))
    }

    fn body(event_id: &str, order_no: &str, status: &str) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({ "event_id": event_id, "order_no": order_no, "status": status })).unwrap()
    }

    #[test]
    fn signature_roundtrip_and_rejections() {
        let now = Utc::now().timestamp();
        let payload = br#"{"event_id":"evt_1"}"#;
        let header = sign(SECRET, now, payload).unwrap();
        assert!(verify_signature(SECRET, &header, payload, now, 300).is_ok());

        assert!(verify_signature("other", &header, payload, now, 300).is_err());
        assert!(verify_signature(SECRET, &header, br#"{"event_id":"evt_2"}"#, now, 300).is_err());
        assert!(verify_signature(SECRET, &header, payload, now + 301, 300).is_err());
        assert!(verify_signature(SECRET, "v1=abcd", payload, now, 300).is_err());
        assert!(verify_signature(SECRET, "t=1,v1=zz", payload, now, 300).is_err());
    }

    #[tokio::test]
    async fn webhook_applies_once_and_dedups() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let (_, m) = seed_member(&db, 5).await?;
        let svc = payments(&db);
        let hooks = processor();

        let paid = request_paid_renewal(&db, svc.policy(), m.id, 30, 3000, PaymentProvider::Wechat, "app").await?;
        let payload = body("evt_success_1", &paid.order.order_no, "success");
        let sig = sign(SECRET, Utc::now().timestamp(), &payload)?;

        // pending order walks through processing to success
        let first = hooks.handle(&svc, PaymentProvider::Wechat, Some(&sig), &payload).await?;
        assert!(!first.duplicate);
        assert_eq!(first.status, Some(PaymentStatus::Success));
        let extended = member::Entity::find_by_id(m.id).one(&db).await?.unwrap();
        assert!(extended.validity_end > m.validity_end);

        let second = hooks.handle(&svc, PaymentProvider::Wechat, Some(&sig), &payload).await?;
        assert!(second.duplicate);

        // a fresh processor (restart) still sees the durable marker
        let restarted = processor();
        let third = restarted.handle(&svc, PaymentProvider::Wechat, Some(&sig), &payload).await?;
        assert!(third.duplicate);
        let unchanged = member::Entity::find_by_id(m.id).one(&db).await?.unwrap();
        assert_eq!(unchanged.validity_end, extended.validity_end);
        Ok(())
    }

    #[tokio::test]
    async fn same_event_id_from_two_providers_both_apply() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let (_, wx_member) = seed_member(&db, 5).await?;
        let (_, ali_member) = seed_member(&db, 5).await?;
        let svc = payments(&db);
        let hooks = processor();
        let now = Utc::now().timestamp();

        let wx = request_paid_renewal(&db, svc.policy(), wx_member.id, 30, 3000, PaymentProvider::Wechat, "app").await?;
        let ali = request_paid_renewal(&db, svc.policy(), ali_member.id, 30, 3000, PaymentProvider::Alipay, "app").await?;

        for (provider, order_no) in [(PaymentProvider::Wechat, &wx.order.order_no), (PaymentProvider::Alipay, &ali.order.order_no)] {
            let payload = body("evt_shared", order_no, "success");
            let sig = sign(SECRET, now, &payload)?;
            let out = hooks.handle(&svc, provider, Some(&sig), &payload).await?;
            assert!(!out.duplicate, "{provider} callback treated as duplicate");
            assert_eq!(out.status, Some(PaymentStatus::Success));
        }

        for m in [&wx_member, &ali_member] {
            let after = member::Entity::find_by_id(m.id).one(&db).await?.unwrap();
            assert!(after.validity_end > m.validity_end);
        }
        Ok(())
    }

    #[tokio::test]
    async fn webhook_rejections() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let (t, m) = seed_member(&db, 5).await?;
        let svc = payments(&db);
        let hooks = processor();
        let order = svc.create_order(t.id, m.id, 100, PaymentProvider::Alipay, "app").await?;
        let now = Utc::now().timestamp();

        let payload = body("evt_bad_sig", &order.order_no, "failed");
        assert!(matches!(hooks.handle(&svc, PaymentProvider::Alipay, None, &payload).await, Err(ServiceError::Validation(_))));
        let wrong = sign("nope", now, &payload)?;
        assert!(matches!(hooks.handle(&svc, PaymentProvider::Alipay, Some(&wrong), &payload).await, Err(ServiceError::Validation(_))));

        let mismatch = body("evt_mismatch", &order.order_no, "failed");
        let sig = sign(SECRET, now, &mismatch)?;
        assert!(matches!(hooks.handle(&svc, PaymentProvider::Stripe, Some(&sig), &mismatch).await, Err(ServiceError::BusinessRule(_))));

        let unknown = body("evt_unknown", "PO_missing", "failed");
        let sig = sign(SECRET, now, &unknown)?;
        assert!(matches!(hooks.handle(&svc, PaymentProvider::Alipay, Some(&sig), &unknown).await, Err(ServiceError::NotFound(_))));

        // rejected events are not remembered; a corrected retry goes through
        let ok = body("evt_mismatch", &order.order_no, "failed");
        let sig = sign(SECRET, now, &ok)?;
        let out = hooks.handle(&svc, PaymentProvider::Alipay, Some(&sig), &ok).await?;
        assert_eq!(out.status, Some(PaymentStatus::Failed));

        let late = body("evt_late", &order.order_no, "success");
        let sig = sign(SECRET, now, &late)?;
        assert!(matches!(hooks.handle(&svc, PaymentProvider::Alipay, Some(&sig), &late).await, Err(ServiceError::Payment(_))));
        Ok(())
    }

    #[tokio::test]
    async fn unconfigured_secret_rejects_everything() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let svc = payments(&db);
        let hooks = WebhookProcessor::new(&PaymentConfig::default());
        let payload = body("evt_unsigned", "PO1", "success");
        let sig = sign("", Utc::now().timestamp(), &payload)?;
        assert!(matches!(hooks.handle(&svc, PaymentProvider::Wechat, Some(&sig), &payload).await, Err(ServiceError::Validation(_))));
        Ok(())
    }
}
