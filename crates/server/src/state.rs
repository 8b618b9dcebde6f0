use std::sync::Arc;

use axum::http::HeaderMap;
use sea_orm::DatabaseConnection;

use configs::AppConfig;
use service::crypto::PiiCipher;
use service::payment::{GatewayRegistry, PaymentService, WebhookProcessor};
use service::renewal::RenewalPolicy;

use crate::errors::StartupError;

/// Header naming who performs a change; recorded in the audit log.
pub const ACTOR_HEADER: &str = "x-actor";
const DEFAULT_ACTOR: &str = "api";

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub cipher: Option<Arc<PiiCipher>>,
    pub policy: Arc<RenewalPolicy>,
    pub payments: PaymentService,
    pub webhooks: WebhookProcessor,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: AppConfig, gateways: GatewayRegistry) -> Result<Self, StartupError> {
        let cipher = config
            .security
            .pii_key_bytes()?
            .map(|bytes| PiiCipher::from_bytes(&bytes))
            .transpose()
            .map_err(|e| StartupError::InvalidConfig(e.to_string()))?
            .map(Arc::new);
        if cipher.is_none() {
            tracing::warn!("security.pii_key not set; id card storage disabled");
        }
        if config.payment.webhook_secret.is_empty() {
            tracing::warn!("payment.webhook_secret not set; webhooks will be rejected");
        }
        let policy = Arc::new(RenewalPolicy::from(&config.membership));
        let payments = PaymentService::new(db.clone(), Arc::new(gateways), policy.clone());
        let webhooks = WebhookProcessor::new(&config.payment);
        Ok(Self { db, config: Arc::new(config), cipher, policy, payments, webhooks })
    }

    pub fn cipher(&self) -> Option<&PiiCipher> { self.cipher.as_deref() }
}

/// Actor for audit rows, from the `x-actor` header.
pub fn actor(headers: &HeaderMap) -> String {
    headers
        .get(ACTOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty() && s.len() <= 64)
        .unwrap_or(DEFAULT_ACTOR)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn actor_header_fallback() {
        let mut h = HeaderMap::new();
        assert_eq!(actor(&h), "api");
        h.insert(ACTOR_HEADER, HeaderValue::from_static("  front-desk "));
        assert_eq!(actor(&h), "front-desk");
        h.insert(ACTOR_HEADER, HeaderValue::from_static(""));
        assert_eq!(actor(&h), "api");
    }
}
