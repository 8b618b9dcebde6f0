use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use models::enums::{PaymentProvider, PaymentStatus};
use models::payment_order;
use crate::errors::ServiceError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayCharge {
    pub txn_id: String,
    pub pay_url: String,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Charge refused for good; the order fails.
    #[error("declined: {0}")]
    Declined(String),
    /// Gateway could not be reached; the order stays where it was.
    #[error("unavailable: {0}")]
    Unavailable(String),
    #[error("unknown transaction {0}")]
    UnknownTxn(String),
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn provider(&self) -> PaymentProvider;

    async fn create_charge(&self, order: &payment_order::Model) -> Result<GatewayCharge, GatewayError>;

    async fn query(&self, txn_id: &str) -> Result<PaymentStatus, GatewayError>;
}

/// In-process stand-in for a real provider.
///
/// Charges start `processing`; tests and the sandbox settle them with [`MockGateway::settle`].
pub struct MockGateway {
    provider: PaymentProvider,
    decline_over_cents: Option<i64>,
    txns: RwLock<HashMap<String, PaymentStatus>>,
}

impl MockGateway {
    pub fn new(provider: PaymentProvider) -> Self {
        Self { provider, decline_over_cents: None, txns: RwLock::new(HashMap::new()) }
    }

    /// Decline any charge above `limit` cents.
    pub fn with_decline_over(mut self, limit: i64) -> Self {
        self.decline_over_cents = Some(limit);
        self
    }

    fn txn_prefix(&self) -> &'static str {
        match self.provider {
            PaymentProvider::Wechat => "wx_",
            PaymentProvider::Alipay => "ali_",
            PaymentProvider::Stripe => "pi_",
        }
    }

    pub async fn settle(&self, txn_id: &str, status: PaymentStatus) -> Result<(), GatewayError> {
        let mut txns = self.txns.write().await;
        let slot = txns.get_mut(txn_id).ok_or_else(|| GatewayError::UnknownTxn(txn_id.to_string()))?;
        *slot = status;
        Ok(())
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    fn provider(&self) -> PaymentProvider { self.provider }

    async fn create_charge(&self, order: &payment_order::Model) -> Result<GatewayCharge, GatewayError> {
        if let Some(limit) = self.decline_over_cents {
            if order.amount_cents > limit {
                return Err(GatewayError::Declined(format!("amount {} exceeds limit {}", order.amount_cents, limit)));
            }
        }
        let txn_id = format!("{}{}", self.txn_prefix(), Uuid::new_v4().simple());
        self.txns.write().await.insert(txn_id.clone(), PaymentStatus::Processing);
        let pay_url = format!("https://pay.mock.local/{}/{}?order_no={}", self.provider, txn_id, order.order_no);
        tracing::debug!(provider = %self.provider, txn_id = %txn_id, order_no = %order.order_no, "mock_charge_created");
        Ok(GatewayCharge { txn_id, pay_url })
    }

    async fn query(&self, txn_id: &str) -> Result<PaymentStatus, GatewayError> {
        self.txns.read().await.get(txn_id).copied().ok_or_else(|| GatewayError::UnknownTxn(txn_id.to_string()))
    }
}

/// Provider → gateway lookup.
#[derive(Clone, Default)]
pub struct GatewayRegistry {
    gateways: HashMap<PaymentProvider, Arc<dyn PaymentGateway>>,
}

impl GatewayRegistry {
    pub fn new() -> Self { Self::default() }

    /// One [`MockGateway`] per provider.
    pub fn mock_all() -> Self {
        let mut reg = Self::new();
        for p in [PaymentProvider::Wechat, PaymentProvider::Alipay, PaymentProvider::Stripe] {
            reg.register(Arc::new(MockGateway::new(p)));
        }
        reg
    }

    pub fn register(&mut self, gateway: Arc<dyn PaymentGateway>) {
        self.gateways.insert(gateway.provider(), gateway);
    }

    pub fn get(&self, provider: PaymentProvider) -> Result<Arc<dyn PaymentGateway>, ServiceError> {
        self.gateways
            .get(&provider)
            .cloned()
            .ok_or_else(|| ServiceError::Payment(format!("no gateway configured for {provider}")))
    }
}
