use anyhow::Result;
use anyhow::anyhow;
use base64::Engine;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub membership: MembershipConfig,
    #[serde(default)]
    pub payment: PaymentConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".into(), port: 8080, worker_threads: Some(4) }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_max_lifetime")]
    pub max_lifetime_secs: u64,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
    #[serde(default)]
    pub sqlx_logging: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            max_lifetime_secs: default_max_lifetime(),
            acquire_timeout_secs: default_acquire_timeout(),
            sqlx_logging: false,
        }
    }
}

fn default_max_connections() -> u32 { 10 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 30 }
fn default_idle_timeout() -> u64 { 600 }
fn default_max_lifetime() -> u64 { 3600 }
fn default_acquire_timeout() -> u64 { 30 }

/// A renewal of at least `min_days` earns `bonus_days` extra.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct BonusRule {
    pub min_days: i64,
    pub bonus_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MembershipConfig {
    #[serde(default = "default_bonus_rules")]
    pub bonus_rules: Vec<BonusRule>,
    #[serde(default = "default_max_renewal_days")]
    pub max_renewal_days: i64,
}

impl Default for MembershipConfig {
    fn default() -> Self {
        Self { bonus_rules: default_bonus_rules(), max_renewal_days: default_max_renewal_days() }
    }
}

fn default_bonus_rules() -> Vec<BonusRule> { vec![BonusRule { min_days: 180, bonus_days: 30 }] }
fn default_max_renewal_days() -> i64 { 3650 }

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    #[serde(default)]
    pub webhook_secret: String,
    #[serde(default = "default_idempotency_ttl")]
    pub idempotency_ttl_secs: u64,
    #[serde(default = "default_idempotency_capacity")]
    pub idempotency_capacity: u64,
    #[serde(default = "default_signature_tolerance")]
    pub signature_tolerance_secs: i64,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            webhook_secret: String::new(),
            idempotency_ttl_secs: default_idempotency_ttl(),
            idempotency_capacity: default_idempotency_capacity(),
            signature_tolerance_secs: default_signature_tolerance(),
        }
    }
}

fn default_idempotency_ttl() -> u64 { 86_400 }
fn default_idempotency_capacity() -> u64 { 100_000 }
fn default_signature_tolerance() -> i64 { 300 }

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SecurityConfig {
    /// base64 encoded 32-byte AES-256-GCM key for member PII
    #[serde(default)]
    pub pii_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self { Self { format: default_log_format() } }
}

fn default_log_format() -> String { "compact".into() }

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    parse(&content)
}

pub fn parse(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    /// Load `config.toml` (or `CONFIG_PATH`), falling back to defaults plus
    /// environment variables when the file is missing.
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = match load_default() {
            Ok(cfg) => cfg,
            Err(e) if e.downcast_ref::<std::io::Error>().is_some() => AppConfig::default(),
            Err(e) => return Err(e),
        };
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.database.normalize_from_env();
        self.database.validate()?;
        self.membership.validate()?;
        self.payment.normalize_from_env();
        self.security.normalize_from_env();
        self.security.validate()?;
        Ok(())
    }
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if let Some(host) = env_var("SERVER_HOST") {
            self.host = host;
        }
        if let Some(port) = env_var("SERVER_PORT").and_then(|p| p.parse::<u16>().ok()) {
            self.port = port;
        }
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be within 1..=65535"));
        }
        match self.worker_threads {
            Some(0) | None => {
                self.worker_threads = env_var("TOKIO_WORKER_THREADS")
                    .and_then(|v| v.parse::<usize>().ok())
                    .filter(|w| *w > 0)
                    .or(Some(4));
            }
            Some(_) => {}
        }
        Ok(())
    }
}

impl DatabaseConfig {
    pub fn normalize_from_env(&mut self) {
        if self.url.trim().is_empty() {
            if let Some(url) = env_var("DATABASE_URL") {
                self.url = url;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(anyhow!("database.url is empty; set it in config.toml or DATABASE_URL"));
        }
        let lower = self.url.to_lowercase();
        if !(lower.starts_with("postgresql://") || lower.starts_with("postgres://") || lower.starts_with("sqlite:")) {
            return Err(anyhow!("database.url must start with postgres://, postgresql:// or sqlite:"));
        }
        if self.min_connections == 0 {
            return Err(anyhow!("database.min_connections must be >= 1"));
        }
        if self.max_connections < self.min_connections {
            return Err(anyhow!("database.max_connections must be >= min_connections"));
        }
        if self.connect_timeout_secs == 0 || self.acquire_timeout_secs == 0 {
            return Err(anyhow!("database timeouts must be positive seconds"));
        }
        Ok(())
    }
}

impl MembershipConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_renewal_days <= 0 {
            return Err(anyhow!("membership.max_renewal_days must be > 0"));
        }
        for rule in &self.bonus_rules {
            if rule.min_days <= 0 || rule.bonus_days <= 0 {
                return Err(anyhow!("membership.bonus_rules entries need positive min_days and bonus_days"));
            }
        }
        Ok(())
    }
}

impl PaymentConfig {
    pub fn normalize_from_env(&mut self) {
        if self.webhook_secret.trim().is_empty() {
            if let Some(secret) = env_var("PAYMENT_WEBHOOK_SECRET") {
                self.webhook_secret = secret;
            }
        }
        if self.idempotency_capacity == 0 {
            self.idempotency_capacity = default_idempotency_capacity();
        }
        if self.signature_tolerance_secs <= 0 {
            self.signature_tolerance_secs = default_signature_tolerance();
        }
    }
}

impl SecurityConfig {
    pub fn normalize_from_env(&mut self) {
        if self.pii_key.trim().is_empty() {
            if let Some(key) = env_var("PII_KEY") {
                self.pii_key = key;
            }
        }
    }

    /// Decoded key bytes, if one is configured.
    pub fn pii_key_bytes(&self) -> Result<Option<Vec<u8>>> {
        if self.pii_key.trim().is_empty() {
            return Ok(None);
        }
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(self.pii_key.trim())
            .map_err(|e| anyhow!("security.pii_key is not valid base64: {e}"))?;
        Ok(Some(bytes))
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(bytes) = self.pii_key_bytes()? {
            if bytes.len() != 32 {
                return Err(anyhow!("security.pii_key must decode to 32 bytes, got {}", bytes.len()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[server]
host = "0.0.0.0"
port = 9000

[database]
url = "sqlite::memory:"
min_connections = 1
max_connections = 1

[membership]
max_renewal_days = 730
bonus_rules = [
  { min_days = 180, bonus_days = 30 },
  { min_days = 365, bonus_days = 90 },
]

[payment]
webhook_secret = "whsec_test"
"#;

    #[test]
    fn parses_full_file() {
        let mut cfg = parse(SAMPLE).unwrap();
        cfg.normalize_and_validate().unwrap();
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.membership.bonus_rules.len(), 2);
        assert_eq!(cfg.membership.max_renewal_days, 730);
        assert_eq!(cfg.payment.webhook_secret, "whsec_test");
        assert_eq!(cfg.payment.idempotency_ttl_secs, 86_400);
        assert_eq!(cfg.logging.format, "compact");
    }

    #[test]
    fn default_bonus_rule_is_180_plus_30() {
        let cfg = MembershipConfig::default();
        assert_eq!(cfg.bonus_rules, vec![BonusRule { min_days: 180, bonus_days: 30 }]);
    }

    #[test]
    fn rejects_unknown_database_scheme() {
        let db = DatabaseConfig { url: "mysql://x".into(), ..DatabaseConfig::default() };
        assert!(db.validate().is_err());
    }

    #[test]
    fn rejects_max_below_min_connections() {
        let db = DatabaseConfig { url: "postgres://x".into(), min_connections: 5, max_connections: 2, ..DatabaseConfig::default() };
        assert!(db.validate().is_err());
    }

    #[test]
    fn rejects_non_positive_bonus_rule() {
        let m = MembershipConfig { bonus_rules: vec![BonusRule { min_days: 0, bonus_days: 10 }], max_renewal_days: 10 };
        assert!(m.validate().is_err());
    }

    #[test]
    fn rejects_short_pii_key() {
        let s = SecurityConfig { pii_key: base64::engine::general_purpose::STANDARD.encode([1u8; 16]) };
        assert!(s.validate().is_err());
        let ok = SecurityConfig { pii_key: base64::engine::general_purpose::STANDARD.encode([1u8; 32]) };
        assert!(ok.validate().is_ok());
    }
}
