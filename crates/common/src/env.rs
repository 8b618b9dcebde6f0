//! Environment/runtime helpers
//!
//! Sanity checks run once at startup before the database pool is opened.

use std::path::Path;

use tracing::{info, warn};

/// For file-backed SQLite URLs (`sqlite://data/app.db?mode=rwc`) make sure the
/// parent directory exists. Other schemes are left untouched.
pub async fn ensure_sqlite_dir(database_url: &str) -> anyhow::Result<()> {
    let Some(rest) = database_url.strip_prefix("sqlite://").or_else(|| database_url.strip_prefix("sqlite:")) else {
        return Ok(());
    };
    let file = rest.split('?').next().unwrap_or_default();
    if file.is_empty() || file == ":memory:" {
        warn!("sqlite in-memory database configured; data is lost on restart");
        return Ok(());
    }
    if let Some(parent) = Path::new(file).parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| anyhow::anyhow!("cannot create {}: {e}", parent.display()))?;
        info!(dir = %parent.display(), "sqlite data directory ready");
    }
    Ok(())
}
