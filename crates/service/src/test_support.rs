#![cfg(test)]
use tokio::sync::OnceCell;
use sea_orm::DatabaseConnection;
use migration::MigratorTrait;
use configs::DatabaseConfig;
use models::db::{connect_with_config, is_in_memory};

// Ensure migrations run only once per shared database
static MIGRATED: OnceCell<()> = OnceCell::const_new();

fn test_config() -> DatabaseConfig {
    let url = std::env::var("TEST_DATABASE_URL").unwrap_or_else(|_| "sqlite::memory:".to_string());
    DatabaseConfig { url, min_connections: 1, max_connections: 10, ..DatabaseConfig::default() }
}

pub async fn get_db() -> Result<DatabaseConnection, anyhow::Error> {
    let cfg = test_config();
    if is_in_memory(&cfg.url) {
        // every in-memory connection is its own database
        let db = connect_with_config(&cfg).await?;
        migration::Migrator::up(&db, None).await?;
        return Ok(db);
    }

    MIGRATED
        .get_or_try_init(|| async {
            let db = connect_with_config(&cfg).await?;
            migration::Migrator::up(&db, None).await?;
            db.close().await?;
            Ok::<(), anyhow::Error>(())
        })
        .await?;

    // Return a fresh connection for the current test's runtime
    Ok(connect_with_config(&cfg).await?)
}

pub fn random_phone() -> String {
    format!("138{:08}", uuid::Uuid::new_v4().as_u128() % 100_000_000)
}

/// Tenant plus one member whose validity ends `days_left` days from now (negative = already expired).
pub async fn seed_member(db: &DatabaseConnection, days_left: i64) -> Result<(models::tenant::Model, models::member::Model), anyhow::Error> {
    use chrono::{Duration, Utc};
    let t = models::tenant::create(db, &format!("seed_{}", uuid::Uuid::new_v4())).await?;
    let now = Utc::now();
    let start = now - Duration::days(400);
    let m = models::member::create(db, models::member::NewMember {
        tenant_id: t.id,
        phone: random_phone(),
        card_no: None,
        name: "Seed Member".into(),
        id_card_encrypted: None,
        validity_start: start,
        validity_end: now + Duration::days(days_left),
    }).await?;
    Ok((t, m))
}
