/// CRUD operations tests for the entities
pub mod crud_tests;

/// Transaction handling tests
pub mod transaction_tests;

use configs::DatabaseConfig;
use migration::MigratorTrait;
use sea_orm::DatabaseConnection;

/// Fresh database with all migrations applied.
///
/// Uses `TEST_DATABASE_URL` when set, otherwise a private in-memory SQLite.
pub(crate) async fn setup_test_db() -> anyhow::Result<DatabaseConnection> {
    let url = std::env::var("TEST_DATABASE_URL").unwrap_or_else(|_| "sqlite::memory:".to_string());
    let cfg = DatabaseConfig { url, min_connections: 1, ..DatabaseConfig::default() };
    let db = crate::db::connect_with_config(&cfg).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}
