use anyhow::Result;
use sea_orm::{EntityTrait, TransactionTrait};

use super::setup_test_db;
use crate::tenant;

/// Test basic transaction commit
#[tokio::test]
async fn test_transaction_commit() -> Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return Ok(());
    }
    let db = setup_test_db().await?;

    let txn = db.begin().await?;
    let created = tenant::create(&txn, "committed").await?;
    txn.commit().await?;

    let found = tenant::Entity::find_by_id(created.id).one(&db).await?;
    assert_eq!(found.map(|t| t.name), Some("committed".to_string()));
    Ok(())
}

/// Test transaction rollback
#[tokio::test]
async fn test_transaction_rollback() -> Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return Ok(());
    }
    let db = setup_test_db().await?;

    let txn = db.begin().await?;
    let created = tenant::create(&txn, "rolled_back").await?;
    txn.rollback().await?;

    assert!(tenant::Entity::find_by_id(created.id).one(&db).await?.is_none());
    Ok(())
}
