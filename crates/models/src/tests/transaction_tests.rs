use crate::db::connect_in_memory;
use crate::category;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set, TransactionTrait};
use chrono::Utc;
use migration::MigratorTrait;
use anyhow::Result;

/// Setup test database
async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = connect_in_memory().await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

/// Test basic transaction commit
#[tokio::test]
async fn test_transaction_commit() -> Result<()> {
    let db = setup_test_db().await?;

    let txn = db.begin().await?;
    let am = category::ActiveModel { name: Set("committed".into()), created: Set(Utc::now().into()), ..Default::default() };
    let created = am.insert(&txn).await?;
    txn.commit().await?;

    let found = category::Entity::find_by_id(created.id).one(&db).await?;
    assert_eq!(found.map(|c| c.name), Some("committed".to_string()));
    Ok(())
}

/// Dropping an uncommitted transaction discards its writes
#[tokio::test]
async fn test_transaction_dropped_rolls_back() -> Result<()> {
    let db = setup_test_db().await?;

    let id = {
        let txn = db.begin().await?;
        let am = category::ActiveModel { name: Set("discarded".into()), created: Set(Utc::now().into()), ..Default::default() };
        am.insert(&txn).await?.id
    };

    let found = category::Entity::find_by_id(id).one(&db).await?;
    assert!(found.is_none());
    Ok(())
}
