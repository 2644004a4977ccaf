//! Unit of work shared by every manager call made while serving one request.

use sea_orm::{DatabaseConnection, DatabaseTransaction, DbErr, TransactionTrait};
use tracing::debug;

/// One request's unit of work.
///
/// A transaction is opened lazily on first use and stays open until
/// [`Session::commit`]. Writes staged without a commit are rolled back when
/// the session is dropped.
pub struct Session {
    db: DatabaseConnection,
    txn: Option<DatabaseTransaction>,
}

impl Session {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db, txn: None }
    }

    /// Current transaction, opening one if none is active.
    pub async fn txn(&mut self) -> Result<&DatabaseTransaction, DbErr> {
        if self.txn.is_none() {
            self.txn = Some(self.db.begin().await?);
        }
        self.txn
            .as_ref()
            .ok_or_else(|| DbErr::Custom("transaction unavailable".into()))
    }

    /// Commit everything staged so far. The next call to [`Session::txn`]
    /// starts a fresh transaction.
    pub async fn commit(&mut self) -> Result<(), DbErr> {
        if let Some(txn) = self.txn.take() {
            txn.commit().await?;
            debug!("session committed");
        }
        Ok(())
    }

    /// Discard everything staged since the last commit.
    pub async fn rollback(&mut self) -> Result<(), DbErr> {
        if let Some(txn) = self.txn.take() {
            txn.rollback().await?;
            debug!("session rolled back");
        }
        Ok(())
    }

    pub fn in_transaction(&self) -> bool {
        self.txn.is_some()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use models::category;
    use sea_orm::{ActiveModelTrait, EntityTrait, Set};

    use super::Session;
    use crate::test_support::get_db;

    #[tokio::test]
    async fn rollback_discards_staged_rows_and_reopens_lazily() -> Result<(), anyhow::Error> {
        let mut session = Session::new(get_db().await?);
        let staged = category::ActiveModel { name: Set("draft".into()), created: Set(Utc::now().into()), ..Default::default() };
        staged.insert(session.txn().await?).await?;

        session.rollback().await?;
        assert!(!session.in_transaction());
        assert!(category::Entity::find().all(session.txn().await?).await?.is_empty());
        Ok(())
    }
}
