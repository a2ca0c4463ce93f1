//! Transaction guard for check-then-write sequences

use sqlx::{PgConnection, PgPool, Postgres, Transaction};

/// Owns a PostgreSQL transaction until it is explicitly finished
///
/// Dropping an unfinished guard lets sqlx roll the transaction back when the
/// connection returns to the pool; a warning is logged because every code path is
/// expected to call [`commit`](Self::commit) or [`rollback`](Self::rollback).
///
/// ```ignore
/// let mut tx = TransactionGuard::begin(&pool, "save_property_coordinate").await?;
/// sqlx::query("INSERT INTO ...").execute(tx.conn()).await?;
/// tx.commit().await?;
/// ```
pub struct TransactionGuard<'a> {
    transaction: Option<Transaction<'a, Postgres>>,
    label: &'static str,
}

impl<'a> TransactionGuard<'a> {
    /// Begin a new transaction; `label` names it in logs.
    pub async fn begin(pool: &'a PgPool, label: &'static str) -> Result<Self, sqlx::Error> {
        let transaction = pool.begin().await?;
        tracing::trace!(transaction = label, "Transaction started");
        Ok(Self {
            transaction: Some(transaction),
            label,
        })
    }

    /// Connection to run statements on inside the transaction.
    pub fn conn(&mut self) -> &mut PgConnection {
        match self.transaction.as_mut() {
            Some(tx) => &mut **tx,
            None => unreachable!("transaction `{}` used after it finished", self.label),
        }
    }

    pub async fn commit(mut self) -> Result<(), sqlx::Error> {
        if let Some(tx) = self.transaction.take() {
            tx.commit().await?;
            tracing::trace!(transaction = self.label, "Transaction committed");
        }
        Ok(())
    }

    pub async fn rollback(mut self) -> Result<(), sqlx::Error> {
        if let Some(tx) = self.transaction.take() {
            tx.rollback().await?;
            tracing::trace!(transaction = self.label, "Transaction rolled back");
        }
        Ok(())
    }
}

impl Drop for TransactionGuard<'_> {
    fn drop(&mut self) {
        if self.transaction.is_some() {
            tracing::warn!(
                transaction = self.label,
                "Transaction dropped without commit or rollback - rolling back"
            );
        }
    }
}
