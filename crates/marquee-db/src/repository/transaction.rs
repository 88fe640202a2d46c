//! # Transaction Repository
//!
//! Append-only wallet ledger. Rows are never updated or deleted.
//!
//! ## Ordering
//! `seq` is an autoincrement key, so reading a wallet's history by `seq`
//! gives exact posting order even when two entries share a timestamp.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use marquee_core::{Transaction, TransactionType};

const TRANSACTION_COLUMNS: &str = "id, wallet_id, transaction_type, amount_cents, \
     balance_after_cents, status, reference_id, related_wallet_id, description, transaction_time";

#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    pub async fn insert(&self, conn: &mut SqliteConnection, txn: &Transaction) -> DbResult<()> {
        debug!(
            id = %txn.id,
            wallet_id = %txn.wallet_id,
            kind = ?txn.transaction_type,
            amount_cents = txn.amount_cents,
            "Appending ledger entry"
        );

        sqlx::query(
            r#"
            INSERT INTO wallet_transactions (
                id, wallet_id, transaction_type, amount_cents, balance_after_cents,
                status, reference_id, related_wallet_id, description, transaction_time
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&txn.id)
        .bind(&txn.wallet_id)
        .bind(txn.transaction_type)
        .bind(txn.amount_cents)
        .bind(txn.balance_after_cents)
        .bind(txn.status)
        .bind(&txn.reference_id)
        .bind(&txn.related_wallet_id)
        .bind(&txn.description)
        .bind(txn.transaction_time)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Entry of the given kind carrying `reference_id`, read on the
    /// caller's connection.
    pub async fn find_by_reference(
        &self,
        conn: &mut SqliteConnection,
        wallet_id: &str,
        kind: TransactionType,
        reference_id: &str,
    ) -> DbResult<Option<Transaction>> {
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM wallet_transactions \
             WHERE wallet_id = ?1 AND transaction_type = ?2 AND reference_id = ?3 \
             ORDER BY seq LIMIT 1"
        );
        let txn = sqlx::query_as::<_, Transaction>(&sql)
            .bind(wallet_id)
            .bind(kind)
            .bind(reference_id)
            .fetch_optional(conn)
            .await?;
        Ok(txn)
    }

    /// True when an entry of the given kind already carries `reference_id`.
    pub async fn has_reference(
        &self,
        wallet_id: &str,
        kind: TransactionType,
        reference_id: &str,
    ) -> DbResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM wallet_transactions \
             WHERE wallet_id = ?1 AND transaction_type = ?2 AND reference_id = ?3",
        )
        .bind(wallet_id)
        .bind(kind)
        .bind(reference_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    /// Full history of a wallet in posting order.
    pub async fn for_wallet(&self, wallet_id: &str) -> DbResult<Vec<Transaction>> {
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM wallet_transactions WHERE wallet_id = ?1 ORDER BY seq"
        );
        let txns = sqlx::query_as::<_, Transaction>(&sql)
            .bind(wallet_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(txns)
    }

    pub async fn count_for_wallet(&self, wallet_id: &str) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM wallet_transactions WHERE wallet_id = ?1")
                .bind(wallet_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}
