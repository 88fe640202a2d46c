//! # Wallet Repository
//!
//! One wallet per member. Balance changes go through `claim` +
//! `save_balance` inside the same atomic unit as the ledger insert.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use marquee_core::Wallet;

const WALLET_COLUMNS: &str = "id, member_id, balance_cents, total_deposit_cents, \
     total_spent_cents, status, last_transaction_at, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct WalletRepository {
    pool: SqlitePool,
}

impl WalletRepository {
    pub fn new(pool: SqlitePool) -> Self {
        WalletRepository { pool }
    }

    /// Inserts a new wallet. A second wallet for the member is a
    /// `UniqueViolation` on `member_id`.
    pub async fn insert(&self, wallet: &Wallet) -> DbResult<()> {
        debug!(id = %wallet.id, member_id = %wallet.member_id, "Inserting wallet");

        sqlx::query(
            r#"
            INSERT INTO wallets (
                id, member_id, balance_cents, total_deposit_cents, total_spent_cents,
                status, last_transaction_at, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&wallet.id)
        .bind(&wallet.member_id)
        .bind(wallet.balance_cents)
        .bind(wallet.total_deposit_cents)
        .bind(wallet.total_spent_cents)
        .bind(wallet.status)
        .bind(wallet.last_transaction_at)
        .bind(wallet.created_at)
        .bind(wallet.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => {
                DbError::duplicate("member_id", wallet.member_id.clone())
            }
            other => other,
        })?;

        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Wallet>> {
        let sql = format!("SELECT {WALLET_COLUMNS} FROM wallets WHERE id = ?1");
        let wallet = sqlx::query_as::<_, Wallet>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(wallet)
    }

    pub async fn get_by_member(&self, member_id: &str) -> DbResult<Option<Wallet>> {
        let sql = format!("SELECT {WALLET_COLUMNS} FROM wallets WHERE member_id = ?1");
        let wallet = sqlx::query_as::<_, Wallet>(&sql)
            .bind(member_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(wallet)
    }

    /// Takes the write lock on the member's wallet row. Must be the first
    /// statement of the unit. Returns `false` if the member has no wallet.
    pub async fn claim(&self, conn: &mut SqliteConnection, member_id: &str) -> DbResult<bool> {
        let result = sqlx::query("UPDATE wallets SET version = version WHERE member_id = ?1")
            .bind(member_id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Reads the member's wallet on the caller's connection.
    pub async fn get_by_member_in(
        &self,
        conn: &mut SqliteConnection,
        member_id: &str,
    ) -> DbResult<Option<Wallet>> {
        let sql = format!("SELECT {WALLET_COLUMNS} FROM wallets WHERE member_id = ?1");
        let wallet = sqlx::query_as::<_, Wallet>(&sql)
            .bind(member_id)
            .fetch_optional(conn)
            .await?;
        Ok(wallet)
    }

    /// Persists balance and counters after `Wallet::apply`.
    pub async fn save_balance(&self, conn: &mut SqliteConnection, wallet: &Wallet) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE wallets
            SET balance_cents = ?1,
                total_deposit_cents = ?2,
                total_spent_cents = ?3,
                last_transaction_at = ?4,
                updated_at = ?5,
                version = version + 1
            WHERE id = ?6
            "#,
        )
        .bind(wallet.balance_cents)
        .bind(wallet.total_deposit_cents)
        .bind(wallet.total_spent_cents)
        .bind(wallet.last_transaction_at)
        .bind(wallet.updated_at)
        .bind(&wallet.id)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Wallet", wallet.id.clone()));
        }
        Ok(())
    }

    pub async fn update_status(&self, conn: &mut SqliteConnection, wallet: &Wallet) -> DbResult<()> {
        debug!(id = %wallet.id, status = ?wallet.status, "Updating wallet status");

        let result = sqlx::query(
            "UPDATE wallets SET status = ?1, updated_at = ?2, version = version + 1 WHERE id = ?3",
        )
        .bind(wallet.status)
        .bind(wallet.updated_at)
        .bind(&wallet.id)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Wallet", wallet.id.clone()));
        }
        Ok(())
    }

    /// Sum of all balances. Used by conservation checks.
    pub async fn total_balance(&self) -> DbResult<i64> {
        let total: i64 = sqlx::query_scalar("SELECT COALESCE(SUM(balance_cents), 0) FROM wallets")
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::error::DbError;
    use crate::repository::test_support::db;
    use marquee_core::{Money, TransactionType, Wallet};

    #[tokio::test]
    async fn test_one_wallet_per_member() {
        let db = db().await;
        db.wallets().insert(&Wallet::open("m-1", Utc::now())).await.unwrap();

        let err = db
            .wallets()
            .insert(&Wallet::open("m-1", Utc::now()))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "member_id"));
    }

    #[tokio::test]
    async fn test_claim_and_save_balance() {
        let db = db().await;
        db.wallets().insert(&Wallet::open("m-1", Utc::now())).await.unwrap();

        let mut tx = db.begin().await.unwrap();
        assert!(db.wallets().claim(&mut tx, "m-1").await.unwrap());
        assert!(!db.wallets().claim(&mut tx, "m-2").await.unwrap());
        let mut wallet = db.wallets().get_by_member_in(&mut tx, "m-1").await.unwrap().unwrap();
        wallet
            .apply(TransactionType::Deposit, Money::from_cents(5000), Utc::now())
            .unwrap();
        db.wallets().save_balance(&mut tx, &wallet).await.unwrap();
        tx.commit().await.unwrap();

        let stored = db.wallets().get_by_member("m-1").await.unwrap().unwrap();
        assert_eq!(stored.balance_cents, 5000);
        assert_eq!(stored.total_deposit_cents, 5000);
        assert_eq!(db.wallets().total_balance().await.unwrap(), 5000);
    }

    #[tokio::test]
    async fn test_negative_balance_never_reaches_storage() {
        let db = db().await;
        let mut wallet = Wallet::open("m-1", Utc::now());
        db.wallets().insert(&wallet).await.unwrap();

        wallet.balance_cents = -1;
        let mut tx = db.begin().await.unwrap();
        let err = db.wallets().save_balance(&mut tx, &wallet).await.unwrap_err();
        assert!(matches!(err, DbError::CheckViolation(_)));
    }
}
