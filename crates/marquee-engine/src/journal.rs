//! # Transaction Journal
//!
//! Read-only views over a wallet's ledger entries: statements, totals,
//! balance at a point in time, and a reconciliation against the wallet's
//! recorded balance. Nothing here writes.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::warn;

use marquee_core::journal::{self, Reconciliation, Statement, TypeTotal};
use marquee_core::{CoreError, Money, Transaction, TransactionType, Wallet};
use marquee_db::Database;

use crate::error::EngineResult;

#[derive(Clone)]
pub struct TransactionJournal {
    db: Database,
}

impl TransactionJournal {
    pub fn new(db: Database) -> Self {
        TransactionJournal { db }
    }

    async fn wallet(&self, member_id: &str) -> EngineResult<Wallet> {
        self.db
            .wallets()
            .get_by_member(member_id)
            .await?
            .ok_or_else(|| CoreError::WalletNotFound(member_id.to_string()).into())
    }

    /// Every entry of the member's wallet in posting order.
    pub async fn history(&self, member_id: &str) -> EngineResult<Vec<Transaction>> {
        let wallet = self.wallet(member_id).await?;
        Ok(self.db.transactions().for_wallet(&wallet.id).await?)
    }

    pub async fn statement(
        &self,
        member_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> EngineResult<Statement> {
        let wallet = self.wallet(member_id).await?;
        let entries = self.db.transactions().for_wallet(&wallet.id).await?;
        Ok(journal::statement(&wallet.id, &entries, from, to))
    }

    pub async fn totals_by_type(
        &self,
        member_id: &str,
    ) -> EngineResult<BTreeMap<TransactionType, TypeTotal>> {
        let entries = self.history(member_id).await?;
        Ok(journal::totals_by_type(&entries))
    }

    pub async fn balance_at(&self, member_id: &str, at: DateTime<Utc>) -> EngineResult<Money> {
        let entries = self.history(member_id).await?;
        Ok(journal::balance_at(&entries, at))
    }

    /// Compares the journal sum with the wallet's balance field.
    pub async fn reconcile(&self, member_id: &str) -> EngineResult<Reconciliation> {
        let wallet = self.wallet(member_id).await?;
        let entries = self.db.transactions().for_wallet(&wallet.id).await?;
        let report = journal::reconcile(&wallet, &entries);
        if !report.is_consistent() {
            warn!(
                member_id = %member_id,
                recorded = %report.recorded_balance,
                journal = %report.journal_balance,
                "Wallet balance drifted from journal"
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Clock;
    use crate::testing::Fixture;
    use chrono::Duration;

    #[tokio::test]
    async fn test_statement_and_balance_at() {
        let fx = Fixture::new().await;
        let ledger = fx.engine.ledger();
        let journal = fx.engine.journal();
        ledger.create_wallet("m-1").await.unwrap();

        let t0 = fx.clock.now();
        ledger.deposit("m-1", Money::from_cents(100_000)).await.unwrap();
        fx.clock.advance(Duration::minutes(10));
        let t1 = fx.clock.now();
        ledger.pay("m-1", Money::from_cents(60_000), "bk-1", None).await.unwrap();
        fx.clock.advance(Duration::minutes(10));
        ledger.refund("m-1", Money::from_cents(60_000), "bk-1").await.unwrap();

        assert_eq!(journal.balance_at("m-1", t0).await.unwrap().cents(), 100_000);
        assert_eq!(journal.balance_at("m-1", t1).await.unwrap().cents(), 40_000);

        let st = journal
            .statement("m-1", t1, t1 + Duration::minutes(30))
            .await
            .unwrap();
        assert_eq!(st.opening_balance.cents(), 100_000);
        assert_eq!(st.closing_balance.cents(), 100_000);
        assert_eq!(st.entries.len(), 2);

        let totals = journal.totals_by_type("m-1").await.unwrap();
        assert_eq!(totals[&TransactionType::Payment].amount.cents(), -60_000);
        assert_eq!(totals[&TransactionType::Refund].count, 1);
    }

    #[tokio::test]
    async fn test_reconcile_matches_ledger() {
        let fx = Fixture::new().await;
        fx.wallet_with("m-1", 50_000).await;
        fx.engine
            .ledger()
            .withdraw("m-1", Money::from_cents(1_234), None)
            .await
            .unwrap();

        let report = fx.engine.journal().reconcile("m-1").await.unwrap();
        assert!(report.is_consistent());
        assert_eq!(report.recorded_balance.cents(), 48_766);

        let err = fx.engine.journal().reconcile("ghost").await.unwrap_err();
        assert_eq!(err.code(), marquee_core::ErrorCode::WalletNotFound);
    }
}
