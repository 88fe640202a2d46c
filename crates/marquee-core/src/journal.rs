//! # Journal Projections
//!
//! Read-only views computed from a wallet's transactions. These never feed
//! back into the balance; the wallet row stays the source of truth and
//! [`reconcile`] cross-checks the two.
//!
//! All functions expect transactions in posting order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

use crate::money::Money;
use crate::wallet::{Transaction, TransactionType, Wallet};

/// Count and signed sum for one transaction type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TypeTotal {
    pub count: u64,
    pub amount: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Statement {
    pub wallet_id: String,
    #[ts(as = "String")]
    pub from: DateTime<Utc>,
    #[ts(as = "String")]
    pub to: DateTime<Utc>,
    /// Balance just before `from`.
    pub opening_balance: Money,
    /// Balance at `to`.
    pub closing_balance: Money,
    pub entries: Vec<Transaction>,
    pub totals: BTreeMap<TransactionType, TypeTotal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Reconciliation {
    pub wallet_id: String,
    pub recorded_balance: Money,
    pub journal_balance: Money,
    /// `recorded - journal`. Zero when consistent.
    pub drift: Money,
}

impl Reconciliation {
    #[inline]
    pub fn is_consistent(&self) -> bool {
        self.drift.is_zero()
    }
}

/// Balance reconstructed from COMPLETED transactions with time <= `at`.
pub fn balance_at(transactions: &[Transaction], at: DateTime<Utc>) -> Money {
    transactions
        .iter()
        .filter(|t| t.is_completed() && t.transaction_time <= at)
        .map(Transaction::amount)
        .sum()
}

/// Running totals by type, COMPLETED transactions only.
pub fn totals_by_type<'a, I>(transactions: I) -> BTreeMap<TransactionType, TypeTotal>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut totals: BTreeMap<TransactionType, TypeTotal> = BTreeMap::new();
    for t in transactions.into_iter().filter(|t| t.is_completed()) {
        let entry = totals.entry(t.transaction_type).or_default();
        entry.count += 1;
        entry.amount += t.amount();
    }
    totals
}

/// Statement for the inclusive period `[from, to]`.
pub fn statement(
    wallet_id: &str,
    transactions: &[Transaction],
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Statement {
    let opening_balance: Money = transactions
        .iter()
        .filter(|t| t.is_completed() && t.transaction_time < from)
        .map(Transaction::amount)
        .sum();

    let entries: Vec<Transaction> = transactions
        .iter()
        .filter(|t| t.transaction_time >= from && t.transaction_time <= to)
        .cloned()
        .collect();

    let totals = totals_by_type(&entries);
    let period_sum: Money = totals.values().map(|t| t.amount).sum();

    Statement {
        wallet_id: wallet_id.to_string(),
        from,
        to,
        opening_balance,
        closing_balance: opening_balance + period_sum,
        entries,
        totals,
    }
}

/// Compares the wallet's balance field with the journal sum.
pub fn reconcile(wallet: &Wallet, transactions: &[Transaction]) -> Reconciliation {
    let journal_balance: Money = transactions
        .iter()
        .filter(|t| t.is_completed())
        .map(Transaction::amount)
        .sum();

    Reconciliation {
        wallet_id: wallet.id.clone(),
        recorded_balance: wallet.balance(),
        journal_balance,
        drift: wallet.balance() - journal_balance,
    }
}
