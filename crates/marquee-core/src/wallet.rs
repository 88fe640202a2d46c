//! # Wallet Ledger Types
//!
//! A wallet is a member's stored-value account. Every balance change is
//! recorded as an immutable `Transaction` carrying a `balance_after`
//! snapshot.
//!
//! ## Posting Rules
//! ```text
//! ┌────────────────┬──────────┬──────────────┬──────────────────────────┐
//! │ Type           │ Sign     │ Balance      │ Counters                 │
//! ├────────────────┼──────────┼──────────────┼──────────────────────────┤
//! │ DEPOSIT        │ +        │ increases    │ total_deposit += amount  │
//! │ WITHDRAWAL     │ -        │ must cover   │ total_spent += amount    │
//! │ PAYMENT        │ -        │ must cover   │ total_spent += amount    │
//! │ REFUND         │ +        │ increases    │ -                        │
//! │ TRANSFER_IN    │ +        │ increases    │ -                        │
//! │ TRANSFER_OUT   │ -        │ must cover   │ -                        │
//! │ ADJUSTMENT     │ ±        │ never < 0    │ -                        │
//! └────────────────┴──────────┴──────────────┴──────────────────────────┘
//! ```
//! Invariant: `balance == Σ amount` over COMPLETED transactions, `balance >= 0`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;

// =============================================================================
// Wallet
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WalletStatus {
    Active,
    Suspended,
    Closed,
}

impl WalletStatus {
    /// CLOSED is terminal; ACTIVE and SUSPENDED move freely between each other.
    pub fn can_transition_to(self, next: WalletStatus) -> bool {
        self != WalletStatus::Closed && self != next
    }
}

/// One wallet per member.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Wallet {
    pub id: String,
    pub member_id: String,
    pub balance_cents: i64,
    pub total_deposit_cents: i64,
    pub total_spent_cents: i64,
    pub status: WalletStatus,
    #[ts(as = "Option<String>")]
    pub last_transaction_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// A fresh ACTIVE wallet with zero balance.
    pub fn open(member_id: &str, now: DateTime<Utc>) -> Self {
        Wallet {
            id: Uuid::new_v4().to_string(),
            member_id: member_id.to_string(),
            balance_cents: 0,
            total_deposit_cents: 0,
            total_spent_cents: 0,
            status: WalletStatus::Active,
            last_transaction_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[inline]
    pub fn balance(&self) -> Money {
        Money::from_cents(self.balance_cents)
    }

    pub fn ensure_active(&self) -> CoreResult<()> {
        if self.status != WalletStatus::Active {
            return Err(CoreError::WalletInactive {
                member_id: self.member_id.clone(),
                status: self.status,
            });
        }
        Ok(())
    }

    /// Applies a posting to the balance and counters.
    ///
    /// `amount` is the unsigned magnitude (signed for ADJUSTMENT).
    /// Returns the signed ledger amount to record.
    ///
    /// ## Errors
    /// - `WalletInactive` unless the wallet is ACTIVE
    /// - `InsufficientBalance` when a debit would take the balance below zero
    pub fn apply(
        &mut self,
        kind: TransactionType,
        amount: Money,
        now: DateTime<Utc>,
    ) -> CoreResult<Money> {
        self.ensure_active()?;

        let signed = match kind {
            TransactionType::Adjustment => amount,
            k if k.is_credit() => amount.abs(),
            _ => amount.abs().negated(),
        };

        let new_balance = self.balance() + signed;
        if new_balance.is_negative() {
            return Err(CoreError::InsufficientBalance {
                member_id: self.member_id.clone(),
                available: self.balance(),
                requested: signed.abs(),
            });
        }

        match kind {
            TransactionType::Deposit => self.total_deposit_cents += signed.cents(),
            TransactionType::Withdrawal | TransactionType::Payment => {
                self.total_spent_cents += signed.abs().cents()
            }
            _ => {}
        }

        self.balance_cents = new_balance.cents();
        self.last_transaction_at = Some(now);
        self.updated_at = now;
        Ok(signed)
    }
}

// =============================================================================
// Transaction
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    Payment,
    Refund,
    TransferIn,
    TransferOut,
    /// Operator correction. Never created by ledger operations.
    Adjustment,
}

impl TransactionType {
    /// Credits increase the balance.
    #[inline]
    pub fn is_credit(self) -> bool {
        matches!(
            self,
            TransactionType::Deposit | TransactionType::Refund | TransactionType::TransferIn
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

/// Immutable ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Transaction {
    pub id: String,
    pub wallet_id: String,
    pub transaction_type: TransactionType,
    /// Signed: credits positive, debits negative.
    pub amount_cents: i64,
    pub balance_after_cents: i64,
    pub status: TransactionStatus,
    /// Booking id for PAYMENT/REFUND.
    pub reference_id: Option<String>,
    /// Counterparty wallet for transfers.
    pub related_wallet_id: Option<String>,
    pub description: Option<String>,
    #[ts(as = "String")]
    pub transaction_time: DateTime<Utc>,
}

impl Transaction {
    /// Builds a COMPLETED entry right after `Wallet::apply` succeeded.
    pub fn completed(
        wallet: &Wallet,
        kind: TransactionType,
        signed_amount: Money,
        reference_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Self {
        Transaction {
            id: generate_transaction_id(),
            wallet_id: wallet.id.clone(),
            transaction_type: kind,
            amount_cents: signed_amount.cents(),
            balance_after_cents: wallet.balance_cents,
            status: TransactionStatus::Completed,
            reference_id: reference_id.map(str::to_string),
            related_wallet_id: None,
            description: None,
            transaction_time: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_related_wallet(mut self, wallet_id: &str) -> Self {
        self.related_wallet_id = Some(wallet_id.to_string());
        self
    }

    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    #[inline]
    pub fn balance_after(&self) -> Money {
        Money::from_cents(self.balance_after_cents)
    }

    #[inline]
    pub fn is_completed(&self) -> bool {
        self.status == TransactionStatus::Completed
    }
}

/// `TXN` + 12 uppercase hex characters.
pub fn generate_transaction_id() -> String {
    let raw = Uuid::new_v4().simple().to_string();
    format!("TXN{}", raw[..12].to_ascii_uppercase())
}

// =============================================================================
// Unit Tests
// =============================================================================
