//! # Wallet Ledger
//!
//! Owns member balances. Every balance change appends exactly one
//! immutable transaction, in the same atomic unit as the balance write.
//!
//! ## Posting a Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  pay("m-1", 600.00, ref = booking id)                                   │
//! │                                                                         │
//! │  validate amount / verification code      (no lock yet)                 │
//! │  lock "wallet:m-1"                                                      │
//! │  BEGIN                                                                  │
//! │    UPDATE wallets SET version=version     (SQLite write lock)           │
//! │    PAYMENT for this ref already posted? ──yes──► return it              │
//! │    Wallet::apply  → status, balance >= 0, counters                      │
//! │    INSERT wallet_transactions (balance_after snapshot)                  │
//! │    UPDATE wallets (balance, totals, last_transaction_at)                │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Limits
//! | Operation | Cap                    | Verification above threshold |
//! |-----------|------------------------|------------------------------|
//! | deposit   | `deposit_cap_cents`    | no                           |
//! | withdraw  | `withdrawal_cap_cents` | yes                          |
//! | pay       | none                   | yes                          |
//! | transfer  | `transfer_cap_cents`   | yes                          |
//! | refund    | none                   | no                           |

use std::sync::Arc;

use sqlx::SqliteConnection;
use tracing::{debug, info};

use marquee_core::validation::{validate_amount, validate_id, validate_verification};
use marquee_core::{
    CoreError, Money, Transaction, TransactionType, ValidationError, Wallet, WalletStatus,
};
use marquee_db::{Database, DbError};

use crate::clock::Clock;
use crate::config::WalletSettings;
use crate::error::{EngineError, EngineResult};
use crate::lock::{wallet_key, KeyedLocks};
use crate::notify::{dispatch, NotificationEvent, Notifier};

/// The two entries written by a transfer.
#[derive(Debug, Clone)]
pub struct TransferReceipt {
    pub outgoing: Transaction,
    pub incoming: Transaction,
}

#[derive(Clone)]
pub struct WalletLedger {
    db: Database,
    locks: Arc<KeyedLocks>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    settings: WalletSettings,
}

impl WalletLedger {
    pub fn new(
        db: Database,
        locks: Arc<KeyedLocks>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
        settings: WalletSettings,
    ) -> Self {
        WalletLedger {
            db,
            locks,
            clock,
            notifier,
            settings,
        }
    }

    // =========================================================================
    // Wallet lifecycle
    // =========================================================================

    /// Opens an empty ACTIVE wallet.
    pub async fn create_wallet(&self, member_id: &str) -> EngineResult<Wallet> {
        validate_id("member_id", member_id)?;

        let wallet = Wallet::open(member_id, self.clock.now());
        self.db
            .wallets()
            .insert(&wallet)
            .await
            .map_err(|e| -> EngineError {
                match e {
                    DbError::UniqueViolation { .. } => {
                        CoreError::WalletAlreadyExists(member_id.to_string()).into()
                    }
                    other => other.into(),
                }
            })?;

        info!(member_id = %member_id, wallet_id = %wallet.id, "Wallet created");
        Ok(wallet)
    }

    pub async fn get_wallet(&self, member_id: &str) -> EngineResult<Wallet> {
        self.db
            .wallets()
            .get_by_member(member_id)
            .await?
            .ok_or_else(|| CoreError::WalletNotFound(member_id.to_string()).into())
    }

    /// Current balance; the ledger's answer to "how much is left".
    pub async fn balance(&self, member_id: &str) -> EngineResult<Money> {
        Ok(self.get_wallet(member_id).await?.balance())
    }

    /// Suspends, reactivates or closes a wallet. CLOSED is final.
    pub async fn update_status(&self, member_id: &str, status: WalletStatus) -> EngineResult<Wallet> {
        let _guard = self.locks.acquire(&wallet_key(member_id)).await;
        let mut tx = self.db.begin().await?;

        let mut wallet = self.claim_wallet(&mut tx, member_id).await?;
        if !wallet.status.can_transition_to(status) {
            return Err(CoreError::InvalidWalletTransition {
                from: wallet.status,
                to: status,
            }
            .into());
        }

        let from = wallet.status;
        wallet.status = status;
        wallet.updated_at = self.clock.now();
        self.db.wallets().update_status(&mut tx, &wallet).await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(member_id = %member_id, ?from, to = ?status, "Wallet status changed");
        Ok(wallet)
    }

    // =========================================================================
    // Postings
    // =========================================================================

    pub async fn deposit(&self, member_id: &str, amount: Money) -> EngineResult<Transaction> {
        validate_amount("amount", amount, self.settings.deposit_cap())?;
        self.post(member_id, TransactionType::Deposit, amount, None, None)
            .await
    }

    pub async fn withdraw(
        &self,
        member_id: &str,
        amount: Money,
        verification_code: Option<&str>,
    ) -> EngineResult<Transaction> {
        validate_amount("amount", amount, self.settings.withdrawal_cap())?;
        validate_verification(amount, self.settings.verification_threshold(), verification_code)?;
        self.post(member_id, TransactionType::Withdrawal, amount, None, None)
            .await
    }

    /// Charges a booking. A second call with the same reference returns the
    /// first payment instead of charging again.
    pub async fn pay(
        &self,
        member_id: &str,
        amount: Money,
        reference_id: &str,
        verification_code: Option<&str>,
    ) -> EngineResult<Transaction> {
        ensure_positive(amount)?;
        validate_id("reference_id", reference_id)?;
        validate_verification(amount, self.settings.verification_threshold(), verification_code)?;
        self.post(
            member_id,
            TransactionType::Payment,
            amount,
            Some(reference_id),
            Some("Booking payment"),
        )
        .await
    }

    /// Credits a booking refund. No balance precondition; the wallet must
    /// be ACTIVE. A second call with the same reference returns the first
    /// refund and credits nothing.
    pub async fn refund(
        &self,
        member_id: &str,
        amount: Money,
        reference_id: &str,
    ) -> EngineResult<Transaction> {
        ensure_positive(amount)?;
        validate_id("reference_id", reference_id)?;
        self.post(
            member_id,
            TransactionType::Refund,
            amount,
            Some(reference_id),
            Some("Booking refund"),
        )
        .await
    }

    /// Whether a REFUND keyed on `reference_id` has posted to the member's
    /// wallet.
    pub async fn refund_posted(&self, member_id: &str, reference_id: &str) -> EngineResult<bool> {
        let Some(wallet) = self.db.wallets().get_by_member(member_id).await? else {
            return Ok(false);
        };
        Ok(self
            .db
            .transactions()
            .has_reference(&wallet.id, TransactionType::Refund, reference_id)
            .await?)
    }

    /// Moves money between two wallets. Both entries post or neither does.
    pub async fn transfer(
        &self,
        from_member_id: &str,
        to_member_id: &str,
        amount: Money,
        verification_code: Option<&str>,
    ) -> EngineResult<TransferReceipt> {
        validate_id("from_member_id", from_member_id)?;
        validate_id("to_member_id", to_member_id)?;
        if from_member_id == to_member_id {
            return Err(ValidationError::InvalidFormat {
                field: "to_member_id".to_string(),
                reason: "cannot transfer to the same wallet".to_string(),
            }
            .into());
        }
        validate_amount("amount", amount, self.settings.transfer_cap())?;
        validate_verification(amount, self.settings.verification_threshold(), verification_code)?;

        let _guard = self
            .locks
            .acquire_many(&[wallet_key(from_member_id), wallet_key(to_member_id)])
            .await;
        let mut tx = self.db.begin().await?;

        // Claim rows in member-id order, same as the in-process locks.
        let (first, second) = if from_member_id < to_member_id {
            (from_member_id, to_member_id)
        } else {
            (to_member_id, from_member_id)
        };
        let first_wallet = self.claim_wallet(&mut tx, first).await?;
        let second_wallet = self.claim_wallet(&mut tx, second).await?;
        let (mut sender, mut receiver) = if first == from_member_id {
            (first_wallet, second_wallet)
        } else {
            (second_wallet, first_wallet)
        };

        let now = self.clock.now();
        let out_amount = sender.apply(TransactionType::TransferOut, amount, now)?;
        let in_amount = receiver.apply(TransactionType::TransferIn, amount, now)?;

        let outgoing = Transaction::completed(&sender, TransactionType::TransferOut, out_amount, None, now)
            .with_related_wallet(&receiver.id)
            .with_description(format!("Transfer to {to_member_id}"));
        let incoming = Transaction::completed(&receiver, TransactionType::TransferIn, in_amount, None, now)
            .with_related_wallet(&sender.id)
            .with_description(format!("Transfer from {from_member_id}"));

        self.db.transactions().insert(&mut tx, &outgoing).await?;
        self.db.transactions().insert(&mut tx, &incoming).await?;
        self.db.wallets().save_balance(&mut tx, &sender).await?;
        self.db.wallets().save_balance(&mut tx, &receiver).await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(
            from = %from_member_id,
            to = %to_member_id,
            amount = %amount,
            "Transfer posted"
        );

        dispatch(
            self.notifier.as_ref(),
            NotificationEvent::TransferCompleted {
                from_member_id: from_member_id.to_string(),
                to_member_id: to_member_id.to_string(),
                amount,
            },
        )
        .await;

        Ok(TransferReceipt { outgoing, incoming })
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn claim_wallet(&self, conn: &mut SqliteConnection, member_id: &str) -> EngineResult<Wallet> {
        if !self.db.wallets().claim(&mut *conn, member_id).await? {
            return Err(CoreError::WalletNotFound(member_id.to_string()).into());
        }
        self.db
            .wallets()
            .get_by_member_in(&mut *conn, member_id)
            .await?
            .ok_or_else(|| CoreError::WalletNotFound(member_id.to_string()).into())
    }

    /// One single-wallet posting as an atomic unit.
    async fn post(
        &self,
        member_id: &str,
        kind: TransactionType,
        amount: Money,
        reference_id: Option<&str>,
        description: Option<&str>,
    ) -> EngineResult<Transaction> {
        let _guard = self.locks.acquire(&wallet_key(member_id)).await;
        let mut tx = self.db.begin().await?;

        let mut wallet = self.claim_wallet(&mut tx, member_id).await?;

        if let Some(reference) = reference_id {
            if let Some(existing) = self
                .db
                .transactions()
                .find_by_reference(&mut tx, &wallet.id, kind, reference)
                .await?
            {
                debug!(
                    member_id = %member_id,
                    reference_id = %reference,
                    kind = ?kind,
                    "Already posted for this reference"
                );
                return Ok(existing);
            }
        }

        let now = self.clock.now();
        let signed = wallet.apply(kind, amount, now)?;
        let mut txn = Transaction::completed(&wallet, kind, signed, reference_id, now);
        if let Some(description) = description {
            txn = txn.with_description(description);
        }

        self.db.transactions().insert(&mut tx, &txn).await?;
        self.db.wallets().save_balance(&mut tx, &wallet).await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(
            member_id = %member_id,
            kind = ?kind,
            amount = %signed,
            balance = %wallet.balance(),
            transaction_id = %txn.id,
            "Ledger posting"
        );
        Ok(txn)
    }
}

fn ensure_positive(amount: Money) -> EngineResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        }
        .into());
    }
    Ok(())
}
