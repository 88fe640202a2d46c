//! # marquee-engine: Booking Transaction Engine
//!
//! Sells seats for showings and pays for them from member wallets.
//!
//! ## Components
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              Engine                                     │
//! │                                                                         │
//! │   ┌───────────────────────┐                                            │
//! │   │  BookingOrchestrator  │── create / cancel / complete / get         │
//! │   └─────┬───────────┬─────┘                                            │
//! │         │           │                                                   │
//! │         ▼           ▼                                                   │
//! │   ┌───────────┐ ┌──────────────┐ ┌────────────────────┐                │
//! │   │   Seat    │ │    Wallet    │ │    Transaction     │                │
//! │   │ Inventory │ │    Ledger    │ │      Journal       │ (read only)    │
//! │   └─────┬─────┘ └──────┬───────┘ └─────────┬──────────┘                │
//! │         │              │                   │                           │
//! │         └──────────────┼───────────────────┘                           │
//! │                        ▼                                               │
//! │          KeyedLocks (in process) + marquee-db units of work            │
//! │                                                                         │
//! │   Collaborators: MemberDirectory, Notifier, Clock                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Locking
//! Seats are serialized per showing, money per wallet, cancellation per
//! booking. A booking request also holds a per member and showing lock so
//! the duplicate-booking check cannot race. Keyed locks are always taken
//! before a database transaction is opened.
//!
//! ## Example
//! ```rust,ignore
//! let config = EngineConfig::load(None)?;
//! let members = Arc::new(InMemoryMemberDirectory::new(Arc::new(SystemClock)));
//! let engine = Engine::open(&config, members, Arc::new(TracingNotifier)).await?;
//!
//! engine.ledger().create_wallet("m-1").await?;
//! engine.ledger().deposit("m-1", Money::from_cents(100_000)).await?;
//! let view = engine.bookings().create_booking(request).await?;
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod journal;
pub mod ledger;
pub mod lock;
pub mod member;
pub mod notify;
pub mod orchestrator;
pub mod seat_inventory;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use marquee_db::Database;
use tracing::info;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::EngineConfig;
pub use error::{ApiError, EngineError, EngineResult};
pub use journal::TransactionJournal;
pub use ledger::{TransferReceipt, WalletLedger};
pub use lock::KeyedLocks;
pub use member::{InMemoryMemberDirectory, MemberDirectory};
pub use notify::{NotificationEvent, Notifier, NotifyError, RecordingNotifier, TracingNotifier};
pub use orchestrator::{BookingOrchestrator, BookingRequest};
pub use seat_inventory::SeatInventory;

/// The wired engine. Cheap to clone.
#[derive(Clone)]
pub struct Engine {
    db: Database,
    seats: SeatInventory,
    ledger: WalletLedger,
    bookings: BookingOrchestrator,
    journal: TransactionJournal,
}

impl Engine {
    /// Opens the configured database (running migrations) and wires the
    /// components on the system clock.
    pub async fn open(
        config: &EngineConfig,
        members: Arc<dyn MemberDirectory>,
        notifier: Arc<dyn Notifier>,
    ) -> EngineResult<Self> {
        config.validate()?;
        let db_config = config.db_config()?;
        if let Some(parent) = db_config.database_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::new(db_config).await?;
        info!("Booking engine ready");
        Ok(Self::with_database(
            db,
            config,
            members,
            notifier,
            Arc::new(SystemClock),
        ))
    }

    /// Wires the components over an already opened database.
    pub fn with_database(
        db: Database,
        config: &EngineConfig,
        members: Arc<dyn MemberDirectory>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let locks = Arc::new(KeyedLocks::new());

        let seats = SeatInventory::new(
            db.clone(),
            locks.clone(),
            clock.clone(),
            config.booking.almost_full_bps,
        );
        let ledger = WalletLedger::new(
            db.clone(),
            locks.clone(),
            clock.clone(),
            notifier.clone(),
            config.wallet.clone(),
        );
        let bookings = BookingOrchestrator::new(
            db.clone(),
            seats.clone(),
            ledger.clone(),
            members,
            notifier,
            clock,
            locks,
            config.booking.clone(),
        );
        let journal = TransactionJournal::new(db.clone());

        Engine {
            db,
            seats,
            ledger,
            bookings,
            journal,
        }
    }

    pub fn seats(&self) -> &SeatInventory {
        &self.seats
    }

    pub fn ledger(&self) -> &WalletLedger {
        &self.ledger
    }

    pub fn bookings(&self) -> &BookingOrchestrator {
        &self.bookings
    }

    pub fn journal(&self) -> &TransactionJournal {
        &self.journal
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}
