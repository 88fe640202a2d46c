//! # marquee-db: Database Layer for Marquee
//!
//! SQLite storage for venues, showings, seat holds, bookings, wallets and
//! the wallet ledger, through sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Marquee Data Flow                                │
//! │                                                                         │
//! │  BookingOrchestrator / WalletLedger / SeatInventory (marquee-engine)   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     marquee-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │    │  (embedded)  │  │   │
//! │  │   │               │    │ ShowingRepo    │    │ 001_initial  │  │   │
//! │  │   │ SqlitePool    │◄───│ SeatHoldRepo   │    │   _schema    │  │   │
//! │  │   │ begin() → tx  │    │ BookingRepo    │    │              │  │   │
//! │  │   │               │    │ WalletRepo ... │    │              │  │   │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (WAL)                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - One repository per aggregate
//!
//! ## Usage
//!
//! ```rust,ignore
//! use marquee_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("marquee.db")).await?;
//!
//! let showing = db.showings().get_by_id("show-1").await?;
//!
//! let mut tx = db.begin().await?;
//! db.showings().claim(&mut tx, "show-1").await?;
//! // ... seat holds, counter ...
//! tx.commit().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::booking::BookingRepository;
pub use repository::seat_hold::SeatHoldRepository;
pub use repository::showing::ShowingRepository;
pub use repository::transaction::TransactionRepository;
pub use repository::venue::VenueRepository;
pub use repository::wallet::WalletRepository;
