//! # Repository Pattern
//!
//! One repository per aggregate. Each is a thin handle over the pool.
//!
//! ## Two Calling Styles
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Plain reads / standalone writes                                        │
//! │     db.showings().get_by_id("show-1")           uses the pool           │
//! │                                                                         │
//! │  Inside an atomic unit                                                  │
//! │     let mut tx = db.begin().await?;                                     │
//! │     db.showings().claim(&mut tx, "show-1")      takes &mut connection   │
//! │     db.seat_holds().insert(&mut tx, ..)                                 │
//! │     tx.commit().await?;                                                 │
//! │                                                                         │
//! │  claim() writes first, so SQLite grants the write lock before any      │
//! │  read in the unit. Readers of a stale snapshot never upgrade.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`VenueRepository`](venue::VenueRepository) - venues and seat layout
//! - [`ShowingRepository`](showing::ShowingRepository) - showings and seat counter
//! - [`SeatHoldRepository`](seat_hold::SeatHoldRepository) - per-showing booked seats
//! - [`BookingRepository`](booking::BookingRepository) - bookings and details
//! - [`WalletRepository`](wallet::WalletRepository) - wallet balances
//! - [`TransactionRepository`](transaction::TransactionRepository) - append-only ledger

pub mod booking;
pub mod seat_hold;
pub mod showing;
pub mod transaction;
pub mod venue;
pub mod wallet;
