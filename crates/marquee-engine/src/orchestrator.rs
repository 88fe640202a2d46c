//! # Booking Orchestrator
//!
//! Coordinates a booking across the seat inventory and the wallet ledger.
//! The two are locked independently; there is no transaction spanning both.
//! When a later step fails, the earlier ones are undone explicitly.
//!
//! ## createBooking
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  validate request ─► showing bookable? ─► member active? eligible?      │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  duplicate booking? ─► reserve seats ───────────────┐ SeatNotAvailable  │
//! │                              │                      └──► (nothing held) │
//! │                              ▼                                          │
//! │                       price lines ─► pay(total, ref = booking id)       │
//! │                              │             │                            │
//! │                              │             └─ failure ─► release seats  │
//! │                              ▼                          re-raise error  │
//! │                  persist booking + details                              │
//! │                              │                                          │
//! │                              └─ failure ─► refund, release, re-raise    │
//! │                              ▼                                          │
//! │                  CONFIRMED / PAID ─► notify (after commit)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## cancelBooking
//! Refund first. Only when the refund has posted are the seats released and
//! the booking marked CANCELLED/REFUNDED, in one unit. A crash in between
//! is repaired by calling cancel again, even after showtime: the refund is
//! keyed on the booking id and is never credited twice.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use marquee_core::booking::generate_booking_id;
use marquee_core::pricing::{self, price_for_member};
use marquee_core::validation::{validate_id, validate_seat_selection};
use marquee_core::{
    Booking, BookingDetail, BookingLine, BookingStatus, BookingView, CoreError, Money,
    PaymentStatus, Showing, TicketType,
};
use marquee_db::{Database, DbError};

use crate::clock::Clock;
use crate::config::BookingSettings;
use crate::error::EngineResult;
use crate::ledger::WalletLedger;
use crate::lock::{booking_key, member_showing_key, showing_key, KeyedLocks};
use crate::member::MemberDirectory;
use crate::notify::{dispatch, NotificationEvent, Notifier};
use crate::seat_inventory::SeatInventory;

/// A member's request to buy seats for one showing.
///
/// `seat_ids[i]` is sold with `ticket_types[i]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRequest {
    pub member_id: String,
    pub showing_id: String,
    pub seat_ids: Vec<String>,
    pub ticket_types: Vec<TicketType>,
    /// Needed when the total is above the verification threshold.
    #[serde(default)]
    pub verification_code: Option<String>,
}

#[derive(Clone)]
pub struct BookingOrchestrator {
    db: Database,
    seats: SeatInventory,
    ledger: WalletLedger,
    members: Arc<dyn MemberDirectory>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    locks: Arc<KeyedLocks>,
    settings: BookingSettings,
}

impl BookingOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: Database,
        seats: SeatInventory,
        ledger: WalletLedger,
        members: Arc<dyn MemberDirectory>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        locks: Arc<KeyedLocks>,
        settings: BookingSettings,
    ) -> Self {
        BookingOrchestrator {
            db,
            seats,
            ledger,
            members,
            notifier,
            clock,
            locks,
            settings,
        }
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Reserves, prices, charges and persists a booking.
    ///
    /// Either the booking is CONFIRMED/PAID with its seats held, or nothing
    /// is left in effect.
    pub async fn create_booking(&self, request: BookingRequest) -> EngineResult<BookingView> {
        validate_id("member_id", &request.member_id)?;
        validate_id("showing_id", &request.showing_id)?;
        validate_seat_selection(
            &request.seat_ids,
            &request.ticket_types,
            self.settings.max_seats_per_booking,
        )?;

        let _guard = self
            .locks
            .acquire(&member_showing_key(&request.member_id, &request.showing_id))
            .await;

        let now = self.clock.now();
        let showing = self
            .db
            .showings()
            .get_by_id(&request.showing_id)
            .await?
            .ok_or_else(|| CoreError::ShowingNotFound(request.showing_id.clone()))?;
        showing.ensure_bookable(now)?;

        match self.members.is_active(&request.member_id).await? {
            None => return Err(CoreError::MemberNotFound(request.member_id.clone()).into()),
            Some(false) => return Err(CoreError::MemberInactive(request.member_id.clone()).into()),
            Some(true) => {}
        }

        let mut eligibility = HashMap::new();
        for ticket_type in &request.ticket_types {
            if eligibility.contains_key(ticket_type) {
                continue;
            }
            let eligible = self
                .members
                .is_eligible_for_ticket_type(&request.member_id, *ticket_type)
                .await?;
            if !eligible {
                return Err(CoreError::TicketTypeNotEligible {
                    member_id: request.member_id.clone(),
                    ticket_type: *ticket_type,
                }
                .into());
            }
            eligibility.insert(*ticket_type, eligible);
        }

        if self
            .db
            .bookings()
            .has_active_booking(&request.member_id, &request.showing_id)
            .await?
        {
            return Err(CoreError::DuplicateBooking {
                member_id: request.member_id.clone(),
                showing_id: request.showing_id.clone(),
            }
            .into());
        }

        let booking_id = generate_booking_id();
        self.seats
            .reserve(&request.showing_id, &request.seat_ids, &booking_id)
            .await?;

        // Seats are held from here on; every failure below must give them back.
        let (details, lines, total) =
            match self.price_lines(&booking_id, &request, &showing, &eligibility).await {
                Ok(priced) => priced,
                Err(e) => {
                    self.compensate(&request, &booking_id, Money::zero()).await;
                    return Err(e);
                }
            };

        let charged = if total.is_positive() {
            if let Err(e) = self
                .ledger
                .pay(
                    &request.member_id,
                    total,
                    &booking_id,
                    request.verification_code.as_deref(),
                )
                .await
            {
                warn!(
                    booking_id = %booking_id,
                    member_id = %request.member_id,
                    code = ?e.code(),
                    "Payment failed, releasing seats"
                );
                self.compensate(&request, &booking_id, Money::zero()).await;
                return Err(e);
            }
            total
        } else {
            Money::zero()
        };

        let booking = Booking::confirmed(
            booking_id.clone(),
            &request.member_id,
            &request.showing_id,
            &details,
            now,
        );

        if let Err(e) = self.persist(&booking, &details).await {
            error!(booking_id = %booking_id, error = %e, "Persisting booking failed, undoing");
            self.compensate(&request, &booking_id, charged).await;
            return Err(e);
        }

        info!(
            booking_id = %booking.id,
            booking_number = %booking.booking_number,
            member_id = %booking.member_id,
            showing_id = %booking.showing_id,
            seats = details.len(),
            total = %booking.total(),
            "Booking confirmed"
        );

        dispatch(
            self.notifier.as_ref(),
            NotificationEvent::BookingConfirmed {
                booking_id: booking.id.clone(),
                booking_number: booking.booking_number.clone(),
                member_id: booking.member_id.clone(),
                showing_id: booking.showing_id.clone(),
                seats: details.len(),
                total: booking.total(),
            },
        )
        .await;

        Ok(BookingView { booking, lines })
    }

    /// One detail and one display line per seat, priced at today's base price.
    async fn price_lines(
        &self,
        booking_id: &str,
        request: &BookingRequest,
        showing: &Showing,
        eligibility: &HashMap<TicketType, bool>,
    ) -> EngineResult<(Vec<BookingDetail>, Vec<BookingLine>, Money)> {
        let now = self.clock.now();
        let mut details = Vec::with_capacity(request.seat_ids.len());
        let mut lines = Vec::with_capacity(request.seat_ids.len());

        for (seat_id, ticket_type) in request.seat_ids.iter().zip(&request.ticket_types) {
            let seat = self
                .db
                .venues()
                .get_seat(seat_id)
                .await?
                .ok_or_else(|| DbError::not_found("Seat", seat_id.clone()))?;

            let price = price_for_member(
                &request.member_id,
                showing.base_price(),
                *ticket_type,
                seat.seat_type,
                eligibility.get(ticket_type).copied().unwrap_or(false),
            )?;

            details.push(BookingDetail {
                id: Uuid::new_v4().to_string(),
                booking_id: booking_id.to_string(),
                showing_id: showing.id.clone(),
                seat_id: seat_id.clone(),
                ticket_type: *ticket_type,
                ticket_price_cents: price.cents(),
                created_at: now,
            });
            lines.push(BookingLine {
                seat_id: seat_id.clone(),
                seat_label: seat.label(),
                seat_type: seat.seat_type,
                ticket_type: *ticket_type,
                price,
            });
        }

        let total = pricing::total(lines.iter().map(|l| l.price));
        Ok((details, lines, total))
    }

    async fn persist(&self, booking: &Booking, details: &[BookingDetail]) -> EngineResult<()> {
        let mut tx = self.db.begin().await?;
        self.db
            .bookings()
            .insert_with_details(&mut tx, booking, details)
            .await?;
        tx.commit().await.map_err(DbError::from)?;
        Ok(())
    }

    /// Undoes a half-done booking: refund what was charged, release the
    /// seats. Errors are logged; the caller re-raises the original failure.
    async fn compensate(&self, request: &BookingRequest, booking_id: &str, charged: Money) {
        if charged.is_positive() {
            if let Err(e) = self
                .ledger
                .refund(&request.member_id, charged, booking_id)
                .await
            {
                error!(
                    booking_id = %booking_id,
                    member_id = %request.member_id,
                    amount = %charged,
                    error = %e,
                    "Compensating refund failed"
                );
            }
        }

        match self
            .seats
            .release(&request.showing_id, &request.seat_ids, booking_id)
            .await
        {
            Ok(released) => warn!(
                booking_id = %booking_id,
                showing_id = %request.showing_id,
                released,
                "Booking compensated"
            ),
            Err(e) => error!(
                booking_id = %booking_id,
                showing_id = %request.showing_id,
                error = %e,
                "Compensating seat release failed"
            ),
        }
    }

    // =========================================================================
    // Cancel / Complete
    // =========================================================================

    /// Cancels a PENDING or CONFIRMED booking before showtime, refunding it
    /// if paid.
    ///
    /// ## Errors
    /// - `BookingNotFound`
    /// - `CannotCancel` when already CANCELLED/COMPLETED or the showing has
    ///   started. Nothing is refunded twice.
    /// - Refund failures are surfaced; the booking then stays as it was.
    pub async fn cancel_booking(&self, booking_id: &str) -> EngineResult<Booking> {
        let _guard = self.locks.acquire(&booking_key(booking_id)).await;

        let mut booking = self.load_booking(booking_id).await?;
        let showing = self.load_showing(&booking.showing_id).await?;
        let now = self.clock.now();
        if let Err(err) = booking.ensure_cancellable(now, showing.starts_at) {
            // A refund that already posted for a still-open booking means an
            // earlier attempt stopped half way. Finish it whatever the time.
            let resumable = booking.booking_status.can_transition_to(BookingStatus::Cancelled)
                && booking.payment_status == PaymentStatus::Paid
                && self.ledger.refund_posted(&booking.member_id, &booking.id).await?;
            if !resumable {
                return Err(err.into());
            }
            warn!(booking_id = %booking.id, "Resuming interrupted cancellation");
        }

        let refunded = if booking.payment_status == PaymentStatus::Paid && booking.total().is_positive() {
            self.ledger
                .refund(&booking.member_id, booking.total(), &booking.id)
                .await?;
            booking.total()
        } else {
            Money::zero()
        };

        let seat_ids: Vec<String> = self
            .db
            .bookings()
            .details(&booking.id)
            .await?
            .into_iter()
            .map(|d| d.seat_id)
            .collect();

        {
            let _seat_guard = self.locks.acquire(&showing_key(&showing.id)).await;
            let mut tx = self.db.begin().await?;
            self.db.showings().claim(&mut tx, &showing.id).await?;
            self.seats
                .release_within(&mut tx, &showing.id, &seat_ids, &booking.id)
                .await?;
            booking.mark_cancelled(now)?;
            self.db.bookings().update_status(&mut tx, &booking).await?;
            tx.commit().await.map_err(DbError::from)?;
        }

        info!(
            booking_id = %booking.id,
            member_id = %booking.member_id,
            refunded = %refunded,
            seats = seat_ids.len(),
            "Booking cancelled"
        );

        dispatch(
            self.notifier.as_ref(),
            NotificationEvent::BookingCancelled {
                booking_id: booking.id.clone(),
                booking_number: booking.booking_number.clone(),
                member_id: booking.member_id.clone(),
                refunded,
            },
        )
        .await;

        Ok(booking)
    }

    /// Marks a CONFIRMED, PAID booking COMPLETED once its showing has ended.
    /// Called by an external sweep.
    pub async fn complete_booking(&self, booking_id: &str) -> EngineResult<Booking> {
        let _guard = self.locks.acquire(&booking_key(booking_id)).await;

        let mut booking = self.load_booking(booking_id).await?;
        let showing = self.load_showing(&booking.showing_id).await?;
        booking.complete(self.clock.now(), showing.ends_at)?;

        let mut tx = self.db.begin().await?;
        self.db.bookings().update_status(&mut tx, &booking).await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(booking_id = %booking.id, "Booking completed");
        Ok(booking)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub async fn get_booking(&self, booking_id: &str) -> EngineResult<BookingView> {
        let booking = self.load_booking(booking_id).await?;
        let details = self.db.bookings().details(booking_id).await?;

        let mut lines = Vec::with_capacity(details.len());
        for detail in details {
            let seat = self
                .db
                .venues()
                .get_seat(&detail.seat_id)
                .await?
                .ok_or_else(|| DbError::not_found("Seat", detail.seat_id.clone()))?;
            lines.push(BookingLine {
                seat_label: seat.label(),
                seat_type: seat.seat_type,
                ticket_type: detail.ticket_type,
                price: detail.ticket_price(),
                seat_id: detail.seat_id,
            });
        }

        Ok(BookingView { booking, lines })
    }

    /// Member's bookings, newest first.
    pub async fn bookings_for_member(&self, member_id: &str) -> EngineResult<Vec<Booking>> {
        Ok(self.db.bookings().for_member(member_id).await?)
    }

    async fn load_booking(&self, booking_id: &str) -> EngineResult<Booking> {
        self.db
            .bookings()
            .get_by_id(booking_id)
            .await?
            .ok_or_else(|| CoreError::BookingNotFound(booking_id.to_string()).into())
    }

    async fn load_showing(&self, showing_id: &str) -> EngineResult<Showing> {
        self.db
            .showings()
            .get_by_id(showing_id)
            .await?
            .ok_or_else(|| CoreError::ShowingNotFound(showing_id.to_string()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;
    use chrono::Duration;
    use marquee_core::{BookingStatus, ErrorCode, MemberProfile, ShowingStatus, TransactionType};

    fn request(member_id: &str, seats: &[&str], ticket_types: &[TicketType]) -> BookingRequest {
        BookingRequest {
            member_id: member_id.to_string(),
            showing_id: "show-1".to_string(),
            seat_ids: seats.iter().map(|s| s.to_string()).collect(),
            ticket_types: ticket_types.to_vec(),
            verification_code: None,
        }
    }

    fn adults(n: usize) -> Vec<TicketType> {
        vec![TicketType::Adult; n]
    }

    async fn count_of(fx: &Fixture, member_id: &str, kind: TransactionType) -> usize {
        fx.engine
            .journal()
            .history(member_id)
            .await
            .unwrap()
            .iter()
            .filter(|t| t.transaction_type == kind)
            .count()
    }

    #[tokio::test]
    async fn test_book_two_adult_regular_seats() {
        let fx = Fixture::new().await;
        fx.member_with_wallet("m-1", 100_000).await;

        let view = fx
            .engine
            .bookings()
            .create_booking(request("m-1", &["A1", "A2"], &adults(2)))
            .await
            .unwrap();

        assert_eq!(view.booking.booking_status, BookingStatus::Confirmed);
        assert_eq!(view.booking.payment_status, PaymentStatus::Paid);
        assert_eq!(view.total().to_string(), "600.00");
        assert_eq!(view.booking.total(), view.total());
        assert_eq!(fx.showing().await.available_seats, 98);

        // 1000.00 - 600.00, one PAYMENT snapshotting the new balance
        let history = fx.engine.journal().history("m-1").await.unwrap();
        let payment = history
            .iter()
            .find(|t| t.transaction_type == TransactionType::Payment)
            .unwrap();
        assert_eq!(payment.balance_after().to_string(), "400.00");
        assert_eq!(payment.reference_id.as_deref(), Some(view.booking.id.as_str()));
        assert_eq!(fx.engine.ledger().balance("m-1").await.unwrap().to_string(), "400.00");

        let events = fx.notifier.events().await;
        assert!(matches!(
            events.last(),
            Some(NotificationEvent::BookingConfirmed { seats: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_vip_seat_surcharge() {
        let fx = Fixture::new().await;
        fx.member_with_wallet("m-1", 100_000).await;

        let view = fx
            .engine
            .bookings()
            .create_booking(request("m-1", &["J5"], &adults(1)))
            .await
            .unwrap();
        assert_eq!(view.lines.len(), 1);
        assert_eq!(view.lines[0].price.to_string(), "360.00");
        assert_eq!(view.lines[0].seat_label, "J5");
    }

    #[tokio::test]
    async fn test_cancel_refunds_and_releases() {
        let fx = Fixture::new().await;
        fx.member_with_wallet("m-1", 100_000).await;
        let bookings = fx.engine.bookings();

        let view = bookings
            .create_booking(request("m-1", &["A1", "A2"], &adults(2)))
            .await
            .unwrap();

        let cancelled = bookings.cancel_booking(&view.booking.id).await.unwrap();
        assert_eq!(cancelled.booking_status, BookingStatus::Cancelled);
        assert_eq!(cancelled.payment_status, PaymentStatus::Refunded);
        assert!(cancelled.cancelled_at.is_some());

        assert_eq!(fx.showing().await.available_seats, 100);
        assert_eq!(fx.engine.ledger().balance("m-1").await.unwrap().to_string(), "1000.00");
        assert_eq!(count_of(&fx, "m-1", TransactionType::Refund).await, 1);

        let stored = bookings.get_booking(&view.booking.id).await.unwrap();
        assert_eq!(stored.booking.booking_status, BookingStatus::Cancelled);
        // the total stays as charged
        assert_eq!(stored.booking.total().to_string(), "600.00");
    }

    #[tokio::test]
    async fn test_second_cancel_does_not_refund_twice() {
        let fx = Fixture::new().await;
        fx.member_with_wallet("m-1", 100_000).await;
        let bookings = fx.engine.bookings();
        let view = bookings
            .create_booking(request("m-1", &["A1"], &adults(1)))
            .await
            .unwrap();

        bookings.cancel_booking(&view.booking.id).await.unwrap();
        let err = bookings.cancel_booking(&view.booking.id).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::CannotCancel);

        assert_eq!(count_of(&fx, "m-1", TransactionType::Refund).await, 1);
        assert_eq!(fx.engine.ledger().balance("m-1").await.unwrap().cents(), 100_000);
    }

    #[tokio::test]
    async fn test_insufficient_balance_releases_seats() {
        let fx = Fixture::new().await;
        fx.member_with_wallet("m-1", 100_000).await;
        fx.member_with_wallet("m-2", 10_000).await;
        let bookings = fx.engine.bookings();

        bookings
            .create_booking(request("m-1", &["A1", "A2"], &adults(2)))
            .await
            .unwrap();

        let err = bookings
            .create_booking(request("m-2", &["A3", "A4"], &adults(2)))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InsufficientBalance);

        assert_eq!(fx.showing().await.available_seats, 98);
        assert!(bookings.bookings_for_member("m-2").await.unwrap().is_empty());
        let available = fx.engine.seats().list_available(&fx.showing_id).await.unwrap();
        assert!(available.contains(&"A3".to_string()));
        assert_eq!(fx.engine.ledger().balance("m-2").await.unwrap().cents(), 10_000);
    }

    #[tokio::test]
    async fn test_inactive_wallet_releases_seats() {
        let fx = Fixture::new().await;
        fx.member_with_wallet("m-1", 100_000).await;
        fx.engine
            .ledger()
            .update_status("m-1", marquee_core::WalletStatus::Suspended)
            .await
            .unwrap();

        let err = fx
            .engine
            .bookings()
            .create_booking(request("m-1", &["A1"], &adults(1)))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::WalletInactive);
        assert_eq!(fx.showing().await.available_seats, 100);
        assert_eq!(
            fx.engine
                .database()
                .bookings()
                .count_active_for_seat(&fx.showing_id, "A1")
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_taken_seat_is_rejected_without_charge() {
        let fx = Fixture::new().await;
        fx.member_with_wallet("m-1", 100_000).await;
        fx.member_with_wallet("m-2", 100_000).await;
        let bookings = fx.engine.bookings();

        bookings
            .create_booking(request("m-1", &["G7"], &adults(1)))
            .await
            .unwrap();
        let err = bookings
            .create_booking(request("m-2", &["G6", "G7"], &adults(2)))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::SeatNotAvailable);
        assert_eq!(count_of(&fx, "m-2", TransactionType::Payment).await, 0);
        assert_eq!(fx.showing().await.available_seats, 99);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_for_one_seat() {
        let fx = Fixture::with_file_db(100).await;
        let contenders = 8;
        for i in 0..contenders {
            fx.member_with_wallet(&format!("m-{i}"), 100_000).await;
        }

        let mut handles = Vec::new();
        for i in 0..contenders {
            let bookings = fx.engine.bookings().clone();
            handles.push(tokio::spawn(async move {
                bookings
                    .create_booking(request(&format!("m-{i}"), &["G7"], &adults(1)))
                    .await
            }));
        }

        let mut confirmed = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => confirmed += 1,
                Err(e) => {
                    assert_eq!(e.code(), ErrorCode::SeatNotAvailable);
                    rejected += 1;
                }
            }
        }
        assert_eq!(confirmed, 1);
        assert_eq!(rejected, contenders - 1);
        assert_eq!(fx.showing().await.available_seats, 99);
        assert_eq!(
            fx.engine
                .database()
                .bookings()
                .count_active_for_seat(&fx.showing_id, "G7")
                .await
                .unwrap(),
            1
        );

        // every losing member keeps their money
        for i in 0..contenders {
            let report = fx.engine.journal().reconcile(&format!("m-{i}")).await.unwrap();
            assert!(report.is_consistent());
        }
    }

    #[tokio::test]
    async fn test_balances_reconcile_after_book_and_cancel() {
        let fx = Fixture::new().await;
        fx.member_with_wallet("m-1", 200_000).await;
        let bookings = fx.engine.bookings();

        let first = bookings
            .create_booking(request("m-1", &["B1", "J1"], &adults(2)))
            .await
            .unwrap();
        bookings.cancel_booking(&first.booking.id).await.unwrap();
        bookings
            .create_booking(request("m-1", &["B2"], &adults(1)))
            .await
            .unwrap();

        let report = fx.engine.journal().reconcile("m-1").await.unwrap();
        assert!(report.is_consistent());
        assert_eq!(report.recorded_balance.cents(), 200_000 - 30_000);
    }

    #[tokio::test]
    async fn test_notifier_failure_keeps_booking() {
        let fx = Fixture::with_failing_notifier().await;
        fx.member_with_wallet("m-1", 100_000).await;

        let view = fx
            .engine
            .bookings()
            .create_booking(request("m-1", &["A1"], &adults(1)))
            .await
            .unwrap();

        let stored = fx.engine.bookings().get_booking(&view.booking.id).await.unwrap();
        assert_eq!(stored.booking.booking_status, BookingStatus::Confirmed);
        assert_eq!(fx.engine.ledger().balance("m-1").await.unwrap().cents(), 70_000);
        assert!(!fx.notifier.events().await.is_empty());
    }

    #[tokio::test]
    async fn test_ineligible_ticket_type_is_refused_before_reserving() {
        let fx = Fixture::new().await;
        fx.member_with_wallet("m-1", 100_000).await;

        let err = fx
            .engine
            .bookings()
            .create_booking(request(
                "m-1",
                &["A1", "A2"],
                &[TicketType::Adult, TicketType::Child],
            ))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::TicketTypeNotEligible);
        assert_eq!(fx.showing().await.available_seats, 100);
    }

    #[tokio::test]
    async fn test_student_ticket_price() {
        let fx = Fixture::new().await;
        fx.student_with_wallet("s-1", 100_000).await;

        let view = fx
            .engine
            .bookings()
            .create_booking(request("s-1", &["C3"], &[TicketType::Student]))
            .await
            .unwrap();
        assert_eq!(view.total().to_string(), "240.00");
    }

    #[tokio::test]
    async fn test_member_checks() {
        let fx = Fixture::new().await;
        let bookings = fx.engine.bookings();

        let err = bookings
            .create_booking(request("ghost", &["A1"], &adults(1)))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::MemberNotFound);

        fx.add_member(MemberProfile {
            member_id: "m-off".to_string(),
            active: false,
            verified: true,
            birth_date: None,
            card_type: None,
        })
        .await;
        let err = bookings
            .create_booking(request("m-off", &["A1"], &adults(1)))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::MemberInactive);
        assert_eq!(fx.showing().await.available_seats, 100);
    }

    #[tokio::test]
    async fn test_duplicate_booking_for_same_showing() {
        let fx = Fixture::new().await;
        fx.member_with_wallet("m-1", 100_000).await;
        let bookings = fx.engine.bookings();

        let first = bookings
            .create_booking(request("m-1", &["A1"], &adults(1)))
            .await
            .unwrap();
        let err = bookings
            .create_booking(request("m-1", &["A2"], &adults(1)))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::DuplicateBooking);

        // allowed again once the first one is cancelled
        bookings.cancel_booking(&first.booking.id).await.unwrap();
        bookings
            .create_booking(request("m-1", &["A2"], &adults(1)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_showing_not_bookable_after_start() {
        let fx = Fixture::new().await;
        fx.member_with_wallet("m-1", 100_000).await;
        fx.clock.advance(Duration::hours(2));

        let err = fx
            .engine
            .bookings()
            .create_booking(request("m-1", &["A1"], &adults(1)))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ShowingNotBookable);
    }

    #[tokio::test]
    async fn test_full_showing_not_bookable() {
        let fx = Fixture::with_capacity(2).await;
        fx.member_with_wallet("m-1", 100_000).await;
        fx.member_with_wallet("m-2", 100_000).await;
        let bookings = fx.engine.bookings();

        bookings
            .create_booking(request("m-1", &["A1", "A2"], &adults(2)))
            .await
            .unwrap();
        assert_eq!(fx.showing().await.status, ShowingStatus::Full);

        let err = bookings
            .create_booking(request("m-2", &["A1"], &adults(1)))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ShowingNotBookable);
    }

    #[tokio::test]
    async fn test_request_validation() {
        let fx = Fixture::new().await;
        fx.member_with_wallet("m-1", 100_000).await;
        let bookings = fx.engine.bookings();

        let eleven: Vec<String> = (1..=10).map(|c| format!("B{c}")).chain(["C1".to_string()]).collect();
        let mut req = request("m-1", &[], &[]);
        req.seat_ids = eleven;
        req.ticket_types = adults(11);
        let err = bookings.create_booking(req).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let err = bookings
            .create_booking(request("m-1", &["A1", "A2"], &adults(1)))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert_eq!(fx.showing().await.available_seats, 100);
    }

    #[tokio::test]
    async fn test_cancel_after_showtime_is_refused() {
        let fx = Fixture::new().await;
        fx.member_with_wallet("m-1", 100_000).await;
        let bookings = fx.engine.bookings();
        let view = bookings
            .create_booking(request("m-1", &["A1"], &adults(1)))
            .await
            .unwrap();

        fx.clock.advance(Duration::hours(3));
        let err = bookings.cancel_booking(&view.booking.id).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::CannotCancel);
        assert_eq!(count_of(&fx, "m-1", TransactionType::Refund).await, 0);
    }

    /// Clock that moves forward by `step` on every read once stepping is on.
    struct TickingClock {
        time: std::sync::Mutex<chrono::DateTime<chrono::Utc>>,
        step: std::sync::Mutex<Duration>,
    }

    impl TickingClock {
        fn new(time: chrono::DateTime<chrono::Utc>) -> Self {
            TickingClock {
                time: std::sync::Mutex::new(time),
                step: std::sync::Mutex::new(Duration::zero()),
            }
        }

        fn tick_from(&self, time: chrono::DateTime<chrono::Utc>, step: Duration) {
            *self.time.lock().unwrap() = time;
            *self.step.lock().unwrap() = step;
        }
    }

    impl Clock for TickingClock {
        fn now(&self) -> chrono::DateTime<chrono::Utc> {
            let step = *self.step.lock().unwrap();
            let mut time = self.time.lock().unwrap();
            let now = *time;
            *time += step;
            now
        }
    }

    #[tokio::test]
    async fn test_cancel_completes_when_showtime_passes_mid_call() {
        let fx = Fixture::new().await;
        fx.member_with_wallet("m-1", 100_000).await;
        let starts_at = fx.showing().await.starts_at;

        let clock = Arc::new(TickingClock::new(fx.clock.now()));
        let engine = crate::Engine::with_database(
            fx.engine.database().clone(),
            &crate::EngineConfig::default(),
            fx.members.clone(),
            fx.notifier.clone(),
            clock.clone(),
        );
        let bookings = engine.bookings();
        let view = bookings
            .create_booking(request("m-1", &["A1", "A2"], &adults(2)))
            .await
            .unwrap();

        // First read is one second before start, every later read is past it
        clock.tick_from(starts_at - Duration::seconds(1), Duration::seconds(1));
        let cancelled = bookings.cancel_booking(&view.booking.id).await.unwrap();
        assert_eq!(cancelled.booking_status, BookingStatus::Cancelled);
        assert_eq!(cancelled.payment_status, PaymentStatus::Refunded);

        let stored = bookings.get_booking(&view.booking.id).await.unwrap();
        assert_eq!(stored.booking.booking_status, BookingStatus::Cancelled);
        assert_eq!(fx.showing().await.available_seats, 100);
        assert_eq!(engine.ledger().balance("m-1").await.unwrap().to_string(), "1000.00");
        assert_eq!(count_of(&fx, "m-1", TransactionType::Refund).await, 1);
    }

    #[tokio::test]
    async fn test_cancel_resumes_after_refund_posted() {
        let fx = Fixture::new().await;
        fx.member_with_wallet("m-1", 100_000).await;
        let bookings = fx.engine.bookings();
        let view = bookings
            .create_booking(request("m-1", &["A1"], &adults(1)))
            .await
            .unwrap();

        // An earlier attempt refunded, then stopped before releasing seats
        fx.engine
            .ledger()
            .refund("m-1", view.booking.total(), &view.booking.id)
            .await
            .unwrap();
        fx.clock.advance(Duration::hours(3));

        let cancelled = bookings.cancel_booking(&view.booking.id).await.unwrap();
        assert_eq!(cancelled.booking_status, BookingStatus::Cancelled);
        assert_eq!(cancelled.payment_status, PaymentStatus::Refunded);
        assert_eq!(fx.showing().await.available_seats, 100);
        assert_eq!(count_of(&fx, "m-1", TransactionType::Refund).await, 1);
        assert_eq!(fx.engine.ledger().balance("m-1").await.unwrap().to_string(), "1000.00");
    }

    #[tokio::test]
    async fn test_complete_after_showing_ends() {
        let fx = Fixture::new().await;
        fx.member_with_wallet("m-1", 100_000).await;
        let bookings = fx.engine.bookings();
        let view = bookings
            .create_booking(request("m-1", &["A1"], &adults(1)))
            .await
            .unwrap();

        let err = bookings.complete_booking(&view.booking.id).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::CannotComplete);

        fx.clock.advance(Duration::hours(5));
        let done = bookings.complete_booking(&view.booking.id).await.unwrap();
        assert_eq!(done.booking_status, BookingStatus::Completed);

        let err = bookings.cancel_booking(&view.booking.id).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::CannotCancel);
    }

    #[tokio::test]
    async fn test_free_showing_skips_payment() {
        let fx = Fixture::new().await;
        fx.member_with_wallet("m-1", 0).await;

        let mut free = fx.showing().await;
        free.id = "show-free".to_string();
        free.base_price_cents = 0;
        fx.engine.database().showings().insert(&free).await.unwrap();

        let mut req = request("m-1", &["A1"], &adults(1));
        req.showing_id = free.id.clone();
        let view = fx.engine.bookings().create_booking(req).await.unwrap();

        assert!(view.total().is_zero());
        assert_eq!(count_of(&fx, "m-1", TransactionType::Payment).await, 0);

        let cancelled = fx.engine.bookings().cancel_booking(&view.booking.id).await.unwrap();
        assert_eq!(cancelled.booking_status, BookingStatus::Cancelled);
        // nothing was refunded, so payment stays PAID
        assert_eq!(cancelled.payment_status, PaymentStatus::Paid);
        assert_eq!(count_of(&fx, "m-1", TransactionType::Refund).await, 0);
    }

    #[tokio::test]
    async fn test_unknown_booking() {
        let fx = Fixture::new().await;
        let err = fx.engine.bookings().cancel_booking("nope").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::BookingNotFound);
        let err = fx.engine.bookings().get_booking("nope").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::BookingNotFound);
    }
}
