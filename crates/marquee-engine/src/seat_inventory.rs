//! # Seat Inventory
//!
//! Per-showing record of sold seats, and the showing's seat counter.
//!
//! ## Atomic Unit
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  reserve(show-1, [F6, F7], hold_ref = booking id)                       │
//! │                                                                         │
//! │  lock "showing:show-1"                   (in-process)                   │
//! │  BEGIN                                                                  │
//! │    UPDATE showings SET version=version   (SQLite write lock)            │
//! │    for each seat: venue? ACTIVE? held?   → collect failures             │
//! │    failures? ──yes──► ROLLBACK, SeatNotAvailable { failures }           │
//! │    INSERT seat_holds (F6), (F7)                                         │
//! │    available_seats -= 2, status recomputed, version += 1                │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Holds and the counter always change in the same unit. A hold carries the
//! booking id that took it, so releasing is scoped to that booking and a
//! repeated release does nothing.

use std::sync::Arc;

use sqlx::SqliteConnection;
use tracing::{debug, info};

use marquee_core::validation::validate_seat_ids;
use marquee_core::CoreError;
use marquee_db::{Database, DbError};

use crate::clock::Clock;
use crate::error::EngineResult;
use crate::lock::{showing_key, KeyedLocks};

#[derive(Clone)]
pub struct SeatInventory {
    db: Database,
    locks: Arc<KeyedLocks>,
    clock: Arc<dyn Clock>,
    almost_full_bps: u32,
}

impl SeatInventory {
    pub fn new(
        db: Database,
        locks: Arc<KeyedLocks>,
        clock: Arc<dyn Clock>,
        almost_full_bps: u32,
    ) -> Self {
        SeatInventory {
            db,
            locks,
            clock,
            almost_full_bps,
        }
    }

    /// ACTIVE seats of the showing's venue that are not booked for it.
    pub async fn list_available(&self, showing_id: &str) -> EngineResult<Vec<String>> {
        let showing = self
            .db
            .showings()
            .get_by_id(showing_id)
            .await?
            .ok_or_else(|| CoreError::ShowingNotFound(showing_id.to_string()))?;

        Ok(self
            .db
            .seat_holds()
            .available_seat_ids(showing_id, &showing.venue_id)
            .await?)
    }

    /// Marks every seat as booked for the showing, or none of them.
    ///
    /// ## Errors
    /// - `ShowingNotFound`
    /// - `ValidationError` when a seat is listed twice
    /// - `SeatNotAvailable` listing every seat that is unknown, in another
    ///   venue, not ACTIVE or already booked
    pub async fn reserve(
        &self,
        showing_id: &str,
        seat_ids: &[String],
        hold_ref: &str,
    ) -> EngineResult<()> {
        validate_seat_ids(seat_ids)?;

        let _guard = self.locks.acquire(&showing_key(showing_id)).await;
        let mut tx = self.db.begin().await?;

        if !self.db.showings().claim(&mut tx, showing_id).await? {
            return Err(CoreError::ShowingNotFound(showing_id.to_string()).into());
        }
        let mut showing = self
            .db
            .showings()
            .get_in(&mut tx, showing_id)
            .await?
            .ok_or_else(|| CoreError::ShowingNotFound(showing_id.to_string()))?;

        let mut unavailable = Vec::new();
        for seat_id in seat_ids {
            let sellable = match self.db.venues().seat_in(&mut tx, seat_id).await? {
                Some(seat) => seat.venue_id == showing.venue_id && seat.is_sellable(),
                None => false,
            };
            if !sellable || self.db.seat_holds().is_held(&mut tx, showing_id, seat_id).await? {
                unavailable.push(seat_id.clone());
            }
        }

        if !unavailable.is_empty() {
            debug!(showing_id = %showing_id, seats = ?unavailable, "Seats not available");
            return Err(CoreError::SeatNotAvailable {
                showing_id: showing_id.to_string(),
                seat_ids: unavailable,
            }
            .into());
        }

        let now = self.clock.now();
        for seat_id in seat_ids {
            self.db
                .seat_holds()
                .insert(&mut tx, showing_id, seat_id, hold_ref, now)
                .await?;
        }

        showing.adjust_available(-(seat_ids.len() as i64), self.almost_full_bps, now);
        self.db.showings().save_seat_counter(&mut tx, &showing).await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(
            showing_id = %showing_id,
            hold_ref = %hold_ref,
            seats = seat_ids.len(),
            available = showing.available_seats,
            status = ?showing.status,
            "Seats reserved"
        );
        Ok(())
    }

    /// Gives back the seats held by `hold_ref`. Seats not held by it are
    /// skipped, so retries are safe. Returns how many seats were released.
    pub async fn release(
        &self,
        showing_id: &str,
        seat_ids: &[String],
        hold_ref: &str,
    ) -> EngineResult<u64> {
        let _guard = self.locks.acquire(&showing_key(showing_id)).await;
        let mut tx = self.db.begin().await?;

        if !self.db.showings().claim(&mut tx, showing_id).await? {
            return Ok(0);
        }
        let released = self.release_within(&mut tx, showing_id, seat_ids, hold_ref).await?;
        tx.commit().await.map_err(DbError::from)?;

        Ok(released)
    }

    /// Release steps on a connection whose unit already claimed the showing.
    /// Used when the release must commit together with other writes.
    pub(crate) async fn release_within(
        &self,
        conn: &mut SqliteConnection,
        showing_id: &str,
        seat_ids: &[String],
        hold_ref: &str,
    ) -> EngineResult<u64> {
        let mut released = 0;
        for seat_id in seat_ids {
            released += self
                .db
                .seat_holds()
                .delete_owned(&mut *conn, showing_id, seat_id, hold_ref)
                .await?;
        }

        if released == 0 {
            debug!(showing_id = %showing_id, hold_ref = %hold_ref, "Nothing to release");
            return Ok(0);
        }

        if let Some(mut showing) = self.db.showings().get_in(&mut *conn, showing_id).await? {
            showing.adjust_available(released as i64, self.almost_full_bps, self.clock.now());
            self.db.showings().save_seat_counter(&mut *conn, &showing).await?;
            info!(
                showing_id = %showing_id,
                hold_ref = %hold_ref,
                released,
                available = showing.available_seats,
                "Seats released"
            );
        }
        Ok(released)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;
    use marquee_core::{ErrorCode, SeatStatus, ShowingStatus};

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_reserve_updates_counter_and_availability() {
        let fx = Fixture::new().await;
        let inv = fx.engine.seats();

        inv.reserve(&fx.showing_id, &ids(&["A1", "A2"]), "bk-1").await.unwrap();

        let showing = fx.showing().await;
        assert_eq!(showing.available_seats, fx.capacity - 2);
        assert_eq!(showing.version, 1);
        let available = inv.list_available(&fx.showing_id).await.unwrap();
        assert!(!available.contains(&"A1".to_string()));
        assert_eq!(available.len() as i64, fx.capacity - 2);
    }

    #[tokio::test]
    async fn test_reserve_is_all_or_nothing() {
        let fx = Fixture::new().await;
        let inv = fx.engine.seats();
        inv.reserve(&fx.showing_id, &ids(&["A2"]), "bk-1").await.unwrap();

        let err = inv
            .reserve(&fx.showing_id, &ids(&["A1", "A2", "Z99"]), "bk-2")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::SeatNotAvailable);
        match err.as_core() {
            Some(CoreError::SeatNotAvailable { seat_ids, .. }) => {
                assert_eq!(seat_ids, &ids(&["A2", "Z99"]));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        // A1 was not taken by the failed call
        assert!(inv.list_available(&fx.showing_id).await.unwrap().contains(&"A1".to_string()));
        assert_eq!(fx.showing().await.available_seats, fx.capacity - 1);
    }

    #[tokio::test]
    async fn test_reserve_rejects_repeated_seat() {
        let fx = Fixture::new().await;
        let inv = fx.engine.seats();

        let err = inv
            .reserve(&fx.showing_id, &ids(&["A1", "A1"]), "bk-1")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        // nothing held, counter untouched
        let showing = fx.showing().await;
        assert_eq!(showing.available_seats, fx.capacity);
        assert_eq!(showing.version, 0);
        assert!(inv.list_available(&fx.showing_id).await.unwrap().contains(&"A1".to_string()));
    }

    #[tokio::test]
    async fn test_counter_stamped_with_clock() {
        let fx = Fixture::new().await;
        let inv = fx.engine.seats();

        fx.clock.advance(chrono::Duration::minutes(10));
        inv.reserve(&fx.showing_id, &ids(&["A1"]), "bk-1").await.unwrap();
        assert_eq!(fx.showing().await.updated_at, fx.clock.now());

        fx.clock.advance(chrono::Duration::minutes(10));
        inv.release(&fx.showing_id, &ids(&["A1"]), "bk-1").await.unwrap();
        assert_eq!(fx.showing().await.updated_at, fx.clock.now());
    }

    #[tokio::test]
    async fn test_reserve_rejects_seat_under_maintenance() {
        let fx = Fixture::new().await;
        fx.engine
            .database()
            .venues()
            .set_seat_status("A3", SeatStatus::Maintenance)
            .await
            .unwrap();

        let err = fx
            .engine
            .seats()
            .reserve(&fx.showing_id, &ids(&["A3"]), "bk-1")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::SeatNotAvailable);
        assert!(!fx
            .engine
            .seats()
            .list_available(&fx.showing_id)
            .await
            .unwrap()
            .contains(&"A3".to_string()));
    }

    #[tokio::test]
    async fn test_release_is_idempotent_and_scoped() {
        let fx = Fixture::new().await;
        let inv = fx.engine.seats();
        inv.reserve(&fx.showing_id, &ids(&["A1", "A2"]), "bk-1").await.unwrap();

        // Another booking cannot release these seats
        assert_eq!(inv.release(&fx.showing_id, &ids(&["A1"]), "bk-2").await.unwrap(), 0);

        assert_eq!(inv.release(&fx.showing_id, &ids(&["A1", "A2"]), "bk-1").await.unwrap(), 2);
        assert_eq!(inv.release(&fx.showing_id, &ids(&["A1", "A2"]), "bk-1").await.unwrap(), 0);
        assert_eq!(fx.showing().await.available_seats, fx.capacity);
    }

    #[tokio::test]
    async fn test_status_follows_counter() {
        let fx = Fixture::with_capacity(5).await;
        let inv = fx.engine.seats();

        inv.reserve(&fx.showing_id, &ids(&["A1", "A2", "A3", "A4"]), "bk-1").await.unwrap();
        assert_eq!(fx.showing().await.status, ShowingStatus::AlmostFull);

        inv.reserve(&fx.showing_id, &ids(&["A5"]), "bk-2").await.unwrap();
        assert_eq!(fx.showing().await.status, ShowingStatus::Full);

        inv.release(&fx.showing_id, &ids(&["A5"]), "bk-2").await.unwrap();
        assert_eq!(fx.showing().await.status, ShowingStatus::AlmostFull);

        inv.release(&fx.showing_id, &ids(&["A1", "A2", "A3", "A4"]), "bk-1").await.unwrap();
        assert_eq!(fx.showing().await.status, ShowingStatus::Available);
    }

    #[tokio::test]
    async fn test_unknown_showing() {
        let fx = Fixture::new().await;
        let err = fx.engine.seats().list_available("nope").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ShowingNotFound);
        assert_eq!(
            fx.engine.seats().release("nope", &ids(&["A1"]), "bk-1").await.unwrap(),
            0
        );
    }
}
