//! # Seat Hold Repository
//!
//! A hold row means "this seat is booked for this showing". Rows are keyed
//! by `(showing_id, seat_id)` and tagged with the booking id that owns them,
//! so a release can only ever drop its own holds.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};

use crate::error::DbResult;

#[derive(Debug, Clone)]
pub struct SeatHoldRepository {
    pool: SqlitePool,
}

impl SeatHoldRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SeatHoldRepository { pool }
    }

    /// ACTIVE seats of the venue with no hold for the showing.
    pub async fn available_seat_ids(&self, showing_id: &str, venue_id: &str) -> DbResult<Vec<String>> {
        let ids: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT s.id
            FROM seats s
            WHERE s.venue_id = ?1
              AND s.status = 'ACTIVE'
              AND NOT EXISTS (
                  SELECT 1 FROM seat_holds h
                  WHERE h.showing_id = ?2 AND h.seat_id = s.id
              )
            ORDER BY s.row_label, s.column_number
            "#,
        )
        .bind(venue_id)
        .bind(showing_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    /// Seat ids currently held for a showing.
    pub async fn held_seat_ids(&self, showing_id: &str) -> DbResult<Vec<String>> {
        let ids: Vec<String> =
            sqlx::query_scalar("SELECT seat_id FROM seat_holds WHERE showing_id = ?1 ORDER BY seat_id")
                .bind(showing_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(ids)
    }

    /// Whether a seat is held, read on the caller's connection.
    pub async fn is_held(
        &self,
        conn: &mut SqliteConnection,
        showing_id: &str,
        seat_id: &str,
    ) -> DbResult<bool> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM seat_holds WHERE showing_id = ?1 AND seat_id = ?2")
                .bind(showing_id)
                .bind(seat_id)
                .fetch_optional(conn)
                .await?;
        Ok(found.is_some())
    }

    pub async fn insert(
        &self,
        conn: &mut SqliteConnection,
        showing_id: &str,
        seat_id: &str,
        hold_ref: &str,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO seat_holds (showing_id, seat_id, hold_ref, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(showing_id)
        .bind(seat_id)
        .bind(hold_ref)
        .bind(now)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Drops one hold if it belongs to `hold_ref`. Returns rows removed (0 or 1).
    pub async fn delete_owned(
        &self,
        conn: &mut SqliteConnection,
        showing_id: &str,
        seat_id: &str,
        hold_ref: &str,
    ) -> DbResult<u64> {
        let result = sqlx::query(
            "DELETE FROM seat_holds WHERE showing_id = ?1 AND seat_id = ?2 AND hold_ref = ?3",
        )
        .bind(showing_id)
        .bind(seat_id)
        .bind(hold_ref)
        .execute(conn)
        .await?;
        Ok(result.rows_affected())
    }
}
