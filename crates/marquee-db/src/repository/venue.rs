//! # Venue Repository
//!
//! Venues and their seat layout. Written by catalog tooling and the seed
//! binary; read by the seat inventory.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use marquee_core::{Seat, Venue};

const VENUE_COLUMNS: &str =
    "id, name, theater_number, seat_rows, seat_columns, venue_type, status, created_at";

const SEAT_COLUMNS: &str = "id, venue_id, row_label, column_number, seat_type, status";

#[derive(Debug, Clone)]
pub struct VenueRepository {
    pool: SqlitePool,
}

impl VenueRepository {
    pub fn new(pool: SqlitePool) -> Self {
        VenueRepository { pool }
    }

    pub async fn insert(&self, venue: &Venue) -> DbResult<()> {
        debug!(id = %venue.id, theater_number = %venue.theater_number, "Inserting venue");

        sqlx::query(
            r#"
            INSERT INTO venues (
                id, name, theater_number, seat_rows, seat_columns,
                venue_type, status, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&venue.id)
        .bind(&venue.name)
        .bind(&venue.theater_number)
        .bind(venue.seat_rows)
        .bind(venue.seat_columns)
        .bind(venue.venue_type)
        .bind(venue.status)
        .bind(venue.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => {
                DbError::duplicate("theater_number", venue.theater_number.clone())
            }
            other => other,
        })?;

        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Venue>> {
        let sql = format!("SELECT {VENUE_COLUMNS} FROM venues WHERE id = ?1");
        let venue = sqlx::query_as::<_, Venue>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(venue)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM venues")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // =========================================================================
    // Seats
    // =========================================================================

    pub async fn insert_seat(&self, seat: &Seat) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO seats (id, venue_id, row_label, column_number, seat_type, status)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&seat.id)
        .bind(&seat.venue_id)
        .bind(&seat.row_label)
        .bind(seat.column_number)
        .bind(seat.seat_type)
        .bind(seat.status)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Seats of a venue in row/column order.
    pub async fn seats_for_venue(&self, venue_id: &str) -> DbResult<Vec<Seat>> {
        let sql = format!(
            "SELECT {SEAT_COLUMNS} FROM seats WHERE venue_id = ?1 ORDER BY row_label, column_number"
        );
        let seats = sqlx::query_as::<_, Seat>(&sql)
            .bind(venue_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(seats)
    }

    /// Looks a seat up on the caller's connection (inside an atomic unit).
    pub async fn seat_in(&self, conn: &mut SqliteConnection, seat_id: &str) -> DbResult<Option<Seat>> {
        let sql = format!("SELECT {SEAT_COLUMNS} FROM seats WHERE id = ?1");
        let seat = sqlx::query_as::<_, Seat>(&sql)
            .bind(seat_id)
            .fetch_optional(conn)
            .await?;
        Ok(seat)
    }

    pub async fn get_seat(&self, seat_id: &str) -> DbResult<Option<Seat>> {
        let sql = format!("SELECT {SEAT_COLUMNS} FROM seats WHERE id = ?1");
        let seat = sqlx::query_as::<_, Seat>(&sql)
            .bind(seat_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(seat)
    }

    /// Puts a seat into MAINTENANCE / INACTIVE or back to ACTIVE.
    pub async fn set_seat_status(
        &self,
        seat_id: &str,
        status: marquee_core::SeatStatus,
    ) -> DbResult<()> {
        let result = sqlx::query("UPDATE seats SET status = ?1 WHERE id = ?2")
            .bind(status)
            .bind(seat_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Seat", seat_id));
        }
        Ok(())
    }
}
