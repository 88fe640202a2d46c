//! # Showing Repository
//!
//! Showings and their available-seat counter.
//!
//! The counter, status and version only change inside a seat-inventory
//! atomic unit, together with the matching `seat_holds` rows.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use marquee_core::{Showing, ShowingStatus};

const SHOWING_COLUMNS: &str = "id, movie_id, venue_id, starts_at, ends_at, base_price_cents, \
     capacity, available_seats, status, version, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct ShowingRepository {
    pool: SqlitePool,
}

impl ShowingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ShowingRepository { pool }
    }

    pub async fn insert(&self, showing: &Showing) -> DbResult<()> {
        debug!(id = %showing.id, venue_id = %showing.venue_id, "Inserting showing");

        sqlx::query(
            r#"
            INSERT INTO showings (
                id, movie_id, venue_id, starts_at, ends_at, base_price_cents,
                capacity, available_seats, status, version, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&showing.id)
        .bind(&showing.movie_id)
        .bind(&showing.venue_id)
        .bind(showing.starts_at)
        .bind(showing.ends_at)
        .bind(showing.base_price_cents)
        .bind(showing.capacity)
        .bind(showing.available_seats)
        .bind(showing.status)
        .bind(showing.version)
        .bind(showing.created_at)
        .bind(showing.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Showing>> {
        let sql = format!("SELECT {SHOWING_COLUMNS} FROM showings WHERE id = ?1");
        let showing = sqlx::query_as::<_, Showing>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(showing)
    }

    /// Takes the write lock on a showing row inside an atomic unit.
    ///
    /// Must be the first statement of the unit. Returns `false` if the
    /// showing does not exist.
    pub async fn claim(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<bool> {
        let result = sqlx::query("UPDATE showings SET version = version WHERE id = ?1")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Reads a showing on the caller's connection.
    pub async fn get_in(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Showing>> {
        let sql = format!("SELECT {SHOWING_COLUMNS} FROM showings WHERE id = ?1");
        let showing = sqlx::query_as::<_, Showing>(&sql)
            .bind(id)
            .fetch_optional(conn)
            .await?;
        Ok(showing)
    }

    /// Persists counter, status, version and `updated_at` after
    /// `Showing::adjust_available`.
    pub async fn save_seat_counter(
        &self,
        conn: &mut SqliteConnection,
        showing: &Showing,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE showings
            SET available_seats = ?1, status = ?2, version = ?3, updated_at = ?4
            WHERE id = ?5
            "#,
        )
        .bind(showing.available_seats)
        .bind(showing.status)
        .bind(showing.version)
        .bind(showing.updated_at)
        .bind(&showing.id)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Showing", showing.id.clone()));
        }
        Ok(())
    }

    /// Marks a showing CANCELLED. Catalog operation; the status then stays
    /// CANCELLED whatever the counter does.
    pub async fn cancel(&self, id: &str, now: DateTime<Utc>) -> DbResult<()> {
        debug!(id = %id, "Cancelling showing");

        let result = sqlx::query("UPDATE showings SET status = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(ShowingStatus::Cancelled)
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Showing", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use crate::repository::test_support::{db, showing_with_seats};
    use marquee_core::ShowingStatus;

    #[tokio::test]
    async fn test_claim_missing_showing() {
        let db = db().await;
        let mut tx = db.begin().await.unwrap();
        assert!(!db.showings().claim(&mut tx, "nope").await.unwrap());
    }

    #[tokio::test]
    async fn test_counter_roundtrip_in_unit() {
        let db = db().await;
        showing_with_seats(&db, 5).await;

        let mut tx = db.begin().await.unwrap();
        assert!(db.showings().claim(&mut tx, "show-1").await.unwrap());
        let mut showing = db.showings().get_in(&mut tx, "show-1").await.unwrap().unwrap();
        let at = Utc.with_ymd_and_hms(2030, 1, 1, 12, 0, 0).unwrap();
        showing.adjust_available(-4, 2000, at);
        db.showings().save_seat_counter(&mut tx, &showing).await.unwrap();
        tx.commit().await.unwrap();

        let stored = db.showings().get_by_id("show-1").await.unwrap().unwrap();
        assert_eq!(stored.available_seats, 1);
        assert_eq!(stored.status, ShowingStatus::AlmostFull);
        assert_eq!(stored.version, 1);
        // stamped with the caller's time, not the wall clock
        assert_eq!(stored.updated_at, at);
    }

    #[tokio::test]
    async fn test_cancel_showing() {
        let db = db().await;
        showing_with_seats(&db, 2).await;
        let at = Utc.with_ymd_and_hms(2030, 1, 1, 9, 30, 0).unwrap();
        db.showings().cancel("show-1", at).await.unwrap();

        let stored = db.showings().get_by_id("show-1").await.unwrap().unwrap();
        assert_eq!(stored.status, ShowingStatus::Cancelled);
        assert_eq!(stored.updated_at, at);
        assert!(db.showings().cancel("missing", at).await.is_err());
    }
}
