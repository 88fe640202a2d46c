//! # Booking Repository
//!
//! Bookings and their per-seat details. A booking and its details are
//! always written together, in the caller's atomic unit.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use marquee_core::{Booking, BookingDetail, BookingStatus};

const BOOKING_COLUMNS: &str = "id, booking_number, member_id, showing_id, total_cents, \
     booking_status, payment_status, created_at, updated_at, cancelled_at";

const DETAIL_COLUMNS: &str =
    "id, booking_id, showing_id, seat_id, ticket_type, ticket_price_cents, created_at";

#[derive(Debug, Clone)]
pub struct BookingRepository {
    pool: SqlitePool,
}

impl BookingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BookingRepository { pool }
    }

    /// Inserts a booking header and all of its details.
    pub async fn insert_with_details(
        &self,
        conn: &mut SqliteConnection,
        booking: &Booking,
        details: &[BookingDetail],
    ) -> DbResult<()> {
        debug!(
            id = %booking.id,
            booking_number = %booking.booking_number,
            seats = details.len(),
            "Inserting booking"
        );

        sqlx::query(
            r#"
            INSERT INTO bookings (
                id, booking_number, member_id, showing_id, total_cents,
                booking_status, payment_status, created_at, updated_at, cancelled_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&booking.id)
        .bind(&booking.booking_number)
        .bind(&booking.member_id)
        .bind(&booking.showing_id)
        .bind(booking.total_cents)
        .bind(booking.booking_status)
        .bind(booking.payment_status)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .bind(booking.cancelled_at)
        .execute(&mut *conn)
        .await?;

        for detail in details {
            sqlx::query(
                r#"
                INSERT INTO booking_details (
                    id, booking_id, showing_id, seat_id, ticket_type,
                    ticket_price_cents, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(&detail.id)
            .bind(&detail.booking_id)
            .bind(&detail.showing_id)
            .bind(&detail.seat_id)
            .bind(detail.ticket_type)
            .bind(detail.ticket_price_cents)
            .bind(detail.created_at)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Booking>> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1");
        let booking = sqlx::query_as::<_, Booking>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(booking)
    }

    /// Reads a booking on the caller's connection.
    pub async fn get_in(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Booking>> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1");
        let booking = sqlx::query_as::<_, Booking>(&sql)
            .bind(id)
            .fetch_optional(conn)
            .await?;
        Ok(booking)
    }

    pub async fn details(&self, booking_id: &str) -> DbResult<Vec<BookingDetail>> {
        let sql = format!(
            "SELECT {DETAIL_COLUMNS} FROM booking_details WHERE booking_id = ?1 ORDER BY seat_id"
        );
        let details = sqlx::query_as::<_, BookingDetail>(&sql)
            .bind(booking_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(details)
    }

    /// Whether the member holds a non-cancelled booking for the showing.
    pub async fn has_active_booking(&self, member_id: &str, showing_id: &str) -> DbResult<bool> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM bookings
            WHERE member_id = ?1 AND showing_id = ?2 AND booking_status != ?3
            "#,
        )
        .bind(member_id)
        .bind(showing_id)
        .bind(BookingStatus::Cancelled)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    /// Member's bookings, newest first.
    pub async fn for_member(&self, member_id: &str) -> DbResult<Vec<Booking>> {
        let sql = format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE member_id = ?1 ORDER BY created_at DESC, id"
        );
        let bookings = sqlx::query_as::<_, Booking>(&sql)
            .bind(member_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(bookings)
    }

    /// Persists status fields after `Booking::cancel` / `Booking::complete`.
    pub async fn update_status(&self, conn: &mut SqliteConnection, booking: &Booking) -> DbResult<()> {
        debug!(
            id = %booking.id,
            status = ?booking.booking_status,
            payment = ?booking.payment_status,
            "Updating booking status"
        );

        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET booking_status = ?1, payment_status = ?2, updated_at = ?3, cancelled_at = ?4
            WHERE id = ?5
            "#,
        )
        .bind(booking.booking_status)
        .bind(booking.payment_status)
        .bind(booking.updated_at)
        .bind(booking.cancelled_at)
        .bind(&booking.id)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Booking", booking.id.clone()));
        }
        Ok(())
    }

    /// Non-cancelled bookings that include the seat for the showing.
    pub async fn count_active_for_seat(&self, showing_id: &str, seat_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM booking_details d
            JOIN bookings b ON b.id = d.booking_id
            WHERE d.showing_id = ?1 AND d.seat_id = ?2 AND b.booking_status != ?3
            "#,
        )
        .bind(showing_id)
        .bind(seat_id)
        .bind(BookingStatus::Cancelled)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::repository::test_support::{db, showing_with_seats};
    use marquee_core::booking::generate_booking_id;
    use marquee_core::{Booking, BookingDetail, BookingStatus, PaymentStatus, TicketType};

    fn detail(booking_id: &str, seat_id: &str) -> BookingDetail {
        BookingDetail {
            id: uuid::Uuid::new_v4().to_string(),
            booking_id: booking_id.to_string(),
            showing_id: "show-1".to_string(),
            seat_id: seat_id.to_string(),
            ticket_type: TicketType::Adult,
            ticket_price_cents: 30000,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let db = db().await;
        showing_with_seats(&db, 3).await;

        let id = generate_booking_id();
        let details = vec![detail(&id, "A1"), detail(&id, "A2")];
        let booking = Booking::confirmed(id.clone(), "m-1", "show-1", &details, Utc::now());

        let mut tx = db.begin().await.unwrap();
        db.bookings().insert_with_details(&mut tx, &booking, &details).await.unwrap();
        tx.commit().await.unwrap();

        let stored = db.bookings().get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.total_cents, 60000);
        assert_eq!(stored.booking_number, booking.booking_number);
        assert_eq!(db.bookings().details(&id).await.unwrap().len(), 2);
        assert!(db.bookings().has_active_booking("m-1", "show-1").await.unwrap());
        assert_eq!(db.bookings().count_active_for_seat("show-1", "A1").await.unwrap(), 1);
        assert_eq!(db.bookings().for_member("m-1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_booking_is_not_active() {
        let db = db().await;
        showing_with_seats(&db, 1).await;

        let id = generate_booking_id();
        let details = vec![detail(&id, "A1")];
        let mut booking = Booking::confirmed(id.clone(), "m-1", "show-1", &details, Utc::now());

        let mut tx = db.begin().await.unwrap();
        db.bookings().insert_with_details(&mut tx, &booking, &details).await.unwrap();
        booking.booking_status = BookingStatus::Cancelled;
        booking.payment_status = PaymentStatus::Refunded;
        booking.cancelled_at = Some(Utc::now());
        db.bookings().update_status(&mut tx, &booking).await.unwrap();
        tx.commit().await.unwrap();

        assert!(!db.bookings().has_active_booking("m-1", "show-1").await.unwrap());
        assert_eq!(db.bookings().count_active_for_seat("show-1", "A1").await.unwrap(), 0);
        let stored = db.bookings().get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.payment_status, PaymentStatus::Refunded);
        assert!(stored.cancelled_at.is_some());
    }
}
