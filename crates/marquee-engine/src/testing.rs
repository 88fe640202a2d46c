//! Shared fixture for the engine tests: one venue, one showing, a fixed
//! clock, an in-memory member directory and a recording notifier.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use marquee_core::{
    CardType, MemberProfile, Money, Seat, SeatStatus, SeatType, Showing, ShowingStatus, Venue,
    VenueType,
};
use marquee_db::{Database, DbConfig};
use uuid::Uuid;

use crate::clock::{Clock, FixedClock};
use crate::config::EngineConfig;
use crate::member::InMemoryMemberDirectory;
use crate::notify::RecordingNotifier;
use crate::Engine;

const ROWS: [&str; 10] = ["A", "B", "C", "D", "E", "F", "G", "H", "I", "J"];

pub struct Fixture {
    pub engine: Engine,
    pub clock: Arc<FixedClock>,
    pub notifier: Arc<RecordingNotifier>,
    pub members: Arc<InMemoryMemberDirectory>,
    pub showing_id: String,
    pub capacity: i64,
    db_file: Option<std::path::PathBuf>,
}

impl Fixture {
    /// 10x10 hall, rows A-J, row J VIP. Base price 300.00, starts in 2h.
    pub async fn new() -> Self {
        Self::build(Database::new(DbConfig::in_memory()).await.unwrap(), 100, None, false).await
    }

    /// Single row A with `capacity` seats (at most 10).
    pub async fn with_capacity(capacity: i64) -> Self {
        assert!((1..=10).contains(&capacity));
        Self::build(
            Database::new(DbConfig::in_memory()).await.unwrap(),
            capacity,
            None,
            false,
        )
        .await
    }

    /// File-backed database with several connections, for tests that race
    /// tasks against each other.
    pub async fn with_file_db(capacity: i64) -> Self {
        let path = std::env::temp_dir().join(format!("marquee-test-{}.db", Uuid::new_v4()));
        let db = Database::new(DbConfig::new(&path).max_connections(8))
            .await
            .unwrap();
        Self::build(db, capacity, Some(path), false).await
    }

    /// Same as [`Fixture::new`], with a notifier that fails every call.
    pub async fn with_failing_notifier() -> Self {
        Self::build(Database::new(DbConfig::in_memory()).await.unwrap(), 100, None, true).await
    }

    async fn build(
        db: Database,
        capacity: i64,
        db_file: Option<std::path::PathBuf>,
        failing_notifier: bool,
    ) -> Self {
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap(),
        ));
        let notifier = Arc::new(if failing_notifier {
            RecordingNotifier::failing()
        } else {
            RecordingNotifier::new()
        });
        let members = Arc::new(InMemoryMemberDirectory::new(clock.clone()));

        let showing_id = seed_showing(&db, clock.now(), capacity).await;

        let engine = Engine::with_database(
            db,
            &EngineConfig::default(),
            members.clone(),
            notifier.clone(),
            clock.clone(),
        );

        Fixture {
            engine,
            clock,
            notifier,
            members,
            showing_id,
            capacity,
            db_file,
        }
    }

    pub async fn showing(&self) -> Showing {
        self.engine
            .database()
            .showings()
            .get_by_id(&self.showing_id)
            .await
            .unwrap()
            .unwrap()
    }

    /// Opens a wallet holding `cents`.
    pub async fn wallet_with(&self, member_id: &str, cents: i64) {
        let ledger = self.engine.ledger();
        ledger.create_wallet(member_id).await.unwrap();
        if cents > 0 {
            ledger
                .deposit(member_id, Money::from_cents(cents))
                .await
                .unwrap();
        }
    }

    /// Active, verified adult member with a funded wallet.
    pub async fn member_with_wallet(&self, member_id: &str, cents: i64) {
        self.add_member(MemberProfile {
            member_id: member_id.to_string(),
            active: true,
            verified: true,
            birth_date: chrono::NaiveDate::from_ymd_opt(1990, 5, 20),
            card_type: None,
        })
        .await;
        self.wallet_with(member_id, cents).await;
    }

    /// Active, verified member holding a student card.
    pub async fn student_with_wallet(&self, member_id: &str, cents: i64) {
        self.add_member(MemberProfile {
            member_id: member_id.to_string(),
            active: true,
            verified: true,
            birth_date: chrono::NaiveDate::from_ymd_opt(2004, 1, 1),
            card_type: Some(CardType::Student),
        })
        .await;
        self.wallet_with(member_id, cents).await;
    }

    pub async fn add_member(&self, profile: MemberProfile) {
        self.members.upsert(profile).await;
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        if let Some(path) = &self.db_file {
            let _ = std::fs::remove_file(path);
        }
    }
}

async fn seed_showing(db: &Database, now: chrono::DateTime<Utc>, capacity: i64) -> String {
    let (rows, columns) = if capacity <= 10 {
        (1, capacity)
    } else {
        (10, 10)
    };

    let venue = Venue {
        id: "venue-1".to_string(),
        name: "Hall 1".to_string(),
        theater_number: "T1".to_string(),
        seat_rows: rows,
        seat_columns: columns,
        venue_type: VenueType::TwoD,
        status: SeatStatus::Active,
        created_at: now,
    };
    db.venues().insert(&venue).await.unwrap();

    for row in ROWS.iter().take(rows as usize) {
        for col in 1..=columns {
            let seat = Seat {
                id: format!("{row}{col}"),
                venue_id: venue.id.clone(),
                row_label: row.to_string(),
                column_number: col,
                seat_type: if *row == "J" { SeatType::Vip } else { SeatType::Regular },
                status: SeatStatus::Active,
            };
            db.venues().insert_seat(&seat).await.unwrap();
        }
    }

    let showing = Showing {
        id: "show-1".to_string(),
        movie_id: "movie-1".to_string(),
        venue_id: venue.id.clone(),
        starts_at: now + Duration::hours(2),
        ends_at: now + Duration::hours(4),
        base_price_cents: 30000,
        capacity: venue.capacity(),
        available_seats: venue.capacity(),
        status: ShowingStatus::Available,
        version: 0,
        created_at: now,
        updated_at: now,
    };
    db.showings().insert(&showing).await.unwrap();
    showing.id
}
