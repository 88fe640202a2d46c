//! # Seed Data Generator
//!
//! Populates the database with venues, seats and showings for development.
//!
//! ## Usage
//! ```bash
//! # Three venues, each with a 10x10 layout and four showings tomorrow
//! cargo run -p marquee-db --bin seed
//!
//! # Custom amount
//! cargo run -p marquee-db --bin seed -- --venues 5
//!
//! # Specify database path
//! cargo run -p marquee-db --bin seed -- --db ./data/marquee.db
//! ```
//!
//! ## Generated Layout
//! - Rows `A`-`J`, columns 1-10
//! - Row `J` is VIP, `A1`/`A2` are DISABLED access seats
//! - Showings at 13:00, 16:00, 19:00 and 22:00 (UTC) tomorrow, 2h each

use chrono::{Duration, NaiveTime, Utc};
use std::env;
use uuid::Uuid;

use marquee_core::{
    Seat, SeatStatus, SeatType, Showing, ShowingStatus, Venue, VenueType,
};
use marquee_db::{Database, DbConfig};

const ROWS: &[&str] = &["A", "B", "C", "D", "E", "F", "G", "H", "I", "J"];
const COLUMNS: i64 = 10;

const VENUE_TYPES: &[(VenueType, i64)] = &[
    (VenueType::TwoD, 30000),
    (VenueType::ThreeD, 40000),
    (VenueType::Imax, 55000),
    (VenueType::FourDx, 60000),
];

const SHOW_HOURS: &[u32] = &[13, 16, 19, 22];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "marquee_db=info".into()),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut venues: usize = 3;
    let mut db_path = String::from("./marquee_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--venues" | "-v" => {
                if i + 1 < args.len() {
                    venues = args[i + 1].parse().unwrap_or(3);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Marquee Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -v, --venues <N>   Number of venues to generate (default: 3)");
                println!("  -d, --db <PATH>    Database file path (default: ./marquee_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Marquee Seed Data Generator");
    println!("===========================");
    println!("Database: {}", db_path);
    println!("Venues:   {}", venues);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.venues().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} venues", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let tomorrow = (Utc::now() + Duration::days(1)).date_naive();
    let mut showings = 0;

    for n in 0..venues {
        let (venue_type, base_price_cents) = VENUE_TYPES[n % VENUE_TYPES.len()];
        let venue = generate_venue(n + 1, venue_type);
        db.venues().insert(&venue).await?;

        for seat in generate_seats(&venue.id) {
            db.venues().insert_seat(&seat).await?;
        }

        for hour in SHOW_HOURS {
            let Some(time) = NaiveTime::from_hms_opt(*hour, 0, 0) else {
                continue;
            };
            let starts_at = tomorrow.and_time(time).and_utc();
            let now = Utc::now();
            let showing = Showing {
                id: Uuid::new_v4().to_string(),
                movie_id: format!("movie-{}", (n % 2) + 1),
                venue_id: venue.id.clone(),
                starts_at,
                ends_at: starts_at + Duration::hours(2),
                base_price_cents,
                capacity: venue.capacity(),
                available_seats: venue.capacity(),
                status: ShowingStatus::Available,
                version: 0,
                created_at: now,
                updated_at: now,
            };
            db.showings().insert(&showing).await?;
            showings += 1;
        }

        println!("  {} ({:?}): {} seats", venue.name, venue_type, venue.capacity());
    }

    println!();
    println!("✓ Generated {} venues and {} showings in {:?}", venues, showings, start.elapsed());
    println!("✓ Seed complete!");

    Ok(())
}

fn generate_venue(number: usize, venue_type: VenueType) -> Venue {
    Venue {
        id: Uuid::new_v4().to_string(),
        name: format!("Screen {}", number),
        theater_number: format!("T{}", number),
        seat_rows: ROWS.len() as i64,
        seat_columns: COLUMNS,
        venue_type,
        status: SeatStatus::Active,
        created_at: Utc::now(),
    }
}

fn generate_seats(venue_id: &str) -> Vec<Seat> {
    let mut seats = Vec::with_capacity(ROWS.len() * COLUMNS as usize);
    for row in ROWS {
        for column in 1..=COLUMNS {
            let seat_type = match (*row, column) {
                ("J", _) => SeatType::Vip,
                ("A", 1) | ("A", 2) => SeatType::Disabled,
                _ => SeatType::Regular,
            };
            seats.push(Seat {
                id: Uuid::new_v4().to_string(),
                venue_id: venue_id.to_string(),
                row_label: row.to_string(),
                column_number: column,
                seat_type,
                status: SeatStatus::Active,
            });
        }
    }
    seats
}
