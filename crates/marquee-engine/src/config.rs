//! # Engine Configuration
//!
//! Limits and storage settings for the booking engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     MARQUEE_DB_PATH=/var/lib/marquee/marquee.db                        │
//! │     MARQUEE_VERIFICATION_THRESHOLD_CENTS=500000                        │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/marquee/marquee.toml (Linux)                             │
//! │     ~/Library/Application Support/com.marquee.marquee/marquee.toml     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "/var/lib/marquee/marquee.db"
//! max_connections = 5
//!
//! [wallet]
//! deposit_cap_cents = 10000000       # 100,000.00
//! withdrawal_cap_cents = 5000000     # 50,000.00
//! transfer_cap_cents = 10000000      # 100,000.00
//! verification_threshold_cents = 1000000
//!
//! [booking]
//! max_seats_per_booking = 10
//! almost_full_bps = 2000             # 20% of capacity
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use marquee_core::types::Multiplier;
use marquee_core::{Money, DEFAULT_ALMOST_FULL_BPS, DEFAULT_MAX_SEATS_PER_BOOKING};
use marquee_db::DbConfig;

use crate::error::{EngineError, EngineResult};

// =============================================================================
// Database Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Defaults to `marquee.db` in the platform data dir.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: default_max_connections(),
        }
    }
}

// =============================================================================
// Wallet Settings
// =============================================================================

/// Per-transaction limits, in minor units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletSettings {
    #[serde(default = "default_deposit_cap")]
    pub deposit_cap_cents: i64,

    #[serde(default = "default_withdrawal_cap")]
    pub withdrawal_cap_cents: i64,

    #[serde(default = "default_transfer_cap")]
    pub transfer_cap_cents: i64,

    /// Payments, withdrawals and transfers above this need a verification code.
    #[serde(default = "default_verification_threshold")]
    pub verification_threshold_cents: i64,
}

fn default_deposit_cap() -> i64 {
    10_000_000
}

fn default_withdrawal_cap() -> i64 {
    5_000_000
}

fn default_transfer_cap() -> i64 {
    10_000_000
}

fn default_verification_threshold() -> i64 {
    1_000_000
}

impl Default for WalletSettings {
    fn default() -> Self {
        WalletSettings {
            deposit_cap_cents: default_deposit_cap(),
            withdrawal_cap_cents: default_withdrawal_cap(),
            transfer_cap_cents: default_transfer_cap(),
            verification_threshold_cents: default_verification_threshold(),
        }
    }
}

impl WalletSettings {
    pub fn deposit_cap(&self) -> Money {
        Money::from_cents(self.deposit_cap_cents)
    }

    pub fn withdrawal_cap(&self) -> Money {
        Money::from_cents(self.withdrawal_cap_cents)
    }

    pub fn transfer_cap(&self) -> Money {
        Money::from_cents(self.transfer_cap_cents)
    }

    pub fn verification_threshold(&self) -> Money {
        Money::from_cents(self.verification_threshold_cents)
    }
}

// =============================================================================
// Booking Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingSettings {
    #[serde(default = "default_max_seats")]
    pub max_seats_per_booking: usize,

    /// Remaining/capacity ratio (basis points) at or below which a showing
    /// turns ALMOST_FULL.
    #[serde(default = "default_almost_full_bps")]
    pub almost_full_bps: u32,
}

fn default_max_seats() -> usize {
    DEFAULT_MAX_SEATS_PER_BOOKING
}

fn default_almost_full_bps() -> u32 {
    DEFAULT_ALMOST_FULL_BPS
}

impl Default for BookingSettings {
    fn default() -> Self {
        BookingSettings {
            max_seats_per_booking: default_max_seats(),
            almost_full_bps: default_almost_full_bps(),
        }
    }
}

// =============================================================================
// Engine Config
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub wallet: WalletSettings,

    #[serde(default)]
    pub booking: BookingSettings,
}

impl EngineConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (marquee.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> EngineResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading engine config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Parses a TOML document on top of the defaults, then validates.
    pub fn from_toml_str(contents: &str) -> EngineResult<Self> {
        let config: EngineConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> EngineResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> EngineResult<()> {
        let w = &self.wallet;
        for (name, cap) in [
            ("deposit_cap_cents", w.deposit_cap_cents),
            ("withdrawal_cap_cents", w.withdrawal_cap_cents),
            ("transfer_cap_cents", w.transfer_cap_cents),
        ] {
            if cap <= 0 {
                return Err(EngineError::Config(format!("{name} must be greater than 0")));
            }
        }

        if w.verification_threshold_cents <= 0 {
            return Err(EngineError::Config(
                "verification_threshold_cents must be greater than 0".into(),
            ));
        }

        if self.booking.max_seats_per_booking == 0 {
            return Err(EngineError::Config(
                "max_seats_per_booking must be greater than 0".into(),
            ));
        }

        if self.booking.almost_full_bps > Multiplier::ONE_BPS {
            return Err(EngineError::Config(format!(
                "almost_full_bps must be at most {}",
                Multiplier::ONE_BPS
            )));
        }

        if self.database.max_connections == 0 {
            return Err(EngineError::Config(
                "max_connections must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("MARQUEE_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Ok(max) = std::env::var("MARQUEE_DB_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(v) => self.database.max_connections = v,
                Err(_) => warn!(value = %max, "Ignoring invalid MARQUEE_DB_MAX_CONNECTIONS"),
            }
        }

        let cents_overrides: [(&str, &mut i64); 4] = [
            ("MARQUEE_DEPOSIT_CAP_CENTS", &mut self.wallet.deposit_cap_cents),
            ("MARQUEE_WITHDRAWAL_CAP_CENTS", &mut self.wallet.withdrawal_cap_cents),
            ("MARQUEE_TRANSFER_CAP_CENTS", &mut self.wallet.transfer_cap_cents),
            (
                "MARQUEE_VERIFICATION_THRESHOLD_CENTS",
                &mut self.wallet.verification_threshold_cents,
            ),
        ];
        for (var, field) in cents_overrides {
            if let Ok(value) = std::env::var(var) {
                match value.parse::<i64>() {
                    Ok(v) => *field = v,
                    Err(_) => warn!(var, value = %value, "Ignoring invalid amount in environment"),
                }
            }
        }

        if let Ok(max) = std::env::var("MARQUEE_MAX_SEATS_PER_BOOKING") {
            if let Ok(v) = max.parse::<usize>() {
                self.booking.max_seats_per_booking = v;
            }
        }

        if let Ok(bps) = std::env::var("MARQUEE_ALMOST_FULL_BPS") {
            if let Ok(v) = bps.parse::<u32>() {
                self.booking.almost_full_bps = v;
            }
        }
    }

    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("com", "marquee", "marquee")
    }

    fn default_config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join("marquee.toml"))
    }

    /// Configured database file, or `marquee.db` in the platform data dir.
    pub fn database_path(&self) -> EngineResult<PathBuf> {
        if let Some(path) = &self.database.path {
            return Ok(path.clone());
        }
        Self::project_dirs()
            .map(|dirs| dirs.data_dir().join("marquee.db"))
            .ok_or_else(|| EngineError::Config("No database path available".into()))
    }

    /// Pool settings for `marquee_db::Database::new`.
    pub fn db_config(&self) -> EngineResult<DbConfig> {
        Ok(DbConfig::new(self.database_path()?).max_connections(self.database.max_connections))
    }
}
