//! # Application Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     CAJA_TENANT_ID, CAJA_DB_PATH, CAJA_MAX_ATTEMPTS,                   │
//! │     CAJA_SETTLE_THRESHOLD_CENTS, CAJA_OVERPAY_TOLERANCE_CENTS          │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/caja-pos/caja.toml (Linux)                               │
//! │     ~/Library/Application Support/com.caja.pos/caja.toml (macOS)       │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # caja.toml
//! [tenant]
//! id = "00000000-0000-0000-0000-000000000001"
//!
//! [store]
//! path = "/var/lib/caja/caja.db"   # omit for the platform data dir
//! max_connections = 5
//!
//! [ledger]
//! max_attempts = 5
//! settle_threshold_cents = 10
//! overpay_tolerance_cents = 1
//!
//! [store_info]
//! name = "Abarrotes Lupita"
//! currency_symbol = "$"
//! ```

use std::path::PathBuf;

use caja_core::ledger::SettlementPolicy;
use caja_core::{Money, DEFAULT_TENANT_ID};
use caja_db::{DbConfig, EngineConfig, DEFAULT_MAX_ATTEMPTS};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

// =============================================================================
// Errors
// =============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading or writing the config file failed.
    #[error("Config file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid TOML for this schema.
    #[error("Config file is invalid: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config could not be serialized: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value is out of range.
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// No platform directory could be determined.
    #[error("No config or data directory available on this platform")]
    NoDirectory,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

/// Which tenant's ledger this installation works on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantSettings {
    #[serde(default = "default_tenant_id")]
    pub id: String,
}

fn default_tenant_id() -> String {
    DEFAULT_TENANT_ID.to_string()
}

impl Default for TenantSettings {
    fn default() -> Self {
        TenantSettings {
            id: default_tenant_id(),
        }
    }
}

/// Where the SQLite store lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Database file. `None` uses the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Maximum pool connections.
    /// Default: 5
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            path: None,
            max_connections: default_max_connections(),
        }
    }
}

/// Transaction and settlement tunables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSettings {
    /// Attempts per transaction before giving up on conflicts.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// A balance at or below this after a payment is written off.
    #[serde(default = "default_settle_threshold")]
    pub settle_threshold_cents: i64,

    /// How far a payment may exceed the balance.
    #[serde(default = "default_overpay_tolerance")]
    pub overpay_tolerance_cents: i64,
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_settle_threshold() -> i64 {
    SettlementPolicy::default().settle_threshold.cents()
}

fn default_overpay_tolerance() -> i64 {
    SettlementPolicy::default().overpay_tolerance.cents()
}

impl Default for LedgerSettings {
    fn default() -> Self {
        LedgerSettings {
            max_attempts: default_max_attempts(),
            settle_threshold_cents: default_settle_threshold(),
            overpay_tolerance_cents: default_overpay_tolerance(),
        }
    }
}

/// Display details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreInfo {
    #[serde(default = "default_store_name")]
    pub name: String,

    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
}

fn default_store_name() -> String {
    "Caja POS".to_string()
}

fn default_currency_symbol() -> String {
    "$".to_string()
}

impl Default for StoreInfo {
    fn default() -> Self {
        StoreInfo {
            name: default_store_name(),
            currency_symbol: default_currency_symbol(),
        }
    }
}

impl StoreInfo {
    /// Formats an amount with the configured symbol: `$1,234.50`.
    pub fn format_money(&self, money: Money) -> String {
        let sign = if money.is_negative() { "-" } else { "" };
        let digits = money.dollars().abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }
        format!(
            "{}{}{}.{:02}",
            sign,
            self.currency_symbol,
            grouped,
            money.cents_part()
        )
    }
}

// =============================================================================
// AppConfig
// =============================================================================

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub tenant: TenantSettings,

    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub ledger: LedgerSettings,

    #[serde(default)]
    pub store_info: StoreInfo,
}

impl AppConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (caja.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or(ConfigError::NoDirectory)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.tenant.id.trim().is_empty() {
            return Err(ConfigError::Invalid("tenant.id must not be empty".into()));
        }
        if self.store.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "store.max_connections must be greater than 0".into(),
            ));
        }
        if self.ledger.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "ledger.max_attempts must be greater than 0".into(),
            ));
        }
        if self.ledger.settle_threshold_cents < 0 || self.ledger.overpay_tolerance_cents < 0 {
            return Err(ConfigError::Invalid(
                "ledger tolerances must not be negative".into(),
            ));
        }
        Ok(())
    }

    /// Applies environment variable overrides read through `lookup`.
    ///
    /// Unparseable numbers are ignored with a warning.
    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(id) = lookup("CAJA_TENANT_ID") {
            debug!(tenant = %id, "Overriding tenant from environment");
            self.tenant.id = id;
        }

        if let Some(path) = lookup("CAJA_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.store.path = Some(PathBuf::from(path));
        }

        if let Some(value) = lookup("CAJA_MAX_ATTEMPTS") {
            match value.parse::<u32>() {
                Ok(n) => self.ledger.max_attempts = n,
                Err(_) => warn!(value = %value, "Ignoring invalid CAJA_MAX_ATTEMPTS"),
            }
        }

        if let Some(value) = lookup("CAJA_SETTLE_THRESHOLD_CENTS") {
            match value.parse::<i64>() {
                Ok(n) => self.ledger.settle_threshold_cents = n,
                Err(_) => warn!(value = %value, "Ignoring invalid CAJA_SETTLE_THRESHOLD_CENTS"),
            }
        }

        if let Some(value) = lookup("CAJA_OVERPAY_TOLERANCE_CENTS") {
            match value.parse::<i64>() {
                Ok(n) => self.ledger.overpay_tolerance_cents = n,
                Err(_) => warn!(value = %value, "Ignoring invalid CAJA_OVERPAY_TOLERANCE_CENTS"),
            }
        }
    }

    /// Platform config file path.
    ///
    /// ## Platform-Specific Paths
    /// - **Linux**: `~/.config/caja-pos/caja.toml`
    /// - **macOS**: `~/Library/Application Support/com.caja.pos/caja.toml`
    /// - **Windows**: `%APPDATA%\caja\pos\config\caja.toml`
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "caja", "pos")
            .map(|dirs| dirs.config_dir().join("caja.toml"))
    }

    /// The configured database file, or `caja.db` in the platform data
    /// directory (created if missing).
    pub fn database_path(&self) -> ConfigResult<PathBuf> {
        if let Some(path) = &self.store.path {
            return Ok(path.clone());
        }
        let dirs = directories::ProjectDirs::from("com", "caja", "pos")
            .ok_or(ConfigError::NoDirectory)?;
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;
        Ok(data_dir.join("caja.db"))
    }

    pub fn db_config(&self) -> ConfigResult<DbConfig> {
        Ok(DbConfig::new(self.database_path()?).max_connections(self.store.max_connections))
    }

    pub fn settlement_policy(&self) -> SettlementPolicy {
        SettlementPolicy::new(
            Money::from_cents(self.ledger.overpay_tolerance_cents),
            Money::from_cents(self.ledger.settle_threshold_cents),
        )
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            max_attempts: self.ledger.max_attempts,
            policy: self.settlement_policy(),
        }
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.tenant_id(), DEFAULT_TENANT_ID);
        assert_eq!(config.ledger.max_attempts, DEFAULT_MAX_ATTEMPTS);
        assert_eq!(config.settlement_policy(), SettlementPolicy::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [ledger]
            settle_threshold_cents = 0

            [store_info]
            name = "Abarrotes Lupita"
            "#,
        )
        .unwrap();

        assert_eq!(config.ledger.settle_threshold_cents, 0);
        assert_eq!(config.ledger.overpay_tolerance_cents, 1);
        assert_eq!(config.store_info.name, "Abarrotes Lupita");
        assert_eq!(config.store_info.currency_symbol, "$");
        assert_eq!(config.tenant_id(), DEFAULT_TENANT_ID);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("CAJA_TENANT_ID", "tienda-7"),
            ("CAJA_DB_PATH", "/tmp/caja-test.db"),
            ("CAJA_MAX_ATTEMPTS", "9"),
            ("CAJA_SETTLE_THRESHOLD_CENTS", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_env_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.tenant_id(), "tienda-7");
        assert_eq!(config.store.path, Some(PathBuf::from("/tmp/caja-test.db")));
        assert_eq!(config.engine_config().max_attempts, 9);
        assert_eq!(config.ledger.settle_threshold_cents, 10);
    }

    #[test]
    fn test_validation() {
        let mut config = AppConfig::default();
        config.ledger.max_attempts = 0;
        assert!(config.validate().is_err());

        config.ledger.max_attempts = 3;
        config.ledger.overpay_tolerance_cents = -1;
        assert!(config.validate().is_err());

        config.ledger.overpay_tolerance_cents = 0;
        config.tenant.id = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_format_money() {
        let info = StoreInfo::default();
        assert_eq!(info.format_money(Money::from_cents(123_450)), "$1,234.50");
        assert_eq!(info.format_money(Money::from_cents(-5)), "-$0.05");
        assert_eq!(info.format_money(Money::zero()), "$0.00");
    }

    #[test]
    fn test_toml_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[tenant]"));
        assert!(toml_str.contains("[ledger]"));
    }
}
