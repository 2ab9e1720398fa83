//! FleetBill configuration

use fleetbill_common::{BillingError, Result, DEFAULT_CONTRACT_CACHE_CAPACITY};
use serde::{Deserialize, Serialize};

/// Environment variable prefix, e.g. `FLEETBILL__CACHE__CAPACITY=256`
pub const ENV_PREFIX: &str = "FLEETBILL";

/// Default config file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "fleetbill";

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetBillConfig {
    /// Contract cache settings
    pub cache: CacheSettings,
    /// JSON fixture used to seed the in-memory repository
    pub seed_path: Option<String>,
    /// Default tracing filter when RUST_LOG is unset
    pub log_level: String,
}

impl Default for FleetBillConfig {
    fn default() -> Self {
        Self {
            cache: CacheSettings::default(),
            seed_path: None,
            log_level: "info".to_string(),
        }
    }
}

/// Contract cache settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Maximum number of tenants kept
    pub capacity: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CONTRACT_CACHE_CAPACITY,
        }
    }
}

impl FleetBillConfig {
    /// Load configuration from `.env`, an optional config file and the
    /// environment, in increasing precedence.
    pub fn load(file: Option<&str>) -> Result<Self> {
        // Try to load .env file
        let _ = dotenvy::dotenv();

        let file_source = match file {
            Some(path) => config::File::with_name(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let cfg: Self = config::Config::builder()
            .add_source(file_source)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| BillingError::Config(format!("Failed to load configuration: {}", e)))?;

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache.capacity == 0 {
            return Err(BillingError::Config(
                "cache.capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
