use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

use crate::domain::{Currency, Decimal};

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub base_currency: Currency,
    pub market_data_api_url: String,
    pub market_data_timeout: Duration,
    /// Percent of each principal-account card expense credited back; 0 disables it.
    pub saveback_pct: Decimal,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let base_currency = env_map
            .get("BASE_CURRENCY")
            .map(|s| s.as_str())
            .unwrap_or("EUR");
        if base_currency.trim().len() != 3
            || !base_currency.trim().chars().all(|c| c.is_ascii_alphabetic())
        {
            return Err(ConfigError::InvalidValue(
                "BASE_CURRENCY".to_string(),
                format!("must be a three-letter currency code, got {}", base_currency),
            ));
        }
        let base_currency = Currency::new(base_currency);

        let market_data_api_url = env_map
            .get("MARKET_DATA_API_URL")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("MARKET_DATA_API_URL".to_string()))?;

        let timeout_ms = env_map
            .get("MARKET_DATA_TIMEOUT_MS")
            .map(|s| s.as_str())
            .unwrap_or("10000")
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "MARKET_DATA_TIMEOUT_MS".to_string(),
                    "must be a valid u64".to_string(),
                )
            })?;

        let saveback_pct = match env_map.get("SAVEBACK_PCT") {
            None => Decimal::zero(),
            Some(raw) => {
                let pct = Decimal::from_str_canonical(raw).map_err(|_| {
                    ConfigError::InvalidValue(
                        "SAVEBACK_PCT".to_string(),
                        "must be a decimal percent".to_string(),
                    )
                })?;
                if pct.is_negative() || pct > Decimal::hundred() {
                    return Err(ConfigError::InvalidValue(
                        "SAVEBACK_PCT".to_string(),
                        format!("must be between 0 and 100, got {}", raw),
                    ));
                }
                pct
            }
        };

        Ok(Config {
            port,
            database_path,
            base_currency,
            market_data_api_url,
            market_data_timeout: Duration::from_millis(timeout_ms),
            saveback_pct,
        })
    }
}
