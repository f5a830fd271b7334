// src/config.rs
use crate::error::ConfigError;
use chrono::{Datelike, Duration as DateDuration, NaiveDate, Utc, Weekday};
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_POLYGON_BASE_URL: &str = "https://api.polygon.io";
pub const DEFAULT_MARKETWATCH_BASE_URL: &str = "https://www.marketwatch.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3030";

/// Date used for pricing lookups when the caller does not ask for one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PricingDate {
    /// The most recent weekday strictly before today (UTC). Holidays are not modelled.
    #[default]
    PreviousWeekday,
    Fixed(NaiveDate),
}

impl PricingDate {
    pub fn resolve(&self) -> NaiveDate {
        match self {
            PricingDate::Fixed(date) => *date,
            PricingDate::PreviousWeekday => previous_weekday(Utc::now().date_naive()),
        }
    }
}

pub fn previous_weekday(today: NaiveDate) -> NaiveDate {
    let mut date = today - DateDuration::days(1);
    while matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
        date = date - DateDuration::days(1);
    }
    date
}

#[derive(Clone)]
pub struct Config {
    pub polygon_api_key: String,
    pub polygon_base_url: String,
    pub marketwatch_base_url: String,
    pub pricing_date: PricingDate,
    pub upstream_timeout: Duration,
    pub bind_addr: SocketAddr,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let polygon_api_key = var("POLYGON_API_KEY").ok_or(ConfigError::Missing("POLYGON_API_KEY"))?;

        let pricing_date = match var("PRICING_DATE") {
            Some(value) => PricingDate::Fixed(
                NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|e| {
                    ConfigError::Invalid {
                        var: "PRICING_DATE",
                        value: value.clone(),
                        reason: e.to_string(),
                    }
                })?,
            ),
            None => PricingDate::PreviousWeekday,
        };

        let upstream_timeout = match var("UPSTREAM_TIMEOUT_SECS") {
            Some(value) => match value.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                Ok(_) => {
                    return Err(ConfigError::Invalid {
                        var: "UPSTREAM_TIMEOUT_SECS",
                        value,
                        reason: "must be greater than zero".to_string(),
                    })
                }
                Err(e) => {
                    return Err(ConfigError::Invalid {
                        var: "UPSTREAM_TIMEOUT_SECS",
                        value,
                        reason: e.to_string(),
                    })
                }
            },
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        let bind_value = var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_value
            .trim()
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                var: "BIND_ADDR",
                value: bind_value.clone(),
                reason: e.to_string(),
            })?;

        Ok(Config {
            polygon_api_key,
            polygon_base_url: var("POLYGON_BASE_URL")
                .unwrap_or_else(|| DEFAULT_POLYGON_BASE_URL.to_string()),
            marketwatch_base_url: var("MARKETWATCH_BASE_URL")
                .unwrap_or_else(|| DEFAULT_MARKETWATCH_BASE_URL.to_string()),
            pricing_date,
            upstream_timeout,
            bind_addr,
        })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("polygon_api_key", &"[REDACTED]")
            .field("polygon_base_url", &self.polygon_base_url)
            .field("marketwatch_base_url", &self.marketwatch_base_url)
            .field("pricing_date", &self.pricing_date)
            .field("upstream_timeout", &self.upstream_timeout)
            .field("bind_addr", &self.bind_addr)
            .finish()
    }
}
