//! Application configuration loaded from environment variables.

use std::time::Duration;

use domain::{BookingConfig, Channel};
use payments::PaymentConfig;
use thiserror::Error;

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Error)]
#[error("invalid value for {name}: {value:?} ({reason})")]
pub struct ConfigError {
    pub name: &'static str,
    pub value: String,
    pub reason: String,
}

/// Server configuration with defaults for every unset variable.
///
/// Reads:
/// - `HOST`, `PORT`: bind address (default `0.0.0.0:3000`)
/// - `RUST_LOG`: tracing filter (default `info`)
/// - `LOG_FORMAT`: `pretty` or `json`
/// - `DATABASE_URL`: Postgres event store; in-memory when unset
/// - `PAYMENT_LINK_BASE_URL`, `PAYMENT_CURRENCY`, `PAYMENT_GATEWAY_TIMEOUT_MS`
/// - `STRIPE_SECRET_KEY`: enables the Stripe gateway; `STRIPE_API_BASE`
/// - `BOOKING_REFERENCE_LENGTH`, `BOOKING_REFERENCE_ATTEMPTS`
/// - `COMMAND_RETRY_ATTEMPTS`
/// - `NOTIFICATION_CHANNEL`: `EMAIL`, `SMS` or `WHATSAPP`
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub payment_link_base_url: String,
    pub payment_currency: String,
    pub payment_gateway_timeout: Duration,
    pub stripe_secret_key: Option<String>,
    pub stripe_api_base: String,
    pub reference_length: usize,
    pub reference_attempts: u32,
    pub command_retry_attempts: u32,
    pub notification_channel: Channel,
}

impl Config {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let log_format = match var("LOG_FORMAT") {
            None => defaults.log_format,
            Some(v) => match v.to_ascii_lowercase().as_str() {
                "pretty" => LogFormat::Pretty,
                "json" => LogFormat::Json,
                _ => return Err(invalid("LOG_FORMAT", v, "expected pretty or json")),
            },
        };

        let notification_channel = match var("NOTIFICATION_CHANNEL") {
            None => defaults.notification_channel,
            Some(v) => v
                .parse()
                .map_err(|reason| invalid("NOTIFICATION_CHANNEL", v.clone(), reason))?,
        };

        Ok(Self {
            host: var("HOST").unwrap_or(defaults.host),
            port: parsed(&var, "PORT")?.unwrap_or(defaults.port),
            log_level: var("RUST_LOG").unwrap_or(defaults.log_level),
            log_format,
            database_url: var("DATABASE_URL"),
            payment_link_base_url: var("PAYMENT_LINK_BASE_URL")
                .unwrap_or(defaults.payment_link_base_url),
            payment_currency: var("PAYMENT_CURRENCY")
                .map(|c| c.to_ascii_lowercase())
                .unwrap_or(defaults.payment_currency),
            payment_gateway_timeout: parsed::<u64>(&var, "PAYMENT_GATEWAY_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.payment_gateway_timeout),
            stripe_secret_key: var("STRIPE_SECRET_KEY"),
            stripe_api_base: var("STRIPE_API_BASE").unwrap_or(defaults.stripe_api_base),
            reference_length: parsed(&var, "BOOKING_REFERENCE_LENGTH")?
                .unwrap_or(defaults.reference_length),
            reference_attempts: parsed(&var, "BOOKING_REFERENCE_ATTEMPTS")?
                .unwrap_or(defaults.reference_attempts),
            command_retry_attempts: parsed(&var, "COMMAND_RETRY_ATTEMPTS")?
                .unwrap_or(defaults.command_retry_attempts),
            notification_channel,
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn booking_config(&self) -> BookingConfig {
        BookingConfig {
            payment_link_base_url: self.payment_link_base_url.clone(),
            notification_channel: self.notification_channel,
            reference_attempts: self.reference_attempts,
            command_retry_attempts: self.command_retry_attempts,
        }
    }

    pub fn payment_config(&self) -> PaymentConfig {
        PaymentConfig {
            currency: self.payment_currency.clone(),
            gateway_timeout: self.payment_gateway_timeout,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let booking = BookingConfig::default();
        let payment = PaymentConfig::default();
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            database_url: None,
            payment_link_base_url: booking.payment_link_base_url,
            payment_currency: payment.currency,
            payment_gateway_timeout: payment.gateway_timeout,
            stripe_secret_key: None,
            stripe_api_base: "https://api.stripe.com".to_string(),
            reference_length: domain::reference::DEFAULT_REFERENCE_LENGTH,
            reference_attempts: booking.reference_attempts,
            command_retry_attempts: booking.command_retry_attempts,
            notification_channel: booking.notification_channel,
        }
    }
}

fn invalid(name: &'static str, value: String, reason: impl Into<String>) -> ConfigError {
    ConfigError {
        name,
        value,
        reason: reason.into(),
    }
}

fn parsed<T>(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    var(name)
        .map(|v| {
            v.trim()
                .parse()
                .map_err(|e: T::Err| invalid(name, v.clone(), e.to_string()))
        })
        .transpose()
}
