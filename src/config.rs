use std::env;
use std::time::Duration;

use crate::engine::ranking::TOP_N;
use crate::engine::scoring::{ScoringPolicy, Weights};
use crate::error::AppError;
use crate::models::notification::DEFAULT_TTL_DAYS;

pub const MAX_NOTIFICATION_WORKERS: usize = 1024;
pub const MAX_NOTIFICATION_TTL_DAYS: i64 = 3650;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub top_n: usize,
    pub directory_timeout_ms: u64,
    pub notification_queue_size: usize,
    pub notification_workers: usize,
    pub notification_delivery_timeout_ms: u64,
    pub notification_ttl_days: i64,
    pub expiry_sweep_secs: u64,
    pub event_buffer_size: usize,
    pub scoring: ScoringPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Compact,
            top_n: TOP_N,
            directory_timeout_ms: 3_000,
            notification_queue_size: 1024,
            notification_workers: 8,
            notification_delivery_timeout_ms: 5_000,
            notification_ttl_days: DEFAULT_TTL_DAYS,
            expiry_sweep_secs: 3_600,
            event_buffer_size: 1024,
            scoring: ScoringPolicy::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();
        let weights = defaults.scoring.weights;

        let config = Self {
            http_port: parse_or_default("HTTP_PORT", defaults.http_port)?,
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_format: match env::var("LOG_FORMAT").as_deref() {
                Ok("json") => LogFormat::Json,
                _ => LogFormat::Compact,
            },
            top_n: parse_or_default("TOP_N", defaults.top_n)?,
            directory_timeout_ms: parse_or_default(
                "DIRECTORY_TIMEOUT_MS",
                defaults.directory_timeout_ms,
            )?,
            notification_queue_size: parse_or_default(
                "NOTIFICATION_QUEUE_SIZE",
                defaults.notification_queue_size,
            )?,
            notification_workers: parse_or_default(
                "NOTIFICATION_WORKERS",
                defaults.notification_workers,
            )?,
            notification_delivery_timeout_ms: parse_or_default(
                "NOTIFICATION_DELIVERY_TIMEOUT_MS",
                defaults.notification_delivery_timeout_ms,
            )?,
            notification_ttl_days: parse_or_default(
                "NOTIFICATION_TTL_DAYS",
                defaults.notification_ttl_days,
            )?,
            expiry_sweep_secs: parse_or_default("EXPIRY_SWEEP_SECS", defaults.expiry_sweep_secs)?,
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", defaults.event_buffer_size)?,
            scoring: ScoringPolicy {
                weights: Weights {
                    skill: parse_or_default("SCORE_WEIGHT_SKILL", weights.skill)?,
                    price: parse_or_default("SCORE_WEIGHT_PRICE", weights.price)?,
                    speed: parse_or_default("SCORE_WEIGHT_SPEED", weights.speed)?,
                    distance: parse_or_default("SCORE_WEIGHT_DISTANCE", weights.distance)?,
                },
                ..defaults.scoring
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        let w = &self.scoring.weights;
        if [w.skill, w.price, w.speed, w.distance]
            .iter()
            .any(|weight| !weight.is_finite() || *weight < 0.0)
        {
            return Err(AppError::Internal(
                "score weights must be finite and >= 0".to_string(),
            ));
        }
        if !(1..=MAX_NOTIFICATION_TTL_DAYS).contains(&self.notification_ttl_days) {
            return Err(AppError::Internal(format!(
                "NOTIFICATION_TTL_DAYS must be between 1 and {MAX_NOTIFICATION_TTL_DAYS}"
            )));
        }
        if !(1..=MAX_NOTIFICATION_WORKERS).contains(&self.notification_workers) {
            return Err(AppError::Internal(format!(
                "NOTIFICATION_WORKERS must be between 1 and {MAX_NOTIFICATION_WORKERS}"
            )));
        }
        Ok(())
    }

    pub fn directory_timeout(&self) -> Duration {
        Duration::from_millis(self.directory_timeout_ms)
    }

    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_millis(self.notification_delivery_timeout_ms)
    }

    pub fn notification_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.notification_ttl_days)
    }

    pub fn expiry_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.expiry_sweep_secs)
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
