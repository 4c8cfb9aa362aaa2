use std::env;

use crate::error::AppError;

const MAX_DIRECTIONS_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub event_buffer_size: usize,
    pub osrm_base_url: Option<String>,
    pub directions_timeout_ms: u64,
    pub stale_position_secs: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        let osrm_base_url = env::var("OSRM_BASE_URL").ok().filter(|url| !url.is_empty());

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            osrm_base_url,
            directions_timeout_ms: parse_or_default("DIRECTIONS_TIMEOUT_MS", 5_000)?
                .min(MAX_DIRECTIONS_TIMEOUT_MS),
            stale_position_secs: parse_or_default("STALE_POSITION_SECS", 120)?,
        })
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
