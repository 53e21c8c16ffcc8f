use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveTime;
use dotenvy::dotenv;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,

    // Rate limiting
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    // Leave policy
    pub monthly_leave_unit: f64,
    pub comp_off_full_day_hours: f64,
    pub comp_off_half_day_hours: f64,

    /// Minutes east of UTC that define the business day.
    pub business_utc_offset_minutes: i32,
    pub absence_sweep_at: NaiveTime,
    pub absence_sweep_enabled: bool,
    pub directory_cache_ttl: Duration,
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn parsed<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse()
        .with_context(|| format!("{key} has an invalid value `{raw}`"))
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let sweep_at = env::var("ABSENCE_SWEEP_AT").unwrap_or_else(|_| "00:30".to_string());
        let absence_sweep_at = NaiveTime::parse_from_str(sweep_at.trim(), "%H:%M")
            .with_context(|| format!("ABSENCE_SWEEP_AT has an invalid value `{sweep_at}`"))?;

        let config = Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,

            rate_protected_per_min: parsed("RATE_PROTECTED_PER_MIN", "1000")?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            monthly_leave_unit: parsed("MONTHLY_LEAVE_UNIT", "1.0")?,
            comp_off_full_day_hours: parsed("COMP_OFF_FULL_DAY_HOURS", "8")?,
            comp_off_half_day_hours: parsed("COMP_OFF_HALF_DAY_HOURS", "4")?,

            business_utc_offset_minutes: parsed("BUSINESS_UTC_OFFSET_MINUTES", "0")?,
            absence_sweep_at,
            absence_sweep_enabled: parsed("ABSENCE_SWEEP_ENABLED", "true")?,
            directory_cache_ttl: Duration::from_secs(parsed("DIRECTORY_CACHE_TTL_SECS", "300")?),
        };

        if config.monthly_leave_unit < 0.0 {
            anyhow::bail!("MONTHLY_LEAVE_UNIT cannot be negative");
        }
        if config.comp_off_half_day_hours > config.comp_off_full_day_hours {
            anyhow::bail!("COMP_OFF_HALF_DAY_HOURS cannot exceed COMP_OFF_FULL_DAY_HOURS");
        }
        Ok(config)
    }
}
