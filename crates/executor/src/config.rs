use std::env;

use anyhow::Context;

/// Process configuration, read once at startup from the environment
/// (`.env` supported via dotenvy).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub bot_token: String,
    pub chat_id: i64,
    /// Settings owner the scanner runs for.
    pub scan_user_id: String,
    pub scan_interval_secs: u64,
    pub cleanup_interval_secs: u64,
    /// Symbols processed per pass before the rotation cursor advances.
    pub scan_chunk_size: usize,
    pub candle_limit: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let bot_token =
            env::var("TELEGRAM_BOT_TOKEN").context("TELEGRAM_BOT_TOKEN not set in .env")?;
        let chat_id = env::var("TELEGRAM_CHAT_ID")
            .context("TELEGRAM_CHAT_ID not set in .env")?
            .parse::<i64>()
            .context("TELEGRAM_CHAT_ID must be a number")?;

        Ok(Self {
            database_path: env::var("DB_PATH").unwrap_or_else(|_| "signals.db".to_string()),
            bot_token,
            chat_id,
            scan_user_id: env::var("SCAN_USER_ID").unwrap_or_else(|_| "default".to_string()),
            scan_interval_secs: env_or("SCAN_INTERVAL_SECS", 300)?,
            cleanup_interval_secs: env_or("CLEANUP_INTERVAL_SECS", 3600)?,
            scan_chunk_size: env_or("SCAN_CHUNK_SIZE", 100)?,
            candle_limit: env_or("CANDLE_LIMIT", 220)?,
        })
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{} must be a number", key)),
        Err(_) => Ok(default),
    }
}
