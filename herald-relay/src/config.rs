//! Relay configuration
//!
//! Defines all configurable parameters for the relay: credentials, remote
//! endpoints, the long polling read timeout and the recovery pause.

use anyhow::Context;
use herald_client::{DEFAULT_API_URL, DEFAULT_SEND_TIMEOUT};
use herald_core::message::DEFAULT_SITE_URL;
use std::time::Duration;
use url::Url;

/// Default long polling endpoint
pub const DEFAULT_POLL_URL: &str = "https://dvmn.org/api/long_polling/";

/// Relay configuration
#[derive(Clone)]
pub struct Config {
    /// Telegram bot token
    pub bot_token: String,

    /// Chat that receives notifications and forwarded logs
    pub chat_id: String,

    /// Value of the `Authorization` header for the review API
    pub dvmn_token: String,

    /// Long polling endpoint
    pub poll_url: String,

    /// Site origin lesson paths are resolved against
    pub site_url: Url,

    /// Telegram Bot API origin
    pub telegram_api_url: String,

    /// How long a single long polling request may wait for an answer
    pub read_timeout: Duration,

    /// How long a single Telegram call may take
    pub send_timeout: Duration,

    /// Pause after a failed request before polling again
    pub retry_delay: Duration,

    /// How often buffered log entries are forwarded to the chat
    pub log_send_interval: Duration,

    /// Whether important log events are forwarded to the chat
    pub chat_logs: bool,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(bot_token: String, chat_id: String, dvmn_token: String) -> Self {
        Self {
            bot_token,
            chat_id,
            dvmn_token,
            poll_url: DEFAULT_POLL_URL.to_string(),
            site_url: Url::parse(DEFAULT_SITE_URL).expect("default site url is valid"),
            telegram_api_url: DEFAULT_API_URL.to_string(),
            read_timeout: Duration::from_secs(91),
            send_timeout: DEFAULT_SEND_TIMEOUT,
            retry_delay: Duration::from_secs(3),
            log_send_interval: Duration::from_secs(2),
            chat_logs: true,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// A `.env` file in the working directory is loaded first, if present.
    ///
    /// Expected environment variables:
    /// - TG_BOT_TOKEN (required)
    /// - TG_CHAT_ID (required)
    /// - DVMN_API_TOKEN (required)
    /// - DVMN_LONG_POLLING_URL (optional, default: https://dvmn.org/api/long_polling/)
    /// - DVMN_URL (optional, default: https://dvmn.org/)
    /// - TELEGRAM_API_URL (optional, default: https://api.telegram.org)
    /// - READ_TIMEOUT (optional, seconds, default: 91)
    /// - SEND_TIMEOUT (optional, seconds, default: 30)
    /// - RETRY_DELAY (optional, seconds, default: 3)
    /// - LOG_SEND_INTERVAL (optional, seconds, default: 2)
    /// - CHAT_LOGS (optional, true/false, default: true)
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates configuration from an arbitrary variable source
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| anyhow::anyhow!("{} environment variable not set", key))
        };
        let seconds = |key: &str, default: u64| -> anyhow::Result<Duration> {
            match lookup(key) {
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .with_context(|| format!("{} must be a number of seconds, got {:?}", key, raw)),
                None => Ok(Duration::from_secs(default)),
            }
        };

        let mut config = Self::new(
            required("TG_BOT_TOKEN")?,
            required("TG_CHAT_ID")?,
            required("DVMN_API_TOKEN")?,
        );

        if let Some(poll_url) = lookup("DVMN_LONG_POLLING_URL") {
            config.poll_url = poll_url;
        }

        if let Some(site_url) = lookup("DVMN_URL") {
            config.site_url = Url::parse(&site_url)
                .with_context(|| format!("DVMN_URL is not a valid URL: {}", site_url))?;
        }

        if let Some(api_url) = lookup("TELEGRAM_API_URL") {
            config.telegram_api_url = api_url;
        }

        config.read_timeout = seconds("READ_TIMEOUT", 91)?;
        config.send_timeout = seconds("SEND_TIMEOUT", DEFAULT_SEND_TIMEOUT.as_secs())?;
        config.retry_delay = seconds("RETRY_DELAY", 3)?;
        config.log_send_interval = seconds("LOG_SEND_INTERVAL", 2)?;

        if let Some(flag) = lookup("CHAT_LOGS") {
            config.chat_logs = parse_flag(&flag)
                .with_context(|| format!("CHAT_LOGS must be true or false, got {:?}", flag))?;
        }

        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bot_token.trim().is_empty() {
            anyhow::bail!("bot_token cannot be empty");
        }

        if self.chat_id.trim().is_empty() {
            anyhow::bail!("chat_id cannot be empty");
        }

        if self.dvmn_token.trim().is_empty() {
            anyhow::bail!("dvmn_token cannot be empty");
        }

        for (name, value) in [
            ("poll_url", self.poll_url.as_str()),
            ("telegram_api_url", self.telegram_api_url.as_str()),
            ("site_url", self.site_url.as_str()),
        ] {
            if !value.starts_with("http://") && !value.starts_with("https://") {
                anyhow::bail!("{} must start with http:// or https://", name);
            }
        }

        if self.read_timeout.is_zero() {
            anyhow::bail!("read_timeout must be greater than 0");
        }

        if self.send_timeout.is_zero() {
            anyhow::bail!("send_timeout must be greater than 0");
        }

        if self.retry_delay.is_zero() {
            anyhow::bail!("retry_delay must be greater than 0");
        }

        if self.log_send_interval.is_zero() {
            anyhow::bail!("log_send_interval must be greater than 0");
        }

        Ok(())
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("chat_id", &self.chat_id)
            .field("poll_url", &self.poll_url)
            .field("site_url", &self.site_url.as_str())
            .field("telegram_api_url", &self.telegram_api_url)
            .field("read_timeout", &self.read_timeout)
            .field("send_timeout", &self.send_timeout)
            .field("retry_delay", &self.retry_delay)
            .field("log_send_interval", &self.log_send_interval)
            .field("chat_logs", &self.chat_logs)
            .finish_non_exhaustive()
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
