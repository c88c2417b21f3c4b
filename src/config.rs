use crate::network::application::headlines::CredentialPlacement;
use crate::network::application::http::Timeouts;
use crate::network::buffer::truncate_str;
use crate::network::tls::TlsPolicy;
use heapless::String;
use serde::Deserialize;

/// Settings for every client, loadable from one JSON document.
///
/// Every field has a default, so a document only needs the keys it changes:
///
/// ```
/// use libcloudlink::config::Config;
///
/// let config = Config::from_json(r#"{"news":{"api_key":"abc"},"ntp":{"timeout_ms":2000}}"#).unwrap();
/// assert_eq!(config.news.api_key.as_str(), "abc");
/// assert_eq!(config.news.host.as_str(), "newsapi.org");
/// assert_eq!(config.ntp.timeout_ms, 2000);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub news: NewsConfig,
    pub telegram: TelegramConfig,
    pub weather: WeatherConfig,
    pub ntp: NtpConfig,
    pub tls: TlsPolicy,
    pub timeouts: Timeouts,
}

impl Config {
    /// Parse a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        if json.trim().is_empty() {
            return Err(ConfigError::Empty);
        }
        let (config, _) = serde_json_core::from_str(json).map_err(|_| ConfigError::Malformed)?;
        Ok(config)
    }
}

/// Why a configuration document was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The document was blank.
    Empty,
    /// Bad JSON, a wrong value type, or a string longer than its field allows.
    Malformed,
}

#[cfg(feature = "defmt")]
impl defmt::Format for ConfigError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            ConfigError::Empty => defmt::write!(f, "Empty"),
            ConfigError::Malformed => defmt::write!(f, "Malformed"),
        }
    }
}

/// Headline service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct NewsConfig {
    pub host: String<64>,
    pub port: u16,
    /// Use the secure channel instead of plain HTTP.
    pub secure: bool,
    pub api_key: String<64>,
    /// Articles requested per fetch.
    pub page_size: u8,
    pub credentials: CredentialPlacement,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            host: truncate_str("newsapi.org"),
            port: 80,
            secure: false,
            api_key: String::new(),
            page_size: 10,
            credentials: CredentialPlacement::Query,
        }
    }
}

/// Message bot service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub host: String<64>,
    pub port: u16,
    pub bot_token: String<128>,
    /// Long-poll wait the server is asked to hold, in seconds.
    pub poll_timeout_s: u16,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            host: truncate_str("api.telegram.org"),
            port: 443,
            bot_token: String::new(),
            poll_timeout_s: 5,
        }
    }
}

/// Forecast and map tile services.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub host: String<64>,
    pub map_host: String<64>,
    pub port: u16,
    pub api_key: String<64>,
    /// `metric`, `imperial` or `standard`.
    pub units: String<16>,
    /// Forecast entries requested per fetch.
    pub forecast_count: u8,
    pub map_layer: String<32>,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            host: truncate_str("api.openweathermap.org"),
            map_host: truncate_str("tile.openweathermap.org"),
            port: 443,
            api_key: String::new(),
            units: truncate_str("metric"),
            forecast_count: 16,
            map_layer: truncate_str("temp_new"),
        }
    }
}

/// Time server.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct NtpConfig {
    pub server: String<64>,
    pub port: u16,
    /// How long to wait for the reply. `0` waits forever.
    pub timeout_ms: u32,
}

impl Default for NtpConfig {
    fn default() -> Self {
        Self {
            server: truncate_str("pool.ntp.org"),
            port: 123,
            timeout_ms: 5_000,
        }
    }
}
