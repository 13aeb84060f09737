//! Board configuration
//!
//! Defaults reproduce the board's built-in constants; a TOML file may
//! override any part of them. Everything is validated up front so that a
//! bad symbol list or conversion rate stops the process at startup
//! instead of quietly rendering a board full of `N/A`.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::exchanges::{SourceKind, Symbol};

/// Allowed range for the board refresh interval, in seconds
pub const RENDER_INTERVAL_RANGE: std::ops::RangeInclusive<u64> = 5..=60;

const PLACEHOLDER_MARKERS: &[&str] = &["CHANGE_ME", "YOUR_", "<placeholder>"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("No symbols configured for {0}")]
    EmptySymbols(&'static str),

    #[error("Invalid symbol: {0:?}")]
    InvalidSymbol(String),

    #[error("Symbol configured twice: {0}")]
    DuplicateSymbol(String),

    #[error("Source name must not be empty")]
    EmptySourceName,

    #[error("Source configured twice: {0}")]
    DuplicateSource(String),

    #[error("Invalid conversion rate for {name}: {value}")]
    InvalidRate { name: String, value: f64 },

    #[error("Invalid URL for {name}: {url}")]
    InvalidUrl { name: String, url: String },

    #[error("Placeholder value left in {0}")]
    Placeholder(String),

    #[error("Interval {field} must be greater than zero")]
    ZeroInterval { field: String },

    #[error("Render interval {0}s is outside the allowed range 5..=60")]
    RenderIntervalOutOfRange(u64),
}

/// A symbol on the board and how it is labelled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolConfig {
    pub symbol: Symbol,
    /// Row label; falls back to the ticker
    pub name: Option<String>,
    /// Quantity held, recorded alongside streamed prices
    pub holdings: Option<f64>,
}

impl SymbolConfig {
    pub fn new(symbol: &str, name: &str) -> Self {
        Self {
            symbol: Symbol::new(symbol),
            name: Some(name.to_string()),
            holdings: None,
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.symbol.as_str())
    }
}

/// One REST price source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub kind: SourceKind,
    /// Overrides the exchange's public API host
    pub base_url: Option<String>,
    /// Fixed multiplier into the display currency; USDT exchanges default to `usdt_krw_rate`
    pub conversion: Option<f64>,
}

impl SourceConfig {
    pub fn new(name: &str, kind: SourceKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            base_url: None,
            conversion: None,
        }
    }

    pub fn effective_conversion(&self, usdt_krw_rate: f64) -> Option<f64> {
        self.conversion
            .or_else(|| self.kind.quotes_in_usdt().then_some(usdt_krw_rate))
    }
}

/// Push subscription feeding the streaming table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PushSourceConfig {
    pub name: String,
    pub url: String,
    /// Upbit stream type (`ticker` or `trade`)
    pub stream_type: String,
    pub max_reconnect_attempts: u32,
    pub reconnect_interval_secs: u64,
    pub message_timeout_secs: u64,
}

impl Default for PushSourceConfig {
    fn default() -> Self {
        Self {
            name: "업비트".to_string(),
            url: "wss://api.upbit.com/websocket/v1".to_string(),
            stream_type: "ticker".to_string(),
            max_reconnect_attempts: 10,
            reconnect_interval_secs: 5,
            message_timeout_secs: 60,
        }
    }
}

/// REST source polled on its own interval in streaming mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollerConfig {
    #[serde(flatten)]
    pub source: SourceConfig,
    pub interval_secs: u64,
}

/// Streaming collector and persisted table settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub symbols: Vec<SymbolConfig>,
    pub push_source: Option<PushSourceConfig>,
    pub pollers: Vec<PollerConfig>,
    pub table_path: PathBuf,
    /// How often `watch` re-reads the table
    pub refresh_interval_secs: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            symbols: vec![
                SymbolConfig::new("BTC", "비트코인"),
                SymbolConfig::new("ETH", "이더리움"),
                SymbolConfig::new("XRP", "리플"),
                SymbolConfig::new("SOL", "솔라나"),
                SymbolConfig::new("DOGE", "도지코인"),
            ],
            push_source: Some(PushSourceConfig::default()),
            pollers: vec![
                PollerConfig {
                    source: SourceConfig::new("빗썸", SourceKind::Bithumb),
                    interval_secs: 10,
                },
                PollerConfig {
                    source: SourceConfig::new("코인원", SourceKind::Coinone),
                    interval_secs: 10,
                },
            ],
            table_path: PathBuf::from("btc_prices.json"),
            refresh_interval_secs: 5,
        }
    }
}

impl StreamConfig {
    /// Source names in column order: push source first, then pollers
    pub fn source_names(&self) -> Vec<String> {
        self.push_source
            .iter()
            .map(|p| p.name.clone())
            .chain(self.pollers.iter().map(|p| p.source.name.clone()))
            .collect()
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Prefix for every rendered price
    pub currency_symbol: String,
    /// Static USDT to KRW conversion rate
    pub usdt_krw_rate: f64,
    pub request_timeout_secs: u64,
    pub render_interval_secs: u64,
    pub symbols: Vec<SymbolConfig>,
    pub sources: Vec<SourceConfig>,
    pub stream: StreamConfig,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            currency_symbol: "₩".to_string(),
            usdt_krw_rate: 1350.0,
            request_timeout_secs: 5,
            render_interval_secs: 15,
            symbols: vec![
                SymbolConfig::new("BTC", "비트코인"),
                SymbolConfig::new("ETH", "이더리움"),
                SymbolConfig::new("XRP", "리플"),
                SymbolConfig::new("ADA", "에이다"),
                SymbolConfig::new("DOGE", "도지코인"),
            ],
            sources: vec![
                SourceConfig::new("업비트", SourceKind::Upbit),
                SourceConfig::new("빗썸", SourceKind::Bithumb),
                SourceConfig::new("바이낸스", SourceKind::Binance),
                SourceConfig::new("바이비트", SourceKind::Bybit),
            ],
            stream: StreamConfig::default(),
        }
    }
}

impl BoardConfig {
    /// Load a TOML file and validate it
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text).map_err(|e| match e {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })?;
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: BoardConfig = toml::from_str(text).map_err(|e| ConfigError::Parse {
            path: PathBuf::new(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn render_interval(&self) -> Duration {
        Duration::from_secs(self.render_interval_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.stream.refresh_interval_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_placeholder("currency_symbol", &self.currency_symbol)?;

        if !(self.usdt_krw_rate.is_finite() && self.usdt_krw_rate > 0.0) {
            return Err(ConfigError::InvalidRate {
                name: "usdt_krw_rate".to_string(),
                value: self.usdt_krw_rate,
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroInterval {
                field: "request_timeout_secs".to_string(),
            });
        }
        if !RENDER_INTERVAL_RANGE.contains(&self.render_interval_secs) {
            return Err(ConfigError::RenderIntervalOutOfRange(self.render_interval_secs));
        }

        validate_symbols("symbols", &self.symbols)?;
        validate_sources(self.sources.iter())?;

        let stream = &self.stream;
        validate_symbols("stream.symbols", &stream.symbols)?;
        validate_sources(stream.pollers.iter().map(|p| &p.source))?;
        for poller in &stream.pollers {
            if poller.interval_secs == 0 {
                return Err(ConfigError::ZeroInterval {
                    field: format!("stream.pollers.{}.interval_secs", poller.source.name),
                });
            }
        }
        if stream.refresh_interval_secs == 0 {
            return Err(ConfigError::ZeroInterval {
                field: "stream.refresh_interval_secs".to_string(),
            });
        }

        if let Some(push) = &stream.push_source {
            check_placeholder(&push.name, &push.url)?;
            if push.name.trim().is_empty() {
                return Err(ConfigError::EmptySourceName);
            }
            if stream.pollers.iter().any(|p| p.source.name == push.name) {
                return Err(ConfigError::DuplicateSource(push.name.clone()));
            }
            check_url(&push.name, &push.url, &["ws", "wss"])?;
            if push.reconnect_interval_secs == 0 || push.message_timeout_secs == 0 {
                return Err(ConfigError::ZeroInterval {
                    field: format!("stream.push_source.{}", push.name),
                });
            }
        }

        Ok(())
    }
}

fn validate_symbols(section: &'static str, symbols: &[SymbolConfig]) -> Result<(), ConfigError> {
    if symbols.is_empty() {
        return Err(ConfigError::EmptySymbols(section));
    }

    let mut seen = HashSet::new();
    for entry in symbols {
        check_placeholder(section, entry.symbol.as_str())?;
        if !entry.symbol.validate() {
            return Err(ConfigError::InvalidSymbol(entry.symbol.0.clone()));
        }
        if !seen.insert(entry.symbol.clone()) {
            return Err(ConfigError::DuplicateSymbol(entry.symbol.0.clone()));
        }
    }
    Ok(())
}

fn validate_sources<'a>(sources: impl Iterator<Item = &'a SourceConfig>) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for source in sources {
        if source.name.trim().is_empty() {
            return Err(ConfigError::EmptySourceName);
        }
        if !seen.insert(source.name.clone()) {
            return Err(ConfigError::DuplicateSource(source.name.clone()));
        }
        if let Some(rate) = source.conversion {
            if !(rate.is_finite() && rate > 0.0) {
                return Err(ConfigError::InvalidRate {
                    name: source.name.clone(),
                    value: rate,
                });
            }
        }
        if let Some(url) = &source.base_url {
            check_placeholder(&source.name, url)?;
            check_url(&source.name, url, &["http", "https"])?;
        }
    }
    Ok(())
}

fn check_url(name: &str, raw: &str, schemes: &[&str]) -> Result<(), ConfigError> {
    let parsed = url::Url::parse(raw).map_err(|_| ConfigError::InvalidUrl {
        name: name.to_string(),
        url: raw.to_string(),
    })?;
    if !schemes.contains(&parsed.scheme()) {
        return Err(ConfigError::InvalidUrl {
            name: name.to_string(),
            url: raw.to_string(),
        });
    }
    Ok(())
}

fn check_placeholder(field: &str, value: &str) -> Result<(), ConfigError> {
    if PLACEHOLDER_MARKERS.iter().any(|m| value.contains(m)) {
        return Err(ConfigError::Placeholder(field.to_string()));
    }
    Ok(())
}
