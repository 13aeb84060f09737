//! Exchange connectivity modules

pub mod binance;
pub mod bithumb;
pub mod bybit;
pub mod coinone;
pub mod connector;
pub mod errors;
pub mod types;
pub mod upbit;
pub mod upbit_websocket;

pub use connector::{apply_conversion, PriceSource, RestClient};
pub use errors::{ErrorKind, SourceError, SourceResult};
pub use types::{Currency, Quote, QuoteRow, SourceId, SourceKind, SourceTick, Symbol};
pub use upbit_websocket::{ConnectionStatus, StreamMetrics, TickerEvent, UpbitWebSocket, WebSocketConfig};

use std::sync::Arc;

use crate::config::SourceConfig;
use crate::market_data::SymbolMapper;

/// Where an adapter sends requests and how it converts the result
#[derive(Clone, Debug)]
pub struct SourceEndpoint {
    pub id: SourceId,
    pub base_url: String,
    pub conversion: Option<f64>,
}

impl SourceEndpoint {
    pub fn from_config(config: &SourceConfig, usdt_krw_rate: f64) -> Self {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| default_base_url(config.kind).to_string());

        Self {
            id: SourceId::new(config.name.clone()),
            base_url: base_url.trim_end_matches('/').to_string(),
            conversion: config.effective_conversion(usdt_krw_rate),
        }
    }
}

pub fn default_base_url(kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::Upbit => upbit::DEFAULT_BASE_URL,
        SourceKind::Bithumb => bithumb::DEFAULT_BASE_URL,
        SourceKind::Binance => binance::DEFAULT_BASE_URL,
        SourceKind::Bybit => bybit::DEFAULT_BASE_URL,
        SourceKind::Coinone => coinone::DEFAULT_BASE_URL,
    }
}

/// Build the adapter for a configured source
pub fn build_source(
    config: &SourceConfig,
    usdt_krw_rate: f64,
    client: RestClient,
    mapper: Arc<SymbolMapper>,
) -> Arc<dyn PriceSource> {
    let endpoint = SourceEndpoint::from_config(config, usdt_krw_rate);

    match config.kind {
        SourceKind::Upbit => Arc::new(upbit::UpbitSource::new(endpoint, client, mapper)),
        SourceKind::Bithumb => Arc::new(bithumb::BithumbSource::new(endpoint, client, mapper)),
        SourceKind::Binance => Arc::new(binance::BinanceSource::new(endpoint, client, mapper)),
        SourceKind::Bybit => Arc::new(bybit::BybitSource::new(endpoint, client, mapper)),
        SourceKind::Coinone => Arc::new(coinone::CoinoneSource::new(endpoint, client, mapper)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_endpoint_from_config() {
        let mut config = SourceConfig::new("바이낸스", SourceKind::Binance);
        let endpoint = SourceEndpoint::from_config(&config, 1350.0);
        assert_eq!(endpoint.base_url, "https://api.binance.com");
        assert_eq!(endpoint.conversion, Some(1350.0));

        config.base_url = Some("http://localhost:9000/".to_string());
        config.conversion = Some(1.0);
        let endpoint = SourceEndpoint::from_config(&config, 1350.0);
        assert_eq!(endpoint.base_url, "http://localhost:9000");
        assert_eq!(endpoint.conversion, Some(1.0));
    }

    #[test]
    fn test_build_source_keeps_identity() {
        let client = RestClient::new(Duration::from_secs(1)).unwrap();
        let mapper = Arc::new(SymbolMapper::new());

        let source = build_source(&SourceConfig::new("코인원", SourceKind::Coinone), 1350.0, client, mapper);
        assert_eq!(source.id().as_str(), "코인원");
        assert_eq!(source.kind(), SourceKind::Coinone);
    }
}
