//! Upbit REST ticker

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use super::connector::{apply_conversion, PriceSource, RestClient};
use super::errors::{SourceError, SourceResult};
use super::types::{SourceId, SourceKind, SourceTick, Symbol};
use super::SourceEndpoint;
use crate::market_data::SymbolMapper;

pub const DEFAULT_BASE_URL: &str = "https://api.upbit.com";

/// Element of the `/v1/ticker` response array
#[derive(Deserialize, Debug, Clone)]
pub struct UpbitTicker {
    pub market: Option<String>,
    pub trade_price: Option<f64>,
    pub acc_trade_volume_24h: Option<f64>,
}

pub struct UpbitSource {
    endpoint: SourceEndpoint,
    client: RestClient,
    mapper: Arc<SymbolMapper>,
}

impl UpbitSource {
    pub fn new(endpoint: SourceEndpoint, client: RestClient, mapper: Arc<SymbolMapper>) -> Self {
        Self { endpoint, client, mapper }
    }

    /// `[ { "market": "KRW-BTC", "trade_price": 95000000.0, ... } ]`
    pub fn parse_ticker(tickers: &[UpbitTicker]) -> SourceResult<(f64, Option<f64>)> {
        let first = tickers
            .first()
            .ok_or_else(|| SourceError::NotListed("empty ticker array".to_string()))?;
        let price = first.trade_price.ok_or(SourceError::MissingField("trade_price"))?;
        Ok((price, first.acc_trade_volume_24h))
    }
}

#[async_trait]
impl PriceSource for UpbitSource {
    fn id(&self) -> &SourceId {
        &self.endpoint.id
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Upbit
    }

    async fn fetch(&self, symbol: &Symbol) -> SourceResult<SourceTick> {
        let market = self.mapper.to_exchange(symbol, SourceKind::Upbit);
        let url = format!("{}/v1/ticker", self.endpoint.base_url);

        let tickers: Vec<UpbitTicker> = self.client.get_json(&url, &[("markets", market)]).await?;
        let (raw, volume) = Self::parse_ticker(&tickers)?;
        let (price, currency) = apply_conversion(raw, self.endpoint.conversion);

        Ok(SourceTick { price, volume, currency })
    }
}
