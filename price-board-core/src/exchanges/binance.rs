//! Binance spot price ticker

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use super::connector::{apply_conversion, PriceSource, RestClient};
use super::errors::{parse_number, SourceError, SourceResult};
use super::types::{SourceId, SourceKind, SourceTick, Symbol};
use super::SourceEndpoint;
use crate::market_data::SymbolMapper;

pub const DEFAULT_BASE_URL: &str = "https://api.binance.com";

/// `/api/v3/ticker/price` response
#[derive(Deserialize, Debug, Clone)]
pub struct BinancePrice {
    pub symbol: Option<String>,
    pub price: Option<String>,
}

pub struct BinanceSource {
    endpoint: SourceEndpoint,
    client: RestClient,
    mapper: Arc<SymbolMapper>,
}

impl BinanceSource {
    pub fn new(endpoint: SourceEndpoint, client: RestClient, mapper: Arc<SymbolMapper>) -> Self {
        Self { endpoint, client, mapper }
    }

    pub fn parse_price(response: &BinancePrice) -> SourceResult<f64> {
        let price = response.price.as_deref().ok_or(SourceError::MissingField("price"))?;
        parse_number("price", price)
    }
}

#[async_trait]
impl PriceSource for BinanceSource {
    fn id(&self) -> &SourceId {
        &self.endpoint.id
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Binance
    }

    async fn fetch(&self, symbol: &Symbol) -> SourceResult<SourceTick> {
        let market = self.mapper.to_exchange(symbol, SourceKind::Binance);
        let url = format!("{}/api/v3/ticker/price", self.endpoint.base_url);

        let response: BinancePrice = self.client.get_json(&url, &[("symbol", market)]).await?;
        let raw = Self::parse_price(&response)?;
        let (price, currency) = apply_conversion(raw, self.endpoint.conversion);

        // This endpoint carries no volume
        Ok(SourceTick {
            price,
            volume: None,
            currency,
        })
    }
}
