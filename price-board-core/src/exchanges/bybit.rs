//! Bybit v5 linear tickers

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use super::connector::{apply_conversion, PriceSource, RestClient};
use super::errors::{parse_number, SourceError, SourceResult};
use super::types::{SourceId, SourceKind, SourceTick, Symbol};
use super::SourceEndpoint;
use crate::market_data::SymbolMapper;

pub const DEFAULT_BASE_URL: &str = "https://api.bybit.com";

#[derive(Deserialize, Debug, Clone)]
pub struct BybitResponse {
    #[serde(rename = "retCode")]
    pub ret_code: Option<i64>,
    #[serde(rename = "retMsg")]
    pub ret_msg: Option<String>,
    pub result: Option<BybitResult>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct BybitResult {
    #[serde(default)]
    pub list: Vec<BybitTicker>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct BybitTicker {
    pub symbol: Option<String>,
    #[serde(rename = "lastPrice")]
    pub last_price: Option<String>,
    #[serde(rename = "volume24h")]
    pub volume_24h: Option<String>,
}

pub struct BybitSource {
    endpoint: SourceEndpoint,
    client: RestClient,
    mapper: Arc<SymbolMapper>,
}

impl BybitSource {
    pub fn new(endpoint: SourceEndpoint, client: RestClient, mapper: Arc<SymbolMapper>) -> Self {
        Self { endpoint, client, mapper }
    }

    pub fn parse_ticker(response: &BybitResponse) -> SourceResult<(f64, Option<f64>)> {
        if let Some(code) = response.ret_code {
            if code != 0 {
                return Err(SourceError::NotListed(
                    response.ret_msg.clone().unwrap_or_else(|| format!("retCode {}", code)),
                ));
            }
        }

        let result = response.result.as_ref().ok_or(SourceError::MissingField("result"))?;
        let ticker = result
            .list
            .first()
            .ok_or(SourceError::MissingField("result.list[0]"))?;
        let last = ticker
            .last_price
            .as_deref()
            .ok_or(SourceError::MissingField("result.list[0].lastPrice"))?;
        let price = parse_number("result.list[0].lastPrice", last)?;
        let volume = ticker
            .volume_24h
            .as_deref()
            .and_then(|v| parse_number("result.list[0].volume24h", v).ok());

        Ok((price, volume))
    }
}

#[async_trait]
impl PriceSource for BybitSource {
    fn id(&self) -> &SourceId {
        &self.endpoint.id
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Bybit
    }

    async fn fetch(&self, symbol: &Symbol) -> SourceResult<SourceTick> {
        let market = self.mapper.to_exchange(symbol, SourceKind::Bybit);
        let url = format!("{}/v5/market/tickers", self.endpoint.base_url);
        let query = [("category", "linear".to_string()), ("symbol", market)];

        let response: BybitResponse = self.client.get_json(&url, &query).await?;
        let (raw, volume) = Self::parse_ticker(&response)?;
        let (price, currency) = apply_conversion(raw, self.endpoint.conversion);

        Ok(SourceTick { price, volume, currency })
    }
}
