//! Bithumb public ticker

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use super::connector::{apply_conversion, PriceSource, RestClient};
use super::errors::{parse_number, SourceError, SourceResult};
use super::types::{SourceId, SourceKind, SourceTick, Symbol};
use super::SourceEndpoint;
use crate::market_data::SymbolMapper;

pub const DEFAULT_BASE_URL: &str = "https://api.bithumb.com";

/// Bithumb wraps every payload in `{ "status": "0000", "data": { ... } }`
#[derive(Deserialize, Debug, Clone)]
pub struct BithumbResponse {
    pub status: Option<String>,
    pub message: Option<String>,
    pub data: Option<BithumbTicker>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct BithumbTicker {
    pub closing_price: Option<String>,
    #[serde(rename = "acc_trade_value_24H")]
    pub acc_trade_value_24h: Option<String>,
}

pub struct BithumbSource {
    endpoint: SourceEndpoint,
    client: RestClient,
    mapper: Arc<SymbolMapper>,
}

impl BithumbSource {
    pub fn new(endpoint: SourceEndpoint, client: RestClient, mapper: Arc<SymbolMapper>) -> Self {
        Self { endpoint, client, mapper }
    }

    pub fn parse_ticker(response: &BithumbResponse) -> SourceResult<(f64, Option<f64>)> {
        if let Some(status) = response.status.as_deref() {
            if status != "0000" {
                return Err(SourceError::NotListed(
                    response.message.clone().unwrap_or_else(|| format!("status {}", status)),
                ));
            }
        }

        let data = response.data.as_ref().ok_or(SourceError::MissingField("data"))?;
        let closing = data
            .closing_price
            .as_deref()
            .ok_or(SourceError::MissingField("data.closing_price"))?;
        let price = parse_number("data.closing_price", closing)?;

        // Volume is informational; a garbled value should not cost us the price
        let volume = data
            .acc_trade_value_24h
            .as_deref()
            .and_then(|v| parse_number("data.acc_trade_value_24H", v).ok());

        Ok((price, volume))
    }
}

#[async_trait]
impl PriceSource for BithumbSource {
    fn id(&self) -> &SourceId {
        &self.endpoint.id
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Bithumb
    }

    async fn fetch(&self, symbol: &Symbol) -> SourceResult<SourceTick> {
        let market = self.mapper.to_exchange(symbol, SourceKind::Bithumb);
        let url = format!("{}/public/ticker/{}", self.endpoint.base_url, market);

        let response: BithumbResponse = self.client.get_json(&url, &[]).await?;
        let (raw, volume) = Self::parse_ticker(&response)?;
        let (price, currency) = apply_conversion(raw, self.endpoint.conversion);

        Ok(SourceTick { price, volume, currency })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bithumb_ticker() {
        let json = r#"{"status":"0000","data":{"opening_price":"94000000","closing_price":"95010000","acc_trade_value_24H":"123456789.5"}}"#;
        let response: BithumbResponse = serde_json::from_str(json).unwrap();

        let (price, volume) = BithumbSource::parse_ticker(&response).unwrap();
        assert_eq!(price, 95010000.0);
        assert_eq!(volume, Some(123456789.5));
    }

    #[test]
    fn test_parse_bithumb_error_status() {
        let json = r#"{"status":"5500","message":"Invalid Parameter"}"#;
        let response: BithumbResponse = serde_json::from_str(json).unwrap();

        let err = BithumbSource::parse_ticker(&response).unwrap_err();
        assert!(matches!(err, SourceError::NotListed(ref m) if m == "Invalid Parameter"));
    }

    #[test]
    fn test_parse_bithumb_bad_number() {
        let json = r#"{"status":"0000","data":{"closing_price":"n/a"}}"#;
        let response: BithumbResponse = serde_json::from_str(json).unwrap();

        assert!(matches!(
            BithumbSource::parse_ticker(&response),
            Err(SourceError::InvalidNumber { field: "data.closing_price", .. })
        ));
    }
}
