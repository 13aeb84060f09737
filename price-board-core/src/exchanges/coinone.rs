//! Coinone public ticker

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use super::connector::{apply_conversion, PriceSource, RestClient};
use super::errors::{parse_number, SourceError, SourceResult};
use super::types::{SourceId, SourceKind, SourceTick, Symbol};
use super::SourceEndpoint;
use crate::market_data::SymbolMapper;

pub const DEFAULT_BASE_URL: &str = "https://api.coinone.co.kr";

#[derive(Deserialize, Debug, Clone)]
pub struct CoinoneTicker {
    pub result: Option<String>,
    #[serde(rename = "errorCode")]
    pub error_code: Option<String>,
    pub last: Option<String>,
    pub volume: Option<String>,
}

pub struct CoinoneSource {
    endpoint: SourceEndpoint,
    client: RestClient,
    mapper: Arc<SymbolMapper>,
}

impl CoinoneSource {
    pub fn new(endpoint: SourceEndpoint, client: RestClient, mapper: Arc<SymbolMapper>) -> Self {
        Self { endpoint, client, mapper }
    }

    pub fn parse_ticker(ticker: &CoinoneTicker) -> SourceResult<(f64, Option<f64>)> {
        if ticker.result.as_deref() == Some("error") {
            return Err(SourceError::NotListed(format!(
                "errorCode {}",
                ticker.error_code.as_deref().unwrap_or("?")
            )));
        }

        let last = ticker.last.as_deref().ok_or(SourceError::MissingField("last"))?;
        let price = parse_number("last", last)?;
        let volume = ticker.volume.as_deref().and_then(|v| parse_number("volume", v).ok());

        Ok((price, volume))
    }
}

#[async_trait]
impl PriceSource for CoinoneSource {
    fn id(&self) -> &SourceId {
        &self.endpoint.id
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Coinone
    }

    async fn fetch(&self, symbol: &Symbol) -> SourceResult<SourceTick> {
        let currency_code = self.mapper.to_exchange(symbol, SourceKind::Coinone);
        let url = format!("{}/ticker", self.endpoint.base_url);

        let ticker: CoinoneTicker = self.client.get_json(&url, &[("currency", currency_code)]).await?;
        let (raw, volume) = Self::parse_ticker(&ticker)?;
        let (price, currency) = apply_conversion(raw, self.endpoint.conversion);

        Ok(SourceTick { price, volume, currency })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_coinone_ticker() {
        let json = r#"{"result":"success","errorCode":"0","currency":"btc","last":"95000000","volume":"152.33"}"#;
        let ticker: CoinoneTicker = serde_json::from_str(json).unwrap();

        let (price, volume) = CoinoneSource::parse_ticker(&ticker).unwrap();
        assert_eq!(price, 95000000.0);
        assert_eq!(volume, Some(152.33));
    }

    #[test]
    fn test_parse_coinone_error() {
        let json = r#"{"result":"error","errorCode":"405"}"#;
        let ticker: CoinoneTicker = serde_json::from_str(json).unwrap();

        assert!(matches!(CoinoneSource::parse_ticker(&ticker), Err(SourceError::NotListed(_))));
    }
}
