//! Price source trait and the shared REST client behind every adapter

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use super::errors::{SourceError, SourceResult};
use super::types::{Currency, SourceId, SourceKind, SourceTick, Symbol};

/// A single exchange endpoint able to quote one symbol at a time
///
/// Implementations normalize their response shape into a [`SourceTick`]
/// and report every failure as a typed [`SourceError`]; turning that
/// error into an absent quote is the collector's job.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Configured display name of this source
    fn id(&self) -> &SourceId;

    /// Exchange this adapter talks to
    fn kind(&self) -> SourceKind;

    /// Fetch the latest price for `symbol`
    async fn fetch(&self, symbol: &Symbol) -> SourceResult<SourceTick>;
}

/// Thin wrapper over `reqwest::Client` with a bounded request timeout
#[derive(Clone, Debug)]
pub struct RestClient {
    client: Client,
}

impl RestClient {
    pub fn new(timeout: Duration) -> SourceResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    /// GET `url` and decode the body as JSON
    ///
    /// Non-2xx responses become [`SourceError::Status`] so an exchange's
    /// error payload is never mistaken for a quote.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> SourceResult<T> {
        debug!("GET {} {:?}", url, query);

        let response = self.client.get(url).query(query).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                body: truncate(&body, 200),
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

/// Multiply a raw price by the static conversion rate, if one is configured
pub fn apply_conversion(raw: f64, conversion: Option<f64>) -> (f64, Currency) {
    match conversion {
        Some(rate) => (raw * rate, Currency::Converted),
        None => (raw, Currency::Native),
    }
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_conversion() {
        assert_eq!(apply_conversion(2.0, None), (2.0, Currency::Native));
        assert_eq!(apply_conversion(2.0, Some(1350.0)), (2700.0, Currency::Converted));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("가나다라", 2), "가나...");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_source_unavailable() {
        let client = RestClient::new(Duration::from_secs(2)).unwrap();
        let result: SourceResult<serde_json::Value> = client.get_json("http://127.0.0.1:1/ticker", &[]).await;

        let err = result.unwrap_err();
        assert_eq!(err.kind(), super::super::ErrorKind::SourceUnavailable);
    }
}
