//! Quote collection across all configured sources

use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::exchanges::{PriceSource, Quote, QuoteRow, SourceResult, SourceTick, Symbol};

/// Queries every source for every symbol and assembles one row per symbol
///
/// A failing source only costs its own cell: every error is logged with
/// its kind and turned into an absent quote here, at the adapter
/// boundary. Fetches run concurrently; rows and cells always come back in
/// configured order.
pub struct QuoteCollector {
    sources: Vec<Arc<dyn PriceSource>>,
}

impl QuoteCollector {
    pub fn new(sources: Vec<Arc<dyn PriceSource>>) -> Self {
        Self { sources }
    }

    pub fn sources(&self) -> &[Arc<dyn PriceSource>] {
        &self.sources
    }

    pub async fn collect(&self, symbols: &[Symbol]) -> Vec<QuoteRow> {
        let started = Instant::now();
        let rows = join_all(symbols.iter().map(|symbol| self.collect_symbol(symbol))).await;

        let present: usize = rows.iter().map(QuoteRow::present_count).sum();
        debug!(
            "Collected {}/{} quotes in {:?}",
            present,
            symbols.len() * self.sources.len(),
            started.elapsed()
        );
        rows
    }

    pub async fn collect_symbol(&self, symbol: &Symbol) -> QuoteRow {
        let results = join_all(self.sources.iter().map(|source| source.fetch(symbol))).await;

        let mut row = QuoteRow::new(symbol.clone());
        for (source, result) in self.sources.iter().zip(results) {
            row.push(Self::to_quote(source.as_ref(), symbol, result));
        }
        row
    }

    fn to_quote(source: &dyn PriceSource, symbol: &Symbol, result: SourceResult<SourceTick>) -> Quote {
        match result {
            Ok(tick) if tick.price.is_finite() => {
                Quote::present(symbol.clone(), source.id().clone(), tick.price, tick.currency)
            }
            Ok(tick) => {
                warn!("{} returned non-finite price {} for {}", source.id(), tick.price, symbol);
                Quote::absent(symbol.clone(), source.id().clone())
            }
            Err(e) => {
                warn!("{} quote for {} unavailable ({}): {}", source.id(), symbol, e.kind(), e);
                Quote::absent(symbol.clone(), source.id().clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchanges::{Currency, SourceError, SourceId, SourceKind};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::time::Duration;

    struct FixedSource {
        id: SourceId,
        prices: HashMap<String, f64>,
        delay: Duration,
    }

    #[async_trait]
    impl PriceSource for FixedSource {
        fn id(&self) -> &SourceId {
            &self.id
        }

        fn kind(&self) -> SourceKind {
            SourceKind::Upbit
        }

        async fn fetch(&self, symbol: &Symbol) -> SourceResult<SourceTick> {
            tokio::time::sleep(self.delay).await;
            self.prices
                .get(symbol.as_str())
                .map(|&price| SourceTick {
                    price,
                    volume: None,
                    currency: Currency::Native,
                })
                .ok_or_else(|| SourceError::NotListed(symbol.to_string()))
        }
    }

    struct BrokenSource(SourceId);

    #[async_trait]
    impl PriceSource for BrokenSource {
        fn id(&self) -> &SourceId {
            &self.0
        }

        fn kind(&self) -> SourceKind {
            SourceKind::Bybit
        }

        async fn fetch(&self, _symbol: &Symbol) -> SourceResult<SourceTick> {
            Err(SourceError::Timeout)
        }
    }

    fn fixed(name: &str, prices: &[(&str, f64)], delay_ms: u64) -> Arc<dyn PriceSource> {
        Arc::new(FixedSource {
            id: SourceId::new(name),
            prices: prices.iter().map(|(s, p)| (s.to_string(), *p)).collect(),
            delay: Duration::from_millis(delay_ms),
        })
    }

    #[tokio::test]
    async fn test_failing_source_only_blanks_its_column() {
        let collector = QuoteCollector::new(vec![
            fixed("A", &[("BTC", 100.0), ("ETH", 10.0)], 0),
            Arc::new(BrokenSource(SourceId::new("B"))),
            fixed("C", &[("BTC", 101.0)], 0),
        ]);

        let rows = collector.collect(&[Symbol::new("BTC"), Symbol::new("ETH")]).await;

        assert_eq!(rows.len(), 2);
        let btc = &rows[0];
        assert_eq!(btc.quotes[0].price, Some(100.0));
        assert!(btc.quotes[1].is_absent());
        assert_eq!(btc.quotes[2].price, Some(101.0));

        let eth = &rows[1];
        assert_eq!(eth.quotes[0].price, Some(10.0));
        assert!(eth.quotes[1].is_absent());
        // Not listed on C
        assert!(eth.quotes[2].is_absent());
    }

    #[tokio::test]
    async fn test_order_is_configured_order_not_completion_order() {
        let collector = QuoteCollector::new(vec![
            fixed("slow", &[("BTC", 1.0)], 50),
            fixed("fast", &[("BTC", 2.0)], 0),
        ]);

        let row = collector.collect_symbol(&Symbol::new("BTC")).await;
        let names: Vec<_> = row.quotes.iter().map(|q| q.source.as_str().to_string()).collect();
        assert_eq!(names, vec!["slow", "fast"]);
    }

    #[tokio::test]
    async fn test_no_sources_yields_empty_rows() {
        let collector = QuoteCollector::new(Vec::new());
        let rows = collector.collect(&[Symbol::new("BTC"), Symbol::new("XRP")]).await;

        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.is_empty() && r.present_count() == 0));
    }

    #[tokio::test]
    async fn test_non_finite_price_is_absent() {
        let collector = QuoteCollector::new(vec![fixed("A", &[("BTC", f64::INFINITY)], 0)]);
        let row = collector.collect_symbol(&Symbol::new("BTC")).await;
        assert!(row.quotes[0].is_absent());
    }
}
