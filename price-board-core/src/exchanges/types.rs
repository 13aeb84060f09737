//! Exchange data types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Trading symbol (base asset ticker, e.g. `BTC`)
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(pub String);

impl Symbol {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn validate(&self) -> bool {
        !self.0.is_empty() && self.0.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name of a configured price source, as shown in the board header
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(pub String);

impl SourceId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Exchange identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Upbit,
    Bithumb,
    Binance,
    Bybit,
    Coinone,
}

impl SourceKind {
    /// Whether the exchange quotes against USDT rather than KRW
    pub fn quotes_in_usdt(&self) -> bool {
        matches!(self, SourceKind::Binance | SourceKind::Bybit)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Upbit => write!(f, "Upbit"),
            SourceKind::Bithumb => write!(f, "Bithumb"),
            SourceKind::Binance => write!(f, "Binance"),
            SourceKind::Bybit => write!(f, "Bybit"),
            SourceKind::Coinone => write!(f, "Coinone"),
        }
    }
}

/// Whether a price is in the exchange's own unit or was multiplied into the display currency
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    Native,
    Converted,
}

/// One successful reading from a source, already in display currency
#[derive(Clone, Debug, PartialEq)]
pub struct SourceTick {
    pub price: f64,
    pub volume: Option<f64>,
    pub currency: Currency,
}

/// One source's price for one symbol, or its absence
#[derive(Clone, Debug, PartialEq)]
pub struct Quote {
    pub symbol: Symbol,
    pub source: SourceId,
    pub price: Option<f64>,
    pub currency: Currency,
}

impl Quote {
    pub fn present(symbol: Symbol, source: SourceId, price: f64, currency: Currency) -> Self {
        Self {
            symbol,
            source,
            price: Some(price),
            currency,
        }
    }

    pub fn absent(symbol: Symbol, source: SourceId) -> Self {
        Self {
            symbol,
            source,
            price: None,
            currency: Currency::Native,
        }
    }

    pub fn is_absent(&self) -> bool {
        self.price.is_none()
    }
}

/// All configured sources' quotes for a single symbol, in source order
#[derive(Clone, Debug, PartialEq)]
pub struct QuoteRow {
    pub symbol: Symbol,
    pub quotes: Vec<Quote>,
}

impl QuoteRow {
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            quotes: Vec::new(),
        }
    }

    /// Build a row from `(source, price)` pairs; `None` marks an absent cell
    pub fn from_prices<I, S>(symbol: Symbol, prices: I) -> Self
    where
        I: IntoIterator<Item = (S, Option<f64>)>,
        S: Into<String>,
    {
        let quotes = prices
            .into_iter()
            .map(|(source, price)| match price {
                Some(p) => Quote::present(symbol.clone(), SourceId::new(source), p, Currency::Native),
                None => Quote::absent(symbol.clone(), SourceId::new(source)),
            })
            .collect();
        Self { symbol, quotes }
    }

    pub fn push(&mut self, quote: Quote) {
        self.quotes.push(quote);
    }

    pub fn get(&self, source: &SourceId) -> Option<&Quote> {
        self.quotes.iter().find(|q| &q.source == source)
    }

    pub fn present_count(&self) -> usize {
        self.quotes.iter().filter(|q| !q.is_absent()).count()
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_validation() {
        assert!(Symbol::new("BTC").validate());
        assert!(Symbol::new("KRW-BTC").validate());
        assert!(!Symbol::new("").validate());
        assert!(!Symbol::new("BTC USD").validate());
        assert!(!Symbol::new("비트").validate());
    }

    #[test]
    fn test_row_from_prices_keeps_order_and_absence() {
        let row = QuoteRow::from_prices(
            Symbol::new("BTC"),
            vec![("A", Some(100.0)), ("B", None), ("C", Some(0.0))],
        );

        assert_eq!(row.len(), 3);
        assert_eq!(row.present_count(), 2);
        assert_eq!(row.quotes[0].source.as_str(), "A");
        assert!(row.get(&SourceId::new("B")).unwrap().is_absent());
        // A zero price is still a present quote
        assert_eq!(row.get(&SourceId::new("C")).unwrap().price, Some(0.0));
    }
}
