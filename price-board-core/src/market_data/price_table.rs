//! Shared streaming price table

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::exchanges::{Currency, Quote, QuoteRow, SourceId, Symbol};

/// Latest reading from one source for one symbol
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceEntry {
    /// `None` when the file holds a null or missing price for this cell
    #[serde(default)]
    pub price: Option<f64>,
    pub volume: Option<f64>,
    pub holdings: Option<f64>,
    /// Local wall-clock time of the update, `HH:MM:SS`
    pub updated_at: String,
}

/// `symbol -> source name -> latest entry`
///
/// Serializes to the persisted document shape directly.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceTable {
    entries: BTreeMap<Symbol, BTreeMap<String, PriceEntry>>,
}

impl PriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cell for `(symbol, source)` wholesale
    pub fn upsert(&mut self, symbol: Symbol, source: impl Into<String>, entry: PriceEntry) {
        self.entries.entry(symbol).or_default().insert(source.into(), entry);
    }

    pub fn get(&self, symbol: &Symbol, source: &str) -> Option<&PriceEntry> {
        self.entries.get(symbol)?.get(source)
    }

    pub fn sources_for(&self, symbol: &Symbol) -> Option<&BTreeMap<String, PriceEntry>> {
        self.entries.get(symbol)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.entries.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(BTreeMap::is_empty)
    }

    /// Project the table onto the board's rows and columns
    ///
    /// Cells never written, or written for a source not in `sources`, are
    /// absent. Row and column order follow the arguments.
    pub fn to_quote_rows(&self, symbols: &[Symbol], sources: &[String]) -> Vec<QuoteRow> {
        symbols
            .iter()
            .map(|symbol| {
                let mut row = QuoteRow::new(symbol.clone());
                for source in sources {
                    let id = SourceId::new(source.clone());
                    let quote = match self.get(symbol, source).and_then(|e| e.price) {
                        Some(price) => Quote::present(symbol.clone(), id, price, Currency::Native),
                        None => Quote::absent(symbol.clone(), id),
                    };
                    row.push(quote);
                }
                row
            })
            .collect()
    }
}

/// Table shared between the stream writers and readers
///
/// Every write and every read takes the same lock; readers always work on
/// a cloned snapshot.
#[derive(Clone, Debug, Default)]
pub struct SharedPriceTable {
    inner: Arc<Mutex<PriceTable>>,
}

impl SharedPriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_table(table: PriceTable) -> Self {
        Self {
            inner: Arc::new(Mutex::new(table)),
        }
    }

    pub fn upsert(&self, symbol: Symbol, source: impl Into<String>, entry: PriceEntry) {
        self.inner.lock().upsert(symbol, source, entry);
    }

    pub fn snapshot(&self) -> PriceTable {
        self.inner.lock().clone()
    }

    pub fn to_quote_rows(&self, symbols: &[Symbol], sources: &[String]) -> Vec<QuoteRow> {
        self.inner.lock().to_quote_rows(symbols, sources)
    }
}
