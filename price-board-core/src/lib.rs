//! Multi-exchange price board
//!
//! Collects the same coins' prices from several exchanges, normalizes them
//! into one display currency and tags each row's most and least expensive
//! venue with the spread between them. Usable as a library or through the
//! `price-board` binary.

pub mod config;
pub mod exchanges;
pub mod market_data;
pub mod render;

pub use config::{BoardConfig, ConfigError, SourceConfig, StreamConfig, SymbolConfig};
pub use exchanges::{PriceSource, Quote, QuoteRow, SourceError, SourceId, SourceKind, Symbol};
pub use market_data::{
    AnnotatedCell, AnnotatedRow, Annotator, CellRole, PriceStore, QuoteCollector, SharedPriceTable, StreamingCollector,
};

use anyhow::Result;
use chrono::Local;
use std::sync::Arc;

use exchanges::{build_source, RestClient};
use market_data::SymbolMapper;

/// Main interface: collect, annotate and render the comparison board
pub struct PriceBoard {
    config: BoardConfig,
    collector: QuoteCollector,
    annotator: Annotator,
}

impl PriceBoard {
    /// Create a board with one REST adapter per configured source
    pub fn new(config: BoardConfig) -> Result<Self> {
        config.validate()?;

        let client = RestClient::new(config.request_timeout())?;
        let mapper = Arc::new(SymbolMapper::new());
        let sources = config
            .sources
            .iter()
            .map(|s| build_source(s, config.usdt_krw_rate, client.clone(), mapper.clone()))
            .collect();

        Ok(Self::with_sources(config, sources))
    }

    /// Create a board over caller-supplied adapters, in column order
    pub fn with_sources(config: BoardConfig, sources: Vec<Arc<dyn PriceSource>>) -> Self {
        let annotator = Annotator::new(config.currency_symbol.clone());
        Self {
            config,
            collector: QuoteCollector::new(sources),
            annotator,
        }
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn symbols(&self) -> Vec<Symbol> {
        self.config.symbols.iter().map(|s| s.symbol.clone()).collect()
    }

    pub fn source_names(&self) -> Vec<String> {
        self.collector
            .sources()
            .iter()
            .map(|s| s.id().as_str().to_string())
            .collect()
    }

    /// One collect + annotate cycle
    pub async fn refresh(&self) -> Vec<AnnotatedRow> {
        let rows = self.collector.collect(&self.symbols()).await;
        self.annotator.annotate(&rows)
    }

    /// One full cycle rendered as text
    pub async fn render_once(&self) -> String {
        let rows = self.refresh().await;
        render::render_board(&rows, &self.config.symbols, &self.source_names(), Local::now())
    }
}

/// Render the persisted streaming table: comparison board plus detail sections
///
/// A missing or empty file renders the "no data yet" state; an unreadable
/// or corrupt one renders a single error line.
pub fn render_persisted(config: &BoardConfig, store: &PriceStore) -> String {
    let table = match store.load() {
        Ok(table) => table,
        Err(e) => return render::render_persistence_error(&e),
    };
    if table.is_empty() {
        return format!("{}\n", render::NO_DATA_YET);
    }

    let stream = &config.stream;
    let symbols: Vec<Symbol> = stream.symbols.iter().map(|s| s.symbol.clone()).collect();
    let sources = stream.source_names();
    let annotator = Annotator::new(config.currency_symbol.clone());

    let rows = annotator.annotate(&table.to_quote_rows(&symbols, &sources));
    let mut out = render::render_board(&rows, &stream.symbols, &sources, Local::now());
    out.push('\n');
    out.push_str(&render::render_details(&table, &stream.symbols, &sources, &annotator));
    out
}
