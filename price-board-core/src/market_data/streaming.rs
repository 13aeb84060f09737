//! Streaming collector: one push subscription plus periodic pollers
//!
//! Every writer replaces single cells of the shared [`SharedPriceTable`]
//! and then asks for a save. A single persister task owns the
//! [`PriceStore`]: saves never overlap, pending requests coalesce into one
//! write, and each write takes its snapshot right before hitting disk. All
//! tasks stop on the same [`CancellationToken`].

use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::persistence::PriceStore;
use super::price_table::{PriceEntry, SharedPriceTable};
use super::symbol_mapper::SymbolMapper;
use crate::config::{BoardConfig, SymbolConfig};
use crate::exchanges::{
    build_source, PriceSource, RestClient, SourceKind, SourceResult, Symbol, TickerEvent, UpbitWebSocket,
    WebSocketConfig,
};

/// Local wall-clock stamp stored with every entry
pub fn timestamp_now() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

pub struct StreamingCollector {
    table: SharedPriceTable,
    store: PriceStore,
    symbols: Arc<Vec<SymbolConfig>>,
    mapper: Arc<SymbolMapper>,
    save_requested: Arc<Notify>,
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl StreamingCollector {
    /// Create the collector and start its persister; must run inside a Tokio runtime
    pub fn new(
        table: SharedPriceTable,
        store: PriceStore,
        symbols: Vec<SymbolConfig>,
        mapper: Arc<SymbolMapper>,
        cancel: CancellationToken,
    ) -> Self {
        let mut collector = Self {
            table,
            store,
            symbols: Arc::new(symbols),
            mapper,
            save_requested: Arc::new(Notify::new()),
            cancel,
            handles: Vec::new(),
        };
        collector.spawn_persister();
        collector
    }

    /// Wire the push source and every poller from `config.stream`
    pub fn from_config(config: &BoardConfig, table: SharedPriceTable, cancel: CancellationToken) -> SourceResult<Self> {
        let stream = &config.stream;
        let mapper = Arc::new(SymbolMapper::new());
        let client = RestClient::new(config.request_timeout())?;

        let mut collector = Self::new(
            table,
            PriceStore::new(stream.table_path.clone()),
            stream.symbols.clone(),
            mapper.clone(),
            cancel,
        );

        if let Some(push) = &stream.push_source {
            collector.spawn_push(push.name.clone(), WebSocketConfig::from(push));
        }
        for poller in &stream.pollers {
            let source = build_source(&poller.source, config.usdt_krw_rate, client.clone(), mapper.clone());
            collector.spawn_poller(source, Duration::from_secs(poller.interval_secs));
        }

        Ok(collector)
    }

    pub fn table(&self) -> &SharedPriceTable {
        &self.table
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn task_count(&self) -> usize {
        self.handles.len()
    }

    /// Subscribe to the Upbit ticker stream and record every event under `source_name`
    pub fn spawn_push(&mut self, source_name: String, ws_config: WebSocketConfig) {
        let codes = self
            .symbols
            .iter()
            .map(|s| self.mapper.to_exchange(&s.symbol, SourceKind::Upbit))
            .collect();
        let websocket = UpbitWebSocket::new(ws_config, codes);
        let (tx, rx) = mpsc::unbounded_channel::<TickerEvent>();

        let cancel = self.cancel.clone();
        self.handles.push(tokio::spawn(async move {
            if let Err(e) = websocket.run(cancel, tx).await {
                error!("Push source stopped: {}", e);
            }
        }));

        let writer = self.writer();
        self.handles
            .push(tokio::spawn(async move { writer.consume_ticks(&source_name, rx).await }));
    }

    /// Poll `source` for every tracked symbol once per `period`
    pub fn spawn_poller(&mut self, source: Arc<dyn PriceSource>, period: Duration) {
        let writer = self.writer();
        let cancel = self.cancel.clone();

        self.handles.push(tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!("Polling {} every {:?}", source.id(), period);

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let results = join_all(writer.symbols.iter().map(|s| source.fetch(&s.symbol))).await;

                let mut written = false;
                for (entry, result) in writer.symbols.iter().zip(results) {
                    match result {
                        Ok(tick) => {
                            written |= writer.record(&entry.symbol, source.id().as_str(), tick.price, tick.volume);
                        }
                        Err(e) => warn!("{} poll for {} failed ({}): {}", source.id(), entry.symbol, e.kind(), e),
                    }
                }
                if written {
                    writer.request_save();
                }
            }

            debug!("Poller {} stopped", source.id());
        }));
    }

    /// Cancel every task, wait for them and write a final snapshot
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Streaming task panicked: {}", e);
            }
        }
        // The persister has exited, so this write cannot race another save
        save_snapshot(&self.table, &self.store).await;
        info!("Streaming collector stopped");
    }

    fn spawn_persister(&mut self) {
        let table = self.table.clone();
        let store = self.store.clone();
        let save_requested = self.save_requested.clone();
        let cancel = self.cancel.clone();

        self.handles.push(tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = save_requested.notified() => {}
                }
                save_snapshot(&table, &store).await;
            }
        }));
    }

    fn writer(&self) -> TableWriter {
        TableWriter {
            table: self.table.clone(),
            symbols: self.symbols.clone(),
            mapper: self.mapper.clone(),
            save_requested: self.save_requested.clone(),
        }
    }
}

async fn save_snapshot(table: &SharedPriceTable, store: &PriceStore) {
    let snapshot = table.snapshot();
    let store = store.clone();

    match tokio::task::spawn_blocking(move || store.save(&snapshot)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Could not persist price table: {}", e),
        Err(e) => error!("Persist task failed: {}", e),
    }
}

/// Handle each writer task owns
#[derive(Clone)]
struct TableWriter {
    table: SharedPriceTable,
    symbols: Arc<Vec<SymbolConfig>>,
    mapper: Arc<SymbolMapper>,
    save_requested: Arc<Notify>,
}

impl TableWriter {
    /// Returns false when the symbol is not tracked or the price is unusable
    fn record(&self, symbol: &Symbol, source: &str, price: f64, volume: Option<f64>) -> bool {
        let Some(config) = self.symbols.iter().find(|s| &s.symbol == symbol) else {
            return false;
        };
        if !price.is_finite() {
            warn!("{} sent non-finite price for {}", source, symbol);
            return false;
        }

        self.table.upsert(
            symbol.clone(),
            source,
            PriceEntry {
                price: Some(price),
                volume,
                holdings: config.holdings,
                updated_at: timestamp_now(),
            },
        );
        true
    }

    /// Requests made while a save is running collapse into one follow-up save
    fn request_save(&self) {
        self.save_requested.notify_one();
    }

    /// Record pushed events until the sending side goes away
    async fn consume_ticks(&self, source_name: &str, mut rx: mpsc::UnboundedReceiver<TickerEvent>) {
        while let Some(event) = rx.recv().await {
            let Some(symbol) = self.mapper.from_exchange(&event.code, SourceKind::Upbit) else {
                debug!("Ignoring unknown market code {}", event.code);
                continue;
            };
            if self.record(&symbol, source_name, event.trade_price, event.acc_trade_volume) {
                self.request_save();
            }
        }
    }
}
