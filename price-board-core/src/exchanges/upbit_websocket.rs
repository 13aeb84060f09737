//! Upbit WebSocket ticker subscription

use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{interval, sleep, timeout, MissedTickBehavior};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

use super::errors::{SourceError, SourceResult};
use crate::config::PushSourceConfig;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Ticker/trade event pushed by Upbit
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TickerEvent {
    /// Market code, e.g. `KRW-BTC`
    pub code: String,
    pub trade_price: f64,
    #[serde(default)]
    pub acc_trade_volume: Option<f64>,
}

/// WebSocket connection status
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Failed,
}

/// Stream health metrics
#[derive(Debug, Clone, Default)]
pub struct StreamMetrics {
    pub messages_received: u64,
    pub events_parsed: u64,
    pub parse_errors: u64,
    pub connection_errors: u64,
    pub reconnection_count: u64,
}

/// WebSocket configuration
#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    pub url: String,
    pub stream_type: String,
    pub ping_interval: Duration,
    pub reconnect_interval: Duration,
    pub max_reconnect_attempts: u32,
    pub message_timeout: Duration,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self::from(&PushSourceConfig::default())
    }
}

impl From<&PushSourceConfig> for WebSocketConfig {
    fn from(config: &PushSourceConfig) -> Self {
        Self {
            url: config.url.clone(),
            stream_type: config.stream_type.clone(),
            // Upbit drops idle connections after 120s
            ping_interval: Duration::from_secs(30),
            reconnect_interval: Duration::from_secs(config.reconnect_interval_secs),
            max_reconnect_attempts: config.max_reconnect_attempts,
            message_timeout: Duration::from_secs(config.message_timeout_secs),
        }
    }
}

/// Why a connected session ended
enum SessionEnd {
    Cancelled,
    ReceiverClosed,
    ServerClosed,
}

/// Upbit WebSocket client
///
/// Subscribes to the configured market codes and forwards every parsed
/// [`TickerEvent`] into a channel. Reconnects after a dropped session;
/// gives up after `max_reconnect_attempts` consecutive failed connects.
pub struct UpbitWebSocket {
    config: WebSocketConfig,
    codes: Vec<String>,
    status: Arc<RwLock<ConnectionStatus>>,
    metrics: Arc<RwLock<StreamMetrics>>,
}

impl UpbitWebSocket {
    pub fn new(config: WebSocketConfig, codes: Vec<String>) -> Self {
        Self {
            config,
            codes,
            status: Arc::new(RwLock::new(ConnectionStatus::Disconnected)),
            metrics: Arc::new(RwLock::new(StreamMetrics::default())),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.status.read()
    }

    pub fn metrics(&self) -> StreamMetrics {
        self.metrics.read().clone()
    }

    /// `[{"ticket": ...}, {"type": "ticker", "codes": ["KRW-BTC", ...]}]`
    pub fn subscription_message(&self, ticket: &str) -> String {
        json!([
            { "ticket": ticket },
            { "type": self.config.stream_type, "codes": self.codes }
        ])
        .to_string()
    }

    /// Parse one frame; status frames without a market code yield `None`
    pub fn parse_event(text: &str) -> SourceResult<Option<TickerEvent>> {
        let value: serde_json::Value = serde_json::from_str(text)?;

        if let Some(err) = value.get("error") {
            return Err(SourceError::WebSocket(err.to_string()));
        }
        if value.get("code").is_none() {
            return Ok(None);
        }

        let event: TickerEvent = serde_json::from_value(value)?;
        Ok(Some(event))
    }

    /// Run until cancelled, the receiver goes away, or reconnects are exhausted
    pub async fn run(&self, cancel: CancellationToken, events: mpsc::UnboundedSender<TickerEvent>) -> SourceResult<()> {
        let mut failed_attempts = 0u32;

        loop {
            self.set_status(if failed_attempts > 0 {
                ConnectionStatus::Reconnecting
            } else {
                ConnectionStatus::Connecting
            });

            let connected = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                result = self.connect() => result,
            };

            let failure = match connected {
                Ok(ws) => {
                    self.set_status(ConnectionStatus::Connected);
                    info!("Upbit WebSocket connected, {} markets subscribed", self.codes.len());

                    let parsed_before = self.metrics.read().events_parsed;
                    let outcome = self.session(ws, &cancel, &events).await;
                    let delivered = self.metrics.read().events_parsed > parsed_before;

                    match outcome {
                        Ok(SessionEnd::Cancelled) => break,
                        Ok(SessionEnd::ReceiverClosed) => {
                            debug!("Event receiver dropped, closing Upbit stream");
                            break;
                        }
                        Ok(SessionEnd::ServerClosed) => warn!("Upbit WebSocket closed by server"),
                        Err(e) => {
                            error!("Upbit WebSocket error: {}", e);
                            self.metrics.write().connection_errors += 1;
                        }
                    }
                    self.metrics.write().reconnection_count += 1;

                    // Only a session that produced events restores the budget
                    if delivered {
                        failed_attempts = 0;
                        None
                    } else {
                        Some("session ended before any ticker event".to_string())
                    }
                }
                Err(e) => {
                    self.metrics.write().connection_errors += 1;
                    Some(e.to_string())
                }
            };

            if let Some(reason) = failure {
                failed_attempts += 1;
                error!(
                    "Upbit WebSocket attempt failed ({}/{}): {}",
                    failed_attempts, self.config.max_reconnect_attempts, reason
                );

                if failed_attempts >= self.config.max_reconnect_attempts {
                    error!("Max reconnection attempts reached, giving up");
                    self.set_status(ConnectionStatus::Failed);
                    return Err(SourceError::Connection(format!(
                        "gave up after {} failed connection attempts",
                        failed_attempts
                    )));
                }
            }

            self.set_status(ConnectionStatus::Disconnected);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = sleep(self.config.reconnect_interval) => {}
            }
        }

        self.set_status(ConnectionStatus::Disconnected);
        Ok(())
    }

    fn set_status(&self, status: ConnectionStatus) {
        *self.status.write() = status;
    }

    async fn connect(&self) -> SourceResult<WsStream> {
        let url = Url::parse(&self.config.url)
            .map_err(|e| SourceError::Connection(format!("Invalid WebSocket URL: {}", e)))?;

        let (mut ws, _) = timeout(self.config.message_timeout, connect_async(url))
            .await
            .map_err(|_| SourceError::Timeout)??;

        let ticket = format!("price-board-{}", chrono::Utc::now().timestamp_millis());
        ws.send(Message::Text(self.subscription_message(&ticket))).await?;
        Ok(ws)
    }

    async fn session(
        &self,
        ws: WsStream,
        cancel: &CancellationToken,
        events: &mpsc::UnboundedSender<TickerEvent>,
    ) -> SourceResult<SessionEnd> {
        let (mut sink, mut stream) = ws.split();
        let mut ping = interval(self.config.ping_interval);
        ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ping.tick().await;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    let _ = sink.send(Message::Close(None)).await;
                    return Ok(SessionEnd::Cancelled);
                }
                _ = ping.tick() => {
                    sink.send(Message::Ping(Vec::new())).await?;
                }
                next = timeout(self.config.message_timeout, stream.next()) => {
                    let message = match next {
                        Err(_) => return Err(SourceError::Timeout),
                        Ok(None) => return Ok(SessionEnd::ServerClosed),
                        Ok(Some(Err(e))) => return Err(e.into()),
                        Ok(Some(Ok(message))) => message,
                    };

                    let text = match message {
                        Message::Text(text) => text,
                        // Upbit sends its JSON payloads as binary frames
                        Message::Binary(bytes) => match String::from_utf8(bytes) {
                            Ok(text) => text,
                            Err(_) => {
                                self.metrics.write().parse_errors += 1;
                                continue;
                            }
                        },
                        Message::Close(frame) => {
                            info!("WebSocket close frame: {:?}", frame);
                            return Ok(SessionEnd::ServerClosed);
                        }
                        _ => continue,
                    };

                    self.metrics.write().messages_received += 1;
                    match Self::parse_event(&text) {
                        Ok(Some(event)) => {
                            self.metrics.write().events_parsed += 1;
                            if events.send(event).is_err() {
                                return Ok(SessionEnd::ReceiverClosed);
                            }
                        }
                        Ok(None) => debug!("Upbit status frame: {}", text),
                        Err(e) => {
                            self.metrics.write().parse_errors += 1;
                            warn!("Unparseable Upbit frame: {}", e);
                        }
                    }
                }
            }
        }
    }
}
