//! Price Board Application
//!
//! Terminal front end for the multi-exchange price board: a polling
//! comparison board, a streaming collector that keeps the price table file
//! up to date, and a viewer for that file.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueHint};
use std::path::PathBuf;
use tokio::signal;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use price_board_core::{render_persisted, BoardConfig, PriceBoard, PriceStore, SharedPriceTable, StreamingCollector};

const CLEAR_SCREEN: &str = "\x1B[2J\x1B[H";

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// TOML configuration file; built-in defaults when omitted
    #[arg(long, short, global = true, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Run a single cycle and exit
    #[arg(long, global = true)]
    once: bool,

    #[command(subcommand)]
    cmd: Option<Command>,
}

#[derive(Subcommand, Clone, Copy, Debug, PartialEq)]
enum Command {
    /// Poll every source and render the comparison board (default)
    Poll,

    /// Stream prices into the table file
    Collect,

    /// Render the table file written by `collect`
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            ctrl_c.cancel();
        }
    });

    match cli.cmd.unwrap_or(Command::Poll) {
        Command::Poll => run_poll(config, cancel, cli.once).await,
        Command::Collect => run_collect(config, cancel, cli.once).await,
        Command::Watch => run_watch(config, cancel, cli.once).await,
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<BoardConfig> {
    match path {
        Some(path) => BoardConfig::from_file(path).with_context(|| format!("Invalid configuration in {}", path.display())),
        None => {
            let config = BoardConfig::default();
            config.validate().context("Invalid built-in configuration")?;
            Ok(config)
        }
    }
}

async fn run_poll(config: BoardConfig, cancel: CancellationToken, once: bool) -> Result<()> {
    let period = config.render_interval();
    let board = PriceBoard::new(config)?;
    info!(
        "Polling {} symbols across {} sources every {:?}",
        board.symbols().len(),
        board.source_names().len(),
        period
    );

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let text = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            text = board.render_once() => text,
        };

        if once {
            print!("{}", text);
            break;
        }
        print!("{}{}", CLEAR_SCREEN, text);
    }

    Ok(())
}

async fn run_collect(config: BoardConfig, cancel: CancellationToken, once: bool) -> Result<()> {
    let store = PriceStore::new(config.stream.table_path.clone());
    let table = match store.load() {
        Ok(table) => SharedPriceTable::from_table(table),
        Err(e) => {
            warn!("Starting with an empty price table: {}", e);
            SharedPriceTable::new()
        }
    };

    let collector = StreamingCollector::from_config(&config, table, cancel.clone())?;
    info!(
        "Streaming {} symbols into {} ({} tasks)",
        config.stream.symbols.len(),
        store.path().display(),
        collector.task_count()
    );

    if once {
        // One refresh period is enough for every writer to land a first update
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(config.refresh_interval()) => {}
        }
    } else {
        cancel.cancelled().await;
    }

    collector.shutdown().await;
    Ok(())
}

async fn run_watch(config: BoardConfig, cancel: CancellationToken, once: bool) -> Result<()> {
    let store = PriceStore::new(config.stream.table_path.clone());
    let mut ticker = interval(config.refresh_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let path = store.path().to_path_buf();
        let render_config = config.clone();
        let render_store = store.clone();
        let text = match tokio::task::spawn_blocking(move || render_persisted(&render_config, &render_store)).await {
            Ok(text) => text,
            Err(e) => {
                error!("Rendering {} failed: {}", path.display(), e);
                continue;
            }
        };

        if once {
            print!("{}", text);
            break;
        }
        print!("{}{}", CLEAR_SCREEN, text);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_default_subcommand_is_poll() {
        let cli = Cli::try_parse_from(["price-board"]).unwrap();
        assert_eq!(cli.cmd.unwrap_or(Command::Poll), Command::Poll);
        assert!(!cli.once);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["price-board", "watch", "--once", "--config", "board.toml"]).unwrap();
        assert_eq!(cli.cmd, Some(Command::Watch));
        assert!(cli.once);
        assert_eq!(cli.config, Some(PathBuf::from("board.toml")));
    }

    #[test]
    fn test_missing_config_file_fails_fast() {
        let err = load_config(Some(std::path::Path::new("/nonexistent/board.toml"))).unwrap_err();
        assert!(err.to_string().contains("Invalid configuration"));
    }

    #[tokio::test]
    async fn test_watch_once_with_missing_table() {
        let mut config = BoardConfig::default();
        config.stream.table_path = std::env::temp_dir().join("price-board-missing-table.json");
        let _ = std::fs::remove_file(&config.stream.table_path);

        let result = tokio::time::timeout(Duration::from_secs(5), run_watch(config, CancellationToken::new(), true)).await;
        tokio_test::assert_ok!(result.unwrap());
    }
}
