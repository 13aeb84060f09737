//! JSON file store for the streaming price table

use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use super::price_table::PriceTable;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Price table {path} unavailable: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Price table {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Reads and writes the table document at a fixed path
///
/// Saves go through a sibling temp file and a rename, so a reader never
/// observes a half-written document.
#[derive(Clone, Debug)]
pub struct PriceStore {
    path: PathBuf,
}

impl PriceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, table: &PriceTable) -> PersistenceResult<()> {
        let body = serde_json::to_vec_pretty(table).map_err(|source| PersistenceError::Corrupt {
            path: self.path.clone(),
            source,
        })?;

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let io_err = |source: std::io::Error| PersistenceError::Io {
            path: self.path.clone(),
            source,
        };

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(io_err)?;
        tmp.write_all(&body).map_err(io_err)?;
        tmp.flush().map_err(io_err)?;
        tmp.persist(&self.path).map_err(|e| io_err(e.error))?;

        debug!("Saved price table to {}", self.path.display());
        Ok(())
    }

    /// Load the table; a missing or empty file is an empty table
    pub fn load(&self) -> PersistenceResult<PriceTable> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(PriceTable::new()),
            Err(source) => {
                return Err(PersistenceError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        if text.trim().is_empty() {
            return Ok(PriceTable::new());
        }

        serde_json::from_str(&text).map_err(|source| PersistenceError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchanges::Symbol;
    use crate::market_data::PriceEntry;

    #[test]
    fn test_missing_and_empty_files_load_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = PriceStore::new(dir.path().join("prices.json"));
        assert!(store.load().unwrap().is_empty());

        std::fs::write(store.path(), "  \n").unwrap();
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = PriceStore::new(dir.path().join("prices.json"));
        std::fs::write(store.path(), "{\"BTC\": ").unwrap();

        assert!(matches!(store.load(), Err(PersistenceError::Corrupt { .. })));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = PriceStore::new(dir.path().join("prices.json"));

        let mut table = PriceTable::new();
        table.upsert(
            Symbol::new("ETH"),
            "코인원",
            PriceEntry {
                price: Some(4_100_000.0),
                volume: None,
                holdings: Some(0.5),
                updated_at: "09:15:02".to_string(),
            },
        );
        tokio_test::assert_ok!(store.save(&table));

        assert_eq!(store.load().unwrap(), table);
        // Only the target file remains in the directory
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_reads_hand_written_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = PriceStore::new(dir.path().join("prices.json"));
        std::fs::write(
            store.path(),
            r#"{"BTC": {"업비트": {"price": 95010000.0, "volume": 1532.1, "holdings": null, "updated_at": "10:00:01"}}}"#,
        )
        .unwrap();

        let table = store.load().unwrap();
        let entry = table.get(&Symbol::new("BTC"), "업비트").unwrap();
        assert_eq!(entry.price, Some(95_010_000.0));
        assert_eq!(entry.volume, Some(1532.1));
    }
}
