//! Market data collection, annotation and the streaming table

pub mod annotator;
pub mod collector;
pub mod format;
pub mod persistence;
pub mod price_table;
pub mod streaming;
pub mod symbol_mapper;

pub use annotator::{AnnotatedCell, AnnotatedRow, Annotator, CellRole, NO_DATA};
pub use collector::QuoteCollector;
pub use format::{format_delta, format_price, format_quantity};
pub use persistence::{PersistenceError, PersistenceResult, PriceStore};
pub use price_table::{PriceEntry, PriceTable, SharedPriceTable};
pub use streaming::{timestamp_now, StreamingCollector};
pub use symbol_mapper::SymbolMapper;
