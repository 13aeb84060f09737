//! Symbol mapping between exchange market codes and board symbols

use crate::exchanges::{SourceKind, Symbol};
use dashmap::DashMap;

/// Symbol mapper for cross-exchange translation
///
/// Every exchange names the same KRW or USDT market differently
/// (`KRW-BTC`, `BTC_KRW`, `BTCUSDT`, `btc`). Explicit mappings win;
/// anything else is inferred from the exchange's naming convention and
/// remembered.
pub struct SymbolMapper {
    universal_to_exchange: DashMap<(Symbol, SourceKind), String>,
    exchange_to_universal: DashMap<(String, SourceKind), Symbol>,
}

impl SymbolMapper {
    pub fn new() -> Self {
        Self {
            universal_to_exchange: DashMap::new(),
            exchange_to_universal: DashMap::new(),
        }
    }

    pub fn add_mapping(&self, universal: Symbol, exchange: SourceKind, exchange_symbol: &str) {
        self.universal_to_exchange
            .insert((universal.clone(), exchange), exchange_symbol.to_string());
        self.exchange_to_universal
            .insert((exchange_symbol.to_string(), exchange), universal);
    }

    pub fn to_exchange(&self, symbol: &Symbol, exchange: SourceKind) -> String {
        if let Some(code) = self.universal_to_exchange.get(&(symbol.clone(), exchange)) {
            return code.clone();
        }

        let base = symbol.as_str();
        match exchange {
            SourceKind::Upbit => format!("KRW-{}", base),
            SourceKind::Bithumb => format!("{}_KRW", base),
            SourceKind::Binance | SourceKind::Bybit => format!("{}USDT", base),
            SourceKind::Coinone => base.to_lowercase(),
        }
    }

    pub fn from_exchange(&self, exchange_symbol: &str, exchange: SourceKind) -> Option<Symbol> {
        if let Some(symbol) = self
            .exchange_to_universal
            .get(&(exchange_symbol.to_string(), exchange))
        {
            return Some(symbol.clone());
        }

        let universal = Self::infer_universal_symbol(exchange_symbol, exchange)?;
        self.add_mapping(universal.clone(), exchange, exchange_symbol);
        Some(universal)
    }

    fn infer_universal_symbol(exchange_symbol: &str, exchange: SourceKind) -> Option<Symbol> {
        let base = match exchange {
            SourceKind::Upbit => exchange_symbol.strip_prefix("KRW-")?,
            SourceKind::Bithumb => exchange_symbol.strip_suffix("_KRW")?,
            SourceKind::Binance | SourceKind::Bybit => exchange_symbol.strip_suffix("USDT")?,
            SourceKind::Coinone => exchange_symbol,
        };

        let symbol = Symbol::new(base.to_uppercase());
        symbol.validate().then_some(symbol)
    }
}

impl Default for SymbolMapper {
    fn default() -> Self {
        Self::new()
    }
}
