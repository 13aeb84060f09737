//! Plain-text rendering of the comparison board and the streaming detail view

use chrono::{DateTime, Local};
use std::fmt::Write;

use crate::config::SymbolConfig;
use crate::market_data::{
    format_price, format_quantity, AnnotatedRow, Annotator, CellRole, PersistenceError, PriceTable, NO_DATA,
};

pub const NO_DATA_YET: &str = "No price data yet";

const MAX_MARK: char = '▲';
const MIN_MARK: char = '▼';

/// Comparison board: one row per symbol, one column per source
///
/// Rows whose symbol has no entry in `symbols` are labelled with the
/// ticker alone.
pub fn render_board(
    rows: &[AnnotatedRow],
    symbols: &[SymbolConfig],
    sources: &[String],
    updated_at: DateTime<Local>,
) -> String {
    let mut header = vec!["Coin".to_string()];
    header.extend(sources.iter().cloned());

    let body: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            let label = symbols
                .iter()
                .find(|s| s.symbol == row.symbol)
                .map(|s| format!("{} ({})", s.display_name(), s.symbol))
                .unwrap_or_else(|| row.symbol.to_string());

            let mut line = vec![label];
            line.extend(sources.iter().map(|source| match row.cell(source) {
                Some(cell) => marked(&cell.display_text, cell.role),
                None => NO_DATA.to_string(),
            }));
            line
        })
        .collect();

    let mut out = draw_table(&header, &body);
    let _ = writeln!(out, "Last updated: {}", updated_at.format("%Y-%m-%d %H:%M:%S"));
    out
}

/// Per-symbol detail sections for the persisted streaming table
pub fn render_details(table: &PriceTable, symbols: &[SymbolConfig], sources: &[String], annotator: &Annotator) -> String {
    if table.is_empty() {
        return format!("{}\n", NO_DATA_YET);
    }

    let header: Vec<String> = ["Exchange", "Price", "Volume", "Holdings", "Updated", "Spread"]
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut out = String::new();
    for config in symbols {
        let symbol = &config.symbol;
        let _ = writeln!(out, "== {} ({}) ==", config.display_name(), symbol);

        let Some(entries) = table.sources_for(symbol).filter(|e| !e.is_empty()) else {
            let _ = writeln!(out, "{}\n", NO_DATA_YET);
            continue;
        };

        // Configured sources first, then anything else found in the file
        let mut order: Vec<&String> = sources.iter().filter(|s| entries.contains_key(*s)).collect();
        order.extend(entries.keys().filter(|k| !sources.contains(*k)));
        let order: Vec<String> = order.into_iter().cloned().collect();

        let annotated = &annotator.annotate(&table.to_quote_rows(std::slice::from_ref(symbol), &order))[0];

        let body: Vec<Vec<String>> = order
            .iter()
            .filter_map(|source| {
                let entry = entries.get(source)?;
                let spread = annotated
                    .cell(source)
                    .and_then(|cell| {
                        let pct = cell.delta_pct?;
                        match cell.role {
                            CellRole::Maximum => Some(format!("{} {:.2}%", MAX_MARK, pct)),
                            CellRole::Minimum => Some(format!("{} {:.2}%", MIN_MARK, pct)),
                            _ => None,
                        }
                    })
                    .unwrap_or_default();

                Some(vec![
                    source.clone(),
                    entry
                        .price
                        .map(|p| format_price(p, annotator.currency_symbol()))
                        .unwrap_or_else(|| "-".to_string()),
                    format_quantity(entry.volume),
                    format_quantity(entry.holdings),
                    entry.updated_at.clone(),
                    spread,
                ])
            })
            .collect();

        out.push_str(&draw_table(&header, &body));
        out.push('\n');
    }
    out
}

/// Single visible error line replacing the board
pub fn render_persistence_error(err: &PersistenceError) -> String {
    format!("Error loading price data: {}\n", err)
}

fn marked(text: &str, role: CellRole) -> String {
    match role {
        CellRole::Maximum => format!("{} {}", MAX_MARK, text),
        CellRole::Minimum => format!("{} {}", MIN_MARK, text),
        CellRole::Normal | CellRole::Absent => text.to_string(),
    }
}

fn draw_table(header: &[String], body: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = header.iter().map(|h| display_width(h)).collect();
    for line in body {
        for (i, cell) in line.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(display_width(cell));
            }
        }
    }

    let mut out = String::new();
    push_line(&mut out, header, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(out, "{}", rule.join("-+-"));
    for line in body {
        push_line(&mut out, line, &widths);
    }
    out
}

fn push_line(out: &mut String, cells: &[String], widths: &[usize]) {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, &w)| format!("{}{}", cell, " ".repeat(w.saturating_sub(display_width(cell)))))
        .collect();
    let _ = writeln!(out, "{}", padded.join(" | ").trim_end());
}

/// Terminal column width; Hangul and other East Asian wide glyphs take two columns
fn display_width(text: &str) -> usize {
    text.chars()
        .map(|c| match c as u32 {
            0x1100..=0x115F | 0x2E80..=0x303E | 0x3041..=0x33FF | 0x3400..=0x4DBF | 0x4E00..=0x9FFF
            | 0xAC00..=0xD7A3 | 0xF900..=0xFAFF | 0xFF00..=0xFF60 | 0xFFE0..=0xFFE6 => 2,
            _ => 1,
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchanges::{QuoteRow, Symbol};
    use crate::market_data::PriceEntry;
    use chrono::TimeZone;

    fn sources() -> Vec<String> {
        vec!["A".to_string(), "B".to_string(), "C".to_string()]
    }

    #[test]
    fn test_board_marks_extremes() {
        let row = QuoteRow::from_prices(
            Symbol::new("BTC"),
            vec![("A", Some(100.0)), ("B", Some(110.0)), ("C", None)],
        );
        let annotated = Annotator::default().annotate(&[row]);
        let when = Local.with_ymd_and_hms(2024, 3, 1, 9, 30, 5).unwrap();

        let text = render_board(&annotated, &[SymbolConfig::new("BTC", "비트코인")], &sources(), when);

        assert!(text.contains("비트코인 (BTC)"));
        assert!(text.contains("▼ ₩100 (-9.09%)"));
        assert!(text.contains("▲ ₩110 (+10.00%)"));
        assert!(text.contains(NO_DATA));
        assert!(text.contains("Last updated: 2024-03-01 09:30:05"));
    }

    #[test]
    fn test_board_without_sources() {
        let rows = vec![QuoteRow::new(Symbol::new("ETH"))];
        let annotated = Annotator::default().annotate(&rows);
        let text = render_board(&annotated, &[], &[], Local::now());

        assert!(text.starts_with("Coin"));
        assert!(text.contains("ETH"));
    }

    #[test]
    fn test_details_spread_column() {
        let mut table = PriceTable::new();
        for (source, price) in [("A", 100.0), ("B", 110.0), ("X", 105.0)] {
            table.upsert(
                Symbol::new("BTC"),
                source,
                PriceEntry {
                    price: Some(price),
                    volume: Some(1.5),
                    holdings: None,
                    updated_at: "10:00:00".to_string(),
                },
            );
        }

        let text = render_details(&table, &[SymbolConfig::new("BTC", "비트코인"), SymbolConfig::new("ETH", "이더리움")], &sources(), &Annotator::default());

        assert!(text.contains("== 비트코인 (BTC) =="));
        assert!(text.contains("▲ 10.00%"));
        assert!(text.contains("▼ 9.09%"));
        assert!(text.contains("1.5000"));
        // Source missing from the configured list still shows up
        assert!(text.contains("₩105"));
        assert!(text.contains("== 이더리움 (ETH) ==\nNo price data yet"));
    }

    #[test]
    fn test_details_empty_table() {
        let text = render_details(&PriceTable::new(), &[SymbolConfig::new("BTC", "비트코인")], &sources(), &Annotator::default());
        assert_eq!(text, "No price data yet\n");
    }

    #[test]
    fn test_display_width_counts_hangul_double() {
        assert_eq!(display_width("BTC"), 3);
        assert_eq!(display_width("빗썸"), 4);
        assert_eq!(display_width("₩1,000"), 6);
    }
}
