//! Extremal annotation of quote rows
//!
//! For each row the highest and lowest present prices are tagged with the
//! spread between them: the maximum carries `(max - min) / min` as a `+`
//! figure, the minimum carries `(max - min) / max` as a `-` figure. Every
//! other cell is only formatted. Annotation is pure; the input row is never
//! touched and the same row always yields the same output.

use super::format::{format_delta, format_price};
use crate::exchanges::{QuoteRow, SourceId, Symbol};

/// Marker rendered for an absent quote
pub const NO_DATA: &str = "N/A";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellRole {
    Normal,
    Maximum,
    Minimum,
    Absent,
}

/// Display-ready cell for one source
#[derive(Clone, Debug, PartialEq)]
pub struct AnnotatedCell {
    pub source: SourceId,
    pub display_text: String,
    pub role: CellRole,
    pub delta_pct: Option<f64>,
}

impl AnnotatedCell {
    fn absent(source: SourceId) -> Self {
        Self {
            source,
            display_text: NO_DATA.to_string(),
            role: CellRole::Absent,
            delta_pct: None,
        }
    }

    /// Signed spread figure, e.g. `+10.00%`; `None` for normal and absent cells
    pub fn delta_text(&self) -> Option<String> {
        let pct = self.delta_pct?;
        match self.role {
            CellRole::Maximum => Some(format_delta(pct, '+')),
            CellRole::Minimum => Some(format_delta(pct, '-')),
            CellRole::Normal | CellRole::Absent => None,
        }
    }
}

/// One annotated row plus the row's two spread figures
#[derive(Clone, Debug, PartialEq)]
pub struct AnnotatedRow {
    pub symbol: Symbol,
    pub cells: Vec<AnnotatedCell>,
    pub max_delta_pct: Option<f64>,
    pub min_delta_pct: Option<f64>,
}

impl AnnotatedRow {
    pub fn cell(&self, source: &str) -> Option<&AnnotatedCell> {
        self.cells.iter().find(|c| c.source.as_str() == source)
    }

    pub fn maximum(&self) -> Option<&AnnotatedCell> {
        self.cells.iter().find(|c| c.role == CellRole::Maximum)
    }

    pub fn minimum(&self) -> Option<&AnnotatedCell> {
        self.cells.iter().find(|c| c.role == CellRole::Minimum)
    }
}

#[derive(Clone, Debug)]
pub struct Annotator {
    currency_symbol: String,
}

impl Annotator {
    pub fn new(currency_symbol: impl Into<String>) -> Self {
        Self {
            currency_symbol: currency_symbol.into(),
        }
    }

    pub fn currency_symbol(&self) -> &str {
        &self.currency_symbol
    }

    pub fn annotate(&self, rows: &[QuoteRow]) -> Vec<AnnotatedRow> {
        rows.iter().map(|row| self.annotate_row(row)).collect()
    }

    pub fn annotate_row(&self, row: &QuoteRow) -> AnnotatedRow {
        let present: Vec<f64> = row
            .quotes
            .iter()
            .filter_map(|q| q.price)
            .filter(|p| !p.is_nan())
            .collect();

        if present.is_empty() {
            return AnnotatedRow {
                symbol: row.symbol.clone(),
                cells: row.quotes.iter().map(|q| AnnotatedCell::absent(q.source.clone())).collect(),
                max_delta_pct: None,
                min_delta_pct: None,
            };
        }

        let max_val = present.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min_val = present.iter().copied().fold(f64::INFINITY, f64::min);
        let distinct = max_val != min_val;

        let mut max_delta_pct = None;
        let mut min_delta_pct = None;
        let mut cells = Vec::with_capacity(row.quotes.len());

        for quote in &row.quotes {
            let value = match quote.price {
                Some(v) if !v.is_nan() => v,
                _ => {
                    cells.push(AnnotatedCell::absent(quote.source.clone()));
                    continue;
                }
            };

            let price_text = format_price(value, &self.currency_symbol);

            // Ties on the extreme go to the first source in column order
            let cell = if distinct && value == max_val && min_val > 0.0 && max_delta_pct.is_none() {
                let pct = (max_val - min_val) / min_val * 100.0;
                max_delta_pct = Some(pct);
                AnnotatedCell {
                    source: quote.source.clone(),
                    display_text: format!("{} ({})", price_text, format_delta(pct, '+')),
                    role: CellRole::Maximum,
                    delta_pct: Some(pct),
                }
            } else if distinct && value == min_val && max_val > 0.0 && min_delta_pct.is_none() {
                let pct = (max_val - min_val) / max_val * 100.0;
                min_delta_pct = Some(pct);
                AnnotatedCell {
                    source: quote.source.clone(),
                    display_text: format!("{} ({})", price_text, format_delta(pct, '-')),
                    role: CellRole::Minimum,
                    delta_pct: Some(pct),
                }
            } else {
                AnnotatedCell {
                    source: quote.source.clone(),
                    display_text: price_text,
                    role: CellRole::Normal,
                    delta_pct: None,
                }
            };
            cells.push(cell);
        }

        AnnotatedRow {
            symbol: row.symbol.clone(),
            cells,
            max_delta_pct,
            min_delta_pct,
        }
    }
}

impl Default for Annotator {
    fn default() -> Self {
        Self::new("₩")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(prices: &[(&str, Option<f64>)]) -> QuoteRow {
        QuoteRow::from_prices(Symbol::new("BTC"), prices.iter().map(|(s, p)| (s.to_string(), *p)))
    }

    fn count(row: &AnnotatedRow, role: CellRole) -> usize {
        row.cells.iter().filter(|c| c.role == role).count()
    }

    #[test]
    fn test_min_max_with_absent_cell() {
        let annotated = Annotator::default().annotate_row(&row(&[("A", Some(100.0)), ("B", Some(110.0)), ("C", None)]));

        let a = annotated.cell("A").unwrap();
        assert_eq!(a.role, CellRole::Minimum);
        assert_eq!(a.delta_text().as_deref(), Some("-9.09%"));
        assert_eq!(a.display_text, "₩100 (-9.09%)");

        let b = annotated.cell("B").unwrap();
        assert_eq!(b.role, CellRole::Maximum);
        assert_eq!(b.delta_text().as_deref(), Some("+10.00%"));
        assert_eq!(b.display_text, "₩110 (+10.00%)");

        let c = annotated.cell("C").unwrap();
        assert_eq!(c.role, CellRole::Absent);
        assert_eq!(c.display_text, NO_DATA);

        assert!((annotated.max_delta_pct.unwrap() - 10.0).abs() < 1e-9);
        assert!((annotated.min_delta_pct.unwrap() - 100.0 / 11.0).abs() < 1e-9);
    }

    #[test]
    fn test_equal_values_are_all_normal() {
        let annotated = Annotator::default().annotate_row(&row(&[("A", Some(50.0)), ("B", Some(50.0))]));

        for cell in &annotated.cells {
            assert_eq!(cell.role, CellRole::Normal);
            assert_eq!(cell.display_text, "₩50");
            assert_eq!(cell.delta_text(), None);
        }
        assert_eq!(annotated.max_delta_pct, None);
        assert_eq!(annotated.min_delta_pct, None);
    }

    #[test]
    fn test_single_present_value_has_no_delta() {
        let annotated = Annotator::default().annotate_row(&row(&[("A", None), ("B", Some(1234.0)), ("C", None)]));

        let b = annotated.cell("B").unwrap();
        assert_eq!(b.role, CellRole::Normal);
        assert_eq!(b.display_text, "₩1,234");
        assert_eq!(count(&annotated, CellRole::Absent), 2);
    }

    #[test]
    fn test_all_absent_row() {
        let annotated = Annotator::default().annotate_row(&row(&[("A", None), ("B", None)]));

        assert!(annotated
            .cells
            .iter()
            .all(|c| c.role == CellRole::Absent && c.display_text == NO_DATA));
    }

    #[test]
    fn test_empty_row() {
        let annotated = Annotator::default().annotate_row(&QuoteRow::new(Symbol::new("BTC")));
        assert!(annotated.cells.is_empty());
        assert_eq!(annotated.max_delta_pct, None);
    }

    #[test]
    fn test_exactly_one_extreme_each() {
        let rows = [
            row(&[("A", Some(3.0)), ("B", Some(1.0)), ("C", Some(2.0))]),
            row(&[("A", Some(10.0)), ("B", Some(10.0)), ("C", Some(5.0)), ("D", None)]),
            row(&[("A", Some(7.0)), ("B", Some(9.0)), ("C", Some(7.0))]),
        ];

        for r in &rows {
            let annotated = Annotator::default().annotate_row(r);
            assert_eq!(count(&annotated, CellRole::Maximum), 1);
            assert_eq!(count(&annotated, CellRole::Minimum), 1);
        }

        // First source in column order wins a tie
        let tied = Annotator::default().annotate_row(&rows[1]);
        assert_eq!(tied.maximum().unwrap().source.as_str(), "A");
        assert_eq!(tied.cell("B").unwrap().role, CellRole::Normal);
    }

    #[test]
    fn test_non_positive_minimum_has_no_maximum() {
        let annotated = Annotator::default().annotate_row(&row(&[("A", Some(0.0)), ("B", Some(10.0))]));
        let a = annotated.cell("A").unwrap();
        assert_eq!(a.role, CellRole::Minimum);
        assert_eq!(a.display_text, "₩0 (-100.00%)");
        assert_eq!(annotated.cell("B").unwrap().role, CellRole::Normal);
        assert_eq!(annotated.cell("B").unwrap().display_text, "₩10");
        assert_eq!(annotated.max_delta_pct, None);

        let annotated = Annotator::default().annotate_row(&row(&[("A", Some(-5.0)), ("B", Some(10.0))]));
        let a = annotated.cell("A").unwrap();
        assert_eq!(a.role, CellRole::Minimum);
        assert_eq!(a.delta_text().as_deref(), Some("-150.00%"));
        assert_eq!(a.display_text, "₩-5 (-150.00%)");
        assert_eq!(count(&annotated, CellRole::Maximum), 0);
    }

    #[test]
    fn test_non_positive_maximum_has_no_delta() {
        let annotated = Annotator::default().annotate_row(&row(&[("A", Some(-5.0)), ("B", Some(0.0))]));
        assert!(annotated.cells.iter().all(|c| c.role == CellRole::Normal));
        assert_eq!(annotated.cell("A").unwrap().display_text, "₩-5");
    }

    #[test]
    fn test_annotation_is_idempotent() {
        let input = row(&[("A", Some(95_010_000.0)), ("B", Some(94_870_500.5)), ("C", None), ("D", Some(95_300_100.0))]);
        let before = input.clone();
        let annotator = Annotator::new("₩");

        let first = annotator.annotate_row(&input);
        let second = annotator.annotate_row(&input);

        assert_eq!(first, second);
        assert_eq!(input, before);
        let texts: Vec<_> = first.cells.iter().map(|c| c.display_text.as_bytes().to_vec()).collect();
        let again: Vec<_> = second.cells.iter().map(|c| c.display_text.as_bytes().to_vec()).collect();
        assert_eq!(texts, again);
    }

    #[test]
    fn test_custom_currency_symbol() {
        let annotated = Annotator::new("$").annotate_row(&row(&[("A", Some(2000.0)), ("B", Some(1000.0))]));
        assert_eq!(annotated.cell("A").unwrap().display_text, "$2,000 (+100.00%)");
        assert_eq!(annotated.cell("B").unwrap().display_text, "$1,000 (-50.00%)");
    }
}
