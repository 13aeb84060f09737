//! Display formatting for prices and spreads

/// Integral, thousands-grouped price with a currency prefix: `₩95,010,000`
pub fn format_price(value: f64, currency_symbol: &str) -> String {
    let digits = format!("{:.0}", value.abs());
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}{}{}", currency_symbol, sign, group_thousands(&digits))
}

/// Percentage with two decimals and an explicit sign: `+10.00%`
pub fn format_delta(pct: f64, sign: char) -> String {
    format!("{}{:.2}%", sign, pct)
}

/// Optional quantity for detail tables; `-` when missing
pub fn format_quantity(value: Option<f64>) -> String {
    match value {
        Some(v) => {
            let fixed = format!("{:.4}", v.abs());
            let (whole, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "0000"));
            let sign = if v < 0.0 { "-" } else { "" };
            format!("{}{}.{}", sign, group_thousands(whole), frac)
        }
        None => "-".to_string(),
    }
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_price_grouping() {
        assert_eq!(format_price(50.0, "₩"), "₩50");
        assert_eq!(format_price(999.0, "₩"), "₩999");
        assert_eq!(format_price(1000.0, "₩"), "₩1,000");
        assert_eq!(format_price(95_010_000.0, "₩"), "₩95,010,000");
        assert_eq!(format_price(1234.6, "$"), "$1,235");
    }

    #[test]
    fn test_format_price_non_positive() {
        assert_eq!(format_price(0.0, "₩"), "₩0");
        assert_eq!(format_price(-1500.0, "₩"), "₩-1,500");
    }

    #[test]
    fn test_format_delta() {
        assert_eq!(format_delta(10.0, '+'), "+10.00%");
        assert_eq!(format_delta(100.0 / 11.0, '-'), "-9.09%");
    }

    #[test]
    fn test_format_quantity() {
        assert_eq!(format_quantity(None), "-");
        assert_eq!(format_quantity(Some(1.2)), "1.2000");
        assert_eq!(format_quantity(Some(12345.678)), "12,345.6780");
        assert_eq!(format_quantity(Some(0.99999)), "1.0000");
    }
}
