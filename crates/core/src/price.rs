use regex::{Captures, Regex};
use std::sync::OnceLock;

// Optional currency symbol, then either comma-grouped thousands or a plain
// digit run, then an optional two-digit fraction.
const PRICE_PATTERN: &str = r"([$£€¥])?\s*(\d{1,3}(?:,\d{3})+|\d+)(?:\.(\d{2}))?\b";

fn price_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(PRICE_PATTERN).expect("price pattern is valid"))
}

/// Extracts the first price found in source-formatted text.
///
/// An amount carrying a currency symbol wins over bare numbers earlier in the
/// text ("2 for $30.00" is 30). Returns `None` when the text holds no numeric
/// pattern; that is the normal outcome for placeholder markup like "See price
/// in cart".
pub fn parse(text: &str) -> Option<f64> {
    let mut bare = None;
    for caps in price_regex().captures_iter(text) {
        if caps.get(1).is_some() {
            return amount(&caps);
        }
        bare.get_or_insert(caps);
    }
    bare.as_ref().and_then(amount)
}

fn amount(caps: &Captures<'_>) -> Option<f64> {
    let whole = caps.get(2)?.as_str().replace(',', "");
    let normalized = match caps.get(3) {
        Some(cents) => format!("{whole}.{}", cents.as_str()),
        None => whole,
    };
    normalized.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_currency_with_thousands_separator() {
        assert_eq!(parse("$1,234.56"), Some(1234.56));
        assert_eq!(parse("$1,234,567"), Some(1_234_567.0));
    }

    #[test]
    fn parses_plain_numbers() {
        assert_eq!(parse("99.99"), Some(99.99));
        assert_eq!(parse("150"), Some(150.0));
        assert_eq!(parse("£ 45.00"), Some(45.0));
    }

    #[test]
    fn returns_none_without_digits() {
        assert_eq!(parse("no price here"), None);
        assert_eq!(parse(""), None);
    }

    #[test]
    fn takes_first_price_of_a_range() {
        assert_eq!(parse("$20.00 to $40.00"), Some(20.0));
        assert_eq!(parse("Now $129.99 (was $180.00)"), Some(129.99));
    }

    #[test]
    fn prefers_amount_with_currency_over_bare_quantity() {
        assert_eq!(parse("2 for $30.00"), Some(30.0));
        assert_eq!(parse("Pack of 3 - £45.50"), Some(45.5));
        assert_eq!(parse("4.5 stars, 120 sold"), Some(4.0));
    }

    #[test]
    fn ignores_fractions_that_are_not_two_digits() {
        assert_eq!(parse("12.5"), Some(12.0));
        assert_eq!(parse("12.567"), Some(12.0));
    }
}
