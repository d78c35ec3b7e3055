//! Converts text as rendered in the deck back into comparable numbers.
//!
//! The parser is total over the formats the generator emits: every string is
//! either a number, a placeholder (`Absent`), or a [`AuditError::Parse`].
//! Nothing is coerced by scraping digits out of surrounding text.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::AuditError;
use crate::types::MetricKind;
use crate::AuditResult;

const PLACEHOLDERS: [&str; 4] = ["", "-", "\u{2013}", "\u{2014}"];
const CURRENCY_SYMBOLS: [char; 4] = ['$', '£', '€', '¥'];
const MINUS_SIGNS: [char; 2] = ['-', '\u{2212}'];
const GROUP_SEPARATORS: [char; 4] = [',', ' ', '\u{00A0}', '\u{202F}'];

/// Display format inferred from the cell text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellFormat {
    Currency,
    Percent,
    Number,
    Placeholder,
}

impl CellFormat {
    /// Whether a cell rendered this way can legitimately show a field of `kind`.
    ///
    /// Plain numbers and placeholders suit anything. Counts accept percent
    /// because reach is shown as a percentage of the audience.
    pub fn suits(&self, kind: MetricKind) -> bool {
        match (self, kind) {
            (CellFormat::Number | CellFormat::Placeholder, _) => true,
            (CellFormat::Currency, MetricKind::Currency) => true,
            (CellFormat::Percent, MetricKind::Share | MetricKind::Count) => true,
            _ => false,
        }
    }
}

/// A parsed display cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayValue {
    /// Empty cell or a dash placeholder.
    Absent,
    /// Percent values stay in percentage units: "12.3%" is 12.3.
    Number { value: Decimal, format: CellFormat },
}

impl DisplayValue {
    pub fn value(&self) -> Option<Decimal> {
        match self {
            DisplayValue::Absent => None,
            DisplayValue::Number { value, .. } => Some(*value),
        }
    }

    pub fn format(&self) -> CellFormat {
        match self {
            DisplayValue::Absent => CellFormat::Placeholder,
            DisplayValue::Number { format, .. } => *format,
        }
    }
}

/// Parse a displayed cell's text.
///
/// Rules, in order: placeholders; parenthesised negatives; leading minus;
/// currency prefix; trailing percent; `K`/`M` magnitude suffix (not with
/// percent); thousands separators. Anything left that is not a plain
/// decimal numeral is a parse error.
pub fn parse_display(text: &str) -> AuditResult<DisplayValue> {
    let trimmed = text.trim();
    if PLACEHOLDERS.contains(&trimmed) {
        return Ok(DisplayValue::Absent);
    }

    let fail = |reason: &str| AuditError::Parse {
        text: text.to_string(),
        reason: reason.to_string(),
    };

    let mut body = trimmed;
    let mut negative = false;

    if let Some(inner) = body.strip_prefix('(').and_then(|b| b.strip_suffix(')')) {
        negative = true;
        body = inner.trim();
    }

    if let Some(rest) = body.strip_prefix(MINUS_SIGNS) {
        if negative {
            return Err(fail("both parentheses and a minus sign"));
        }
        negative = true;
        body = rest.trim_start();
    }

    let mut format = CellFormat::Number;
    if let Some(rest) = body.strip_prefix(CURRENCY_SYMBOLS) {
        format = CellFormat::Currency;
        body = rest.trim_start();
        // "£-120" as well as "-£120"
        if let Some(rest) = body.strip_prefix(MINUS_SIGNS) {
            if negative {
                return Err(fail("more than one negative marker"));
            }
            negative = true;
            body = rest.trim_start();
        }
    }

    if let Some(rest) = body.strip_suffix('%') {
        if format == CellFormat::Currency {
            return Err(fail("currency symbol on a percentage"));
        }
        format = CellFormat::Percent;
        body = rest.trim_end();
    }

    let mut scale = Decimal::ONE;
    if format != CellFormat::Percent {
        if let Some(rest) = body.strip_suffix(['K', 'k']) {
            scale = dec!(1000);
            body = rest.trim_end();
        } else if let Some(rest) = body.strip_suffix(['M', 'm']) {
            scale = dec!(1000000);
            body = rest.trim_end();
        }
    }

    let numeral: String = body
        .chars()
        .filter(|c| !GROUP_SEPARATORS.contains(c))
        .collect();
    validate_numeral(&numeral).map_err(|reason| fail(reason))?;

    let magnitude = Decimal::from_str(&numeral).map_err(|e| fail(&e.to_string()))?;
    let value = magnitude
        .checked_mul(scale)
        .ok_or_else(|| fail("value out of range"))?;

    Ok(DisplayValue::Number {
        value: if negative { -value } else { value },
        format,
    })
}

/// Digits with at most one decimal point.
fn validate_numeral(numeral: &str) -> Result<(), &'static str> {
    if !numeral.chars().any(|c| c.is_ascii_digit()) {
        return Err("no digits");
    }
    let mut seen_point = false;
    for c in numeral.chars() {
        match c {
            '0'..='9' => {}
            '.' if !seen_point => seen_point = true,
            '.' => return Err("more than one decimal point"),
            _ => return Err("residual non-numeric characters"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn number(text: &str) -> (Decimal, CellFormat) {
        match parse_display(text).unwrap() {
            DisplayValue::Number { value, format } => (value, format),
            DisplayValue::Absent => panic!("'{text}' parsed as absent"),
        }
    }

    #[test]
    fn test_currency_with_thousands_separator() {
        assert_eq!(number("$1,234.50"), (dec!(1234.50), CellFormat::Currency));
        assert_eq!(number("£ 1,200"), (dec!(1200), CellFormat::Currency));
        assert_eq!(number("€0.99"), (dec!(0.99), CellFormat::Currency));
    }

    #[test]
    fn test_parenthesised_negative() {
        assert_eq!(number("(500)"), (dec!(-500), CellFormat::Number));
        assert_eq!(number("($1,000.00)"), (dec!(-1000.00), CellFormat::Currency));
        assert_eq!(number("(12.5%)"), (dec!(-12.5), CellFormat::Percent));
    }

    #[test]
    fn test_placeholders_are_absent() {
        for text in ["", "   ", "-", " – ", "—"] {
            assert_eq!(parse_display(text).unwrap(), DisplayValue::Absent, "{text:?}");
        }
    }

    #[test]
    fn test_percent_kept_in_percentage_units() {
        assert_eq!(number("12.3%"), (dec!(12.3), CellFormat::Percent));
        assert_eq!(number("100 %"), (dec!(100), CellFormat::Percent));
    }

    #[test]
    fn test_magnitude_suffixes() {
        assert_eq!(number("£127K").0, dec!(127000));
        assert_eq!(number("1.5k").0, dec!(1500.0));
        assert_eq!(number("$2.25M").0, dec!(2250000.00));
    }

    #[test]
    fn test_leading_minus_variants() {
        assert_eq!(number("-42").0, dec!(-42));
        assert_eq!(number("\u{2212}7.5").0, dec!(-7.5));
        assert_eq!(number("-$120").0, dec!(-120));
        assert_eq!(number("£-120").0, dec!(-120));
    }

    #[test]
    fn test_plain_numbers_and_spaces() {
        assert_eq!(number("1 234"), (dec!(1234), CellFormat::Number));
        assert_eq!(number("0"), (dec!(0), CellFormat::Number));
        assert_eq!(number(" 3.14 "), (dec!(3.14), CellFormat::Number));
    }

    #[test]
    fn test_unparseable_text_is_an_error() {
        for text in ["N/A*", "TBC", "$", "12..3", "1e5", "12%%", "$5%", "-(500)", "12abc"] {
            let err = parse_display(text).unwrap_err();
            assert!(
                matches!(err, AuditError::Parse { .. }),
                "'{text}' should fail with Parse, got {err}"
            );
        }
    }

    #[test]
    fn test_display_value_accessors() {
        assert_eq!(DisplayValue::Absent.value(), None);
        assert_eq!(DisplayValue::Absent.format(), CellFormat::Placeholder);
        let v = parse_display("$10").unwrap();
        assert_eq!(v.value(), Some(dec!(10)));
        assert_eq!(v.format(), CellFormat::Currency);
    }

    #[test]
    fn test_suffix_overflow_is_an_error() {
        match parse_display("79228162514264337593543950335M").unwrap_err() {
            AuditError::Parse { reason, .. } => assert_eq!(reason, "value out of range"),
            other => panic!("Expected Parse, got: {other}"),
        }
        assert!(parse_display("$79,228,162,514,264,337,593,543,950K").is_err());
    }

    #[test]
    fn test_format_suits_field_kind() {
        assert!(CellFormat::Currency.suits(MetricKind::Currency));
        assert!(!CellFormat::Percent.suits(MetricKind::Currency));
        assert!(!CellFormat::Currency.suits(MetricKind::Share));
        assert!(!CellFormat::Currency.suits(MetricKind::Count));
        assert!(CellFormat::Percent.suits(MetricKind::Share));
        assert!(CellFormat::Percent.suits(MetricKind::Count));
        assert!(CellFormat::Number.suits(MetricKind::Currency));
        assert!(CellFormat::Placeholder.suits(MetricKind::Share));
    }
}
