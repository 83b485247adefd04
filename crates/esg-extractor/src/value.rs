//! Value parsing
//!
//! Converts raw cell or key-value strings such as `"1,234.56 kg"` into a
//! number and an optional unit. Thousands separators are stripped first,
//! then the leading (optionally signed, optionally decimal) number is taken
//! and whatever follows it, trimmed, becomes the unit.

use regex::Regex;

/// A parsed numeric value with its trailing unit
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedValue {
    pub value: f64,
    pub unit: Option<String>,
}

impl ParsedValue {
    pub fn into_parts(self) -> (f64, Option<String>) {
        (self.value, self.unit)
    }
}

/// Parser for numeric values with trailing units
#[derive(Debug, Clone)]
pub struct ValueParser {
    leading_number: Regex,
}

impl ValueParser {
    pub fn new() -> Self {
        Self {
            // A literal pattern; compilation cannot fail
            leading_number: Regex::new(r"^[-+]?(?:\d+(?:\.\d*)?|\.\d+)")
                .unwrap_or_else(|e| unreachable!("invalid number pattern: {e}")),
        }
    }

    /// Parse a raw value string.
    ///
    /// Returns `None` when the text does not start with a number or the
    /// number does not fit a finite `f64`. Never panics.
    pub fn parse(&self, text: &str) -> Option<ParsedValue> {
        let cleaned = text.trim().replace(',', "");

        let mat = self.leading_number.find(&cleaned)?;
        let value: f64 = mat.as_str().parse().ok()?;
        if !value.is_finite() {
            return None;
        }

        let unit = cleaned[mat.end()..].trim();
        let unit = (!unit.is_empty()).then(|| unit.to_string());

        Some(ParsedValue { value, unit })
    }
}

impl Default for ValueParser {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Option<(f64, Option<String>)> {
        ValueParser::new().parse(text).map(ParsedValue::into_parts)
    }

    #[test]
    fn test_reference_values() {
        assert_eq!(parse("123.45"), Some((123.45, None)));
        assert_eq!(parse("1,234.56 kg"), Some((1234.56, Some("kg".to_string()))));
        assert_eq!(parse("45%"), Some((45.0, Some("%".to_string()))));
        assert_eq!(parse("invalid"), None);
    }

    #[test]
    fn test_signs_and_decimals() {
        assert_eq!(parse("-12.5 tCO2e"), Some((-12.5, Some("tCO2e".to_string()))));
        assert_eq!(parse("+3"), Some((3.0, None)));
        assert_eq!(parse(".5"), Some((0.5, None)));
        assert_eq!(parse("7."), Some((7.0, None)));
    }

    #[test]
    fn test_whitespace_and_units() {
        assert_eq!(
            parse("  1,234 tons  "),
            Some((1234.0, Some("tons".to_string())))
        );
        assert_eq!(
            parse("12 000 MWh"),
            Some((12.0, Some("000 MWh".to_string())))
        );
        assert_eq!(parse("0"), Some((0.0, None)));
    }

    #[test]
    fn test_rejects_non_leading_numbers() {
        assert_eq!(parse(""), None);
        assert_eq!(parse("   "), None);
        assert_eq!(parse("$1,000"), None);
        assert_eq!(parse("approx. 40"), None);
        assert_eq!(parse("-"), None);
        assert_eq!(parse("N/A"), None);
    }

    #[test]
    fn test_rejects_overflow() {
        let huge = "9".repeat(400);
        assert_eq!(parse(&huge), None);
    }
}
