use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::Decimal;

use crate::ParseError;

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

// Numeric body after sign and currency symbol have been stripped. Grouping,
// when present, must be well-formed: "1,234.56" is fine, "1,23.45" is not.
re!(re_body_comma_grouped, r"^(?:\d{1,3}(?:,\d{3})+|\d+)(?:\.\d+)?$");
re!(re_body_dot_grouped, r"^(?:\d{1,3}(?:\.\d{3})+|\d+)(?:,\d+)?$");

/// Per-currency amount grammar. Each format fixes a currency symbol, a
/// thousands separator, and a decimal separator; everything else about the
/// shape (optional symbol, parentheses-for-negative, leading or trailing
/// minus) is shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountFormat {
    Usd,
    Eur,
    Gbp,
    Cad,
}

impl AmountFormat {
    pub fn name(self) -> &'static str {
        match self {
            AmountFormat::Usd => "USD",
            AmountFormat::Eur => "EUR",
            AmountFormat::Gbp => "GBP",
            AmountFormat::Cad => "CAD",
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            AmountFormat::Usd | AmountFormat::Cad => "$",
            AmountFormat::Eur => "€",
            AmountFormat::Gbp => "£",
        }
    }

    fn thousands_sep(self) -> char {
        match self {
            AmountFormat::Eur => '.',
            _ => ',',
        }
    }

    fn decimal_sep(self) -> char {
        match self {
            AmountFormat::Eur => ',',
            _ => '.',
        }
    }

    fn body_regex(self) -> &'static Regex {
        match self {
            AmountFormat::Eur => re_body_dot_grouped(),
            _ => re_body_comma_grouped(),
        }
    }
}

impl FromStr for AmountFormat {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "USD" => Ok(AmountFormat::Usd),
            "EUR" => Ok(AmountFormat::Eur),
            "GBP" => Ok(AmountFormat::Gbp),
            "CAD" => Ok(AmountFormat::Cad),
            other => Err(ParseError::UnknownAmountFormat(other.to_string())),
        }
    }
}

impl std::fmt::Display for AmountFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Parse a raw amount field into a signed decimal.
///
/// Accepted shapes, all optional and combinable: currency symbol,
/// thousands separators, `(100.00)` accounting negatives, leading minus,
/// trailing minus. The sign of the input is preserved.
pub fn parse_amount(s: &str, format: AmountFormat) -> Result<Decimal, ParseError> {
    let raw = s.trim();
    if raw.is_empty() {
        return Err(ParseError::InvalidAmount(s.to_string()));
    }

    let (parens_negative, inner) = if raw.starts_with('(') && raw.ends_with(')') {
        (true, raw[1..raw.len() - 1].trim())
    } else {
        (false, raw)
    };

    let stripped = inner.replace(format.symbol(), "");
    let mut body = stripped.trim().to_string();

    let mut minus_negative = false;
    if let Some(rest) = body.strip_prefix('-') {
        minus_negative = true;
        body = rest.trim_start().to_string();
    } else if let Some(rest) = body.strip_suffix('-') {
        minus_negative = true;
        body = rest.trim_end().to_string();
    }

    if !format.body_regex().is_match(&body) {
        return Err(ParseError::InvalidAmount(s.to_string()));
    }

    let normalized: String = body
        .chars()
        .filter(|&c| c != format.thousands_sep())
        .map(|c| if c == format.decimal_sep() { '.' } else { c })
        .collect();

    let mut value =
        Decimal::from_str(&normalized).map_err(|_| ParseError::InvalidAmount(s.to_string()))?;

    if parens_negative || minus_negative {
        value = -value;
    }
    Ok(value)
}
