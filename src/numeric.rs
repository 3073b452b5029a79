use std::{fmt, str::FromStr, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::value::parse_finite_f64;

pub const MAX_DPS: u8 = 3;

static COMMA_GROUPED_INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d{1,3}(,\d{3}){2,}$").expect("valid grouping pattern"));

static DOT_GROUPED_INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d{1,3}(\.\d{3}){2,}$").expect("valid grouping pattern"));

static DECIMAL_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d*,\d+$").expect("valid decimal comma pattern"));

static DOT_GROUPED_DECIMAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-?\d{1,3}(\.\d{3})+(,\d+)?$").expect("valid decimal comma pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DecimalSymbol {
    #[default]
    #[serde(rename = ".")]
    Dot,
    #[serde(rename = ",")]
    Comma,
}

impl DecimalSymbol {
    pub fn as_char(&self) -> char {
        match self {
            DecimalSymbol::Dot => '.',
            DecimalSymbol::Comma => ',',
        }
    }
}

impl fmt::Display for DecimalSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl FromStr for DecimalSymbol {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "." | "dot" | "point" => Ok(DecimalSymbol::Dot),
            "," | "comma" => Ok(DecimalSymbol::Comma),
            other => Err(format!("Decimal symbol must be '.' or ',' (got '{other}')")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NumericLiteral {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl NumericLiteral {
    pub fn is_number(&self) -> bool {
        !matches!(self, NumericLiteral::Text(_))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            NumericLiteral::Integer(v) => Some(*v as f64),
            NumericLiteral::Float(v) => Some(*v),
            NumericLiteral::Text(_) => None,
        }
    }
}

pub fn parse_numeric(text: &str, decimal_symbol: DecimalSymbol) -> NumericLiteral {
    let compact: String = text.trim().chars().filter(|c| *c != ' ').collect();
    let has_comma = compact.contains(',');
    let has_dot = compact.contains('.');

    let parsed = match (has_comma, has_dot) {
        (true, true) => parse_mixed_separators(&compact),
        (true, false) => {
            if COMMA_GROUPED_INTEGER.is_match(&compact) {
                parse_integer(&compact.replace(',', ""))
            } else if decimal_symbol == DecimalSymbol::Comma {
                parse_float(&compact.replace(',', "."))
            } else {
                parse_integer(&compact.replace(',', ""))
            }
        }
        (false, true) => {
            if decimal_symbol == DecimalSymbol::Comma && DOT_GROUPED_INTEGER.is_match(&compact) {
                parse_integer(&compact.replace('.', ""))
            } else {
                parse_float(&compact)
            }
        }
        (false, false) => parse_integer(&compact),
    };

    parsed.unwrap_or_else(|| NumericLiteral::Text(text.to_string()))
}

/// A number written with a decimal comma (`12,5`, `1.234,5`, `1.234.567`).
/// Comma-grouped text such as `1,234,567` is not accepted.
pub fn parse_decimal_comma(text: &str) -> Option<f64> {
    let compact: String = text.trim().chars().filter(|c| *c != ' ').collect();
    if DECIMAL_COMMA.is_match(&compact) || DOT_GROUPED_DECIMAL.is_match(&compact) {
        parse_numeric(&compact, DecimalSymbol::Comma).as_f64()
    } else {
        None
    }
}

fn parse_mixed_separators(compact: &str) -> Option<NumericLiteral> {
    let decimal_at = compact.rfind([',', '.'])?;
    let (whole, fraction) = compact.split_at(decimal_at);
    let whole: String = whole.chars().filter(|c| *c != ',' && *c != '.').collect();
    parse_float(&format!("{whole}.{}", &fraction[1..]))
}

fn parse_integer(value: &str) -> Option<NumericLiteral> {
    value.parse::<i64>().ok().map(NumericLiteral::Integer)
}

fn parse_float(value: &str) -> Option<NumericLiteral> {
    parse_finite_f64(value).map(NumericLiteral::Float)
}

pub fn calc_dps(value: f64) -> u8 {
    calc_dps_bounded(value, MAX_DPS)
}

pub fn calc_dps_bounded(value: f64, max_dp: u8) -> u8 {
    if !value.is_finite() {
        return 0;
    }
    let fraction = value.rem_euclid(1.0);
    let formatted = format!("{fraction:.prec$}", prec = usize::from(max_dp));
    // "0.120" -> "120"; rounding can carry into "1.000", whose digits are all zero.
    let digits = formatted.split_once('.').map(|(_, d)| d).unwrap_or("");
    digits.trim_end_matches('0').len() as u8
}
