use std::{cmp::Ordering, fmt, str::FromStr, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    error::DatasetError,
    value::{CellValue, int_to_float, parse_finite_f64},
};

static RULE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(==|!=|<=|>=|<|>)\s*(.*?)\s*$").expect("valid missing rule pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
    Le,
    Ge,
    Lt,
    Gt,
}

impl Comparison {
    fn symbol(&self) -> &'static str {
        match self {
            Comparison::Eq => "==",
            Comparison::Ne => "!=",
            Comparison::Le => "<=",
            Comparison::Ge => ">=",
            Comparison::Lt => "<",
            Comparison::Gt => ">",
        }
    }

    fn holds(&self, ordering: Ordering) -> bool {
        match self {
            Comparison::Eq => ordering == Ordering::Equal,
            Comparison::Ne => ordering != Ordering::Equal,
            Comparison::Le => ordering != Ordering::Greater,
            Comparison::Ge => ordering != Ordering::Less,
            Comparison::Lt => ordering == Ordering::Less,
            Comparison::Gt => ordering == Ordering::Greater,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MissingRule {
    pub comparison: Comparison,
    pub operand: Operand,
    source: String,
}

impl MissingRule {
    pub fn parse(rule: &str) -> Result<Self, DatasetError> {
        let captures = RULE_PATTERN
            .captures(rule)
            .ok_or_else(|| DatasetError::InvalidMissingRule(rule.to_string()))?;
        let comparison = match &captures[1] {
            "==" => Comparison::Eq,
            "!=" => Comparison::Ne,
            "<=" => Comparison::Le,
            ">=" => Comparison::Ge,
            "<" => Comparison::Lt,
            ">" => Comparison::Gt,
            _ => return Err(DatasetError::InvalidMissingRule(rule.to_string())),
        };
        let raw = &captures[2];
        let operand = if let Some(quoted) = unquote(raw) {
            Operand::Text(quoted.to_string())
        } else if let Some(number) = parse_finite_f64(raw) {
            Operand::Number(number)
        } else if raw.is_empty() {
            return Err(DatasetError::InvalidMissingRule(rule.to_string()));
        } else {
            Operand::Text(raw.to_string())
        };
        Ok(Self {
            comparison,
            operand,
            source: format!("{} {}", comparison.symbol(), raw),
        })
    }

    pub fn matches(&self, value: &CellValue) -> bool {
        let ordering = match (&self.operand, value) {
            (Operand::Number(operand), CellValue::Int(v)) => {
                compare_numbers(int_to_float(*v), *operand)
            }
            (Operand::Number(operand), CellValue::Float(v)) => compare_numbers(*v, *operand),
            (Operand::Number(operand), CellValue::Text(v)) => match parse_finite_f64(v) {
                Some(parsed) => compare_numbers(parsed, *operand),
                None => return self.comparison == Comparison::Ne && !v.is_empty(),
            },
            (Operand::Text(operand), CellValue::Text(v)) => Some(v.as_str().cmp(operand.as_str())),
            (Operand::Text(operand), other) => {
                if other.is_missing(false) {
                    None
                } else {
                    Some(other.as_display().as_str().cmp(operand.as_str()))
                }
            }
        };
        ordering.is_some_and(|ordering| self.comparison.holds(ordering))
    }

    pub fn flags_empty_text(&self) -> bool {
        self.comparison == Comparison::Eq && self.operand == Operand::Text(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

fn compare_numbers(value: f64, operand: f64) -> Option<Ordering> {
    if value.is_nan() {
        None
    } else {
        value.partial_cmp(&operand)
    }
}

fn unquote(raw: &str) -> Option<&str> {
    let bytes = raw.as_bytes();
    if raw.len() >= 2
        && ((bytes[0] == b'"' && bytes[raw.len() - 1] == b'"')
            || (bytes[0] == b'\'' && bytes[raw.len() - 1] == b'\''))
    {
        Some(&raw[1..raw.len() - 1])
    } else {
        None
    }
}

impl fmt::Display for MissingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for MissingRule {
    type Err = DatasetError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        MissingRule::parse(value)
    }
}

impl Serialize for MissingRule {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for MissingRule {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let source = String::deserialize(deserializer)?;
        MissingRule::parse(&source).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MissingValues {
    rules: Vec<MissingRule>,
}

impl MissingValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse<I, S>(rules: I) -> Result<Self, DatasetError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rules = rules
            .into_iter()
            .map(|rule| MissingRule::parse(rule.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    pub fn push(&mut self, rule: MissingRule) {
        if !self.rules.contains(&rule) {
            self.rules.push(rule);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MissingRule> {
        self.rules.iter()
    }

    pub fn matches(&self, value: &CellValue) -> bool {
        self.rules.iter().any(|rule| rule.matches(value))
    }

    pub fn flags_empty_text(&self) -> bool {
        self.rules.iter().any(MissingRule::flags_empty_text)
    }

    pub fn to_strings(&self) -> Vec<String> {
        self.rules.iter().map(|rule| rule.source.clone()).collect()
    }
}
