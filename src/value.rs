use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::DatasetError;

pub const MISSING_INT: i32 = i32::MIN;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Integer,
    Decimal,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasureType {
    Nominal,
    Ordinal,
    Continuous,
    Id,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    None,
    #[default]
    Data,
    Computed,
    Recoded,
    Filter,
    Output,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Integer => "integer",
            DataType::Decimal => "decimal",
            DataType::Text => "text",
        }
    }

    pub fn canonical_measure_type(&self) -> MeasureType {
        match self {
            DataType::Decimal => MeasureType::Continuous,
            DataType::Integer | DataType::Text => MeasureType::Nominal,
        }
    }
}

impl MeasureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeasureType::Nominal => "nominal",
            MeasureType::Ordinal => "ordinal",
            MeasureType::Continuous => "continuous",
            MeasureType::Id => "id",
        }
    }

    pub fn is_categorical(&self) -> bool {
        matches!(self, MeasureType::Nominal | MeasureType::Ordinal)
    }

    pub fn is_compatible_with(&self, data_type: DataType) -> bool {
        match self {
            MeasureType::Continuous => matches!(data_type, DataType::Integer | DataType::Decimal),
            MeasureType::Nominal | MeasureType::Ordinal => {
                matches!(data_type, DataType::Integer | DataType::Text)
            }
            MeasureType::Id => true,
        }
    }
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::None => "none",
            ColumnType::Data => "data",
            ColumnType::Computed => "computed",
            ColumnType::Recoded => "recoded",
            ColumnType::Filter => "filter",
            ColumnType::Output => "output",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for MeasureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = DatasetError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "integer" | "int" => Ok(DataType::Integer),
            "decimal" | "float" | "double" => Ok(DataType::Decimal),
            "text" | "string" => Ok(DataType::Text),
            _ => Err(DatasetError::UnknownDataType(value.to_string())),
        }
    }
}

impl FromStr for MeasureType {
    type Err = DatasetError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "nominal" => Ok(MeasureType::Nominal),
            "ordinal" => Ok(MeasureType::Ordinal),
            "continuous" => Ok(MeasureType::Continuous),
            "id" => Ok(MeasureType::Id),
            _ => Err(DatasetError::UnknownMeasureType(value.to_string())),
        }
    }
}

impl FromStr for ColumnType {
    type Err = DatasetError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(ColumnType::None),
            "data" => Ok(ColumnType::Data),
            "computed" => Ok(ColumnType::Computed),
            "recoded" => Ok(ColumnType::Recoded),
            "filter" => Ok(ColumnType::Filter),
            "output" => Ok(ColumnType::Output),
            _ => Err(DatasetError::UnknownColumnType(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Int(i32),
    Float(f64),
    Text(String),
}

impl CellValue {
    pub fn missing(data_type: DataType) -> Self {
        match data_type {
            DataType::Integer => CellValue::Int(MISSING_INT),
            DataType::Decimal => CellValue::Float(f64::NAN),
            DataType::Text => CellValue::Text(String::new()),
        }
    }

    pub fn is_missing(&self, empty_text_is_missing: bool) -> bool {
        match self {
            CellValue::Int(v) => *v == MISSING_INT,
            CellValue::Float(v) => v.is_nan(),
            CellValue::Text(v) => empty_text_is_missing && v.is_empty(),
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            CellValue::Int(_) => DataType::Integer,
            CellValue::Float(_) => DataType::Decimal,
            CellValue::Text(_) => DataType::Text,
        }
    }

    pub fn convert_to(&self, target: DataType) -> CellValue {
        match (self, target) {
            (CellValue::Int(v), DataType::Integer) => CellValue::Int(*v),
            (CellValue::Int(v), DataType::Decimal) => CellValue::Float(int_to_float(*v)),
            (CellValue::Int(v), DataType::Text) => CellValue::Text(int_to_text(*v)),
            (CellValue::Float(v), DataType::Integer) => CellValue::Int(float_to_int(*v)),
            (CellValue::Float(v), DataType::Decimal) => CellValue::Float(*v),
            (CellValue::Float(v), DataType::Text) => CellValue::Text(float_to_text(*v, None)),
            (CellValue::Text(v), DataType::Integer) => CellValue::Int(text_to_int(v)),
            (CellValue::Text(v), DataType::Decimal) => CellValue::Float(text_to_float(v)),
            (CellValue::Text(v), DataType::Text) => CellValue::Text(v.clone()),
        }
    }

    pub fn as_display(&self) -> String {
        match self {
            CellValue::Int(v) => int_to_text(*v),
            CellValue::Float(v) => float_to_text(*v, None),
            CellValue::Text(v) => v.clone(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        CellValue::Int(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Float(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

pub fn int_to_float(value: i32) -> f64 {
    if value == MISSING_INT {
        f64::NAN
    } else {
        f64::from(value)
    }
}

pub fn int_to_text(value: i32) -> String {
    if value == MISSING_INT {
        String::new()
    } else {
        value.to_string()
    }
}

pub fn float_to_int(value: f64) -> i32 {
    if !value.is_finite() {
        return MISSING_INT;
    }
    let rounded = value.round();
    if rounded <= f64::from(MISSING_INT) || rounded > f64::from(i32::MAX) {
        MISSING_INT
    } else {
        rounded as i32
    }
}

pub fn float_to_text(value: f64, dps: Option<u8>) -> String {
    if value.is_nan() {
        return String::new();
    }
    match dps {
        Some(dps) => format!("{value:.prec$}", prec = usize::from(dps)),
        None => {
            if value.fract() == 0.0 && value.abs() < 1e15 {
                format!("{value:.0}")
            } else {
                value.to_string()
            }
        }
    }
}

pub fn text_to_int(value: &str) -> i32 {
    parse_i32(value).unwrap_or(MISSING_INT)
}

pub fn text_to_float(value: &str) -> f64 {
    parse_finite_f64(value).unwrap_or(f64::NAN)
}

pub fn parse_i32(value: &str) -> Option<i32> {
    let parsed: i64 = value.trim().parse().ok()?;
    if parsed <= i64::from(MISSING_INT) || parsed > i64::from(i32::MAX) {
        None
    } else {
        Some(parsed as i32)
    }
}

pub fn parse_finite_f64(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|parsed| parsed.is_finite())
}
