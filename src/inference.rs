use std::collections::{BTreeMap, HashSet};

use log::debug;

use crate::{
    column::Column,
    dataset::Dataset,
    error::Result,
    levels::Level,
    missing::MissingRule,
    numeric::{DecimalSymbol, calc_dps, parse_decimal_comma},
    settings::ImportSettings,
    value::{CellValue, ColumnType, DataType, MISSING_INT, MeasureType, parse_finite_f64, parse_i32},
};

pub fn fix_names(names: &[String]) -> Vec<String> {
    if names.is_empty() {
        return vec!["A".to_string()];
    }
    let mut fixed: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let mut candidate = name.clone();
        let mut suffix = 2;
        while fixed.contains(&candidate) {
            candidate = format!("{name} ({suffix})");
            suffix += 1;
        }
        fixed.push(candidate);
    }
    fixed
}

#[derive(Debug, Clone)]
pub struct ColumnExaminer {
    index: usize,
    missing_token: String,
    decimal_symbol: DecimalSymbol,
    max_uniques: usize,
    includes_na: bool,
    is_empty: bool,
    only_integers: bool,
    only_floats: bool,
    only_locale_numbers: bool,
    uniques: HashSet<String>,
    many_uniques: bool,
    dps: u8,
    resolved: Option<(DataType, MeasureType)>,
}

impl ColumnExaminer {
    pub fn new(index: usize, settings: &ImportSettings) -> Self {
        Self {
            index,
            missing_token: settings.missing_token.clone(),
            decimal_symbol: settings.decimal_symbol,
            max_uniques: settings.max_uniques,
            includes_na: false,
            is_empty: true,
            only_integers: true,
            only_floats: true,
            only_locale_numbers: true,
            uniques: HashSet::new(),
            many_uniques: false,
            dps: 0,
            resolved: None,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_empty(&self) -> bool {
        self.is_empty
    }

    pub fn includes_na(&self) -> bool {
        self.includes_na
    }

    pub fn many_uniques(&self) -> bool {
        self.many_uniques
    }

    pub fn dps(&self) -> u8 {
        self.dps
    }

    pub fn examine(&mut self, row: &[String]) -> bool {
        let Some(value) = row.get(self.index) else {
            return false;
        };
        if value == &self.missing_token {
            self.includes_na = true;
            return true;
        }
        if value.trim().is_empty() {
            return false;
        }
        self.is_empty = false;

        if !self.many_uniques && !self.uniques.contains(value) {
            self.uniques.insert(value.clone());
            if self.uniques.len() > self.max_uniques {
                self.many_uniques = true;
                self.uniques.clear();
            }
        }

        if parse_i32(value).is_none() {
            self.only_integers = false;
        }
        let float = parse_finite_f64(value);
        if float.is_none() {
            self.only_floats = false;
        }
        let locale = float.or_else(|| self.parse_locale(value));
        match locale {
            Some(number) => self.dps = self.dps.max(calc_dps(number)),
            None => self.only_locale_numbers = false,
        }
        true
    }

    fn parse_locale(&self, value: &str) -> Option<f64> {
        match self.decimal_symbol {
            DecimalSymbol::Comma => parse_decimal_comma(value),
            DecimalSymbol::Dot => None,
        }
    }

    pub fn ruminate(&mut self, column: &mut Column) -> Result<()> {
        let (data_type, measure_type) = if self.only_integers {
            if self.many_uniques {
                (DataType::Integer, MeasureType::Continuous)
            } else {
                (DataType::Integer, MeasureType::Nominal)
            }
        } else if self.only_floats || self.only_locale_numbers {
            (DataType::Decimal, MeasureType::Continuous)
        } else if self.many_uniques {
            (DataType::Text, MeasureType::Id)
        } else {
            (DataType::Text, MeasureType::Nominal)
        };

        column.set_data_type(data_type);
        column.set_measure_type(measure_type);
        column.clear_levels();

        match (data_type, measure_type) {
            (DataType::Integer, MeasureType::Nominal) => {
                let mut distinct: BTreeMap<i32, &String> = BTreeMap::new();
                for literal in &self.uniques {
                    if let Some(value) = parse_i32(literal) {
                        distinct
                            .entry(value)
                            .and_modify(|kept| {
                                if literal < *kept {
                                    *kept = literal;
                                }
                            })
                            .or_insert(literal);
                    }
                }
                for (value, literal) in distinct {
                    column.append_level(Level::new(value, literal.clone()))?;
                }
            }
            (DataType::Text, MeasureType::Nominal) => {
                let mut sorted: Vec<&String> = self.uniques.iter().collect();
                sorted.sort();
                for (code, literal) in (0..).zip(sorted) {
                    column.append_level(Level::new(code, literal.clone()))?;
                }
                if self.includes_na {
                    let code = column.levels().next_value();
                    column.append_level(Level::new(code, self.missing_token.clone()))?;
                }
            }
            _ => {}
        }

        if data_type == DataType::Text && self.includes_na {
            let mut rules = column.missing_values().clone();
            rules.push(MissingRule::parse(&format!("== \"{}\"", self.missing_token))?);
            column.missing_values = rules;
        }

        column.set_dps(self.dps);
        debug!(
            "Column '{}' inferred as {data_type}/{measure_type} ({} level(s), dps {})",
            column.name(),
            column.level_count(),
            self.dps
        );
        self.resolved = Some((data_type, measure_type));
        Ok(())
    }

    pub fn parse(&mut self, column: &mut Column, row: &[String], row_no: usize) -> Result<()> {
        if self.resolved.is_none() {
            self.ruminate(column)?;
        }
        let raw = row.get(self.index).map(String::as_str).unwrap_or("");
        let is_token = raw == self.missing_token;
        let blank = raw.trim().is_empty();

        match column.data_type() {
            DataType::Integer => {
                if blank || is_token {
                    column.clear_at(row_no)?;
                } else {
                    let value = parse_i32(raw).unwrap_or(MISSING_INT);
                    column.set_value(row_no, CellValue::Int(value))?;
                }
            }
            DataType::Decimal => {
                let value = if blank || is_token {
                    f64::NAN
                } else {
                    parse_finite_f64(raw)
                        .or_else(|| self.parse_locale(raw))
                        .unwrap_or(f64::NAN)
                };
                column.set_value(row_no, CellValue::Float(value))?;
            }
            DataType::Text => {
                if blank {
                    column.clear_at(row_no)?;
                } else {
                    column.set_value(row_no, CellValue::Text(raw.to_string()))?;
                }
            }
        }
        Ok(())
    }
}

/// Builds a dataset from a header row and data rows. Trailing rows with no
/// values (blank cells only) are left out of the row count; a missing-value
/// token counts as a value.
pub fn infer_dataset(
    header: &[String],
    rows: &[Vec<String>],
    settings: &ImportSettings,
) -> Result<Dataset> {
    let names = fix_names(header);
    let mut dataset = Dataset::new();
    let mut examiners = Vec::with_capacity(names.len());
    for (index, name) in names.into_iter().enumerate() {
        let column = dataset.append_column(name);
        column.set_import_name(header.get(index).cloned().unwrap_or_default());
        column.set_column_type(ColumnType::Data);
        examiners.push(ColumnExaminer::new(index, settings));
    }

    let mut row_count = 0;
    let mut empty_run = 0;
    for row in rows {
        let mut has_value = false;
        for examiner in &mut examiners {
            has_value |= examiner.examine(row);
        }
        if has_value {
            row_count += empty_run + 1;
            empty_run = 0;
        } else {
            empty_run += 1;
        }
    }

    for (index, examiner) in examiners.iter_mut().enumerate() {
        examiner.ruminate(dataset.column_mut(index)?)?;
    }

    dataset.set_row_count(row_count);
    for (row_no, row) in rows.iter().take(row_count).enumerate() {
        for (index, examiner) in examiners.iter_mut().enumerate() {
            examiner.parse(dataset.column_mut(index)?, row, row_no)?;
        }
    }

    debug!(
        "Inferred {} column(s) over {row_count} row(s); {} trailing empty row(s) dropped",
        dataset.column_count(),
        rows.len() - row_count
    );
    Ok(dataset)
}
