use std::borrow::Cow;
use std::fmt::Write as _;

use crate::{
    column::{Column, FValue},
    error::Result,
    value::{CellValue, float_to_text},
};

pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths = headers.iter().map(|h| display_width(h)).collect::<Vec<_>>();
    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(widths.len()) {
            widths[idx] = widths[idx].max(display_width(cell));
        }
    }
    for width in &mut widths {
        *width = (*width).max(1);
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers, &widths));

    let separator_widths = widths.iter().map(|w| (*w).max(3)).collect::<Vec<usize>>();
    let separator_cells = separator_widths
        .iter()
        .map(|w| "-".repeat(*w))
        .collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&separator_cells, &separator_widths));

    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths));
    }
    output
}

pub fn print_table(headers: &[String], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

pub fn display_cell(column: &Column, row: usize) -> Result<String> {
    Ok(match column.fvalue(row)? {
        FValue::Missing => String::new(),
        FValue::Level(level) => level.label.clone(),
        FValue::Value(CellValue::Float(value)) => float_to_text(value, Some(column.dps())),
        FValue::Value(value) => value.as_display(),
    })
}

fn format_row(values: &[String], widths: &[usize]) -> String {
    let mut cells = Vec::with_capacity(values.len());
    for (value, width) in values.iter().zip(widths) {
        let sanitized = sanitize_cell(value);
        let padding = width.saturating_sub(display_width(sanitized.as_ref()));
        let mut cell = sanitized.into_owned();
        cell.push_str(&" ".repeat(padding));
        cells.push(cell);
    }
    cells.join("  ").trim_end().to_string()
}

fn display_width(value: &str) -> usize {
    value.chars().count()
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}
