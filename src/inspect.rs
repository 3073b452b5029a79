use anyhow::{Context, Result};
use itertools::Itertools;
use log::info;

use crate::{cli::InspectArgs, column::Column, load_dataset, table};

const MAX_LISTED_LEVELS: usize = 6;

pub fn execute(args: &InspectArgs) -> Result<()> {
    let (dataset, _) = load_dataset(&args.input, None)?;

    let headers = ["#", "name", "data type", "measure", "dps", "levels", "missing"]
        .iter()
        .map(|h| h.to_string())
        .collect::<Vec<_>>();
    let rows = dataset
        .iter()
        .map(|column| {
            vec![
                (column.index() + 1).to_string(),
                column.name().to_string(),
                column.data_type().to_string(),
                column.measure_type().to_string(),
                column.dps().to_string(),
                summarize_levels(column),
                column.missing_values().to_strings().join("; "),
            ]
        })
        .collect::<Vec<_>>();
    table::print_table(&headers, &rows);

    if let Some(meta) = &args.meta {
        dataset
            .schema()
            .save(meta)
            .with_context(|| format!("Writing schema to {meta:?}"))?;
        info!(
            "Schema for {} column(s) written to {:?}",
            dataset.column_count(),
            meta
        );
    }
    Ok(())
}

fn summarize_levels(column: &Column) -> String {
    if !column.has_levels() {
        return String::new();
    }
    let mut listed = column
        .levels()
        .iter()
        .take(MAX_LISTED_LEVELS)
        .map(|level| level.label.as_str())
        .join(", ");
    if column.level_count() > MAX_LISTED_LEVELS {
        listed.push_str(&format!(", ... ({} total)", column.level_count()));
    }
    listed
}
