use anyhow::Result;
use log::info;

use crate::{cli::PreviewArgs, load_dataset, table};

pub fn execute(args: &PreviewArgs) -> Result<()> {
    let (dataset, _) = load_dataset(&args.input, args.meta.as_deref())?;
    let shown = args.rows.min(dataset.row_count_ex_filtered());

    let mut rows = Vec::with_capacity(shown);
    for row in dataset.get_indices_ex_filtered(0, shown)? {
        let cells = dataset
            .iter()
            .map(|column| table::display_cell(column, row))
            .collect::<crate::error::Result<Vec<_>>>()?;
        rows.push(cells);
    }

    table::print_table(&dataset.headers(), &rows);
    info!(
        "Displayed {} of {} row(s) ({} filtered out) from {:?}",
        rows.len(),
        dataset.row_count(),
        dataset.row_count() - dataset.row_count_ex_filtered(),
        args.input.input
    );
    Ok(())
}
