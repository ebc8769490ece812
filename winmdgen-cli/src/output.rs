use comfy_table::{presets, CellAlignment, ContentArrangement, Table};
use serde::Serialize;

use crate::app::GlobalOptions;

/// Print `data` as pretty JSON with `--json`, otherwise hand it to `display_fn`.
pub fn print_output<T: Serialize>(
    data: &T,
    opts: &GlobalOptions,
    display_fn: impl FnOnce(&T),
) -> anyhow::Result<()> {
    if !opts.json {
        display_fn(data);
        return Ok(());
    }

    println!("{}", serde_json::to_string_pretty(data)?);
    Ok(())
}

/// Column alignment for tabular output.
#[derive(Clone, Copy)]
pub enum Align {
    Left,
    Right,
}

impl From<Align> for CellAlignment {
    fn from(align: Align) -> Self {
        match align {
            Align::Left => CellAlignment::Left,
            Align::Right => CellAlignment::Right,
        }
    }
}

/// Borderless table whose columns are sized to their widest cell.
pub struct TabWriter {
    table: Table,
    indent: String,
}

impl TabWriter {
    /// Create a table from `(header, alignment)` pairs.
    pub fn new(columns: Vec<(&str, Align)>) -> Self {
        let mut table = Table::new();
        table
            .load_preset(presets::NOTHING)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(columns.iter().map(|(header, _)| *header));

        // Two spaces between columns, none at the outer edges
        let last = columns.len().saturating_sub(1);
        for (index, (_, align)) in columns.into_iter().enumerate() {
            let Some(column) = table.column_mut(index) else {
                continue;
            };
            column.set_cell_alignment(align.into());
            column.set_padding((u16::from(index != 0), u16::from(index != last)));
        }

        Self {
            table,
            indent: String::new(),
        }
    }

    /// Prefix every printed line with `prefix`.
    pub fn indent(mut self, prefix: &str) -> Self {
        prefix.clone_into(&mut self.indent);
        self
    }

    /// Add a row, values in column order.
    pub fn row(&mut self, values: Vec<String>) {
        self.table.add_row(values);
    }

    /// Print to stdout without trailing whitespace.
    pub fn print(&self) {
        for line in self.table.to_string().lines() {
            println!("{}{}", self.indent, line.trim_end());
        }
    }
}
