use std::path::Path;

use serde::Serialize;

use crate::{
    app::GlobalOptions,
    commands::common::load_view,
    output::{print_output, Align, TabWriter},
};

#[derive(Debug, Serialize)]
struct TableEntry {
    table: String,
    rows: u32,
}

#[derive(Debug, Serialize)]
struct MetadataInfo {
    version: String,
    module: String,
    mvid: String,
    type_count: u32,
    tables: Vec<TableEntry>,
}

pub fn run(path: &Path, opts: &GlobalOptions) -> anyhow::Result<()> {
    let view = load_view(path)?;
    let metadata = view.metadata();

    let tables = metadata
        .tables()
        .table_summary()
        .into_iter()
        .map(|summary| TableEntry {
            table: format!("{:?}", summary.table_id),
            rows: summary.row_count,
        })
        .collect();

    let info = MetadataInfo {
        version: metadata.version().to_string(),
        module: metadata.module_name()?.to_string(),
        mvid: metadata.mvid()?.to_string(),
        type_count: metadata.type_count(),
        tables,
    };

    print_output(&info, opts, |info| {
        println!("Version:  {}", info.version);
        println!("Module:   {}", info.module);
        println!("MVID:     {}", info.mvid);
        println!("Types:    {}", info.type_count);

        println!("\nTables:");
        let mut tw =
            TabWriter::new(vec![("Table", Align::Left), ("Rows", Align::Right)]).indent("  ");
        for t in &info.tables {
            tw.row(vec![t.table.clone(), t.rows.to_string()]);
        }
        tw.print();
    })
}
