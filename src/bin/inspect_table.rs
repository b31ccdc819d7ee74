use anyhow::{Context, Result};
use pizza_sales::loader::load_table;
use std::env;

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let path = env::args()
        .nth(1)
        .context("Usage: inspect_table <file.xlsx|file.csv> [rows]")?;
    let rows: usize = match env::args().nth(2) {
        Some(rows) => rows
            .parse()
            .with_context(|| format!("Invalid row count: {}", rows))?,
        None => 5,
    };

    let table = load_table(&path).with_context(|| format!("Failed to load {}", path))?;

    println!("=== {} ({} rows x {} columns) ===\n", path, table.height(), table.width());
    println!("{}", table.head(rows));

    println!("\nColumns:");
    for column in table.info() {
        println!("   {:<20} {:<16} {} non-null", column.name, column.dtype.to_string(), column.non_null);
    }

    println!("\n{}", table.describe()?);

    let nulls: usize = table.null_counts().iter().map(|(_, n)| n).sum();
    println!("Missing values: {}", nulls);
    println!("Duplicated rows: {}", table.duplicate_count()?);
    Ok(())
}
