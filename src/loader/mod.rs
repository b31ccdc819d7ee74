pub mod csv_loader;
pub mod spreadsheet_loader;
pub mod unified_loader;

pub use unified_loader::{load_table, SourceFormat, TableLoader};
