use std::path::{Path, PathBuf};
use tracing::info;

use super::csv_loader::read_csv;
use super::spreadsheet_loader::read_spreadsheet;
use crate::error::{Result, TableError};
use crate::processor::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Spreadsheet,
    Csv,
}

impl SourceFormat {
    /// Format implied by the file extension, case-insensitive.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "xlsx" | "xlsm" | "xls" | "ods" => Ok(SourceFormat::Spreadsheet),
            "csv" => Ok(SourceFormat::Csv),
            _ => Err(TableError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Load any supported file into a table labeled `0..n`.
pub fn load_table(path: impl AsRef<Path>) -> Result<Table> {
    let path = path.as_ref();
    let format = SourceFormat::from_path(path)?;
    std::fs::metadata(path).map_err(|source| TableError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let frame = match format {
        SourceFormat::Spreadsheet => read_spreadsheet(path)?,
        SourceFormat::Csv => read_csv(path)?,
    };

    info!(
        "Loaded {} rows x {} columns from {}",
        frame.height(),
        frame.width(),
        path.display()
    );
    Ok(Table::new(frame))
}

/// Loads named files from one data directory.
pub struct TableLoader {
    data_dir: PathBuf,
}

impl TableLoader {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn path_for(&self, file: &str) -> PathBuf {
        self.data_dir.join(file)
    }

    pub fn load(&self, file: &str) -> Result<Table> {
        load_table(self.path_for(file))
    }

    /// Load `file` and fail unless every column in `required` is present.
    pub fn load_with_columns(&self, file: &str, required: &[&str]) -> Result<Table> {
        let table = self.load(file)?;
        table.require_columns(required)?;
        Ok(table)
    }
}
