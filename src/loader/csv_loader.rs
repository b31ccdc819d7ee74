use polars::prelude::*;
use std::path::Path;

use crate::error::Result;

/// Read a headed CSV file, inferring dtypes from every row.
pub fn read_csv(path: &Path) -> Result<DataFrame> {
    let frame = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    Ok(frame)
}
