use calamine::{open_workbook_auto, Data, Reader};
use polars::prelude::*;
use std::path::Path;
use tracing::debug;

use crate::error::{Result, TableError};

const MILLIS_PER_DAY: f64 = 86_400_000.0;
const NANOS_PER_MILLI: i64 = 1_000_000;

/// Dtype family of a spreadsheet column, widened cell by cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Empty,
    Int,
    Float,
    Bool,
    DateTime,
    Time,
    Text,
}

impl CellKind {
    fn of(cell: &Data) -> Self {
        match cell {
            Data::Empty | Data::Error(_) => CellKind::Empty,
            Data::Int(_) => CellKind::Int,
            Data::Float(f) if f.is_finite() && f.fract() == 0.0 => CellKind::Int,
            Data::Float(_) => CellKind::Float,
            Data::Bool(_) => CellKind::Bool,
            Data::DateTime(dt) if dt.as_f64() < 1.0 => CellKind::Time,
            Data::DateTime(_) => CellKind::DateTime,
            _ => CellKind::Text,
        }
    }

    fn widen(self, other: CellKind) -> CellKind {
        use CellKind::*;
        match (self, other) {
            (Empty, k) | (k, Empty) => k,
            (a, b) if a == b => a,
            (Int, Float) | (Float, Int) => Float,
            _ => Text,
        }
    }
}

/// Read the first sheet of a workbook. The first row holds the column names.
pub fn read_spreadsheet(path: &Path) -> Result<DataFrame> {
    let source_name = path.display().to_string();
    let spreadsheet_error = |message: String| TableError::Spreadsheet {
        path: source_name.clone(),
        message,
    };

    let mut workbook = open_workbook_auto(path).map_err(|e| spreadsheet_error(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| TableError::EmptySource(source_name.clone()))?
        .map_err(|e| spreadsheet_error(e.to_string()))?;

    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| TableError::EmptySource(source_name.clone()))?;
    let body: Vec<&[Data]> = rows.collect();

    let mut columns = Vec::with_capacity(header.len());
    for (i, name) in header.iter().enumerate() {
        let name = match name {
            Data::Empty => format!("column_{}", i),
            other => other.to_string(),
        };
        let cells: Vec<&Data> = body
            .iter()
            .map(|row| row.get(i).unwrap_or(&Data::Empty))
            .collect();
        columns.push(build_column(&name, &cells)?);
    }

    debug!("Read {} rows and {} columns from {}", body.len(), columns.len(), source_name);
    Ok(DataFrame::new(columns)?)
}

fn build_column(name: &str, cells: &[&Data]) -> Result<Column> {
    let kind = cells
        .iter()
        .fold(CellKind::Empty, |kind, cell| kind.widen(CellKind::of(cell)));
    let name = PlSmallStr::from(name);

    let column = match kind {
        CellKind::Int => {
            let values: Vec<Option<i64>> = cells.iter().map(|c| as_i64(c)).collect();
            Column::new(name, values)
        }
        CellKind::Float => {
            let values: Vec<Option<f64>> = cells.iter().map(|c| as_f64(c)).collect();
            Column::new(name, values)
        }
        CellKind::Bool => {
            let values: Vec<Option<bool>> = cells
                .iter()
                .map(|c| match c {
                    Data::Bool(b) => Some(*b),
                    _ => None,
                })
                .collect();
            Column::new(name, values)
        }
        CellKind::DateTime => {
            let values: Vec<Option<i64>> = cells
                .iter()
                .map(|c| match c {
                    Data::DateTime(dt) => dt.as_datetime().map(|d| d.and_utc().timestamp_millis()),
                    _ => None,
                })
                .collect();
            Column::new(name, values).cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
        }
        CellKind::Time => {
            // nanoseconds since midnight, rounded to the millisecond
            let values: Vec<Option<i64>> = cells
                .iter()
                .map(|c| match c {
                    Data::DateTime(dt) => {
                        let millis = (dt.as_f64().fract() * MILLIS_PER_DAY).round() as i64;
                        Some(millis * NANOS_PER_MILLI)
                    }
                    _ => None,
                })
                .collect();
            Column::new(name, values).cast(&DataType::Time)?
        }
        CellKind::Text | CellKind::Empty => {
            let values: Vec<Option<String>> = cells.iter().map(|c| as_text(c)).collect();
            Column::new(name, values)
        }
    };
    Ok(column)
}

fn as_i64(cell: &Data) -> Option<i64> {
    match cell {
        Data::Int(i) => Some(*i),
        Data::Float(f) => Some(*f as i64),
        _ => None,
    }
}

fn as_f64(cell: &Data) -> Option<f64> {
    match cell {
        Data::Int(i) => Some(*i as f64),
        Data::Float(f) => Some(*f),
        _ => None,
    }
}

fn as_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_widening() {
        assert_eq!(CellKind::Int.widen(CellKind::Float), CellKind::Float);
        assert_eq!(CellKind::Empty.widen(CellKind::Bool), CellKind::Bool);
        assert_eq!(CellKind::Int.widen(CellKind::Text), CellKind::Text);
        assert_eq!(CellKind::DateTime.widen(CellKind::Time), CellKind::Text);
    }

    #[test]
    fn test_integral_floats_become_integers() {
        let cells = [Data::Float(1.0), Data::Empty, Data::Int(3)];
        let refs: Vec<&Data> = cells.iter().collect();
        let column = build_column("quantity", &refs).unwrap();
        assert_eq!(column.dtype(), &DataType::Int64);
        assert_eq!(column.null_count(), 1);
    }

    #[test]
    fn test_mixed_cells_fall_back_to_text() {
        let cells = [Data::Float(12.5), Data::String("n/a".to_string())];
        let refs: Vec<&Data> = cells.iter().collect();
        let column = build_column("unit_price", &refs).unwrap();
        assert_eq!(column.dtype(), &DataType::String);
        assert_eq!(column.str().unwrap().get(0), Some("12.5"));
    }
}
