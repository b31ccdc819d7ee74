use polars::prelude::*;

use super::table::Table;
use crate::error::Result;
use crate::models::sales;

const STATISTICS: [&str; 8] = ["count", "mean", "std", "min", "25%", "50%", "75%", "max"];

const DUPLICATED: &str = "duplicated";

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    pub name: String,
    pub dtype: DataType,
    pub non_null: usize,
}

impl Table {
    /// count, mean, std, min, quartiles and max of every numeric column, one
    /// row per statistic.
    pub fn describe(&self) -> Result<DataFrame> {
        let mut columns = vec![Column::new("statistic".into(), STATISTICS.to_vec())];

        for column in self.frame().get_columns() {
            if !column.dtype().is_numeric() {
                continue;
            }
            let series = column.as_materialized_series();
            let floats = series.cast(&DataType::Float64)?;
            let floats = floats.f64()?;

            let stats = vec![
                Some((series.len() - series.null_count()) as f64),
                series.mean(),
                series.std(1),
                series.min::<f64>()?,
                floats.quantile(0.25, QuantileMethod::Linear)?,
                series.median(),
                floats.quantile(0.75, QuantileMethod::Linear)?,
                series.max::<f64>()?,
            ];
            columns.push(Column::new(column.name().clone(), stats));
        }

        Ok(DataFrame::new(columns)?)
    }

    pub fn info(&self) -> Vec<ColumnInfo> {
        self.frame()
            .get_columns()
            .iter()
            .map(|column| ColumnInfo {
                name: column.name().to_string(),
                dtype: column.dtype().clone(),
                non_null: column.len() - column.null_count(),
            })
            .collect()
    }

    pub fn null_counts(&self) -> Vec<(String, usize)> {
        self.frame()
            .get_columns()
            .iter()
            .map(|column| (column.name().to_string(), column.null_count()))
            .collect()
    }

    /// One flag per row: true when an earlier row has exactly the same cells.
    pub fn duplicated(&self) -> Result<Vec<bool>> {
        if self.width() == 0 {
            return Ok(vec![false; self.height()]);
        }

        let cells: Vec<Expr> = self.column_names().iter().map(|name| col(name.as_str())).collect();
        let flags = self
            .frame()
            .clone()
            .lazy()
            .select([as_struct(cells).is_first_distinct().not().alias(DUPLICATED)])
            .collect()?;

        Ok(flags
            .column(DUPLICATED)?
            .bool()?
            .into_iter()
            .map(|flag| flag.unwrap_or(false))
            .collect())
    }

    pub fn duplicate_count(&self) -> Result<usize> {
        Ok(self.duplicated()?.into_iter().filter(|d| *d).count())
    }

    /// Rows whose total_price is off from quantity x unit_price by more than
    /// `tolerance`. Rows with a missing operand are not counted.
    pub fn price_mismatches(&self, tolerance: f64) -> Result<usize> {
        self.require_columns(&[sales::QUANTITY, sales::UNIT_PRICE, sales::TOTAL_PRICE])?;

        let quantity = self.frame().column(sales::QUANTITY)?.cast(&DataType::Float64)?;
        let unit_price = self.frame().column(sales::UNIT_PRICE)?.cast(&DataType::Float64)?;
        let total_price = self.frame().column(sales::TOTAL_PRICE)?.cast(&DataType::Float64)?;

        let mismatches = quantity
            .f64()?
            .into_iter()
            .zip(unit_price.f64()?.into_iter())
            .zip(total_price.f64()?.into_iter())
            .filter(|((q, u), t)| match (q, u, t) {
                (Some(q), Some(u), Some(t)) => (q * u - t).abs() > tolerance,
                _ => false,
            })
            .count();

        Ok(mismatches)
    }
}
