use polars::prelude::*;
use std::collections::BTreeSet;
use tracing::warn;

use super::table::{Table, ROW_POSITION, row_positions};
use crate::error::{Result, TableError};

const DUPLICATE_SUFFIX: &str = "_right";

/// Result of an inner join with the rows it could not match.
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    pub table: Table,
    /// Left rows whose key had no match on the right.
    pub orphaned_rows: usize,
    /// Distinct unmatched keys, as text.
    pub orphaned_keys: Vec<String>,
}

impl Table {
    /// Inner join with `other` on the shared column `key`, keeping the left
    /// row order. The result is relabeled `0..n`.
    pub fn merge(&self, other: &Table, key: &str) -> Result<JoinOutcome> {
        self.require_columns(&[key])?;
        other.require_columns(&[key])?;

        let left_dtype = self.dtype(key)?;
        let right_dtype = other.dtype(key)?;
        if left_dtype != right_dtype {
            return Err(TableError::type_mismatch(key, left_dtype.to_string(), right_dtype));
        }

        let left = self
            .frame()
            .with_row_index(PlSmallStr::from_static(ROW_POSITION), None)?;
        let joined = left
            .lazy()
            .join(
                other.frame().clone().lazy(),
                [col(key)],
                [col(key)],
                JoinArgs::new(JoinType::Inner),
            )
            .sort([ROW_POSITION], SortMultipleOptions::default().with_maintain_order(true))
            .collect()?;

        let matched: BTreeSet<usize> = row_positions(&joined)?.into_iter().collect();
        let orphans: Vec<usize> = (0..self.height()).filter(|p| !matched.contains(p)).collect();

        let orphaned_keys = if orphans.is_empty() {
            Vec::new()
        } else {
            let keys = self.frame().column(key)?.cast(&DataType::String)?;
            let keys = keys.str()?;
            let distinct: BTreeSet<String> = orphans
                .iter()
                .map(|&p| keys.get(p).unwrap_or("null").to_string())
                .collect();
            distinct.into_iter().collect()
        };

        if !orphans.is_empty() {
            warn!(
                "Join on '{}' dropped {} rows with unmatched keys: {:?}",
                key,
                orphans.len(),
                orphaned_keys
            );
        }

        Ok(JoinOutcome {
            table: Table::new(joined.drop(ROW_POSITION)?),
            orphaned_rows: orphans.len(),
            orphaned_keys,
        })
    }

    /// Append the rows of `other`, matching its columns to these by name.
    /// Numeric columns of different widths are widened to a shared dtype; any
    /// other dtype difference is an error. Labels of both inputs are kept, so
    /// they may repeat until the index is reset.
    pub fn concat_vertical(&self, other: &Table) -> Result<Table> {
        let names = self.column_names();
        let missing: Vec<&String> = names.iter().filter(|n| !other.has_column(n)).collect();
        let extra: Vec<String> = other
            .column_names()
            .into_iter()
            .filter(|n| !self.has_column(n))
            .collect();
        if !missing.is_empty() || !extra.is_empty() {
            return Err(TableError::ShapeMismatch(format!(
                "cannot stack rows: missing columns {:?}, unexpected columns {:?}",
                missing, extra
            )));
        }

        let mut upper = Vec::with_capacity(names.len());
        let mut lower = Vec::with_capacity(names.len());
        for name in &names {
            let top = self.frame().column(name)?;
            let bottom = other.frame().column(name)?;
            let dtype = stacked_dtype(name, top.dtype(), bottom.dtype())?;
            upper.push(top.cast(&dtype)?);
            lower.push(bottom.cast(&dtype)?);
        }

        let frame = DataFrame::new(upper)?.vstack(&DataFrame::new(lower)?)?;
        let mut labels = self.labels().to_vec();
        labels.extend_from_slice(other.labels());
        Table::with_labels(frame, self.index_name().map(str::to_string), labels)
    }

    /// Place the columns of `other` beside these, row by row. Row counts must
    /// match. A clashing column name from `other` gets the suffix `_right`.
    pub fn concat_horizontal(&self, other: &Table) -> Result<Table> {
        if self.height() != other.height() {
            return Err(TableError::ShapeMismatch(format!(
                "cannot place {} rows beside {} rows",
                other.height(),
                self.height()
            )));
        }

        let mut columns = Vec::with_capacity(other.width());
        for column in other.frame().get_columns() {
            let mut column = column.clone();
            if self.has_column(column.name()) {
                let renamed = format!("{}{}", column.name(), DUPLICATE_SUFFIX);
                column.rename(renamed.into());
            }
            columns.push(column);
        }

        let frame = self.frame().hstack(&columns)?;
        self.replace_frame(frame)
    }
}

fn stacked_dtype(column: &str, top: &DataType, bottom: &DataType) -> Result<DataType> {
    if top == bottom {
        return Ok(top.clone());
    }
    if top.is_numeric() && bottom.is_numeric() {
        return Ok(if top.is_float() || bottom.is_float() {
            DataType::Float64
        } else {
            DataType::Int64
        });
    }
    Err(TableError::ShapeMismatch(format!(
        "cannot stack column '{}': {} onto {}",
        column, bottom, top
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Label;

    fn sales() -> Table {
        let frame = df!(
            "order_details_id" => [1i64, 2, 3, 4],
            "pizza_size_id" => [2i64, 1, 9, 2],
            "total_price" => [16.0, 13.25, 20.5, 18.5],
        )
        .unwrap();
        Table::new(frame)
    }

    fn sizes() -> Table {
        let frame = df!(
            "pizza_size_id" => [1i64, 2, 3],
            "pizza_size" => ["S", "M", "L"],
        )
        .unwrap();
        Table::new(frame)
    }

    #[test]
    fn test_inner_join_reports_orphans() {
        let outcome = sales().merge(&sizes(), "pizza_size_id").unwrap();
        assert_eq!(outcome.table.height(), 3);
        assert_eq!(outcome.orphaned_rows, 1);
        assert_eq!(outcome.orphaned_keys, vec!["9".to_string()]);

        let ids: Vec<i64> = outcome
            .table
            .frame()
            .column("order_details_id")
            .unwrap()
            .i64()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(ids, vec![1, 2, 4]);

        let labels: Vec<Option<&str>> = outcome
            .table
            .frame()
            .column("pizza_size")
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(labels, vec![Some("M"), Some("S"), Some("M")]);
        assert_eq!(outcome.table.labels(), &Label::range(3)[..]);
    }

    #[test]
    fn test_join_key_dtype_mismatch() {
        let text_sizes = Table::new(
            df!("pizza_size_id" => ["1", "2"], "pizza_size" => ["S", "M"]).unwrap(),
        );
        assert!(matches!(
            sales().merge(&text_sizes, "pizza_size_id"),
            Err(TableError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_concat_vertical_then_reset() {
        let first = sales();
        let second = sales().head(3);
        let stacked = first.concat_vertical(&second).unwrap();
        assert_eq!(stacked.height(), 7);
        assert_eq!(stacked.labels()[4], Label::Int(0));

        let reset = stacked.reset_index().unwrap();
        assert_eq!(reset.labels(), &Label::range(7)[..]);
        assert_eq!(reset.column_names()[0], "index");
    }

    #[test]
    fn test_concat_vertical_schema_mismatch() {
        let result = sales().concat_vertical(&sizes());
        assert!(matches!(result, Err(TableError::ShapeMismatch(_))));
    }

    #[test]
    fn test_concat_vertical_aligns_columns_by_name() {
        let extra = Table::new(
            df!(
                "total_price" => [12.0, 20.75],
                "order_details_id" => [5i64, 6],
                "pizza_size_id" => [1i64, 3],
            )
            .unwrap(),
        );
        let stacked = sales().concat_vertical(&extra).unwrap();
        assert_eq!(
            stacked.column_names(),
            vec!["order_details_id", "pizza_size_id", "total_price"]
        );

        let ids: Vec<i64> = stacked
            .frame()
            .column("order_details_id")
            .unwrap()
            .i64()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
        let prices = stacked.frame().column("total_price").unwrap().f64().unwrap().clone();
        assert_eq!(prices.get(5), Some(20.75));
    }

    #[test]
    fn test_concat_vertical_widens_whole_number_prices() {
        let extra = Table::new(
            df!(
                "order_details_id" => [5i64, 6],
                "pizza_size_id" => [1i64, 3],
                "total_price" => [16i64, 20],
            )
            .unwrap(),
        );
        let stacked = sales().concat_vertical(&extra).unwrap();
        let prices = stacked.frame().column("total_price").unwrap();
        assert_eq!(prices.dtype(), &DataType::Float64);
        let prices: Vec<f64> = prices.f64().unwrap().into_no_null_iter().collect();
        assert_eq!(prices, vec![16.0, 13.25, 20.5, 18.5, 16.0, 20.0]);

        // the widening works from either side
        let stacked = extra.concat_vertical(&sales()).unwrap();
        assert_eq!(stacked.dtype("total_price").unwrap(), DataType::Float64);
        assert_eq!(stacked.height(), 6);
    }

    #[test]
    fn test_concat_vertical_dtype_conflict_names_dtypes() {
        let extra = Table::new(
            df!(
                "order_details_id" => [5i64],
                "pizza_size_id" => [1i64],
                "total_price" => ["16.00"],
            )
            .unwrap(),
        );
        match sales().concat_vertical(&extra) {
            Err(TableError::ShapeMismatch(message)) => {
                assert!(message.contains("total_price"));
                assert!(message.contains(&DataType::Float64.to_string()));
                assert!(message.contains(&DataType::String.to_string()));
            }
            other => panic!("expected a shape mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_concat_horizontal() {
        let vouchers = Table::new(
            df!(
                "voucher_code" => ["NONE", "PIZZA10", "NONE", "FREEDRINK"],
                "total_price" => [16.0, 11.93, 20.5, 18.5],
            )
            .unwrap(),
        );
        let wide = sales().concat_horizontal(&vouchers).unwrap();
        assert_eq!(
            wide.column_names(),
            vec!["order_details_id", "pizza_size_id", "total_price", "voucher_code", "total_price_right"]
        );

        let short = vouchers.head(2);
        assert!(matches!(
            sales().concat_horizontal(&short),
            Err(TableError::ShapeMismatch(_))
        ));
    }
}
