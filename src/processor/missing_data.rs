use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::BTreeMap;

use super::table::Table;
use crate::error::Result;
use crate::models::Value;

/// Replacement values for missing cells, one typed default per column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FillPolicy {
    defaults: BTreeMap<String, Value>,
}

impl FillPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.defaults.insert(column.to_string(), value.into());
        self
    }

    /// A default for every column of `table` that has a dtype family:
    /// numbers get 0, text an empty string, booleans false and
    /// dates/datetimes `fallback_date`.
    pub fn typed_defaults(table: &Table, fallback_date: NaiveDate) -> Self {
        let mut policy = Self::new();
        for column in table.frame().get_columns() {
            let dtype = column.dtype();
            let value = if dtype.is_integer() {
                Some(Value::Int(0))
            } else if dtype.is_numeric() {
                Some(Value::Float(0.0))
            } else {
                match dtype {
                    DataType::String => Some(Value::Str(String::new())),
                    DataType::Boolean => Some(Value::Bool(false)),
                    DataType::Date | DataType::Datetime(_, _) => Some(Value::Date(fallback_date)),
                    _ => None,
                }
            };
            if let Some(value) = value {
                policy.defaults.insert(column.name().to_string(), value);
            }
        }
        policy
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.defaults.get(column)
    }

    pub fn len(&self) -> usize {
        self.defaults.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defaults.is_empty()
    }
}

impl Table {
    /// Rows that have no missing value in any column.
    pub fn drop_missing(&self) -> Result<Table> {
        let mut keep = vec![true; self.height()];
        for column in self.frame().get_columns() {
            if column.null_count() == 0 {
                continue;
            }
            let present = column.is_not_null();
            for (flag, present) in keep.iter_mut().zip(present.into_iter()) {
                *flag &= present.unwrap_or(false);
            }
        }
        self.mask_rows(&keep)
    }

    /// Replace missing cells using `policy`. Columns the policy does not name
    /// keep their nulls; every filled column keeps its dtype.
    pub fn fill_missing(&self, policy: &FillPolicy) -> Result<Table> {
        let mut fills = Vec::with_capacity(policy.len());
        for (column, value) in &policy.defaults {
            let dtype = self.dtype(column)?;
            value.check_fill(column, &dtype)?;
            fills.push(
                col(column.as_str())
                    .fill_null(value.to_expr().cast(dtype))
                    .alias(column.as_str()),
            );
        }

        if fills.is_empty() {
            return Ok(self.clone());
        }
        let frame = self.frame().clone().lazy().with_columns(fills).collect()?;
        self.replace_frame(frame)
    }
}
