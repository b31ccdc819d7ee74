use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use std::fmt;

use crate::error::{Result, TableError};

// Days from 0001-01-01 (CE day 1) to 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A typed literal used in predicates and fill policies.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Date(NaiveDate),
}

impl Value {
    /// Parse a `YYYY-MM-DD` date literal.
    pub fn date(text: &str) -> Result<Self> {
        NaiveDate::parse_from_str(text.trim(), DATE_FORMAT)
            .map(Value::Date)
            .map_err(|_| TableError::InvalidDate(text.to_string()))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Bool(_) => "boolean",
            Value::Date(_) => "date",
        }
    }

    /// Whether this literal can be compared with, or stored in, a column of `dtype`.
    pub fn fits(&self, dtype: &DataType) -> bool {
        match self {
            Value::Int(_) | Value::Float(_) => dtype.is_numeric(),
            Value::Str(_) => matches!(dtype, DataType::String),
            Value::Bool(_) => matches!(dtype, DataType::Boolean),
            Value::Date(_) => matches!(dtype, DataType::Date | DataType::Datetime(_, _)),
        }
    }

    /// Fail with a type mismatch unless the literal fits `dtype`.
    pub fn check_fits(&self, column: &str, dtype: &DataType) -> Result<()> {
        if self.fits(dtype) {
            Ok(())
        } else {
            Err(TableError::type_mismatch(column, self.kind(), dtype))
        }
    }

    /// As `check_fits`, but a float stored in an integer column must be a
    /// whole number.
    pub fn check_fill(&self, column: &str, dtype: &DataType) -> Result<()> {
        self.check_fits(column, dtype)?;
        match self {
            Value::Float(v) if dtype.is_integer() && v.fract() != 0.0 => Err(
                TableError::type_mismatch(column, dtype.to_string(), format!("fractional float {}", v)),
            ),
            _ => Ok(()),
        }
    }

    pub fn to_expr(&self) -> Expr {
        match self {
            Value::Int(v) => lit(*v),
            Value::Float(v) => lit(*v),
            Value::Str(s) => lit(s.clone()),
            Value::Bool(b) => lit(*b),
            Value::Date(d) => lit(epoch_days(*d)).cast(DataType::Date),
        }
    }
}

/// Days since 1970-01-01, the physical representation of a polars Date.
pub fn epoch_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Str(s) => write!(f, "'{}'", s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Value::Date(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_literal_parsing() {
        let value = Value::date("2015-12-15").unwrap();
        assert_eq!(value, Value::Date(NaiveDate::from_ymd_opt(2015, 12, 15).unwrap()));

        assert!(matches!(
            Value::date("15/12/2015"),
            Err(TableError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_epoch_days() {
        assert_eq!(epoch_days(NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()), 0);
        assert_eq!(epoch_days(NaiveDate::from_ymd_opt(1970, 1, 31).unwrap()), 30);
        assert_eq!(epoch_days(NaiveDate::from_ymd_opt(1969, 12, 31).unwrap()), -1);
    }

    #[test]
    fn test_fits_dtype() {
        assert!(Value::from(20.0).fits(&DataType::Int64));
        assert!(Value::from(3).fits(&DataType::Float64));
        assert!(!Value::from("Feta").fits(&DataType::Float64));
        assert!(Value::date("2000-01-01").unwrap().fits(&DataType::Date));
        assert!(!Value::date("2000-01-01").unwrap().fits(&DataType::String));
    }

    #[test]
    fn test_fill_needs_whole_numbers_for_integers() {
        assert!(Value::from(3.0).check_fill("quantity", &DataType::Int64).is_ok());
        assert!(Value::from(0.5).check_fill("quantity", &DataType::Float64).is_ok());
        assert!(matches!(
            Value::from(0.5).check_fill("quantity", &DataType::Int64),
            Err(TableError::TypeMismatch { .. })
        ));
        assert!(Value::from(f64::NAN).check_fill("quantity", &DataType::Int32).is_err());
    }
}
