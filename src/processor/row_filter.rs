use polars::prelude::*;

use super::table::Table;
use crate::error::{Result, TableError};
use crate::models::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Gt,
    GtEq,
    Lt,
    LtEq,
    Eq,
    NotEq,
}

/// A boolean row condition built from column comparisons.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare {
        column: String,
        op: CompareOp,
        value: Value,
    },
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
}

/// Starting point for `Predicate::column("unit_price").gt(20.0)`.
pub struct ColumnPredicate {
    column: String,
}

impl ColumnPredicate {
    fn compare(self, op: CompareOp, value: impl Into<Value>) -> Predicate {
        Predicate::Compare {
            column: self.column,
            op,
            value: value.into(),
        }
    }

    pub fn gt(self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Gt, value)
    }

    pub fn gt_eq(self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::GtEq, value)
    }

    pub fn lt(self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Lt, value)
    }

    pub fn lt_eq(self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::LtEq, value)
    }

    pub fn eq(self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Eq, value)
    }

    pub fn not_eq(self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::NotEq, value)
    }
}

impl Predicate {
    pub fn column(name: &str) -> ColumnPredicate {
        ColumnPredicate {
            column: name.to_string(),
        }
    }

    pub fn and(self, other: Predicate) -> Predicate {
        Predicate::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Predicate) -> Predicate {
        Predicate::Or(Box::new(self), Box::new(other))
    }

    /// Every column/literal pair must name an existing column of a
    /// comparable dtype.
    fn validate(&self, table: &Table) -> Result<()> {
        match self {
            Predicate::Compare { column, value, .. } => {
                let dtype = table.dtype(column)?;
                value.check_fits(column, &dtype)
            }
            Predicate::And(left, right) | Predicate::Or(left, right) => {
                left.validate(table)?;
                right.validate(table)
            }
        }
    }

    pub fn to_expr(&self) -> Expr {
        match self {
            Predicate::Compare { column, op, value } => {
                let lhs = col(column.as_str());
                let rhs = value.to_expr();
                match op {
                    CompareOp::Gt => lhs.gt(rhs),
                    CompareOp::GtEq => lhs.gt_eq(rhs),
                    CompareOp::Lt => lhs.lt(rhs),
                    CompareOp::LtEq => lhs.lt_eq(rhs),
                    CompareOp::Eq => lhs.eq(rhs),
                    CompareOp::NotEq => lhs.neq(rhs),
                }
            }
            Predicate::And(left, right) => left.to_expr().and(right.to_expr()),
            Predicate::Or(left, right) => left.to_expr().or(right.to_expr()),
        }
    }
}

impl Table {
    /// Rows matching `predicate`, labels kept. Null comparisons are false.
    pub fn filter(&self, predicate: &Predicate) -> Result<Table> {
        predicate.validate(self)?;
        let condition = predicate.to_expr();
        self.track(|frame| Ok(frame.lazy().filter(condition).collect()?))
    }

    /// Truncate a datetime column to its calendar date.
    pub fn to_date(&self, column: &str) -> Result<Table> {
        match self.dtype(column)? {
            DataType::Date => Ok(self.clone()),
            DataType::Datetime(_, _) => {
                let frame = self
                    .frame()
                    .clone()
                    .lazy()
                    .with_column(col(column).cast(DataType::Date))
                    .collect()?;
                self.replace_frame(frame)
            }
            other => Err(TableError::type_mismatch(column, "datetime", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Label;
    use crate::models::value::epoch_days;
    use chrono::NaiveDate;

    fn day(y: i32, m: u32, d: u32) -> i32 {
        epoch_days(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    fn fixture() -> Table {
        let frame = df!(
            "pizza_name" => [
                "The Hawaiian Pizza",
                "The Barbecue Chicken Pizza",
                "The Barbecue Chicken Pizza",
                "The Greek Pizza",
                "The Thai Chicken Pizza",
            ],
            "unit_price" => [10.0, 25.0, 30.0, 15.0, 22.0],
            "order_date" => [
                day(2015, 12, 14),
                day(2015, 12, 15),
                day(2015, 12, 16),
                day(2015, 12, 20),
                day(2015, 1, 1),
            ],
        )
        .unwrap();
        let frame = frame
            .lazy()
            .with_column(col("order_date").cast(DataType::Date))
            .collect()
            .unwrap();
        Table::new(frame)
    }

    #[test]
    fn test_filter_greater_than_keeps_labels() {
        let table = fixture();
        let expensive = table
            .filter(&Predicate::column("unit_price").gt(20.0))
            .unwrap();
        assert_eq!(expensive.height(), 3);
        assert_eq!(expensive.labels(), &[Label::Int(1), Label::Int(2), Label::Int(4)]);
    }

    #[test]
    fn test_filter_integer_literal_on_float_column() {
        let table = fixture();
        let expensive = table.filter(&Predicate::column("unit_price").gt(20)).unwrap();
        assert_eq!(expensive.height(), 3);
    }

    #[test]
    fn test_filter_and_or() {
        let table = fixture();
        let featured = Predicate::column("pizza_name").eq("The Barbecue Chicken Pizza");

        let both = Predicate::column("unit_price").gt(15.0).and(featured.clone());
        assert_eq!(table.filter(&both).unwrap().height(), 2);

        let either = Predicate::column("unit_price").gt(15.0).or(featured);
        assert_eq!(table.filter(&either).unwrap().height(), 3);

        let band = Predicate::column("unit_price")
            .gt(15.0)
            .and(Predicate::column("unit_price").lt_eq(25.0));
        assert_eq!(table.filter(&band).unwrap().labels(), &[Label::Int(1), Label::Int(4)]);
    }

    #[test]
    fn test_filter_on_date() {
        let table = fixture();
        let cutoff = Value::date("2015-12-15").unwrap();
        let later = table
            .filter(&Predicate::column("order_date").gt(cutoff))
            .unwrap();
        assert_eq!(later.labels(), &[Label::Int(2), Label::Int(3)]);
    }

    #[test]
    fn test_filter_type_mismatch() {
        let table = fixture();
        let result = table.filter(&Predicate::column("unit_price").gt("twenty"));
        assert!(matches!(result, Err(TableError::TypeMismatch { .. })));

        let result = table.filter(&Predicate::column("discount").gt(1));
        assert!(matches!(result, Err(TableError::MissingColumn(_))));
    }

    #[test]
    fn test_to_date_truncates_datetime() {
        let frame = df!("order_date" => [1_450_180_800_000i64, 1_450_224_000_000])
            .unwrap()
            .lazy()
            .with_column(col("order_date").cast(DataType::Datetime(TimeUnit::Milliseconds, None)))
            .collect()
            .unwrap();
        let table = Table::new(frame).to_date("order_date").unwrap();
        assert_eq!(table.dtype("order_date").unwrap(), DataType::Date);

        let on_day = table
            .filter(&Predicate::column("order_date").eq(Value::date("2015-12-15").unwrap()))
            .unwrap();
        assert_eq!(on_day.height(), 1);

        assert!(matches!(
            fixture().to_date("unit_price"),
            Err(TableError::TypeMismatch { .. })
        ));
    }
}
