use polars::prelude::*;

use super::table::Table;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    /// Non-null values.
    Count,
    Sum,
    Mean,
    Min,
    Max,
    Std,
    Var,
    First,
}

impl Aggregation {
    fn apply(self, column: &str) -> Expr {
        let expr = col(column);
        match self {
            Aggregation::Count => expr.count(),
            Aggregation::Sum => expr.sum(),
            Aggregation::Mean => expr.mean(),
            Aggregation::Min => expr.min(),
            Aggregation::Max => expr.max(),
            Aggregation::Std => expr.std(1),
            Aggregation::Var => expr.var(1),
            Aggregation::First => expr.first(),
        }
    }
}

/// Rows of a table grouped by key columns, awaiting an aggregation.
pub struct GroupBy<'a> {
    table: &'a Table,
    keys: Vec<String>,
}

impl Table {
    pub fn group_by(&self, keys: &[&str]) -> Result<GroupBy<'_>> {
        self.require_columns(keys)?;
        Ok(GroupBy {
            table: self,
            keys: keys.iter().map(|k| k.to_string()).collect(),
        })
    }
}

impl GroupBy<'_> {
    /// Non-null count of every non-key column.
    pub fn count(&self) -> Result<Table> {
        let columns = self.value_columns();
        let specs: Vec<(&str, Aggregation)> = columns
            .iter()
            .map(|c| (c.as_str(), Aggregation::Count))
            .collect();
        self.agg(&specs)
    }

    pub fn sum(&self, columns: &[&str]) -> Result<Table> {
        self.uniform(columns, Aggregation::Sum)
    }

    pub fn mean(&self, columns: &[&str]) -> Result<Table> {
        self.uniform(columns, Aggregation::Mean)
    }

    /// One aggregated column per `(column, aggregation)` pair, named after its
    /// source column. Rows are ordered by key ascending.
    pub fn agg(&self, specs: &[(&str, Aggregation)]) -> Result<Table> {
        let columns: Vec<&str> = specs.iter().map(|(c, _)| *c).collect();
        self.table.require_columns(&columns)?;

        let keys: Vec<Expr> = self.keys.iter().map(|k| col(k.as_str())).collect();
        let aggregations: Vec<Expr> = specs.iter().map(|(c, agg)| agg.apply(c)).collect();

        let frame = self
            .table
            .frame()
            .clone()
            .lazy()
            .group_by(keys.clone())
            .agg(aggregations)
            .sort_by_exprs(&keys, key_order(keys.len()))
            .collect()?;

        Ok(Table::new(frame))
    }

    fn uniform(&self, columns: &[&str], aggregation: Aggregation) -> Result<Table> {
        let specs: Vec<(&str, Aggregation)> = columns.iter().map(|c| (*c, aggregation)).collect();
        self.agg(&specs)
    }

    fn value_columns(&self) -> Vec<String> {
        self.table
            .column_names()
            .into_iter()
            .filter(|name| !self.keys.contains(name))
            .collect()
    }
}

fn key_order(n: usize) -> SortMultipleOptions {
    SortMultipleOptions {
        descending: vec![false; n],
        nulls_last: vec![true; n],
        maintain_order: true,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::SortKey;

    fn fixture() -> Table {
        let frame = df!(
            "pizza_size_id" => [2i64, 1, 2, 3, 1, 2],
            "pizza_category_id" => [1i64, 1, 2, 2, 1, 1],
            "quantity" => [Some(1i64), Some(2), Some(1), Some(1), None, Some(3)],
            "total_price" => [16.0, 24.0, 20.25, 20.75, 12.0, 48.0],
        )
        .unwrap();
        Table::new(frame)
    }

    fn f64_values(table: &Table, column: &str) -> Vec<f64> {
        table
            .frame()
            .column(column)
            .unwrap()
            .f64()
            .unwrap()
            .into_no_null_iter()
            .collect()
    }

    #[test]
    fn test_sum_per_group_matches_manual_sum() {
        let table = fixture();
        let sums = table.group_by(&["pizza_size_id"]).unwrap().sum(&["total_price"]).unwrap();
        assert_eq!(sums.height(), 3);
        // size 1: 24 + 12, size 2: 16 + 20.25 + 48, size 3: 20.75
        assert_eq!(f64_values(&sums, "total_price"), vec![36.0, 84.25, 20.75]);
    }

    #[test]
    fn test_count_skips_nulls() {
        let counts = fixture().group_by(&["pizza_size_id"]).unwrap().count().unwrap();
        assert_eq!(counts.column_names(), vec!["pizza_size_id", "pizza_category_id", "quantity", "total_price"]);

        let quantity: Vec<u32> = counts
            .frame()
            .column("quantity")
            .unwrap()
            .cast(&DataType::UInt32)
            .unwrap()
            .u32()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(quantity, vec![1, 3, 1]);
    }

    #[test]
    fn test_mixed_aggregations() {
        let result = fixture()
            .group_by(&["pizza_size_id"])
            .unwrap()
            .agg(&[("quantity", Aggregation::Sum), ("total_price", Aggregation::Mean)])
            .unwrap();

        let quantity: Vec<i64> = result
            .frame()
            .column("quantity")
            .unwrap()
            .i64()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(quantity, vec![2, 5, 1]);

        let means = f64_values(&result, "total_price");
        assert_eq!(means[0], 18.0);
        assert_eq!(means[2], 20.75);
    }

    #[test]
    fn test_multi_key_grouping_and_descending_order() {
        let result = fixture()
            .group_by(&["pizza_size_id", "pizza_category_id"])
            .unwrap()
            .sum(&["total_price"])
            .unwrap();
        assert_eq!(result.height(), 4);

        let ordered = result.sort_by(&[SortKey::descending("total_price")]).unwrap();
        let totals = f64_values(&ordered, "total_price");
        assert_eq!(totals[0], 64.0);
        assert!(totals.windows(2).all(|w| w[0] >= w[1]));
    }
}
