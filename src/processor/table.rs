use polars::prelude::*;
use std::collections::HashSet;
use std::fmt;
use std::ops::Range;

use crate::error::{Result, TableError};
use crate::models::Label;

/// Scratch column used to follow rows through reordering operations.
pub(crate) const ROW_POSITION: &str = "__row_position";

const DEFAULT_INDEX_NAME: &str = "index";
const FALLBACK_INDEX_NAME: &str = "level_0";

/// A polars frame with one label per row.
///
/// Labels survive filtering, sorting and deletion, so a row keeps the label it
/// was loaded with until the index is reset. Every operation returns a new
/// table and leaves `self` untouched.
#[derive(Debug, Clone)]
pub struct Table {
    frame: DataFrame,
    index_name: Option<String>,
    labels: Vec<Label>,
}

/// One column together with the row labels of its table.
#[derive(Debug, Clone)]
pub struct LabeledColumn {
    series: Series,
    labels: Vec<Label>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub column: String,
    pub descending: bool,
}

impl SortKey {
    pub fn ascending(column: &str) -> Self {
        Self {
            column: column.to_string(),
            descending: false,
        }
    }

    pub fn descending(column: &str) -> Self {
        Self {
            column: column.to_string(),
            descending: true,
        }
    }
}

impl Table {
    pub fn new(frame: DataFrame) -> Self {
        let labels = Label::range(frame.height());
        Self {
            frame,
            index_name: None,
            labels,
        }
    }

    pub(crate) fn with_labels(
        frame: DataFrame,
        index_name: Option<String>,
        labels: Vec<Label>,
    ) -> Result<Self> {
        if frame.height() != labels.len() {
            return Err(TableError::ShapeMismatch(format!(
                "{} labels for {} rows",
                labels.len(),
                frame.height()
            )));
        }
        Ok(Self {
            frame,
            index_name,
            labels,
        })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn index_name(&self) -> Option<&str> {
        self.index_name.as_deref()
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn width(&self) -> usize {
        self.frame.width()
    }

    pub fn is_empty(&self) -> bool {
        self.height() == 0
    }

    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.frame.column(name).is_ok()
    }

    /// Fail with [`TableError::MissingColumn`] for the first absent column.
    pub fn require_columns(&self, names: &[&str]) -> Result<()> {
        match names.iter().find(|name| !self.has_column(name)) {
            Some(missing) => Err(TableError::MissingColumn(missing.to_string())),
            None => Ok(()),
        }
    }

    pub fn dtype(&self, name: &str) -> Result<DataType> {
        self.require_columns(&[name])?;
        Ok(self.frame.column(name)?.dtype().clone())
    }

    /// Same labels and same cells, nulls compared equal.
    pub fn equals(&self, other: &Table) -> bool {
        self.index_name == other.index_name
            && self.labels == other.labels
            && self.frame.equals_missing(&other.frame)
    }

    pub fn head(&self, n: usize) -> Table {
        let n = n.min(self.height());
        Table {
            frame: self.frame.head(Some(n)),
            index_name: self.index_name.clone(),
            labels: self.labels[..n].to_vec(),
        }
    }

    pub fn tail(&self, n: usize) -> Table {
        let n = n.min(self.height());
        Table {
            frame: self.frame.tail(Some(n)),
            index_name: self.index_name.clone(),
            labels: self.labels[self.height() - n..].to_vec(),
        }
    }

    // ---- selection ----

    pub fn column(&self, name: &str) -> Result<LabeledColumn> {
        self.require_columns(&[name])?;
        Ok(LabeledColumn {
            series: self.frame.column(name)?.as_materialized_series().clone(),
            labels: self.labels.clone(),
        })
    }

    pub fn select(&self, names: &[&str]) -> Result<Table> {
        self.require_columns(names)?;
        Ok(Table {
            frame: self.frame.select(names.iter().copied())?,
            index_name: self.index_name.clone(),
            labels: self.labels.clone(),
        })
    }

    /// The row labeled `label`. A repeated label yields every matching row.
    pub fn loc(&self, label: &Label) -> Result<Table> {
        let positions = self.positions_of(label);
        if positions.is_empty() {
            return Err(TableError::MissingLabel(label.clone()));
        }
        self.take(&positions)
    }

    /// Rows for each label, in the order the labels are given.
    pub fn loc_many(&self, labels: &[Label]) -> Result<Table> {
        let mut positions = Vec::with_capacity(labels.len());
        for label in labels {
            let found = self.positions_of(label);
            if found.is_empty() {
                return Err(TableError::MissingLabel(label.clone()));
            }
            positions.extend(found);
        }
        self.take(&positions)
    }

    /// Rows from `start` through `end`, both inclusive.
    ///
    /// On a sorted index this compares labels, so the bounds need not exist.
    /// Otherwise both bounds must be present and the rows between their
    /// positions are returned.
    pub fn loc_range(&self, start: &Label, end: &Label) -> Result<Table> {
        let range = if is_monotonic_increasing(&self.labels) {
            label_bounds(&self.labels, Some(start), Some(end))
        } else {
            let first = self
                .labels
                .iter()
                .position(|l| l == start)
                .ok_or_else(|| TableError::MissingLabel(start.clone()))?;
            let last = self
                .labels
                .iter()
                .rposition(|l| l == end)
                .ok_or_else(|| TableError::MissingLabel(end.clone()))?;
            first..(last + 1).max(first)
        };
        Ok(self.slice_rows(range))
    }

    pub fn loc_range_select(&self, start: &Label, end: &Label, columns: &[&str]) -> Result<Table> {
        self.select(columns)?.loc_range(start, end)
    }

    // ---- indexing ----

    /// Move `column` out of the frame and use its values as row labels.
    pub fn set_index(&self, column: &str) -> Result<Table> {
        self.require_columns(&[column])?;
        let series = self.frame.column(column)?.as_materialized_series();

        let mut labels = Vec::with_capacity(series.len());
        for value in series.iter() {
            match Label::from_any_value(&value) {
                Some(label) => labels.push(label),
                None => return Err(TableError::type_mismatch(column, "non-null labels", "null")),
            }
        }

        Table::with_labels(self.frame.drop(column)?, Some(column.to_string()), labels)
    }

    /// Move the labels back into a leading column and relabel rows `0..n`.
    pub fn reset_index(&self) -> Result<Table> {
        let name = match &self.index_name {
            Some(name) => name.clone(),
            None if self.has_column(DEFAULT_INDEX_NAME) => FALLBACK_INDEX_NAME.to_string(),
            None => DEFAULT_INDEX_NAME.to_string(),
        };
        if self.has_column(&name) {
            return Err(TableError::ShapeMismatch(format!(
                "cannot insert index column '{}', it already exists",
                name
            )));
        }

        let index_column = Label::to_column(&name, &self.labels);
        let frame = DataFrame::new(vec![index_column])?.hstack(self.frame.get_columns())?;
        Ok(Table::new(frame))
    }

    /// Keep rows labeled at or after `before` and at or before `after`.
    pub fn truncate(&self, before: Option<&Label>, after: Option<&Label>) -> Result<Table> {
        if !is_monotonic_increasing(&self.labels) {
            return Err(TableError::UnsortedIndex);
        }
        Ok(self.slice_rows(label_bounds(&self.labels, before, after)))
    }

    // ---- deletion ----

    pub fn drop_row(&self, label: &Label) -> Result<Table> {
        self.drop_rows(std::slice::from_ref(label))
    }

    pub fn drop_rows(&self, labels: &[Label]) -> Result<Table> {
        if let Some(missing) = labels.iter().find(|l| !self.labels.contains(l)) {
            return Err(TableError::MissingLabel((*missing).clone()));
        }
        let doomed: HashSet<&Label> = labels.iter().collect();
        let keep: Vec<bool> = self.labels.iter().map(|l| !doomed.contains(l)).collect();
        self.mask_rows(&keep)
    }

    pub fn drop_column(&self, name: &str) -> Result<Table> {
        self.drop_columns(&[name])
    }

    pub fn drop_columns(&self, names: &[&str]) -> Result<Table> {
        self.require_columns(names)?;
        let mut frame = self.frame.clone();
        for name in names {
            frame = frame.drop(name)?;
        }
        Ok(Table {
            frame,
            index_name: self.index_name.clone(),
            labels: self.labels.clone(),
        })
    }

    // ---- sorting ----

    /// Stable multi-key sort; nulls go last.
    pub fn sort_by(&self, keys: &[SortKey]) -> Result<Table> {
        if keys.is_empty() {
            return Ok(self.clone());
        }
        let by: Vec<&str> = keys.iter().map(|k| k.column.as_str()).collect();
        self.require_columns(&by)?;
        let descending: Vec<bool> = keys.iter().map(|k| k.descending).collect();

        self.track(|frame| {
            let options = SortMultipleOptions {
                nulls_last: vec![true; descending.len()],
                descending,
                maintain_order: true,
                ..Default::default()
            };
            Ok(frame.sort(by, options)?)
        })
    }

    // ---- row plumbing ----

    fn positions_of(&self, label: &Label) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, l)| *l == label)
            .map(|(pos, _)| pos)
            .collect()
    }

    pub(crate) fn take(&self, positions: &[usize]) -> Result<Table> {
        let idx: Vec<IdxSize> = positions.iter().map(|&p| p as IdxSize).collect();
        let idx = IdxCa::from_vec(PlSmallStr::from_static("take"), idx);
        Ok(Table {
            frame: self.frame.take(&idx)?,
            index_name: self.index_name.clone(),
            labels: positions.iter().map(|&p| self.labels[p].clone()).collect(),
        })
    }

    pub(crate) fn slice_rows(&self, range: Range<usize>) -> Table {
        let len = range.end.saturating_sub(range.start);
        Table {
            frame: self.frame.slice(range.start as i64, len),
            index_name: self.index_name.clone(),
            labels: self.labels[range.start..range.start + len].to_vec(),
        }
    }

    pub(crate) fn mask_rows(&self, keep: &[bool]) -> Result<Table> {
        let mask = BooleanChunked::from_slice(PlSmallStr::from_static("keep"), keep);
        let labels = self
            .labels
            .iter()
            .zip(keep)
            .filter(|(_, k)| **k)
            .map(|(l, _)| l.clone())
            .collect();
        Table::with_labels(self.frame.filter(&mask)?, self.index_name.clone(), labels)
    }

    /// Run `op` on the frame and carry each surviving row's label along,
    /// however `op` filters or reorders rows.
    pub(crate) fn track<F>(&self, op: F) -> Result<Table>
    where
        F: FnOnce(DataFrame) -> Result<DataFrame>,
    {
        let tracked = self
            .frame
            .with_row_index(PlSmallStr::from_static(ROW_POSITION), None)?;
        let out = op(tracked)?;
        let positions = row_positions(&out)?;
        let labels = positions.iter().map(|&p| self.labels[p].clone()).collect();
        Table::with_labels(out.drop(ROW_POSITION)?, self.index_name.clone(), labels)
    }

    pub(crate) fn replace_frame(&self, frame: DataFrame) -> Result<Table> {
        Table::with_labels(frame, self.index_name.clone(), self.labels.clone())
    }

    /// The frame with the labels shown as a leading column.
    fn display_frame(&self) -> Result<DataFrame> {
        let name = self.index_name.as_deref().unwrap_or("");
        let name = if self.has_column(name) { "#" } else { name };
        let index_column = Label::to_column(name, &self.labels);
        Ok(DataFrame::new(vec![index_column])?.hstack(self.frame.get_columns())?)
    }
}

pub(crate) fn row_positions(frame: &DataFrame) -> Result<Vec<usize>> {
    Ok(frame
        .column(ROW_POSITION)?
        .as_materialized_series()
        .idx()?
        .into_no_null_iter()
        .map(|p| p as usize)
        .collect())
}

fn is_monotonic_increasing(labels: &[Label]) -> bool {
    labels.windows(2).all(|pair| pair[0] <= pair[1])
}

// Positions of sorted `labels` falling inside [before, after].
fn label_bounds(labels: &[Label], before: Option<&Label>, after: Option<&Label>) -> Range<usize> {
    let start = match before {
        Some(b) => labels.partition_point(|l| l < b),
        None => 0,
    };
    let end = match after {
        Some(a) => labels.partition_point(|l| l <= a),
        None => labels.len(),
    };
    start..end.max(start)
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.display_frame() {
            Ok(frame) => write!(f, "{}", frame),
            Err(_) => write!(f, "{}", self.frame),
        }
    }
}

impl LabeledColumn {
    pub fn name(&self) -> &str {
        self.series.name().as_str()
    }

    pub fn series(&self) -> &Series {
        &self.series
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn truncate(&self, before: Option<&Label>, after: Option<&Label>) -> Result<LabeledColumn> {
        if !is_monotonic_increasing(&self.labels) {
            return Err(TableError::UnsortedIndex);
        }
        let range = label_bounds(&self.labels, before, after);
        let len = range.end - range.start;
        Ok(LabeledColumn {
            series: self.series.slice(range.start as i64, len),
            labels: self.labels[range].to_vec(),
        })
    }
}

impl fmt::Display for LabeledColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({} rows)", self.name(), self.len())?;
        for (label, value) in self.labels.iter().zip(self.series.iter()) {
            writeln!(f, "{:>8}  {}", label.to_string(), value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sales_fixture() -> Table {
        let frame = df!(
            "order_details_id" => [11i64, 12, 13, 14, 15, 16, 17, 18, 19, 20],
            "order_id" => [1i64, 1, 2, 2, 3, 4, 4, 5, 6, 6],
            "quantity" => [1i64, 2, 1, 1, 3, 1, 2, 1, 1, 2],
            "unit_price" => [10.0, 25.0, 30.0, 15.0, 22.0, 12.5, 20.0, 16.0, 21.0, 18.5],
        )
        .unwrap();
        Table::new(frame)
    }

    fn int_labels(table: &Table) -> Vec<i64> {
        table
            .labels()
            .iter()
            .map(|l| match l {
                Label::Int(v) => *v,
                Label::Str(_) => panic!("text label"),
            })
            .collect()
    }

    #[test]
    fn test_head_and_tail_keep_labels() {
        let table = sales_fixture();
        assert_eq!(int_labels(&table.head(3)), vec![0, 1, 2]);
        assert_eq!(int_labels(&table.tail(2)), vec![8, 9]);
        assert_eq!(table.head(50).height(), 10);
    }

    #[test]
    fn test_column_projection() {
        let table = sales_fixture();
        let quantity = table.column("quantity").unwrap();
        assert_eq!(quantity.len(), 10);
        assert_eq!(quantity.name(), "quantity");

        let selected = table.select(&["order_id", "quantity", "unit_price"]).unwrap();
        assert_eq!(selected.column_names(), vec!["order_id", "quantity", "unit_price"]);

        assert!(matches!(
            table.select(&["order_id", "discount"]),
            Err(TableError::MissingColumn(name)) if name == "discount"
        ));
    }

    #[test]
    fn test_loc_by_label() {
        let table = sales_fixture();
        let row = table.loc(&Label::Int(3)).unwrap();
        assert_eq!(row.height(), 1);
        assert_eq!(
            row.frame().column("order_details_id").unwrap().i64().unwrap().get(0),
            Some(14)
        );

        let rows = table.loc_many(&[Label::Int(5), Label::Int(3)]).unwrap();
        assert_eq!(int_labels(&rows), vec![5, 3]);

        assert!(matches!(
            table.loc(&Label::Int(42)),
            Err(TableError::MissingLabel(Label::Int(42)))
        ));
    }

    #[test]
    fn test_loc_range_is_inclusive() {
        let table = sales_fixture();
        let subset = table.loc_range(&Label::Int(3), &Label::Int(5)).unwrap();
        assert_eq!(int_labels(&subset), vec![3, 4, 5]);

        let subset = table
            .loc_range_select(&Label::Int(3), &Label::Int(5), &["order_id", "quantity"])
            .unwrap();
        assert_eq!(subset.height(), 3);
        assert_eq!(subset.width(), 2);
    }

    #[test]
    fn test_loc_range_on_unsorted_index_uses_positions() {
        let table = sales_fixture()
            .sort_by(&[SortKey::descending("unit_price")])
            .unwrap();
        // labels by descending price: 2, 1, 4, 8, 6, 9, 7, 3, 5, 0
        let subset = table.loc_range(&Label::Int(4), &Label::Int(6)).unwrap();
        assert_eq!(int_labels(&subset), vec![4, 8, 6]);
    }

    #[test]
    fn test_set_and_reset_index() {
        let table = sales_fixture();
        let indexed = table.set_index("order_details_id").unwrap();
        assert_eq!(indexed.index_name(), Some("order_details_id"));
        assert!(!indexed.has_column("order_details_id"));
        assert_eq!(indexed.labels()[0], Label::Int(11));

        let row = indexed.loc(&Label::Int(14)).unwrap();
        assert_eq!(row.frame().column("order_id").unwrap().i64().unwrap().get(0), Some(2));

        let reset = indexed.reset_index().unwrap();
        assert_eq!(reset.column_names()[0], "order_details_id");
        assert_eq!(int_labels(&reset), (0..10).collect::<Vec<_>>());
        assert_eq!(reset.index_name(), None);
    }

    #[test]
    fn test_reset_unnamed_index_twice_uses_fallback_name() {
        let once = sales_fixture().reset_index().unwrap();
        assert_eq!(once.column_names()[0], "index");
        let twice = once.reset_index().unwrap();
        assert_eq!(twice.column_names()[0], "level_0");
    }

    #[test]
    fn test_truncate_table_and_column() {
        let table = sales_fixture();
        assert_eq!(int_labels(&table.truncate(Some(&Label::Int(3)), None).unwrap()).len(), 7);
        assert_eq!(int_labels(&table.truncate(None, Some(&Label::Int(5))).unwrap()).len(), 6);

        let quantity = table.column("quantity").unwrap();
        assert_eq!(quantity.truncate(Some(&Label::Int(3)), None).unwrap().len(), 7);
        assert_eq!(quantity.truncate(None, Some(&Label::Int(5))).unwrap().len(), 6);
    }

    #[test]
    fn test_truncate_before_then_after_same_label() {
        let table = sales_fixture();
        let k = Label::Int(4);
        let single = table
            .truncate(Some(&k), None)
            .unwrap()
            .truncate(None, Some(&k))
            .unwrap();
        assert_eq!(int_labels(&single), vec![4]);

        // label 4 no longer exists once dropped
        let without = table.drop_row(&k).unwrap();
        let empty = without
            .truncate(Some(&k), None)
            .unwrap()
            .truncate(None, Some(&k))
            .unwrap();
        assert!(empty.is_empty());

        let quantity = table.column("quantity").unwrap();
        let single = quantity
            .truncate(Some(&k), None)
            .unwrap()
            .truncate(None, Some(&k))
            .unwrap();
        assert_eq!(single.labels(), &[Label::Int(4)]);
    }

    #[test]
    fn test_truncate_requires_sorted_index() {
        let sorted = sales_fixture()
            .sort_by(&[SortKey::descending("unit_price")])
            .unwrap();
        assert!(matches!(
            sorted.truncate(Some(&Label::Int(3)), None),
            Err(TableError::UnsortedIndex)
        ));
    }

    #[test]
    fn test_drop_rows_and_columns_copy() {
        let table = sales_fixture();

        let without_two = table.drop_row(&Label::Int(2)).unwrap();
        assert_eq!(without_two.height(), 9);
        assert!(!without_two.labels().contains(&Label::Int(2)));

        let without_many = table
            .drop_rows(&[Label::Int(5), Label::Int(7), Label::Int(9)])
            .unwrap();
        assert_eq!(int_labels(&without_many), vec![0, 1, 2, 3, 4, 6, 8]);

        let no_price = table.drop_column("unit_price").unwrap();
        assert!(!no_price.has_column("unit_price"));

        let fewer = table.drop_columns(&["unit_price", "order_id"]).unwrap();
        assert_eq!(fewer.column_names(), vec!["order_details_id", "quantity"]);

        // the source is untouched
        assert_eq!(table.height(), 10);
        assert_eq!(table.width(), 4);

        assert!(matches!(
            table.drop_row(&Label::Int(99)),
            Err(TableError::MissingLabel(_))
        ));
    }

    #[test]
    fn test_sort_single_and_multi_key() {
        let table = sales_fixture();

        let descending = table.sort_by(&[SortKey::descending("unit_price")]).unwrap();
        let prices: Vec<f64> = descending
            .frame()
            .column("unit_price")
            .unwrap()
            .f64()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(prices[0], 30.0);
        assert_eq!(prices[9], 10.0);
        assert_eq!(descending.labels()[0], Label::Int(2));

        let multi = table
            .sort_by(&[SortKey::ascending("order_id"), SortKey::descending("unit_price")])
            .unwrap();
        // order 2 has prices 30.0 (label 2) and 15.0 (label 3)
        assert_eq!(&int_labels(&multi)[..4], &[1, 0, 2, 3]);
    }

    #[test]
    fn test_sort_is_stable_for_equal_keys() {
        let table = sales_fixture();
        let by_quantity = table.sort_by(&[SortKey::ascending("quantity")]).unwrap();
        // quantity 1 appears at labels 0, 2, 3, 5, 7, 8 in load order
        assert_eq!(&int_labels(&by_quantity)[..6], &[0, 2, 3, 5, 7, 8]);
    }
}
