use polars::prelude::*;
use std::fmt;

/// A row label. Tables keep one label per row; a fresh table is labeled `0..n`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Label {
    Int(i64),
    Str(String),
}

impl Label {
    /// Convert a cell into a label. Nulls have no label.
    pub fn from_any_value(value: &AnyValue) -> Option<Label> {
        match value {
            AnyValue::Null => None,
            AnyValue::Int8(v) => Some(Label::Int(*v as i64)),
            AnyValue::Int16(v) => Some(Label::Int(*v as i64)),
            AnyValue::Int32(v) => Some(Label::Int(*v as i64)),
            AnyValue::Int64(v) => Some(Label::Int(*v)),
            AnyValue::UInt8(v) => Some(Label::Int(*v as i64)),
            AnyValue::UInt16(v) => Some(Label::Int(*v as i64)),
            AnyValue::UInt32(v) => Some(Label::Int(*v as i64)),
            AnyValue::UInt64(v) => Some(Label::Int(*v as i64)),
            AnyValue::String(s) => Some(Label::Str(s.to_string())),
            AnyValue::StringOwned(s) => Some(Label::Str(s.to_string())),
            other => Some(Label::Str(other.to_string())),
        }
    }

    /// Build a column holding `labels`. All-integer labels give an Int64
    /// column, anything else a String column.
    pub fn to_column(name: &str, labels: &[Label]) -> Column {
        if labels.iter().all(|l| matches!(l, Label::Int(_))) {
            let values: Vec<i64> = labels
                .iter()
                .filter_map(|l| match l {
                    Label::Int(v) => Some(*v),
                    Label::Str(_) => None,
                })
                .collect();
            Column::new(name.into(), values)
        } else {
            let values: Vec<String> = labels.iter().map(|l| l.to_string()).collect();
            Column::new(name.into(), values)
        }
    }

    pub fn range(len: usize) -> Vec<Label> {
        (0..len as i64).map(Label::Int).collect()
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Int(v) => write!(f, "{}", v),
            Label::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for Label {
    fn from(value: i64) -> Self {
        Label::Int(value)
    }
}

impl From<i32> for Label {
    fn from(value: i32) -> Self {
        Label::Int(value as i64)
    }
}

impl From<&str> for Label {
    fn from(value: &str) -> Self {
        Label::Str(value.to_string())
    }
}

impl From<String> for Label {
    fn from(value: String) -> Self {
        Label::Str(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_from_cells() {
        assert_eq!(Label::from_any_value(&AnyValue::Int32(7)), Some(Label::Int(7)));
        assert_eq!(
            Label::from_any_value(&AnyValue::String("hawaiian")),
            Some(Label::Str("hawaiian".to_string()))
        );
        assert_eq!(Label::from_any_value(&AnyValue::Null), None);
    }

    #[test]
    fn test_int_labels_order_before_text() {
        let mut labels = vec![Label::from("b"), Label::from(3), Label::from("a"), Label::from(1)];
        labels.sort();
        assert_eq!(
            labels,
            vec![Label::Int(1), Label::Int(3), Label::from("a"), Label::from("b")]
        );
    }

    #[test]
    fn test_label_column_dtype() {
        let ints = Label::to_column("index", &Label::range(3));
        assert_eq!(ints.dtype(), &DataType::Int64);

        let mixed = Label::to_column("index", &[Label::Int(1), Label::from("x")]);
        assert_eq!(mixed.dtype(), &DataType::String);
    }
}
