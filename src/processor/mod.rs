pub mod aggregator;
pub mod inspector;
pub mod merger;
pub mod missing_data;
pub mod row_filter;
pub mod stats;
pub mod table;
pub mod text_normalizer;

pub use aggregator::{Aggregation, GroupBy};
pub use inspector::ColumnInfo;
pub use merger::JoinOutcome;
pub use missing_data::FillPolicy;
pub use row_filter::{CompareOp, Predicate};
pub use table::{LabeledColumn, SortKey, Table};
pub use text_normalizer::TextTransform;
