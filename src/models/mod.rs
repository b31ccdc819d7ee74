pub mod data_models;
pub mod label;
pub mod value;

pub use data_models::*;
pub use label::Label;
pub use value::Value;
