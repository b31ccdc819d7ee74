pub mod config;
pub mod error;
pub mod loader;
pub mod models;
pub mod processor;
pub mod report;
