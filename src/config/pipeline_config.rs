use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Overrides `[data].dir` when set.
pub const DATA_DIR_ENV: &str = "PIZZA_DATA_DIR";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub data: DataSection,
    pub analysis: AnalysisSection,
    pub chart: ChartSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSection {
    pub dir: PathBuf,
    pub sales_file: String,
    pub size_file: String,
    pub category_file: String,
    pub extra_sales_file: String,
    pub voucher_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSection {
    pub preview_rows: usize,
    /// Label looked up with `loc`, and the inclusive label range for slicing
    /// and truncation.
    pub sample_label: i64,
    pub label_range: (i64, i64),
    pub price_threshold: f64,
    pub date_cutoff: NaiveDate,
    pub featured_pizza: String,
    pub featured_min_price: f64,
    /// Exclusive lower and inclusive upper unit price.
    pub price_band: (f64, f64),
    pub missing_date_fill: NaiveDate,
    pub price_tolerance: f64,
    pub drop_row: i64,
    pub drop_rows: Vec<i64>,
    pub drop_columns: Vec<String>,
    pub replace_ingredient: String,
    pub replacement_ingredient: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartSection {
    pub output: PathBuf,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub width: u32,
    pub height: u32,
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data"),
            sales_file: "pizza_sales.xlsx".to_string(),
            size_file: "pizza_size.csv".to_string(),
            category_file: "pizza_category.csv".to_string(),
            extra_sales_file: "another_pizza_sales.xlsx".to_string(),
            voucher_file: "pizza_sales_voucher.xlsx".to_string(),
        }
    }
}

impl Default for AnalysisSection {
    fn default() -> Self {
        Self {
            preview_rows: 5,
            sample_label: 3,
            label_range: (3, 5),
            price_threshold: 20.0,
            date_cutoff: NaiveDate::from_ymd_opt(2015, 12, 15).unwrap_or_default(),
            featured_pizza: "The Barbecue Chicken Pizza".to_string(),
            featured_min_price: 15.0,
            price_band: (15.0, 20.0),
            missing_date_fill: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default(),
            price_tolerance: 0.01,
            drop_row: 2,
            drop_rows: vec![5, 7, 9],
            drop_columns: vec!["unit_price".to_string(), "order_id".to_string()],
            replace_ingredient: "Feta Cheese".to_string(),
            replacement_ingredient: "Mozzarella".to_string(),
        }
    }
}

impl Default for ChartSection {
    fn default() -> Self {
        Self {
            output: PathBuf::from("pizza_sales_boxplot.svg"),
            title: "Boxplot showing distribution of sales by category".to_string(),
            x_label: "Pizza Category".to_string(),
            y_label: "Total Price".to_string(),
            width: 1024,
            height: 768,
        }
    }
}

impl PipelineConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read pipeline config file: {}", path))?;
        let mut config = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse pipeline config file: {}", path))?;

        config.override_data_dir(env::var(DATA_DIR_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn override_data_dir(&mut self, dir: Option<String>) {
        if let Some(dir) = dir.filter(|d| !d.trim().is_empty()) {
            self.data.dir = PathBuf::from(dir);
        }
    }

    pub fn validate(&self) -> Result<()> {
        let (low, high) = self.analysis.price_band;
        if low > high {
            bail!("Invalid price band: lower bound {} exceeds upper bound {}", low, high);
        }
        let (start, end) = self.analysis.label_range;
        if start > end {
            bail!("Invalid label range: {} comes after {}", start, end);
        }
        if self.chart.width == 0 || self.chart.height == 0 {
            bail!(
                "Chart size must be non-zero, got {}x{}",
                self.chart.width,
                self.chart.height
            );
        }
        Ok(())
    }

    pub fn drop_columns(&self) -> Vec<&str> {
        self.analysis.drop_columns.iter().map(String::as_str).collect()
    }
}
