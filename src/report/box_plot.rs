use anyhow::{Context, Result};
use plotters::prelude::*;
use polars::prelude::*;
use std::collections::HashMap;
use std::fmt;
use tracing::info;

use crate::config::ChartSection;
use crate::error::TableError;
use crate::processor::stats::quantile;
use crate::processor::Table;

const IQR_FENCE: f64 = 1.5;
const BOX_HALF_WIDTH: f64 = 0.3;
const CAP_HALF_WIDTH: f64 = 0.15;

/// Five-number summary of one category's values, with Tukey whiskers.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxStats {
    pub category: String,
    pub count: usize,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub lower_whisker: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
    values: Vec<f64>,
}

impl BoxStats {
    /// `None` when there are no values.
    pub fn from_values(category: &str, mut values: Vec<f64>) -> Option<Self> {
        values.retain(|v| !v.is_nan());
        values.sort_by(f64::total_cmp);

        let q1 = quantile(&values, 0.25)?;
        let median = quantile(&values, 0.5)?;
        let q3 = quantile(&values, 0.75)?;
        let iqr = q3 - q1;
        let (low_fence, high_fence) = (q1 - IQR_FENCE * iqr, q3 + IQR_FENCE * iqr);

        let inside = values.iter().filter(|v| **v >= low_fence && **v <= high_fence);
        let lower_whisker = inside.clone().copied().fold(f64::INFINITY, f64::min);
        let upper_whisker = inside.copied().fold(f64::NEG_INFINITY, f64::max);
        let outliers = values
            .iter()
            .copied()
            .filter(|v| *v < low_fence || *v > high_fence)
            .collect();

        Some(Self {
            category: category.to_string(),
            count: values.len(),
            q1,
            median,
            q3,
            lower_whisker,
            upper_whisker,
            outliers,
            values,
        })
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

impl fmt::Display for BoxStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<10} n={:<6} whiskers=[{:.2}, {:.2}] q1={:.2} median={:.2} q3={:.2} outliers={}",
            self.category,
            self.count,
            self.lower_whisker,
            self.upper_whisker,
            self.q1,
            self.median,
            self.q3,
            self.outliers.len()
        )
    }
}

/// One box per distinct value of `category_column`, in order of first
/// appearance. Rows with a null category or value are skipped.
pub fn category_box_stats(
    table: &Table,
    category_column: &str,
    value_column: &str,
) -> Result<Vec<BoxStats>, TableError> {
    table.require_columns(&[category_column, value_column])?;

    let categories = table.frame().column(category_column)?.cast(&DataType::String)?;
    let values = table.frame().column(value_column)?.cast(&DataType::Float64)?;

    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<f64>> = HashMap::new();
    for (category, value) in categories.str()?.into_iter().zip(values.f64()?.into_iter()) {
        let (Some(category), Some(value)) = (category, value) else {
            continue;
        };
        if !groups.contains_key(category) {
            order.push(category.to_string());
        }
        groups.entry(category.to_string()).or_default().push(value);
    }

    Ok(order
        .into_iter()
        .filter_map(|category| {
            let values = groups.remove(&category)?;
            BoxStats::from_values(&category, values)
        })
        .collect())
}

/// Text rendering of every box, one line each.
pub fn summary(stats: &[BoxStats], chart: &ChartSection) -> String {
    let mut out = format!("{}\n{} by {}\n", chart.title, chart.y_label, chart.x_label);
    for stat in stats {
        out.push_str(&stat.to_string());
        out.push('\n');
    }
    out
}

/// Chart coordinates of one box centred on `x`. Whiskers run from the box
/// edges to the whisker values of the stats, not to the fences.
#[derive(Debug, Clone, PartialEq)]
struct BoxShape {
    body: [(f64, f64); 2],
    median: [(f64, f64); 2],
    whiskers: [[(f64, f64); 2]; 2],
    caps: [[(f64, f64); 2]; 2],
    outliers: Vec<(f64, f64)>,
}

impl BoxShape {
    fn new(stat: &BoxStats, x: f64) -> Self {
        let (left, right) = (x - BOX_HALF_WIDTH, x + BOX_HALF_WIDTH);
        let cap = |y: f64| [(x - CAP_HALF_WIDTH, y), (x + CAP_HALF_WIDTH, y)];
        Self {
            body: [(left, stat.q1), (right, stat.q3)],
            median: [(left, stat.median), (right, stat.median)],
            whiskers: [
                [(x, stat.q1), (x, stat.lower_whisker)],
                [(x, stat.q3), (x, stat.upper_whisker)],
            ],
            caps: [cap(stat.lower_whisker), cap(stat.upper_whisker)],
            outliers: stat.outliers.iter().map(|v| (x, *v)).collect(),
        }
    }
}

/// Draw the box plot as SVG to `chart.output`.
pub fn render_svg(stats: &[BoxStats], chart: &ChartSection) -> Result<()> {
    let categories: Vec<&str> = stats.iter().map(|s| s.category.as_str()).collect();

    let (min, max) = stats.iter().flat_map(|s| s.values.iter()).fold(
        (f64::INFINITY, f64::NEG_INFINITY),
        |(lo, hi), v| (lo.min(*v), hi.max(*v)),
    );
    let (min, max) = if min.is_finite() { (min, max) } else { (0.0, 1.0) };
    let pad = ((max - min) * 0.05).max(1.0);
    let x_range = -0.5..(stats.len().max(1) as f64 - 0.5);
    let y_range = (min - pad)..(max + pad);

    let root = SVGBackend::new(&chart.output, (chart.width, chart.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut plot = ChartBuilder::on(&root)
        .caption(&chart.title, ("sans-serif", 24))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)?;

    let category_label = |x: &f64| -> String {
        let slot = x.round();
        if (x - slot).abs() > 1e-6 || slot < 0.0 {
            return String::new();
        }
        categories.get(slot as usize).map(|c| c.to_string()).unwrap_or_default()
    };

    plot.configure_mesh()
        .disable_x_mesh()
        .x_labels(stats.len() * 2 + 1)
        .x_label_formatter(&category_label)
        .x_desc(chart.x_label.as_str())
        .y_desc(chart.y_label.as_str())
        .draw()?;

    for (slot, stat) in stats.iter().enumerate() {
        let shape = BoxShape::new(stat, slot as f64);
        plot.draw_series(std::iter::once(Rectangle::new(shape.body, BLUE.stroke_width(2))))?;
        plot.draw_series(std::iter::once(PathElement::new(
            shape.median.to_vec(),
            BLUE.stroke_width(3),
        )))?;
        plot.draw_series(
            shape
                .whiskers
                .iter()
                .chain(shape.caps.iter())
                .map(|line| PathElement::new(line.to_vec(), BLUE.stroke_width(2))),
        )?;
        plot.draw_series(shape.outliers.iter().map(|point| Circle::new(*point, 3, RED.filled())))?;
    }

    root.present()
        .with_context(|| format!("Failed to write chart to {}", chart.output.display()))?;
    info!("Box plot written to {}", chart.output.display());
    Ok(())
}
