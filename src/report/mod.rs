pub mod box_plot;

pub use box_plot::{category_box_stats, render_svg, summary, BoxStats};
