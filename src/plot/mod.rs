//! Terminal and file charts of time series.

pub mod ascii;
pub mod svg;

pub use ascii::render_series_plot;
pub use svg::write_svg_chart;
