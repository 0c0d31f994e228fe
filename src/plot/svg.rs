//! SVG line charts via Plotters.
//!
//! The chart is fully data-driven: bounds are computed from the series before
//! any drawing happens, and missing values break the line instead of being
//! bridged. An optional 0/1 indicator (FRED `USREC`) shades recession periods.

use std::path::Path;

use plotters::prelude::*;

use crate::domain::TimeSeries;
use crate::error::AppError;
use crate::plot::ascii::year_fraction;

/// Write a line chart of `series` (one line each, with a legend) to `path`.
///
/// When `recessions` is given, periods where it is above 0.5 are shaded.
pub fn write_svg_chart(
    path: &Path,
    title: &str,
    series: &[&TimeSeries],
    recessions: Option<&TimeSeries>,
    size: (u32, u32),
) -> Result<(), AppError> {
    let runs: Vec<Vec<Vec<(f64, f64)>>> = series.iter().map(|s| finite_runs(s)).collect();
    let Some((x_bounds, y_bounds)) = bounds(&runs) else {
        return Err(AppError::new(2, format!("Nothing to chart for '{title}': no finite observations.")));
    };
    let spans = recessions
        .map(|r| recession_spans(r, x_bounds))
        .unwrap_or_default();

    draw(path, title, series, &runs, &spans, x_bounds, y_bounds, size)
        .map_err(|e| AppError::new(2, format!("Failed to write chart '{}': {e}", path.display())))?;
    log::info!("wrote chart {}", path.display());
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn draw(
    path: &Path,
    title: &str,
    series: &[&TimeSeries],
    runs: &[Vec<Vec<(f64, f64)>>],
    spans: &[(f64, f64)],
    (x0, x1): (f64, f64),
    (y0, y1): (f64, f64),
    size: (u32, u32),
) -> Result<(), Box<dyn std::error::Error>> {
    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 20))
        .margin(10)
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 30)
        .build_cartesian_2d(x0..x1, y0..y1)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(8)
        .y_labels(6)
        .x_label_formatter(&|v| format!("{v:.0}"))
        .y_label_formatter(&|v| format!("{v:.2}"))
        .draw()?;

    let shade = RGBColor(200, 200, 200).mix(0.5).filled();
    chart.draw_series(
        spans
            .iter()
            .map(|&(a, b)| Rectangle::new([(a, y0), (b, y1)], shade)),
    )?;

    for (idx, (s, pieces)) in series.iter().zip(runs).enumerate() {
        let style = Palette99::pick(idx).stroke_width(2);
        for (n, piece) in pieces.iter().enumerate() {
            let drawn = chart.draw_series(LineSeries::new(piece.iter().copied(), style))?;
            // One legend entry per series, not per unbroken run.
            if n == 0 {
                drawn
                    .label(s.name())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
            }
        }
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Split a series into runs of consecutive finite observations, on a
/// fractional-year x axis.
fn finite_runs(series: &TimeSeries) -> Vec<Vec<(f64, f64)>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();
    for &(date, value) in series.points() {
        if value.is_finite() {
            current.push((year_fraction(date), value));
        } else if !current.is_empty() {
            runs.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

/// Runs of indicator values above 0.5, as x spans clipped to `(x0, x1)`.
///
/// A run lasts until the next observation, so a single monthly flag shades
/// the whole month.
fn recession_spans(indicator: &TimeSeries, (x0, x1): (f64, f64)) -> Vec<(f64, f64)> {
    let points = indicator.points();
    let mut spans = Vec::new();
    let mut start = None;
    for (i, &(date, value)) in points.iter().enumerate() {
        let on = value > 0.5;
        match (on, start) {
            (true, None) => start = Some(year_fraction(date)),
            (false, Some(a)) => {
                spans.push((a, year_fraction(date)));
                start = None;
            }
            _ => {}
        }
        if on && i + 1 == points.len() {
            if let Some(a) = start {
                spans.push((a, year_fraction(date)));
            }
        }
    }
    spans
        .into_iter()
        .map(|(a, b)| (a.max(x0), b.min(x1)))
        .filter(|(a, b)| a < b)
        .collect()
}

fn bounds(runs: &[Vec<Vec<(f64, f64)>>]) -> Option<((f64, f64), (f64, f64))> {
    let mut x = (f64::INFINITY, f64::NEG_INFINITY);
    let mut y = (f64::INFINITY, f64::NEG_INFINITY);
    for &(px, py) in runs.iter().flatten().flatten() {
        x = (x.0.min(px), x.1.max(px));
        y = (y.0.min(py), y.1.max(py));
    }
    if !x.0.is_finite() {
        return None;
    }
    if x.1 <= x.0 {
        x = (x.0 - 0.5, x.1 + 0.5);
    }
    let pad = ((y.1 - y.0).abs() * 0.05).max(1e-9);
    Some((x, (y.0 - pad, y.1 + pad)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn y(year: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, 1, 1).unwrap()
    }

    #[test]
    fn missing_values_split_runs() {
        let s = TimeSeries::new(
            "v",
            vec![(y(2000), 1.0), (y(2001), f64::NAN), (y(2002), 2.0), (y(2003), 3.0)],
        )
        .unwrap();
        let runs = finite_runs(&s);
        assert_eq!(runs, vec![vec![(2000.0, 1.0)], vec![(2002.0, 2.0), (2003.0, 3.0)]]);
    }

    #[test]
    fn writes_svg_with_legend() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.svg");
        let a = TimeSeries::new("Capital", vec![(y(2000), 1.0), (y(2001), 2.0)]).unwrap();
        let b = TimeSeries::new("Output", vec![(y(2000), 1.5), (y(2001), 1.0)]).unwrap();

        write_svg_chart(&path, "Test", &[&a, &b], None, (640, 480)).unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Capital"));
        assert!(svg.contains("Output"));
    }

    #[test]
    fn recession_runs_become_clipped_spans() {
        let usrec = TimeSeries::new(
            "USREC",
            vec![
                (y(2000), 0.0),
                (y(2001), 1.0),
                (y(2002), 0.0),
                (y(2003), f64::NAN),
                (y(2004), 1.0),
                (y(2005), 1.0),
            ],
        )
        .unwrap();
        assert_eq!(
            recession_spans(&usrec, (1990.0, 2010.0)),
            vec![(2001.0, 2002.0), (2004.0, 2005.0)]
        );
        assert_eq!(recession_spans(&usrec, (2001.5, 2004.5)), vec![(2001.5, 2002.0), (2004.0, 2004.5)]);
        assert!(recession_spans(&usrec, (2010.0, 2020.0)).is_empty());
    }

    #[test]
    fn recessions_are_shaded() {
        let dir = tempfile::tempdir().unwrap();
        let gdp = TimeSeries::new("GDP", (2000..2006).map(|yr| (y(yr), yr as f64)).collect()).unwrap();
        let usrec = TimeSeries::new(
            "USREC",
            vec![(y(2000), 0.0), (y(2001), 1.0), (y(2002), 0.0), (y(2003), 1.0), (y(2004), 0.0)],
        )
        .unwrap();

        let plain = dir.path().join("plain.svg");
        let shaded = dir.path().join("shaded.svg");
        write_svg_chart(&plain, "GDP", &[&gdp], None, (640, 480)).unwrap();
        write_svg_chart(&shaded, "GDP", &[&gdp], Some(&usrec), (640, 480)).unwrap();

        let rects = |p: &Path| std::fs::read_to_string(p).unwrap().matches("<rect").count();
        assert_eq!(rects(&shaded), rects(&plain) + 2);
    }

    #[test]
    fn all_missing_is_a_usage_error() {
        let dir = tempfile::tempdir().unwrap();
        let s = TimeSeries::new("v", vec![(y(2000), f64::NAN)]).unwrap();
        let err = write_svg_chart(&dir.path().join("x.svg"), "x", &[&s], None, (100, 100)).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
