//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal (e.g., do the spliced pieces line up?)
//! - deterministic output (helpful for golden tests)
//!
//! Each series gets its own glyph; multi-point series are drawn as connected
//! lines, earlier series win where lines cross.

use chrono::{Datelike, NaiveDate};

use crate::domain::TimeSeries;

const GLYPHS: [char; 6] = ['*', 'o', '+', 'x', '#', '@'];

/// Render one or more series on a shared date axis.
pub fn render_series_plot(series: &[&TimeSeries], width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let Some((d_min, d_max)) = date_range(series) else {
        return "Plot: no finite observations\n".to_string();
    };
    let (t_min, t_max) = (year_fraction(d_min), year_fraction(d_max));
    let (t_min, t_max) = if t_max > t_min { (t_min, t_max) } else { (t_min - 0.5, t_max + 0.5) };

    let (y_min, y_max) = y_range(series).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    for (idx, s) in series.iter().enumerate() {
        let glyph = GLYPHS[idx % GLYPHS.len()];
        let cells: Vec<(usize, usize)> = s
            .points()
            .iter()
            .filter(|(_, v)| v.is_finite())
            .map(|&(d, v)| {
                (
                    map_x(year_fraction(d), t_min, t_max, width),
                    map_y(v, y_min, y_max, height),
                )
            })
            .collect();
        match cells.as_slice() {
            [] => {}
            [(x, y)] => grid[*y][*x] = glyph,
            _ => {
                for pair in cells.windows(2) {
                    draw_line(&mut grid, pair[0].0, pair[0].1, pair[1].0, pair[1].1, glyph);
                }
            }
        }
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: {d_min}..{d_max} | y=[{y_min:.2}, {y_max:.2}]\n"
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    let legend: Vec<String> = series
        .iter()
        .enumerate()
        .map(|(idx, s)| format!("{} {}", GLYPHS[idx % GLYPHS.len()], s.name()))
        .collect();
    out.push_str(&format!("Legend: {}\n", legend.join(" | ")));
    out
}

/// Date as a fractional year (`1950-07-02` is about `1950.5`).
pub fn year_fraction(date: NaiveDate) -> f64 {
    let days_in_year = if date.leap_year() { 366.0 } else { 365.0 };
    date.year() as f64 + date.ordinal0() as f64 / days_in_year
}

fn date_range(series: &[&TimeSeries]) -> Option<(NaiveDate, NaiveDate)> {
    let finite = || {
        series
            .iter()
            .flat_map(|s| s.points().iter())
            .filter(|(_, v)| v.is_finite())
            .map(|(d, _)| *d)
    };
    Some((finite().min()?, finite().max()?))
}

fn y_range(series: &[&TimeSeries]) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for v in series.iter().flat_map(|s| s.values()).filter(|v| v.is_finite()) {
        min_y = min_y.min(v);
        max_y = max_y.max(v);
    }

    if !(min_y.is_finite() && max_y.is_finite()) {
        None
    } else if max_y > min_y {
        Some((min_y, max_y))
    } else {
        Some((min_y - 1.0, max_y + 1.0))
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn y(year: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, 1, 1).unwrap()
    }

    #[test]
    fn plot_golden_snapshot_small() {
        let flat = TimeSeries::new("A", vec![(y(1950), 0.0), (y(1954), 0.0)]).unwrap();
        let point = TimeSeries::new("B", vec![(y(1954), 10.0)]).unwrap();

        let txt = render_series_plot(&[&flat, &point], 10, 5);
        let expected = concat!(
            "Plot: 1950-01-01..1954-01-01 | y=[-0.50, 10.50]\n",
            "         o\n",
            "          \n",
            "          \n",
            "          \n",
            "**********\n",
            "Legend: * A | o B\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn missing_values_are_not_plotted() {
        let s = TimeSeries::new("x", vec![(y(2000), f64::NAN)]).unwrap();
        assert_eq!(render_series_plot(&[&s], 20, 5), "Plot: no finite observations\n");
    }

    #[test]
    fn year_fraction_midyear() {
        let d = NaiveDate::from_ymd_opt(2001, 7, 2).unwrap();
        let t = year_fraction(d);
        assert!((t - (2001.0 + 182.0 / 365.0)).abs() < 1e-12);
    }
}
