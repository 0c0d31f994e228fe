//! Explicit alignment of several series on their dates.
//!
//! Nothing here broadcasts implicitly: callers pick an inner join (dates present
//! everywhere) or an outer join (union of dates, `NaN` where a series has no
//! observation).

use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::domain::TimeSeries;

/// Rows present in both `a` and `b`, as `(date, a, b)`.
pub fn inner_join(a: &TimeSeries, b: &TimeSeries) -> Vec<(NaiveDate, f64, f64)> {
    let (pa, pb) = (a.points(), b.points());
    let mut out = Vec::with_capacity(pa.len().min(pb.len()));
    let (mut i, mut j) = (0, 0);
    while i < pa.len() && j < pb.len() {
        match pa[i].0.cmp(&pb[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                out.push((pa[i].0, pa[i].1, pb[j].1));
                i += 1;
                j += 1;
            }
        }
    }
    out
}

/// Union of all dates; each row holds one value per input series (`NaN` if absent).
pub fn outer_join(series: &[&TimeSeries]) -> Vec<(NaiveDate, Vec<f64>)> {
    let dates: BTreeSet<NaiveDate> = series.iter().flat_map(|s| s.dates()).collect();
    dates
        .into_iter()
        .map(|date| {
            let row = series
                .iter()
                .map(|s| s.get(date).unwrap_or(f64::NAN))
                .collect();
            (date, row)
        })
        .collect()
}

/// Inner-join `a` and `b` and apply `op` row by row.
pub fn combine(
    a: &TimeSeries,
    b: &TimeSeries,
    name: impl Into<String>,
    op: impl Fn(f64, f64) -> f64,
) -> TimeSeries {
    let points = inner_join(a, b)
        .into_iter()
        .map(|(d, x, y)| (d, op(x, y)))
        .collect();
    TimeSeries::from_ordered(name, points)
}

/// `a / b` on the common dates.
pub fn ratio(a: &TimeSeries, b: &TimeSeries) -> TimeSeries {
    combine(a, b, format!("{}/{}", a.name(), b.name()), |x, y| x / y)
}

/// Trim every series to the window shared by all of them.
///
/// Returns empty series if the windows do not intersect.
pub fn window_equalize(series: &[TimeSeries]) -> Vec<TimeSeries> {
    let start = series.iter().filter_map(|s| s.first().map(|p| p.0)).max();
    let end = series.iter().filter_map(|s| s.last().map(|p| p.0)).min();
    match (start, end) {
        (Some(start), Some(end)) if start <= end && series.iter().all(|s| !s.is_empty()) => {
            series.iter().map(|s| s.window(start, end)).collect()
        }
        _ => series.iter().map(|s| TimeSeries::empty(s.name())).collect(),
    }
}
