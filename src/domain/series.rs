//! Immutable, date-ordered numeric series.
//!
//! A `TimeSeries` is an ordered mapping from a period date to an `f64`:
//!
//! - dates are strictly increasing (checked on construction)
//! - `NaN` marks a missing observation and is carried through transforms
//! - every transform returns a new series; nothing mutates in place

use std::collections::BTreeMap;

use chrono::{Datelike, Months, NaiveDate};

use crate::domain::Frequency;
use crate::error::SeriesError;

#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    name: String,
    points: Vec<(NaiveDate, f64)>,
}

impl TimeSeries {
    /// Build a series from points that are already in strictly increasing date order.
    pub fn new(name: impl Into<String>, points: Vec<(NaiveDate, f64)>) -> Result<Self, SeriesError> {
        let name = name.into();
        if let Some(w) = points.windows(2).find(|w| w[1].0 <= w[0].0) {
            return Err(SeriesError::UnorderedDates { name, date: w[1].0 });
        }
        Ok(Self { name, points })
    }

    /// Build a series from points in any order. Duplicate dates are still rejected.
    pub fn from_unsorted(
        name: impl Into<String>,
        mut points: Vec<(NaiveDate, f64)>,
    ) -> Result<Self, SeriesError> {
        points.sort_by_key(|(d, _)| *d);
        Self::new(name, points)
    }

    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            points: Vec::new(),
        }
    }

    /// Crate-internal constructor for points whose ordering is already guaranteed
    /// (e.g., produced by merging ordered inputs).
    pub(crate) fn from_ordered(name: impl Into<String>, points: Vec<(NaiveDate, f64)>) -> Self {
        debug_assert!(points.windows(2).all(|w| w[0].0 < w[1].0));
        Self {
            name: name.into(),
            points,
        }
    }

    /// Internal constructor for transforms that preserve (or rebuild) ordering.
    fn with_points(&self, points: Vec<(NaiveDate, f64)>) -> Self {
        Self {
            name: self.name.clone(),
            points,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            points: self.points.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[(NaiveDate, f64)] {
        &self.points
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.points.iter().map(|(d, _)| *d)
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|(_, v)| *v)
    }

    pub fn first(&self) -> Option<(NaiveDate, f64)> {
        self.points.first().copied()
    }

    pub fn last(&self) -> Option<(NaiveDate, f64)> {
        self.points.last().copied()
    }

    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.points
            .binary_search_by_key(&date, |(d, _)| *d)
            .ok()
            .map(|idx| self.points[idx].1)
    }

    pub fn value_at(&self, date: NaiveDate) -> Result<f64, SeriesError> {
        self.get(date).ok_or_else(|| SeriesError::MissingDate {
            name: self.name.clone(),
            date,
        })
    }

    /// Observations with `start <= date <= end`.
    pub fn window(&self, start: NaiveDate, end: NaiveDate) -> Self {
        let lo = self.points.partition_point(|(d, _)| *d < start);
        let hi = self.points.partition_point(|(d, _)| *d <= end);
        let points = if lo < hi { self.points[lo..hi].to_vec() } else { Vec::new() };
        self.with_points(points)
    }

    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        self.with_points(self.points.iter().map(|&(d, v)| (d, f(v))).collect())
    }

    pub fn scale(&self, factor: f64) -> Self {
        self.map(|v| v * factor)
    }

    /// Rescale so that the value at `date` equals `target`.
    pub fn rescale_to(&self, date: NaiveDate, target: f64) -> Result<Self, SeriesError> {
        let current = self.value_at(date)?;
        self.scale_checked(date, target, current)
    }

    /// Rescale so that the mean over `start..=end` equals `target`
    /// (e.g. a vacancy rate whose 1965 average is 2.05%).
    pub fn rescale_mean(&self, start: NaiveDate, end: NaiveDate, target: f64) -> Result<Self, SeriesError> {
        let current = self
            .window(start, end)
            .mean()
            .ok_or_else(|| SeriesError::EmptySeries(format!("{} in {start}..{end}", self.name)))?;
        self.scale_checked(start, target, current)
    }

    fn scale_checked(&self, date: NaiveDate, target: f64, current: f64) -> Result<Self, SeriesError> {
        let factor = target / current;
        if !factor.is_finite() {
            return Err(SeriesError::NonFiniteScale {
                segment: 0,
                date,
                emitted: target,
                raw: current,
            });
        }
        Ok(self.scale(factor))
    }

    /// Percent change over `lag` observations. The first `lag` dates are dropped.
    pub fn pct_change(&self, lag: usize) -> Self {
        let lag = lag.max(1);
        let points = self
            .points
            .iter()
            .skip(lag)
            .zip(self.points.iter())
            .map(|(&(d, v), &(_, prev))| (d, 100.0 * (v / prev - 1.0)))
            .collect();
        self.with_points(points)
    }

    /// Percent change from the same period one year earlier.
    pub fn annual_pct_change(&self, frequency: Frequency) -> Self {
        self.pct_change(frequency.periods_per_year())
    }

    pub fn ln(&self) -> Self {
        self.map(f64::ln)
    }

    /// Mean over finite values; `None` if there are none.
    pub fn mean(&self) -> Option<f64> {
        let (sum, n) = self
            .values()
            .filter(|v| v.is_finite())
            .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
        if n == 0 { None } else { Some(sum / n as f64) }
    }

    /// Fill interior runs of `NaN` by linear interpolation in calendar days.
    ///
    /// Leading and trailing missing values have no bracketing observation and stay `NaN`.
    /// Infinite values are kept and never serve as an interpolation anchor.
    pub fn interpolate_missing(&self) -> Self {
        let mut points = self.points.clone();
        let mut last_finite: Option<usize> = None;
        for idx in 0..points.len() {
            let v = points[idx].1;
            if v.is_nan() {
                continue;
            }
            if v.is_infinite() {
                last_finite = None;
                continue;
            }
            if let Some(prev) = last_finite {
                if idx > prev + 1 {
                    let (d0, v0) = points[prev];
                    let (d1, v1) = points[idx];
                    for gap in &mut points[prev + 1..idx] {
                        gap.1 = lerp_days(d0, v0, d1, v1, gap.0);
                    }
                }
            }
            last_finite = Some(idx);
        }
        self.with_points(points)
    }

    /// Calendar-year means (dated January 1st). Missing values are skipped;
    /// a year without any finite value is `NaN`.
    pub fn to_annual_mean(&self) -> Self {
        let mut years: BTreeMap<i32, (f64, usize)> = BTreeMap::new();
        for &(d, v) in &self.points {
            let entry = years.entry(d.year()).or_insert((0.0, 0));
            if v.is_finite() {
                entry.0 += v;
                entry.1 += 1;
            }
        }
        let points = years
            .into_iter()
            .filter_map(|(year, (sum, n))| {
                let date = NaiveDate::from_ymd_opt(year, 1, 1)?;
                let mean = if n == 0 { f64::NAN } else { sum / n as f64 };
                Some((date, mean))
            })
            .collect();
        self.with_points(points)
    }

    /// Resample onto a first-of-month grid spanning the series, interpolating
    /// linearly in calendar days between finite observations.
    pub fn upsample_monthly_linear(&self) -> Self {
        let known: Vec<(NaiveDate, f64)> = self
            .points
            .iter()
            .copied()
            .filter(|(_, v)| v.is_finite())
            .collect();
        let (Some(&(first, _)), Some(&(last, _))) = (known.first(), known.last()) else {
            return self.with_points(Vec::new());
        };

        let mut cursor = Frequency::Monthly.period_start(first);
        if cursor < first {
            cursor = match cursor.checked_add_months(Months::new(1)) {
                Some(next) => next,
                None => return self.with_points(Vec::new()),
            };
        }

        let mut points = Vec::new();
        let mut seg = 0usize;
        while cursor <= last {
            while seg + 1 < known.len() && known[seg + 1].0 < cursor {
                seg += 1;
            }
            let (d0, v0) = known[seg];
            let value = match known.get(seg + 1) {
                Some(&(d1, v1)) if d0 != cursor => lerp_days(d0, v0, d1, v1, cursor),
                _ => v0,
            };
            points.push((cursor, value));
            cursor = match cursor.checked_add_months(Months::new(1)) {
                Some(next) => next,
                None => break,
            };
        }
        self.with_points(points)
    }
}

fn lerp_days(d0: NaiveDate, v0: f64, d1: NaiveDate, v1: f64, at: NaiveDate) -> f64 {
    let span = (d1 - d0).num_days() as f64;
    if span <= 0.0 {
        return v0;
    }
    let u = (at - d0).num_days() as f64 / span;
    v0 + u * (v1 - v0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn annual(pairs: &[(i32, f64)]) -> TimeSeries {
        TimeSeries::new("x", pairs.iter().map(|&(y, v)| (d(y, 1, 1), v)).collect()).unwrap()
    }

    #[test]
    fn rejects_duplicate_and_unordered_dates() {
        let err = TimeSeries::new("x", vec![(d(2000, 1, 1), 1.0), (d(2000, 1, 1), 2.0)]).unwrap_err();
        assert_eq!(
            err,
            SeriesError::UnorderedDates {
                name: "x".to_string(),
                date: d(2000, 1, 1)
            }
        );
        assert!(TimeSeries::new("x", vec![(d(2001, 1, 1), 1.0), (d(2000, 1, 1), 2.0)]).is_err());
        assert!(TimeSeries::from_unsorted("x", vec![(d(2001, 1, 1), 1.0), (d(2000, 1, 1), 2.0)]).is_ok());
    }

    #[test]
    fn window_is_inclusive() {
        let s = annual(&[(1950, 1.0), (1951, 2.0), (1952, 3.0), (1953, 4.0)]);
        let w = s.window(d(1951, 1, 1), d(1952, 1, 1));
        assert_eq!(w.points(), &[(d(1951, 1, 1), 2.0), (d(1952, 1, 1), 3.0)]);
        assert!(s.window(d(1960, 1, 1), d(1970, 1, 1)).is_empty());
    }

    #[test]
    fn rescaling_by_inverse_restores_values() {
        let s = annual(&[(1950, 10.0), (1951, 20.0), (1952, 30.5)]);
        let back = s.scale(1.7).scale(1.0 / 1.7);
        for ((_, a), (_, b)) in s.points().iter().zip(back.points()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn rescale_to_matches_target_and_rejects_zero() {
        let s = annual(&[(1950, 2.0), (1951, 4.0)]);
        let r = s.rescale_to(d(1951, 1, 1), 10.0).unwrap();
        assert_eq!(r.get(d(1950, 1, 1)), Some(5.0));
        let z = annual(&[(1950, 0.0)]);
        assert!(matches!(
            z.rescale_to(d(1950, 1, 1), 1.0),
            Err(SeriesError::NonFiniteScale { raw, .. }) if raw == 0.0
        ));
        assert!(matches!(
            s.rescale_to(d(1990, 1, 1), 1.0),
            Err(SeriesError::MissingDate { .. })
        ));
    }

    #[test]
    fn rescale_mean_hits_target_over_window() {
        let s = annual(&[(1964, 1.0), (1965, 2.0), (1966, 4.0), (1967, 8.0)]);
        let r = s.rescale_mean(d(1965, 1, 1), d(1966, 1, 1), 0.0205).unwrap();
        let mean = r.window(d(1965, 1, 1), d(1966, 1, 1)).mean().unwrap();
        assert!((mean - 0.0205).abs() < 1e-15);
        assert!((r.get(d(1967, 1, 1)).unwrap() - 8.0 * 0.0205 / 3.0).abs() < 1e-15);

        assert!(matches!(
            s.rescale_mean(d(1990, 1, 1), d(1991, 1, 1), 1.0),
            Err(SeriesError::EmptySeries(_))
        ));
        let zero = annual(&[(1965, 0.0), (1966, 0.0)]);
        assert!(matches!(
            zero.rescale_mean(d(1965, 1, 1), d(1966, 1, 1), 1.0),
            Err(SeriesError::NonFiniteScale { .. })
        ));
    }

    #[test]
    fn pct_change_drops_leading_lag() {
        let s = annual(&[(2000, 100.0), (2001, 110.0), (2002, 99.0)]);
        let g = s.pct_change(1);
        assert_eq!(g.len(), 2);
        assert!((g.points()[0].1 - 10.0).abs() < 1e-12);
        assert!((g.points()[1].1 + 10.0).abs() < 1e-12);
        assert_eq!(g.first().unwrap().0, d(2001, 1, 1));
    }

    #[test]
    fn interpolation_fills_interior_gaps_only() {
        let s = TimeSeries::new(
            "x",
            vec![
                (d(2000, 1, 1), f64::NAN),
                (d(2000, 1, 11), 0.0),
                (d(2000, 1, 21), f64::NAN),
                (d(2000, 1, 31), 20.0),
                (d(2000, 2, 10), f64::NAN),
            ],
        )
        .unwrap();
        let f = s.interpolate_missing();
        let v: Vec<f64> = f.values().collect();
        assert!(v[0].is_nan());
        assert!((v[2] - 10.0).abs() < 1e-12);
        assert!(v[4].is_nan());
    }

    #[test]
    fn interpolation_keeps_infinite_values() {
        let s = annual(&[(2000, 1.0), (2001, f64::INFINITY), (2002, 3.0)]);
        let f = s.interpolate_missing();
        assert_eq!(f.get(d(2001, 1, 1)), Some(f64::INFINITY));

        // A gap next to an infinity has no finite bracket on that side.
        let s = annual(&[(2000, 1.0), (2001, f64::NAN), (2002, f64::NEG_INFINITY), (2003, f64::NAN), (2004, 5.0)]);
        let v: Vec<f64> = s.interpolate_missing().values().collect();
        assert!(v[1].is_nan());
        assert_eq!(v[2], f64::NEG_INFINITY);
        assert!(v[3].is_nan());
    }

    #[test]
    fn annual_mean_skips_missing() {
        let s = TimeSeries::new(
            "m",
            vec![
                (d(2000, 1, 1), 1.0),
                (d(2000, 2, 1), f64::NAN),
                (d(2000, 3, 1), 3.0),
                (d(2001, 1, 1), f64::NAN),
            ],
        )
        .unwrap();
        let a = s.to_annual_mean();
        assert_eq!(a.get(d(2000, 1, 1)), Some(2.0));
        assert!(a.get(d(2001, 1, 1)).unwrap().is_nan());
    }

    #[test]
    fn monthly_upsample_interpolates_between_july_observations() {
        let s = TimeSeries::new("pop", vec![(d(2000, 7, 1), 100.0), (d(2001, 7, 1), 465.0)]).unwrap();
        let m = s.upsample_monthly_linear();
        assert_eq!(m.len(), 13);
        assert_eq!(m.first(), Some((d(2000, 7, 1), 100.0)));
        assert_eq!(m.last(), Some((d(2001, 7, 1), 465.0)));
        // 2000-07-01 -> 2001-07-01 spans 365 days; Jan 1st is 184 days in.
        let jan = m.get(d(2001, 1, 1)).unwrap();
        assert!((jan - (100.0 + 184.0)).abs() < 1e-9);
    }

    #[test]
    fn mean_ignores_nan() {
        let s = annual(&[(2000, 1.0), (2001, f64::NAN), (2002, 2.0)]);
        assert_eq!(s.mean(), Some(1.5));
        assert_eq!(TimeSeries::empty("e").mean(), None);
    }
}
