//! Chain-linking of overlapping historical series.
//!
//! Given raw series that each cover part of history, `splice` builds one
//! continuous series: the first segment is copied as-is, and each following
//! segment is rescaled so that it agrees with what has already been emitted at
//! the single date the two segments share.
//!
//! Scale factors compose: segment `k` is matched against the already-rescaled
//! output, so its factor is the product of all relative factors before it.
//!
//! Segments whose window holds no observations are skipped; the next segment is
//! then matched against the last segment that contributed anything.

use chrono::NaiveDate;

use crate::domain::TimeSeries;
use crate::error::{OverlapFault, SeriesError};

/// A read-only view of the part of a raw series to keep in the splice.
#[derive(Debug, Clone, Copy)]
pub struct Segment<'a> {
    pub series: &'a TimeSeries,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl<'a> Segment<'a> {
    pub fn new(series: &'a TimeSeries, start: NaiveDate, end: NaiveDate) -> Self {
        Self { series, start, end }
    }

    /// The observations retained from this segment.
    fn retained(&self) -> &'a [(NaiveDate, f64)] {
        let points = self.series.points();
        let lo = points.partition_point(|(d, _)| *d < self.start);
        let hi = points.partition_point(|(d, _)| *d <= self.end);
        if lo < hi { &points[lo..hi] } else { &[] }
    }
}

/// How one segment was rescaled.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentScale {
    pub index: usize,
    pub name: String,
    /// Date matched against the predecessor (`None` for the first contributing segment
    /// and for skipped segments).
    pub overlap: Option<NaiveDate>,
    /// Factor applied to the raw values of this segment.
    pub factor: f64,
    /// `factor` divided by the predecessor's factor.
    pub relative: f64,
    /// Number of points this segment added to the output.
    pub points: usize,
}

#[derive(Debug, Clone)]
pub struct SpliceOutput {
    pub series: TimeSeries,
    pub scales: Vec<SegmentScale>,
}

/// Splice `segments` into one continuous series named `name`.
pub fn splice(name: &str, segments: &[Segment<'_>]) -> Result<TimeSeries, SeriesError> {
    splice_with_report(name, segments).map(|out| out.series)
}

/// Like [`splice`], but also reports the factor applied to every segment.
pub fn splice_with_report(name: &str, segments: &[Segment<'_>]) -> Result<SpliceOutput, SeriesError> {
    if segments.is_empty() {
        return Err(SeriesError::NoSegments);
    }

    let mut output: Vec<(NaiveDate, f64)> = Vec::new();
    let mut scales = Vec::with_capacity(segments.len());
    // Retained points of the last segment that contributed anything, and its factor.
    let mut previous: Option<(&[(NaiveDate, f64)], f64)> = None;

    for (index, segment) in segments.iter().enumerate() {
        let retained = segment.retained();
        if retained.is_empty() {
            log::warn!(
                "segment {index} ('{}') has no observations in {}..{}; skipping",
                segment.series.name(),
                segment.start,
                segment.end
            );
            scales.push(SegmentScale {
                index,
                name: segment.series.name().to_string(),
                overlap: None,
                factor: previous.map_or(1.0, |(_, f)| f),
                relative: 1.0,
                points: 0,
            });
            continue;
        }

        let Some((prev_points, prev_factor)) = previous else {
            output.extend_from_slice(retained);
            scales.push(SegmentScale {
                index,
                name: segment.series.name().to_string(),
                overlap: None,
                factor: 1.0,
                relative: 1.0,
                points: retained.len(),
            });
            previous = Some((retained, 1.0));
            continue;
        };

        let overlap = boundary_date(index, prev_points, retained)?;
        // The overlap date is the last emitted point and the first retained one.
        let emitted = output.last().map_or(f64::NAN, |(_, v)| *v);
        let raw = retained[0].1;
        let factor = emitted / raw;
        if !factor.is_finite() {
            return Err(SeriesError::NonFiniteScale {
                segment: index,
                date: overlap,
                emitted,
                raw,
            });
        }
        log::debug!(
            "segment {index} ('{}'): overlap {overlap}, factor {factor:.6}",
            segment.series.name()
        );

        output.extend(retained[1..].iter().map(|&(d, v)| (d, v * factor)));
        scales.push(SegmentScale {
            index,
            name: segment.series.name().to_string(),
            overlap: Some(overlap),
            factor,
            relative: factor / prev_factor,
            points: retained.len() - 1,
        });
        previous = Some((retained, factor));
    }

    Ok(SpliceOutput {
        series: TimeSeries::from_ordered(name, output),
        scales,
    })
}

/// The single date shared by two retained ranges, which must be the end of
/// `prev` and the start of `next`.
fn boundary_date(
    segment: usize,
    prev: &[(NaiveDate, f64)],
    next: &[(NaiveDate, f64)],
) -> Result<NaiveDate, SeriesError> {
    let shared: Vec<NaiveDate> = next
        .iter()
        .map(|(d, _)| *d)
        .filter(|d| prev.binary_search_by_key(d, |(p, _)| *p).is_ok())
        .collect();

    let date = match shared.as_slice() {
        [] => {
            return Err(SeriesError::MisalignedOverlap {
                segment,
                fault: OverlapFault::NoSharedDate,
            });
        }
        [date] => *date,
        many => {
            return Err(SeriesError::MisalignedOverlap {
                segment,
                fault: OverlapFault::MultipleSharedDates(many.len()),
            });
        }
    };

    let prev_last = prev.last().map(|(d, _)| *d);
    let next_first = next.first().map(|(d, _)| *d);
    if prev_last != Some(date) || next_first != Some(date) {
        return Err(SeriesError::MisalignedOverlap {
            segment,
            fault: OverlapFault::NotAtBoundary(date),
        });
    }
    Ok(date)
}
