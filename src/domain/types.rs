//! Shared domain enums.

use chrono::{Datelike, NaiveDate};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Sampling frequency of a series.
///
/// Dates are always stored as the first day of their period (annual data on
/// January 1st, quarterly data on the first day of the quarter, ...). The
/// frequency decides how those dates are written out and how many periods make
/// up a year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Annual,
    Quarterly,
    Monthly,
}

impl Frequency {
    pub fn periods_per_year(self) -> usize {
        match self {
            Frequency::Annual => 1,
            Frequency::Quarterly => 4,
            Frequency::Monthly => 12,
        }
    }

    /// `strftime` pattern used for CSV output.
    pub fn date_format(self) -> &'static str {
        match self {
            Frequency::Annual => "%Y",
            Frequency::Quarterly | Frequency::Monthly => "%Y-%m-%d",
        }
    }

    pub fn format_date(self, date: NaiveDate) -> String {
        date.format(self.date_format()).to_string()
    }

    /// Header of the date column in exported CSVs.
    pub fn date_header(self) -> &'static str {
        match self {
            Frequency::Annual => "Year",
            Frequency::Quarterly | Frequency::Monthly => "Date",
        }
    }

    /// First day of the period containing `date`.
    pub fn period_start(self, date: NaiveDate) -> NaiveDate {
        let month = match self {
            Frequency::Annual => 1,
            Frequency::Quarterly => (date.month0() / 3) * 3 + 1,
            Frequency::Monthly => date.month(),
        };
        NaiveDate::from_ymd_opt(date.year(), month, 1).unwrap_or(date)
    }

    /// Guess the frequency from the median spacing of a sorted date list.
    pub fn infer(dates: &[NaiveDate]) -> Option<Frequency> {
        if dates.len() < 2 {
            return None;
        }
        let mut gaps: Vec<i64> = dates.windows(2).map(|w| (w[1] - w[0]).num_days()).collect();
        gaps.sort_unstable();
        let median = gaps[gaps.len() / 2];
        let freq = if median <= 31 {
            Frequency::Monthly
        } else if median <= 92 {
            Frequency::Quarterly
        } else {
            Frequency::Annual
        };
        Some(freq)
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Frequency::Annual => "annual",
            Frequency::Quarterly => "quarterly",
            Frequency::Monthly => "monthly",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn annual_dates_format_as_year_only() {
        assert_eq!(Frequency::Annual.format_date(d(1950, 1, 1)), "1950");
        assert_eq!(Frequency::Quarterly.format_date(d(1950, 4, 1)), "1950-04-01");
        assert_eq!(Frequency::Annual.date_header(), "Year");
        assert_eq!(Frequency::Monthly.date_header(), "Date");
    }

    #[test]
    fn period_start_snaps_to_first_day() {
        assert_eq!(Frequency::Annual.period_start(d(2001, 7, 1)), d(2001, 1, 1));
        assert_eq!(Frequency::Quarterly.period_start(d(2001, 8, 15)), d(2001, 7, 1));
        assert_eq!(Frequency::Monthly.period_start(d(2001, 8, 15)), d(2001, 8, 1));
    }

    #[test]
    fn infer_from_spacing() {
        let monthly = vec![d(2000, 1, 1), d(2000, 2, 1), d(2000, 3, 1)];
        let quarterly = vec![d(2000, 1, 1), d(2000, 4, 1), d(2000, 7, 1)];
        let annual = vec![d(2000, 1, 1), d(2001, 1, 1), d(2002, 1, 1)];
        assert_eq!(Frequency::infer(&monthly), Some(Frequency::Monthly));
        assert_eq!(Frequency::infer(&quarterly), Some(Frequency::Quarterly));
        assert_eq!(Frequency::infer(&annual), Some(Frequency::Annual));
        assert_eq!(Frequency::infer(&annual[..1]), None);
    }
}
