//! Error types.
//!
//! Two layers:
//!
//! - `SeriesError`: typed failures of the pure computations (splicing, capital
//!   recursion, series transforms). Library callers can match on these.
//! - `AppError`: what the binary reports. It carries a process exit code:
//!   `2` usage/config/local files, `3` domain errors, `4` remote data.

use chrono::NaiveDate;
use thiserror::Error;

/// Why two adjacent segments could not be joined.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OverlapFault {
    /// The retained ranges do not share any date.
    #[error("no shared date")]
    NoSharedDate,
    /// The retained ranges share more than one date.
    #[error("{0} shared dates")]
    MultipleSharedDates(usize),
    /// Exactly one date is shared, but it is not the end of the predecessor
    /// and the start of the successor.
    #[error("shared date {0} is not a boundary")]
    NotAtBoundary(NaiveDate),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SeriesError {
    #[error("No segments to splice")]
    NoSegments,

    #[error("Segment {segment} does not share exactly one boundary date with its predecessor ({fault})")]
    MisalignedOverlap { segment: usize, fault: OverlapFault },

    #[error("Non-finite scale for segment {segment} at {date}: emitted={emitted}, raw={raw}")]
    NonFiniteScale {
        segment: usize,
        date: NaiveDate,
        emitted: f64,
        raw: f64,
    },

    #[error("Initial capital calibration did not converge after {iterations} iterations (k0={k0}, residual={residual})")]
    CalibrationNotConverged {
        k0: f64,
        residual: f64,
        iterations: usize,
    },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Dates in series '{name}' are not strictly increasing at {date}")]
    UnorderedDates { name: String, date: NaiveDate },

    #[error("Series '{name}' has no observation at {date}")]
    MissingDate { name: String, date: NaiveDate },

    #[error("Series '{0}' is empty")]
    EmptySeries(String),
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<SeriesError> for AppError {
    fn from(err: SeriesError) -> Self {
        AppError::new(3, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
