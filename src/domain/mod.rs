//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the sampling `Frequency` of a series and its date conventions
//! - `TimeSeries`, an immutable ordered mapping from date to value
//! - explicit alignment helpers (`inner_join`, `outer_join`, `combine`, ...)

pub mod align;
pub mod series;
pub mod types;

pub use align::*;
pub use series::*;
pub use types::*;
