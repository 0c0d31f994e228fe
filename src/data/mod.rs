//! Raw series sources.
//!
//! - FRED observations API (`fred`)
//! - source descriptors and a lazy loader with one fallback (`source`)

pub mod fred;
pub mod source;

pub use fred::*;
pub use source::*;
