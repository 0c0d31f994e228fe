//! Input/output helpers.
//!
//! - CSV ingest of dated series (`ingest`)
//! - CSV export of one or more aligned series (`export`)
//! - splice recipes in JSON (`recipe`)

pub mod export;
pub mod ingest;
pub mod recipe;

pub use export::*;
pub use ingest::*;
pub use recipe::*;
