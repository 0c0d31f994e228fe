//! `macro-splice` library crate.
//!
//! The binary (`msplice`) is a thin wrapper around this library so that:
//!
//! - splicing and capital-stock code is testable without spawning processes
//! - modules are reusable (e.g., notebooks or other front-ends)
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod capital;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod plot;
pub mod report;
pub mod splice;
