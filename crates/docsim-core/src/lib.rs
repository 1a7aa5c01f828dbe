#![forbid(unsafe_code)]
//! docsim-core: the shared vocabulary of the simulator.
//!
//! Responsibilities:
//! - Schema model (document types, collections, databases) and flattening.
//! - Field/collection statistics records.
//! - Cost coefficients and simulation limits (`config`).
//! - Typed IDs and stable hashing.
//! - The error taxonomy every other crate reports through.
//!
//! **No I/O, no parsing of external file formats** here. Callers hand us
//! already-parsed descriptor records.

pub mod config;
pub mod error;
pub mod hash;
pub mod id;
pub mod prelude;
pub mod schema;
pub mod stats;

pub use error::{Error, Result};

/// Crate version recorded in reports for provenance.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
