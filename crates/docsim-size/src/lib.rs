#![forbid(unsafe_code)]
//! docsim-size: analytical byte-size estimation for documents, collections
//! and databases.
//!
//! Everything is computed from `Collection::flatten` plus a `SizeModel` of
//! per-type payload sizes. Outputs are exact for fixed inputs; nothing is
//! sampled.

pub mod estimate;
pub mod model;

pub use estimate::{
    collection_size, database_size, document_size, DatabaseSizeReport, SizeEstimator, SizeReport,
};
pub use model::SizeModel;
