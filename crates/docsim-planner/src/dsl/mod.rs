//! Textual front ends for query suites.

pub mod yaml;
