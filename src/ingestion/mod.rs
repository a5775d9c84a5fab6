//! Spectrum import.
//!
//! - [`json`]: JSON arrays, single objects and NDJSON

pub mod json;

pub use json::{load_from_json_path, load_from_json_str};
