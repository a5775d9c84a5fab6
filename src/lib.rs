//! `rust-spectrum-processing` harmonizes and validates the metadata of mass spectra through an
//! ordered chain of filters, and reports which filter changed or removed what.
//!
//! The primary entrypoint is [`processing::SpectrumProcessor`], built from a
//! [`processing::Preset`] and/or individually added filters. Filters are looked up in a
//! [`processing::FilterCatalog`], which fixes their execution order and default parameters.
//!
//! ## What a pipeline does
//!
//! - **Metadata harmonization**: charge, pepmass, precursor m/z, ion mode, compound name,
//!   adduct and formula ([`filters::metadata`])
//! - **Mass derivation**: precursor m/z ↔ parent mass via the adduct table or the charge
//!   ([`filters::mass`])
//! - **Annotation checks**: SMILES/InChI/InChIKey harmonization, repair and cross-validation
//!   ([`filters::annotation`])
//! - **Peak processing**: intensity normalization ([`filters::peaks`])
//!
//! A filter never fails on bad data: it returns `None` to discard the spectrum and logs why
//! through the [`log`] facade. [`ProcessingError`] is reserved for configuration mistakes
//! (unknown filter or preset, missing parameters, an empty pipeline) and I/O.
//!
//! ## Quick example
//!
//! ```rust
//! use rust_spectrum_processing::processing::{Preset, SpectrumProcessor};
//! use rust_spectrum_processing::types::{params, Spectrum, Value};
//!
//! # fn main() -> Result<(), rust_spectrum_processing::ProcessingError> {
//! let mut processor = SpectrumProcessor::new(Some(Preset::Minimal))?;
//! processor.add_filter(("require_correct_ionmode", params([("ion_mode_to_keep", "positive")])))?;
//!
//! let spectrum = Spectrum::from_metadata([
//!     ("pepmass", Value::from(445.12)),
//!     ("adduct", Value::from("[M+H]+")),
//! ]);
//! let out = processor.process_spectrum(&spectrum, None)?.expect("positive spectrum is kept");
//! assert_eq!(out.get_str("ionmode"), Some("positive"));
//! assert_eq!(out.get_i64("charge"), Some(1));
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`processing`]: filter catalog, pipeline builder/executor and processing report
//! - [`filters`]: the built-in filters
//! - [`adducts`]: adduct table and adduct-string canonicalization
//! - [`chemistry`]: structural identifier checks behind the [`chemistry::StructureToolkit`] seam
//! - [`execution`]: parallel batch execution with metrics and observer hooks
//! - [`ingestion`]: JSON spectrum import
//! - [`types`]: spectra and metadata values
//! - [`error`]: error type used across the crate

pub mod adducts;
pub mod chemistry;
pub mod error;
pub mod execution;
pub mod filters;
pub mod ingestion;
pub mod processing;
pub mod types;

pub use error::{ProcessingError, ProcessingResult};
