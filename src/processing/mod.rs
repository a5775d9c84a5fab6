//! Filter pipelines over [`crate::types::Spectrum`] values.
//!
//! - [`FilterCatalog`]: registry of known filters, their canonical order, defaults and presets
//! - [`SpectrumProcessor`]: builds an ordered chain from a preset and added filters, then runs it
//! - [`ProcessingReport`]: counts, per filter, removed spectra and changed/added metadata
//!
//! ## Example: minimal preset with a report
//!
//! ```rust
//! use rust_spectrum_processing::processing::{Preset, SpectrumProcessor};
//! use rust_spectrum_processing::types::{Spectrum, Value};
//!
//! let spectra = vec![
//!     Spectrum::from_metadata([("charge", Value::from("+1")), ("pepmass", Value::from(100))]),
//!     Spectrum::from_metadata([("charge", Value::from("-1")), ("pepmass", Value::from(102))]),
//!     Spectrum::from_metadata([("charge", Value::from(-1)), ("pepmass", Value::from(104))]),
//! ];
//!
//! let processor = SpectrumProcessor::new(Some(Preset::Minimal)).unwrap();
//! let (kept, report) = processor.process_spectrums(&spectra, true).unwrap();
//! let report = report.unwrap();
//!
//! assert_eq!(kept.len(), 3);
//! assert_eq!(report.changed("make_charge_int"), 2);
//! assert_eq!(report.added("interpret_pepmass"), 3);
//! ```

mod builtin;
pub mod catalog;
pub mod processor;
pub mod report;

pub use catalog::{BoundFilter, CatalogEntry, FilterCatalog, FilterFn, ParamReader, Preset, ProcessingStep};
pub use processor::{CustomFilter, CustomFilterFn, FilterStep, SpectrumProcessor};
pub use report::{ProcessingReport, ReportRow};
