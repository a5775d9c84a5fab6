//! Pipeline builder and sequential executor.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use log::debug;

use crate::error::{ProcessingError, ProcessingResult};
use crate::types::{Params, Spectrum};

use super::catalog::{BoundFilter, FilterCatalog, FilterFn, Preset, ProcessingStep};
use super::report::ProcessingReport;

/// Signature of a user-supplied filter. The second argument is the parameter map the filter
/// was added with.
pub type CustomFilterFn = Arc<dyn Fn(&Spectrum, &Params) -> Option<Spectrum> + Send + Sync>;

/// A filter that is not part of the catalog.
#[derive(Clone)]
pub struct CustomFilter {
    name: String,
    function: CustomFilterFn,
    params: Params,
}

impl CustomFilter {
    /// A named custom filter; `params` are passed to every call.
    pub fn new<F>(name: impl Into<String>, function: F, params: Option<Params>) -> Self
    where
        F: Fn(&Spectrum, &Params) -> Option<Spectrum> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            function: Arc::new(function),
            params: params.unwrap_or_default(),
        }
    }

    /// Name used in reports.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameters passed to the filter.
    pub fn params(&self) -> &Params {
        &self.params
    }

    fn bind(&self) -> BoundFilter {
        let function = Arc::clone(&self.function);
        let params = self.params.clone();
        let bound: FilterFn = Arc::new(move |s: &Spectrum| function(s, &params));
        BoundFilter::new(self.name.clone(), bound)
    }
}

impl fmt::Debug for CustomFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomFilter")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// One filter to add to a [`SpectrumProcessor`].
#[derive(Debug, Clone)]
pub enum FilterStep {
    /// A catalog filter; `params` are merged over its defaults.
    Known { name: String, params: Params },
    /// A user-supplied filter, always run after the catalog filters.
    Custom(CustomFilter),
}

impl FilterStep {
    /// A catalog filter with its default parameters.
    pub fn known(name: impl Into<String>) -> Self {
        FilterStep::Known {
            name: name.into(),
            params: Params::new(),
        }
    }

    /// A catalog filter with parameter overrides.
    pub fn with_params(name: impl Into<String>, params: Params) -> Self {
        FilterStep::Known {
            name: name.into(),
            params,
        }
    }
}

impl From<&str> for FilterStep {
    fn from(name: &str) -> Self {
        FilterStep::known(name)
    }
}

impl From<(&str, Params)> for FilterStep {
    fn from((name, params): (&str, Params)) -> Self {
        FilterStep::with_params(name, params)
    }
}

impl From<CustomFilter> for FilterStep {
    fn from(filter: CustomFilter) -> Self {
        FilterStep::Custom(filter)
    }
}

/// An ordered chain of filters applied to spectra one at a time.
///
/// Catalog filters always run in catalog order, whatever order they were added in. Custom
/// filters run afterwards, in the order they were added.
///
/// ```
/// use rust_spectrum_processing::processing::{Preset, SpectrumProcessor};
/// use rust_spectrum_processing::types::{Spectrum, Value};
///
/// let processor = SpectrumProcessor::new(Some(Preset::Minimal)).unwrap();
/// let spectrum = Spectrum::from_metadata([("charge", Value::from("+1")), ("pepmass", Value::from(100.0))]);
/// let out = processor.process_spectrum(&spectrum, None).unwrap().unwrap();
/// assert_eq!(out.get_f64("precursor_mz"), Some(100.0));
/// assert_eq!(out.get_i64("charge"), Some(1));
/// ```
#[derive(Debug, Clone)]
pub struct SpectrumProcessor {
    catalog: Arc<FilterCatalog>,
    preset: Option<Preset>,
    steps: Vec<ProcessingStep>,
    known: Vec<BoundFilter>,
    custom: Vec<BoundFilter>,
}

impl SpectrumProcessor {
    /// A processor over the built-in catalog, seeded from `preset` if given.
    pub fn new(preset: Option<Preset>) -> ProcessingResult<Self> {
        Self::with_catalog(FilterCatalog::builtin(), preset)
    }

    /// A processor over the built-in catalog, seeded from a preset name if given.
    pub fn from_preset_name(name: Option<&str>) -> ProcessingResult<Self> {
        Self::new(Preset::parse_optional(name)?)
    }

    /// A processor over an explicit catalog, seeded from `preset` if given.
    pub fn with_catalog(catalog: Arc<FilterCatalog>, preset: Option<Preset>) -> ProcessingResult<Self> {
        let mut processor = Self {
            catalog,
            preset,
            steps: Vec::new(),
            known: Vec::new(),
            custom: Vec::new(),
        };
        if let Some(preset) = preset {
            for step in processor.catalog.preset(preset)? {
                processor.insert_known(step)?;
            }
        }
        Ok(processor)
    }

    /// The preset this processor was seeded from.
    pub fn preset(&self) -> Option<Preset> {
        self.preset
    }

    /// The catalog filters are resolved against.
    pub fn catalog(&self) -> &Arc<FilterCatalog> {
        &self.catalog
    }

    /// Add a catalog or custom filter.
    ///
    /// A catalog filter replaces an earlier step of the same name.
    pub fn add_filter(&mut self, step: impl Into<FilterStep>) -> ProcessingResult<()> {
        match step.into() {
            FilterStep::Known { name, params } => {
                let step = self.catalog.resolve(&name, &params)?;
                self.insert_known(step)
            }
            FilterStep::Custom(filter) => {
                self.custom.push(filter.bind());
                Ok(())
            }
        }
    }

    /// Append a custom filter.
    pub fn add_custom_filter<F>(&mut self, name: impl Into<String>, function: F, params: Option<Params>)
    where
        F: Fn(&Spectrum, &Params) -> Option<Spectrum> + Send + Sync + 'static,
    {
        self.custom
            .push(CustomFilter::new(name, function, params).bind());
    }

    fn insert_known(&mut self, step: ProcessingStep) -> ProcessingResult<()> {
        let bound = self.catalog.bind(&step)?;
        if let Some(idx) = self.steps.iter().position(|s| s.name == step.name) {
            self.steps[idx] = step;
            self.known[idx] = bound;
            return Ok(());
        }
        let ordinal = self.catalog.ordinal(&step.name);
        let idx = self
            .steps
            .iter()
            .position(|s| self.catalog.ordinal(&s.name) > ordinal)
            .unwrap_or(self.steps.len());
        self.steps.insert(idx, step);
        self.known.insert(idx, bound);
        Ok(())
    }

    /// Resolved catalog steps in execution order. Custom filters are not included.
    pub fn processing_steps(&self) -> &[ProcessingStep] {
        &self.steps
    }

    /// Every filter in execution order.
    pub fn filters(&self) -> impl Iterator<Item = &BoundFilter> {
        self.known.iter().chain(self.custom.iter())
    }

    /// Whether no filter has been added.
    pub fn is_empty(&self) -> bool {
        self.known.is_empty() && self.custom.is_empty()
    }

    /// Run every filter on `spectrum`, stopping at the first one that discards it.
    ///
    /// Returns [`ProcessingError::NoFilters`] when the processor has no filters.
    pub fn process_spectrum(
        &self,
        spectrum: &Spectrum,
        mut report: Option<&mut ProcessingReport>,
    ) -> ProcessingResult<Option<Spectrum>> {
        if self.is_empty() {
            return Err(ProcessingError::NoFilters);
        }
        if let Some(report) = report.as_deref_mut() {
            report.count_spectrum();
        }

        let mut current = Cow::Borrowed(spectrum);
        for filter in self.filters() {
            let after = filter.apply(&current);
            if let Some(report) = report.as_deref_mut() {
                report.add_to_report(&current, after.as_ref(), filter.name());
            }
            match after {
                Some(next) => current = Cow::Owned(next),
                None => {
                    debug!("Spectrum discarded by {}.", filter.name());
                    return Ok(None);
                }
            }
        }
        Ok(Some(current.into_owned()))
    }

    /// Process every spectrum in order, keeping the survivors.
    pub fn process_spectrums(
        &self,
        spectra: &[Spectrum],
        create_report: bool,
    ) -> ProcessingResult<(Vec<Spectrum>, Option<ProcessingReport>)> {
        let mut report = create_report.then(ProcessingReport::new);
        let mut kept = Vec::with_capacity(spectra.len());
        for spectrum in spectra {
            if let Some(out) = self.process_spectrum(spectrum, report.as_mut())? {
                kept.push(out);
            }
        }
        Ok((kept, report))
    }

    /// The resolved steps as JSON.
    pub fn processing_steps_json(&self) -> ProcessingResult<String> {
        Ok(serde_json::to_string_pretty(&self.steps)?)
    }
}

impl fmt::Display for SpectrumProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SpectrumProcessor\nProcessing steps:")?;
        for step in &self.steps {
            write!(f, "\n- {}", step.name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{params, Value};

    #[test]
    fn empty_processor_refuses_to_run() {
        let processor = SpectrumProcessor::new(None).unwrap();
        let err = processor
            .process_spectrum(&Spectrum::default(), None)
            .unwrap_err();
        assert_eq!(err.to_string(), "No filters to process");
    }

    #[test]
    fn known_filters_are_sorted_by_catalog_order() {
        let mut processor = SpectrumProcessor::new(None).unwrap();
        processor.add_filter("correct_charge").unwrap();
        processor.add_filter("make_charge_int").unwrap();
        processor.add_filter("derive_ionmode").unwrap();
        let names: Vec<_> = processor.filters().map(|f| f.name().to_string()).collect();
        assert_eq!(names, vec!["make_charge_int", "derive_ionmode", "correct_charge"]);
    }

    #[test]
    fn later_parameterization_replaces_earlier() {
        let mut processor = SpectrumProcessor::new(Some(Preset::Default)).unwrap();
        let before = processor.processing_steps().len();
        processor
            .add_filter(("require_precursor_mz", params([("minimum_accepted_mz", 50.0)])))
            .unwrap();
        assert_eq!(processor.processing_steps().len(), before);
        let step = processor
            .processing_steps()
            .iter()
            .find(|s| s.name == "require_precursor_mz")
            .unwrap();
        assert_eq!(step.params.get("minimum_accepted_mz"), Some(&Value::Float64(50.0)));
    }

    #[test]
    fn unknown_filter_is_a_configuration_error() {
        let mut processor = SpectrumProcessor::new(None).unwrap();
        assert!(matches!(
            processor.add_filter("no_such_filter"),
            Err(ProcessingError::UnknownFilter { name }) if name == "no_such_filter"
        ));
        assert!(processor.is_empty());
    }

    #[test]
    fn steps_serialize_to_json() {
        let processor = SpectrumProcessor::new(Some(Preset::Minimal)).unwrap();
        let json = processor.processing_steps_json().unwrap();
        let parsed: Vec<ProcessingStep> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, processor.processing_steps());
    }

    #[test]
    fn discard_stops_the_chain() {
        let mut processor = SpectrumProcessor::new(None).unwrap();
        processor.add_custom_filter("drop", |_: &Spectrum, _: &Params| None, None);
        processor.add_custom_filter(
            "mark",
            |s: &Spectrum, _: &Params| {
                let mut out = s.clone();
                out.set("marked", true);
                Some(out)
            },
            None,
        );
        let mut report = ProcessingReport::new();
        let out = processor
            .process_spectrum(&Spectrum::default(), Some(&mut report))
            .unwrap();
        assert!(out.is_none());
        assert_eq!(report.removed("drop"), 1);
        assert_eq!(report.filter_applications(), 1);
    }
}
