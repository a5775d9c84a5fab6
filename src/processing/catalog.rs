//! Registry of known filters: identity, canonical order, defaults and presets.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{ProcessingError, ProcessingResult};
use crate::filters::FilterEnvironment;
use crate::types::{Params, Spectrum, Value};

use super::builtin;

/// A bound filter function.
pub type FilterFn = Arc<dyn Fn(&Spectrum) -> Option<Spectrum> + Send + Sync>;

/// Turns resolved parameters into a [`FilterFn`], rejecting parameters of the wrong type.
pub type Binder = Arc<dyn Fn(&ParamReader<'_>) -> ProcessingResult<FilterFn> + Send + Sync>;

/// One registered filter.
#[derive(Clone)]
pub struct CatalogEntry {
    name: String,
    ordinal: usize,
    defaults: Option<Params>,
    required: Vec<String>,
    binder: Binder,
}

impl CatalogEntry {
    /// Registered filter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position in the canonical execution order.
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Stored defaults; `None` means the caller must supply every required parameter.
    pub fn defaults(&self) -> Option<&Params> {
        self.defaults.as_ref()
    }

    /// Parameter keys that must be supplied when there are no defaults.
    pub fn required(&self) -> &[String] {
        &self.required
    }

    fn accepts(&self, param: &str) -> bool {
        self.required.iter().any(|r| r == param)
            || self.defaults.as_ref().is_some_and(|d| d.contains_key(param))
    }
}

impl fmt::Debug for CatalogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogEntry")
            .field("name", &self.name)
            .field("ordinal", &self.ordinal)
            .field("defaults", &self.defaults)
            .field("required", &self.required)
            .finish_non_exhaustive()
    }
}

/// Immutable-after-construction registry of filters.
///
/// The registration index of a filter is its ordinal, and ordinals alone decide the execution
/// order of known filters in a [`super::SpectrumProcessor`].
#[derive(Debug, Clone, Default)]
pub struct FilterCatalog {
    entries: IndexMap<String, CatalogEntry>,
}

impl FilterCatalog {
    /// A catalog without any filters.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The shipped filters bound to the built-in adduct table and [`crate::chemistry::SyntacticToolkit`].
    ///
    /// Built once and shared.
    pub fn builtin() -> Arc<FilterCatalog> {
        static BUILTIN: OnceLock<Arc<FilterCatalog>> = OnceLock::new();
        Arc::clone(BUILTIN.get_or_init(|| {
            Arc::new(
                Self::with_environment(FilterEnvironment::default())
                    .expect("built-in filters have unique names"),
            )
        }))
    }

    /// The shipped filters bound to the given collaborators.
    pub fn with_environment(env: FilterEnvironment) -> ProcessingResult<Self> {
        let mut catalog = Self::empty();
        builtin::register_all(&mut catalog, &env)?;
        Ok(catalog)
    }

    /// Register a filter at the next ordinal.
    ///
    /// `defaults` of `None` marks a filter that must always be configured explicitly; its
    /// parameters are then listed in `required`.
    pub fn register<F>(
        &mut self,
        name: impl Into<String>,
        defaults: Option<Params>,
        required: &[&str],
        binder: F,
    ) -> ProcessingResult<()>
    where
        F: Fn(&ParamReader<'_>) -> ProcessingResult<FilterFn> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return Err(ProcessingError::DuplicateFilter { name });
        }
        let entry = CatalogEntry {
            name: name.clone(),
            ordinal: self.entries.len(),
            defaults,
            required: required.iter().map(|r| r.to_string()).collect(),
            binder: Arc::new(binder),
        };
        self.entries.insert(name, entry);
        Ok(())
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of registered filters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no filter is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Execution position of `name`, if registered.
    pub fn ordinal(&self, name: &str) -> Option<usize> {
        self.entries.get(name).map(|e| e.ordinal)
    }

    /// Filter names in canonical order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// The entry for `name`, or [`ProcessingError::UnknownFilter`].
    pub fn entry(&self, name: &str) -> ProcessingResult<&CatalogEntry> {
        self.entries
            .get(name)
            .ok_or_else(|| ProcessingError::UnknownFilter {
                name: name.to_string(),
            })
    }

    /// Merge `provided` over the stored defaults of `name`.
    pub fn resolve(&self, name: &str, provided: &Params) -> ProcessingResult<ProcessingStep> {
        let entry = self.entry(name)?;
        if let Some(param) = provided.keys().find(|key| !entry.accepts(key)) {
            return Err(ProcessingError::InvalidParameter {
                filter: name.to_string(),
                param: param.clone(),
                message: "unknown parameter".to_string(),
            });
        }

        let mut params = entry.defaults.clone().unwrap_or_default();
        params.extend(provided.iter().map(|(k, v)| (k.clone(), v.clone())));

        let missing: Vec<String> = entry
            .required
            .iter()
            .filter(|key| !params.contains_key(*key))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(ProcessingError::MissingParameters {
                filter: name.to_string(),
                missing,
            });
        }

        Ok(ProcessingStep {
            name: name.to_string(),
            params,
        })
    }

    /// Bind a resolved step to its filter function.
    pub fn bind(&self, step: &ProcessingStep) -> ProcessingResult<BoundFilter> {
        let entry = self.entry(&step.name)?;
        let reader = ParamReader {
            filter: &step.name,
            params: &step.params,
        };
        let function = (entry.binder)(&reader)?;
        Ok(BoundFilter {
            name: step.name.clone(),
            function,
        })
    }

    /// The resolved steps of a preset, in canonical order.
    pub fn preset(&self, preset: Preset) -> ProcessingResult<Vec<ProcessingStep>> {
        let mut steps = builtin::preset_steps(preset)
            .into_iter()
            .map(|(name, params)| self.resolve(name, &params))
            .collect::<ProcessingResult<Vec<_>>>()?;
        steps.sort_by_key(|step| self.ordinal(&step.name));
        Ok(steps)
    }
}

/// Typed access to the parameters of one step during binding.
#[derive(Debug, Clone, Copy)]
pub struct ParamReader<'a> {
    filter: &'a str,
    params: &'a Params,
}

impl<'a> ParamReader<'a> {
    /// Name of the filter being bound.
    pub fn filter(&self) -> &'a str {
        self.filter
    }

    /// The resolved parameters.
    pub fn params(&self) -> &'a Params {
        self.params
    }

    fn value(&self, key: &str) -> ProcessingResult<&'a Value> {
        self.params
            .get(key)
            .ok_or_else(|| ProcessingError::MissingParameters {
                filter: self.filter.to_string(),
                missing: vec![key.to_string()],
            })
    }

    fn invalid(&self, key: &str, expected: &str, found: &Value) -> ProcessingError {
        ProcessingError::InvalidParameter {
            filter: self.filter.to_string(),
            param: key.to_string(),
            message: format!("expected {expected}, got {found}"),
        }
    }

    /// Read a boolean parameter.
    pub fn bool(&self, key: &str) -> ProcessingResult<bool> {
        let value = self.value(key)?;
        value
            .as_bool()
            .ok_or_else(|| self.invalid(key, "a boolean", value))
    }

    /// Read a numeric parameter; integers are widened.
    pub fn f64(&self, key: &str) -> ProcessingResult<f64> {
        let value = self.value(key)?;
        value
            .as_f64()
            .ok_or_else(|| self.invalid(key, "a number", value))
    }

    /// Read a string parameter.
    pub fn str(&self, key: &str) -> ProcessingResult<&'a str> {
        let value = self.value(key)?;
        value
            .as_str()
            .ok_or_else(|| self.invalid(key, "a string", value))
    }

    /// `None` for a null parameter, otherwise a list of strings.
    pub fn optional_str_list(&self, key: &str) -> ProcessingResult<Option<Vec<String>>> {
        match self.value(key)? {
            Value::Null => Ok(None),
            Value::List(items) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| self.invalid(key, "a list of strings", item))
                })
                .collect::<ProcessingResult<Vec<_>>>()
                .map(Some),
            other => Err(self.invalid(key, "a list of strings or null", other)),
        }
    }

    /// Parse a string parameter with [`FromStr`].
    pub fn parse<T>(&self, key: &str) -> ProcessingResult<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.str(key)?
            .parse()
            .map_err(|e: T::Err| ProcessingError::InvalidParameter {
                filter: self.filter.to_string(),
                param: key.to_string(),
                message: e.to_string(),
            })
    }
}

/// A filter name with its fully resolved parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingStep {
    pub name: String,
    pub params: Params,
}

impl ProcessingStep {
    /// A step with already-resolved parameters.
    pub fn new(name: impl Into<String>, params: Params) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }
}

impl fmt::Display for ProcessingStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if self.params.is_empty() {
            return Ok(());
        }
        write!(f, "(")?;
        for (i, (key, value)) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{key}={value}")?;
        }
        write!(f, ")")
    }
}

/// A named filter ready to run.
#[derive(Clone)]
pub struct BoundFilter {
    name: String,
    function: FilterFn,
}

impl BoundFilter {
    /// Wrap a ready-to-run filter function.
    pub fn new(name: impl Into<String>, function: FilterFn) -> Self {
        Self {
            name: name.into(),
            function,
        }
    }

    /// Filter name used in reports.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the filter on one spectrum.
    pub fn apply(&self, spectrum: &Spectrum) -> Option<Spectrum> {
        (self.function)(spectrum)
    }
}

impl fmt::Debug for BoundFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundFilter")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Predefined pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Full metadata harmonization.
    Default,
    /// Charge normalization, pepmass interpretation, ion-mode derivation, charge correction.
    Minimal,
}

impl Preset {
    /// Preset name as accepted by [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::Default => "default",
            Preset::Minimal => "minimal",
        }
    }

    /// Parse an optional preset name; `None` stays `None`.
    pub fn parse_optional(name: Option<&str>) -> ProcessingResult<Option<Preset>> {
        name.map(str::parse).transpose()
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Preset {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(Preset::Default),
            "minimal" => Ok(Preset::Minimal),
            other => Err(ProcessingError::UnknownPipeline {
                name: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::params;

    fn identity() -> FilterFn {
        Arc::new(|s: &Spectrum| Some(s.clone()))
    }

    fn small_catalog() -> FilterCatalog {
        let mut catalog = FilterCatalog::empty();
        catalog
            .register("first", Some(Params::new()), &[], |_| Ok(identity()))
            .unwrap();
        catalog
            .register(
                "scaled",
                Some(params([("factor", Value::Float64(2.0)), ("enabled", Value::Bool(true))])),
                &[],
                |p| {
                    let factor = p.f64("factor")?;
                    let _ = p.bool("enabled")?;
                    Ok(Arc::new(move |s: &Spectrum| {
                        let mut out = s.clone();
                        out.set("factor", factor);
                        Some(out)
                    }))
                },
            )
            .unwrap();
        catalog
            .register("explicit", None, &["mode"], |p| {
                let _ = p.str("mode")?;
                Ok(identity())
            })
            .unwrap();
        catalog
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut catalog = small_catalog();
        let err = catalog
            .register("first", None, &[], |_| Ok(identity()))
            .unwrap_err();
        assert!(matches!(err, ProcessingError::DuplicateFilter { name } if name == "first"));
    }

    #[test]
    fn ordinals_follow_registration() {
        let catalog = small_catalog();
        assert_eq!(catalog.ordinal("first"), Some(0));
        assert_eq!(catalog.ordinal("explicit"), Some(2));
        assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["first", "scaled", "explicit"]);
    }

    #[test]
    fn provided_params_merge_over_defaults() {
        let catalog = small_catalog();
        let step = catalog
            .resolve("scaled", &params([("factor", Value::Float64(3.0))]))
            .unwrap();
        assert_eq!(
            step.params,
            params([("factor", Value::Float64(3.0)), ("enabled", Value::Bool(true))])
        );
        assert_eq!(step.to_string(), "scaled(enabled=true, factor=3)");
    }

    #[test]
    fn configuration_errors() {
        let catalog = small_catalog();
        assert!(matches!(
            catalog.resolve("nope", &Params::new()),
            Err(ProcessingError::UnknownFilter { .. })
        ));
        assert!(matches!(
            catalog.resolve("explicit", &Params::new()),
            Err(ProcessingError::MissingParameters { missing, .. }) if missing == vec!["mode".to_string()]
        ));
        assert!(matches!(
            catalog.resolve("first", &params([("bogus", 1)])),
            Err(ProcessingError::InvalidParameter { param, .. }) if param == "bogus"
        ));

        let step = catalog
            .resolve("scaled", &params([("factor", "big")]))
            .unwrap();
        assert!(matches!(
            catalog.bind(&step),
            Err(ProcessingError::InvalidParameter { param, .. }) if param == "factor"
        ));
    }

    #[test]
    fn bound_filter_runs() {
        let catalog = small_catalog();
        let step = catalog.resolve("scaled", &Params::new()).unwrap();
        let bound = catalog.bind(&step).unwrap();
        assert_eq!(bound.name(), "scaled");
        let out = bound.apply(&Spectrum::default()).unwrap();
        assert_eq!(out.get_f64("factor"), Some(2.0));
    }

    #[test]
    fn preset_names() {
        assert_eq!("minimal".parse::<Preset>().unwrap(), Preset::Minimal);
        assert_eq!(Preset::parse_optional(None).unwrap(), None);
        let err = Preset::parse_optional(Some("something_wrong")).unwrap_err();
        assert!(err.to_string().contains("Unknown processing pipeline 'something_wrong'"));
    }

    #[test]
    fn optional_string_lists() {
        let p = params([
            ("none", Value::Null),
            ("list", Value::List(vec!["a".into(), "b".into()])),
            ("mixed", Value::List(vec!["a".into(), Value::Int64(1)])),
        ]);
        let reader = ParamReader {
            filter: "test",
            params: &p,
        };
        assert_eq!(reader.optional_str_list("none").unwrap(), None);
        assert_eq!(
            reader.optional_str_list("list").unwrap(),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert!(reader.optional_str_list("mixed").is_err());
        assert!(reader.optional_str_list("missing").is_err());
    }
}
