//! Core data model types for spectrum processing.
//!
//! A [`Spectrum`] is a peak list (parallel m/z and intensity arrays) plus a metadata mapping of
//! lowercase string keys to heterogeneous [`Value`]s. Filter parameters use the same value type,
//! collected in [`Params`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single dynamically-typed metadata or parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Missing/empty value.
    Null,
    /// Boolean.
    Bool(bool),
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// UTF-8 string.
    Utf8(String),
    /// Ordered list of values (e.g. a `pepmass` tuple or an alias list).
    List(Vec<Value>),
}

impl Value {
    /// Numeric view of the value. Integers are widened; text is not parsed.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float64(v) => Some(*v),
            Value::Int64(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Integer view of the value. Floats are accepted only when they hold a whole number.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(i) => Some(*i),
            Value::Float64(v) if v.fract() == 0.0 && v.is_finite() => Some(*v as i64),
            _ => None,
        }
    }

    /// Text view of the value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Utf8(s) => Some(s),
            _ => None,
        }
    }

    /// Boolean view of the value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Whether the value is [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "None"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int64(i) => write!(f, "{i}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::Utf8(s) => write!(f, "'{s}'"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int64(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Utf8(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Utf8(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Filter parameters, keyed by parameter name.
///
/// A `BTreeMap` keeps the key order deterministic, so resolved steps compare and print the same
/// way regardless of how the caller built them.
pub type Params = BTreeMap<String, Value>;

/// Build a [`Params`] map from `(name, value)` pairs.
pub fn params<K, V, I>(pairs: I) -> Params
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// A mass spectrum: peaks plus metadata.
///
/// Metadata keys are stored lowercase; [`Spectrum::get`] and [`Spectrum::set`] normalize the key
/// they are given, so `"PEPMASS"` and `"pepmass"` address the same entry.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Spectrum {
    /// Peak positions (m/z), ascending.
    pub mz: Vec<f64>,
    /// Peak intensities, same length as `mz`.
    pub intensities: Vec<f64>,
    metadata: BTreeMap<String, Value>,
}

impl Spectrum {
    /// Create a spectrum from peaks and metadata.
    ///
    /// # Panics
    ///
    /// Panics if `mz` and `intensities` have different lengths.
    pub fn new(mz: Vec<f64>, intensities: Vec<f64>, metadata: BTreeMap<String, Value>) -> Self {
        assert!(
            mz.len() == intensities.len(),
            "mz length {} does not match intensities length {}",
            mz.len(),
            intensities.len()
        );
        let metadata = metadata
            .into_iter()
            .map(|(k, v)| (normalize_key(&k), v))
            .collect();
        Self {
            mz,
            intensities,
            metadata,
        }
    }

    /// Create a peak-less spectrum carrying only metadata.
    pub fn from_metadata<K, V, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut spectrum = Self::default();
        for (k, v) in pairs {
            let key: String = k.into();
            spectrum.set(&key, v);
        }
        spectrum
    }

    /// Builder-style peak assignment.
    ///
    /// # Panics
    ///
    /// Panics if `mz` and `intensities` have different lengths.
    pub fn with_peaks(mut self, mz: Vec<f64>, intensities: Vec<f64>) -> Self {
        assert!(
            mz.len() == intensities.len(),
            "mz length {} does not match intensities length {}",
            mz.len(),
            intensities.len()
        );
        self.mz = mz;
        self.intensities = intensities;
        self
    }

    /// Look up a metadata value. Explicit `Null` entries are reported as absent.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.metadata
            .get(&normalize_key(key))
            .filter(|v| !v.is_null())
    }

    /// Look up a metadata value, falling back to `default` when absent.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a Value) -> &'a Value {
        self.get(key).unwrap_or(default)
    }

    /// Numeric metadata value for `key`.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    /// Integer metadata value for `key`.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    /// Text metadata value for `key`.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Set (or overwrite) a metadata value.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.metadata.insert(normalize_key(key), value.into());
    }

    /// Remove a metadata entry, returning its previous value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.metadata.remove(&normalize_key(key))
    }

    /// Full metadata mapping in key order.
    pub fn metadata(&self) -> &BTreeMap<String, Value> {
        &self.metadata
    }

    /// Number of peaks.
    pub fn peak_count(&self) -> usize {
        self.mz.len()
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}
