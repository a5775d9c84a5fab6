//! JSON spectrum import.
//!
//! Supported inputs:
//! - A JSON array of objects: `[{"compound_name": "a", "peaks_json": [[100.0, 1.0]]}, ...]`
//! - A single object
//! - Newline-delimited JSON (NDJSON), one object per line
//!
//! Peaks are read from `peaks_json` or `peaks` (a list of `[mz, intensity]` pairs, or a JSON
//! string holding one), or from parallel `mz` / `intensities` arrays. Every other key becomes
//! metadata. Spectra without peaks are skipped.

use std::fs;
use std::path::Path;

use log::info;

use crate::error::{ProcessingError, ProcessingResult};
use crate::types::{Spectrum, Value};

const PEAK_KEYS: &[&str] = &["peaks_json", "peaks", "mz", "intensities"];

/// Load spectra from a JSON or NDJSON file.
pub fn load_from_json_path(path: impl AsRef<Path>) -> ProcessingResult<Vec<Spectrum>> {
    let text = fs::read_to_string(path)?;
    load_from_json_str(&text)
}

/// Load spectra from an in-memory JSON or NDJSON string.
pub fn load_from_json_str(input: &str) -> ProcessingResult<Vec<Spectrum>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ProcessingError::InvalidInput {
            message: "json input is empty".to_string(),
        });
    }

    // First try parsing as a single JSON value (array or object).
    let values = if let Ok(v) = serde_json::from_str::<serde_json::Value>(trimmed) {
        match v {
            serde_json::Value::Array(items) => items,
            serde_json::Value::Object(_) => vec![v],
            _ => {
                return Err(ProcessingError::InvalidInput {
                    message: "json must be an object, an array of objects, or NDJSON".to_string(),
                });
            }
        }
    } else {
        let mut values = Vec::new();
        for (i, line) in trimmed.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let v = serde_json::from_str::<serde_json::Value>(line).map_err(|e| {
                ProcessingError::InvalidInput {
                    message: format!("invalid ndjson at line {}: {}", i + 1, e),
                }
            })?;
            values.push(v);
        }
        values
    };

    let mut spectra = Vec::with_capacity(values.len());
    for (idx0, v) in values.iter().enumerate() {
        if let Some(spectrum) = json_to_spectrum(idx0 + 1, v)? {
            spectra.push(spectrum);
        }
    }
    Ok(spectra)
}

fn json_to_spectrum(record: usize, v: &serde_json::Value) -> ProcessingResult<Option<Spectrum>> {
    let obj = v.as_object().ok_or_else(|| ProcessingError::InvalidInput {
        message: format!("record {record} is not a json object"),
    })?;

    let mut peaks = read_peaks(record, obj)?;
    if peaks.is_empty() {
        info!("Empty spectrum found at record {record} (no peaks). Will not be imported.");
        return Ok(None);
    }
    peaks.sort_by(|a, b| a.0.total_cmp(&b.0));
    let (mz, intensities): (Vec<f64>, Vec<f64>) = peaks.into_iter().unzip();

    let mut spectrum = Spectrum::default().with_peaks(mz, intensities);
    for (key, value) in obj {
        if PEAK_KEYS.contains(&key.to_lowercase().as_str()) {
            continue;
        }
        spectrum.set(key, convert_json_value(value));
    }
    Ok(Some(spectrum))
}

fn read_peaks(
    record: usize,
    obj: &serde_json::Map<String, serde_json::Value>,
) -> ProcessingResult<Vec<(f64, f64)>> {
    let invalid = |message: String| ProcessingError::InvalidInput {
        message: format!("record {record}: {message}"),
    };

    if let Some(raw) = obj.get("peaks_json").or_else(|| obj.get("peaks")) {
        let parsed;
        let pairs = match raw {
            serde_json::Value::String(text) => {
                parsed = serde_json::from_str::<serde_json::Value>(text)?;
                &parsed
            }
            other => other,
        };
        let items = pairs
            .as_array()
            .ok_or_else(|| invalid("peaks must be a list of [mz, intensity] pairs".to_string()))?;
        return items
            .iter()
            .map(|pair| match pair.as_array().map(Vec::as_slice) {
                Some([mz, intensity]) => match (mz.as_f64(), intensity.as_f64()) {
                    (Some(mz), Some(intensity)) => Ok((mz, intensity)),
                    _ => Err(invalid(format!("non-numeric peak {pair}"))),
                },
                _ => Err(invalid(format!("peak {pair} is not an [mz, intensity] pair"))),
            })
            .collect();
    }

    match (obj.get("mz"), obj.get("intensities")) {
        (Some(mz), Some(intensities)) => {
            let mz = numeric_array(mz).ok_or_else(|| invalid("mz must be a list of numbers".to_string()))?;
            let intensities = numeric_array(intensities)
                .ok_or_else(|| invalid("intensities must be a list of numbers".to_string()))?;
            if mz.len() != intensities.len() {
                return Err(invalid(format!(
                    "mz length {} does not match intensities length {}",
                    mz.len(),
                    intensities.len()
                )));
            }
            Ok(mz.into_iter().zip(intensities).collect())
        }
        (None, None) => Ok(Vec::new()),
        _ => Err(invalid("mz and intensities must be given together".to_string())),
    }
}

fn numeric_array(v: &serde_json::Value) -> Option<Vec<f64>> {
    v.as_array()?.iter().map(serde_json::Value::as_f64).collect()
}

fn convert_json_value(v: &serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int64(i),
            None => n.as_f64().map(Value::Float64).unwrap_or(Value::Null),
        },
        serde_json::Value::String(s) => Value::Utf8(s.clone()),
        serde_json::Value::Array(items) => Value::List(items.iter().map(convert_json_value).collect()),
        serde_json::Value::Object(_) => Value::Utf8(v.to_string()),
    }
}
