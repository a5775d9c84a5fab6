//! Adduct lookup table and adduct-string canonicalization.
//!
//! An adduct relates the neutral parent mass `M` of a molecule to the m/z of the measured ion:
//!
//! ```text
//! precursor_mz = M * mass_multiplier + correction_mass
//! ```
//!
//! The table is loaded once (either the built-in table shipped with the crate, see
//! [`AdductTable::builtin`], or a custom CSV via [`AdductTable::from_reader`]) and then shared
//! read-only behind an [`Arc`].

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::{ProcessingError, ProcessingResult};

const BUILTIN_ADDUCTS_CSV: &str = include_str!("../data/known_adducts.csv");

/// One row of the adduct table.
#[derive(Debug, Clone, PartialEq)]
pub struct AdductEntry {
    /// Canonical adduct string, e.g. `[M+H]+`.
    pub adduct: String,
    /// `"positive"` or `"negative"`.
    pub ionmode: String,
    /// Signed ion charge.
    pub charge: i64,
    pub mass_multiplier: f64,
    pub correction_mass: f64,
}

#[derive(Debug, Deserialize)]
struct AdductRecord {
    adduct: String,
    ionmode: String,
    charge: i64,
    mass_multiplier: f64,
    correction_mass: f64,
}

/// Immutable mapping `canonical adduct -> AdductEntry`.
#[derive(Debug, Clone, Default)]
pub struct AdductTable {
    entries: IndexMap<String, AdductEntry>,
}

impl AdductTable {
    /// The table shipped with the crate, parsed on first use and shared afterwards.
    pub fn builtin() -> Arc<AdductTable> {
        static BUILTIN: OnceLock<Arc<AdductTable>> = OnceLock::new();
        Arc::clone(BUILTIN.get_or_init(|| {
            Arc::new(
                AdductTable::from_reader(BUILTIN_ADDUCTS_CSV.as_bytes())
                    .expect("built-in adduct table is valid"),
            )
        }))
    }

    /// Load a table from a CSV file.
    pub fn from_path(path: impl AsRef<Path>) -> ProcessingResult<Self> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// Load a table from CSV with the header
    /// `adduct,ionmode,charge,mass_multiplier,correction_mass`.
    ///
    /// Adduct strings are canonicalized with [`clean_adduct`]; a row whose canonical form was
    /// already seen is rejected.
    pub fn from_reader<R: Read>(reader: R) -> ProcessingResult<Self> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut entries = IndexMap::new();

        for (idx0, record) in rdr.deserialize::<AdductRecord>().enumerate() {
            // +1 for the header, +1 for 1-based lines.
            let line = idx0 + 2;
            let record = record?;
            let adduct = clean_adduct(&record.adduct).ok_or_else(|| ProcessingError::AdductTable {
                line,
                message: format!("empty adduct '{}'", record.adduct),
            })?;
            if record.mass_multiplier <= 0.0 {
                return Err(ProcessingError::AdductTable {
                    line,
                    message: format!("mass_multiplier must be > 0 (got {})", record.mass_multiplier),
                });
            }
            if entries.contains_key(&adduct) {
                return Err(ProcessingError::AdductTable {
                    line,
                    message: format!("duplicate adduct '{adduct}'"),
                });
            }
            entries.insert(
                adduct.clone(),
                AdductEntry {
                    adduct,
                    ionmode: record.ionmode.to_lowercase(),
                    charge: record.charge,
                    mass_multiplier: record.mass_multiplier,
                    correction_mass: record.correction_mass,
                },
            );
        }

        Ok(Self { entries })
    }

    /// Look up an adduct given in any common notation (`M+H`, `[M+H]+`, `[M+H]1+`, ...).
    ///
    /// If the given adduct carries no charge suffix, it matches the single table entry with the
    /// same core, if there is exactly one.
    pub fn lookup(&self, adduct: &str) -> Option<&AdductEntry> {
        let canonical = clean_adduct(adduct)?;
        if let Some(entry) = self.entries.get(&canonical) {
            return Some(entry);
        }
        if !canonical.ends_with(']') {
            return None;
        }
        let mut same_core = self
            .entries
            .values()
            .filter(|e| e.adduct.starts_with(canonical.as_str()));
        match (same_core.next(), same_core.next()) {
            (Some(entry), None) => Some(entry),
            _ => None,
        }
    }

    /// `(mass_multiplier, correction_mass)` for an adduct, if known.
    pub fn multiplier_and_correction(&self, adduct: &str) -> Option<(f64, f64)> {
        self.lookup(adduct)
            .map(|e| (e.mass_multiplier, e.correction_mass))
    }

    /// Number of adducts in the table.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no adducts.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in file order.
    pub fn iter(&self) -> impl Iterator<Item = &AdductEntry> {
        self.entries.values()
    }
}

/// Canonicalize an adduct string to the `[core]charge` notation used as table key.
///
/// - whitespace is removed
/// - a missing bracket pair is added around the core
/// - the charge suffix is normalized to `+`/`-` for a single charge and `n+`/`n-` otherwise
///
/// Returns `None` for empty input.
pub fn clean_adduct(adduct: &str) -> Option<String> {
    let compact: String = adduct.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return None;
    }

    let (core, charge) = match (compact.find('['), compact.rfind(']')) {
        (Some(open), Some(close)) if open < close => {
            (compact[open + 1..close].to_string(), compact[close + 1..].to_string())
        }
        _ => {
            let stripped = compact.trim_matches(|c| c == '[' || c == ']');
            match stripped.char_indices().last() {
                // `M+H+` carries its charge as the trailing sign.
                Some((idx, sign @ ('+' | '-'))) if idx > 0 => {
                    (stripped[..idx].to_string(), sign.to_string())
                }
                _ => (stripped.to_string(), String::new()),
            }
        }
    };

    if core.is_empty() {
        return None;
    }
    Some(format!("[{core}]{}", normalize_charge_suffix(&charge)))
}

fn normalize_charge_suffix(charge: &str) -> String {
    let sign = match (charge.contains('+'), charge.contains('-')) {
        (true, false) => '+',
        (false, true) => '-',
        _ => return charge.to_string(),
    };
    let digits: String = charge.chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.parse::<u32>() {
        Ok(n) if n > 1 => format!("{n}{sign}"),
        _ => sign.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{clean_adduct, AdductTable};
    use crate::error::ProcessingError;

    #[test]
    fn clean_adduct_adds_brackets_and_normalizes_charge() {
        assert_eq!(clean_adduct("M+H+").as_deref(), Some("[M+H]+"));
        assert_eq!(clean_adduct("[M+H]1+").as_deref(), Some("[M+H]+"));
        assert_eq!(clean_adduct(" [M+2H] 2+ ").as_deref(), Some("[M+2H]2+"));
        assert_eq!(clean_adduct("[M-H]+1").as_deref(), Some("[M-H]+"));
        assert_eq!(clean_adduct("M+Na").as_deref(), Some("[M+Na]"));
        assert_eq!(clean_adduct("   "), None);
        assert_eq!(clean_adduct("[]+"), None);
    }

    #[test]
    fn builtin_table_contains_common_adducts() {
        let table = AdductTable::builtin();
        assert!(!table.is_empty());
        let h = table.lookup("[M+H]+").unwrap();
        assert_eq!(h.mass_multiplier, 1.0);
        assert_eq!(h.correction_mass, 1.007276);
        assert_eq!(h.ionmode, "positive");

        assert_eq!(table.multiplier_and_correction("[M+2H]2+"), Some((0.5, 1.007276)));
    }

    #[test]
    fn lookup_without_charge_uses_unique_core() {
        let table = AdductTable::builtin();
        assert_eq!(table.lookup("M+Na").map(|e| e.adduct.as_str()), Some("[M+Na]+"));
        assert_eq!(table.lookup("[M-H]").map(|e| e.charge), Some(-1));
        assert!(table.lookup("[M+Xy]+").is_none());
    }

    #[test]
    fn custom_table_from_reader() {
        let csv = "adduct,ionmode,charge,mass_multiplier,correction_mass\n\
                   M+H+,positive,1,1,1.007276\n\
                   [M-H]-,negative,-1,1,-1.007276\n";
        let table = AdductTable::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        let adducts: Vec<_> = table.iter().map(|e| e.adduct.as_str()).collect();
        assert_eq!(adducts, vec!["[M+H]+", "[M-H]-"]);
    }

    #[test]
    fn duplicate_rows_are_rejected() {
        let csv = "adduct,ionmode,charge,mass_multiplier,correction_mass\n\
                   [M+H]+,positive,1,1,1.007276\n\
                   M+H+,positive,1,1,1.007276\n";
        let err = AdductTable::from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, ProcessingError::AdductTable { line: 3, .. }));
    }

    #[test]
    fn malformed_numbers_are_csv_errors() {
        let csv = "adduct,ionmode,charge,mass_multiplier,correction_mass\n\
                   [M+H]+,positive,one,1,1.007276\n";
        let err = AdductTable::from_reader(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("csv error"));
    }
}
