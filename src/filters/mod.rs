//! Built-in spectrum filters.
//!
//! Every filter has the same contract: it takes a spectrum by reference and returns either a new
//! spectrum or `None` to discard it. Filters never mutate their input and never fail with an
//! error for bad data; the reason for a discard is logged through [`log`].
//!
//! - [`metadata`]: charge, precursor, ion mode and compound name harmonization
//! - [`mass`]: precursor m/z ↔ parent mass derivation
//! - [`annotation`]: SMILES/InChI/InChIKey harmonization, repair and validation
//! - [`peaks`]: peak-list transformations
//!
//! Filters that need collaborators (the adduct table, a structure toolkit) receive them from a
//! [`FilterEnvironment`] when the catalog binds them.

pub mod annotation;
pub mod mass;
pub mod metadata;
pub mod peaks;

use std::fmt;
use std::sync::Arc;

use crate::adducts::AdductTable;
use crate::chemistry::{StructureToolkit, SyntacticToolkit};
use crate::types::Value;

pub use annotation::{
    harmonize_undefined_inchi, harmonize_undefined_inchikey, harmonize_undefined_smiles,
    repair_inchi_inchikey_smiles, require_annotation,
};
pub use mass::{derive_parent_mass, derive_precursor_mz, effective_charge, PROTON_MASS};
pub use metadata::{
    add_compound_name, add_parent_mass, add_precursor_mz, add_precursor_mz_from_parent_mass,
    clean_compound_name, correct_charge, derive_adduct_from_name, derive_formula_from_name,
    derive_ionmode, interpret_pepmass, make_charge_int, require_correct_ionmode,
    require_precursor_mz, IonModeSelection,
};
pub use peaks::normalize_intensities;

/// Shared, read-only collaborators handed to filters at bind time.
#[derive(Clone)]
pub struct FilterEnvironment {
    pub adducts: Arc<AdductTable>,
    pub toolkit: Arc<dyn StructureToolkit>,
}

impl FilterEnvironment {
    /// Collaborators from an explicit adduct table and toolkit.
    pub fn new(adducts: Arc<AdductTable>, toolkit: Arc<dyn StructureToolkit>) -> Self {
        Self { adducts, toolkit }
    }
}

impl Default for FilterEnvironment {
    /// Built-in adduct table and [`SyntacticToolkit`].
    fn default() -> Self {
        Self {
            adducts: AdductTable::builtin(),
            toolkit: Arc::new(SyntacticToolkit),
        }
    }
}

impl fmt::Debug for FilterEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterEnvironment")
            .field("adducts_len", &self.adducts.len())
            .finish()
    }
}

/// Numeric view of a metadata value, parsing numeric text.
pub(crate) fn to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Utf8(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        other => other.as_f64(),
    }
}
