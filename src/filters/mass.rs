//! Precursor m/z ↔ parent mass derivation.
//!
//! Both directions prefer the adduct table and fall back to a charge-only model that assumes an
//! `[M+xH]` / `[M-xH]` ion:
//!
//! ```text
//! adduct:  parent_mass  = (precursor_mz - correction_mass) / mass_multiplier
//!          precursor_mz = parent_mass * mass_multiplier + correction_mass
//! charge:  parent_mass  = precursor_mz * |z| - z * PROTON_MASS
//!          precursor_mz = (parent_mass + z * PROTON_MASS) / |z|
//! ```
//!
//! The two functions are inverses for the same adduct or charge.

use log::{error, info, warn};

use crate::adducts::AdductTable;
use crate::types::Spectrum;

use super::metadata::parse_charge;
use super::to_f64;

/// Mass of a proton in Dalton.
pub const PROTON_MASS: f64 = 1.007_276_47;

/// Charge used for mass derivation.
///
/// An explicit nonzero `charge` wins; otherwise `+1`/`-1` is inferred from `ionmode`; otherwise
/// `0` (unknown).
pub fn effective_charge(spectrum: &Spectrum) -> i64 {
    if let Some(charge) = spectrum.get("charge").and_then(parse_charge).filter(|c| *c != 0) {
        return charge;
    }
    match spectrum.get_str("ionmode") {
        Some("positive") => {
            info!(
                "Missing charge entry, but positive ionmode detected. \
                 Consider prior run of `correct_charge` filter."
            );
            1
        }
        Some("negative") => {
            info!(
                "Missing charge entry, but negative ionmode detected. \
                 Consider prior run of `correct_charge` filter."
            );
            -1
        }
        _ => {
            warn!(
                "Missing charge and ionmode entries. \
                 Consider prior run of `derive_ionmode` and `correct_charge` filters."
            );
            0
        }
    }
}

/// Derive the neutral parent mass from `precursor_mz`.
///
/// With `estimate_from_adduct`, a known `adduct` takes precedence over the charge model.
pub fn derive_parent_mass(
    spectrum: &Spectrum,
    estimate_from_adduct: bool,
    adducts: &AdductTable,
) -> Option<f64> {
    let Some(precursor_mz) = spectrum.get("precursor_mz").and_then(to_f64) else {
        warn!("Missing precursor m/z to derive parent mass.");
        return None;
    };
    let charge = effective_charge(spectrum);

    if estimate_from_adduct {
        if let Some((multiplier, correction_mass)) = adduct_terms(spectrum, adducts) {
            return Some((precursor_mz - correction_mass) / multiplier);
        }
    }

    if charge != 0 {
        let precursor_mass = precursor_mz * charge.abs() as f64;
        return Some(precursor_mass - PROTON_MASS * charge as f64);
    }
    None
}

/// Derive `precursor_mz` from `parent_mass`, the inverse of [`derive_parent_mass`].
pub fn derive_precursor_mz(spectrum: &Spectrum, adducts: &AdductTable) -> Option<f64> {
    let Some(parent_mass) = spectrum.get("parent_mass").and_then(to_f64) else {
        warn!("Missing parent mass to derive precursor m/z.");
        return None;
    };

    if let Some((multiplier, correction_mass)) = adduct_terms(spectrum, adducts) {
        return Some(parent_mass * multiplier + correction_mass);
    }

    let charge = effective_charge(spectrum);
    if charge != 0 {
        let precursor_mass = parent_mass + PROTON_MASS * charge as f64;
        return Some(precursor_mass / charge.abs() as f64);
    }
    error!("Precursor m/z could not be derived from parent mass, since charge and adduct were missing");
    None
}

fn adduct_terms(spectrum: &Spectrum, adducts: &AdductTable) -> Option<(f64, f64)> {
    let adduct = spectrum.get_str("adduct")?;
    let terms = adducts.multiplier_and_correction(adduct);
    if terms.is_none() {
        info!("Adduct '{adduct}' is not in the adduct table.");
    }
    terms
}
