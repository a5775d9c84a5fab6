//! Structural annotation filters (SMILES, InChI, InChIKey).

use log::{error, info, warn};

use crate::chemistry::{inchikey_skeleton, looks_like_inchi, looks_like_inchikey, looks_like_smiles, StructureToolkit};
use crate::types::{Spectrum, Value};

/// Values treated as "no annotation" when no explicit alias list is configured.
pub const DEFAULT_UNDEFINED_ALIASES: &[&str] = &["", "n/a", "na", "nan", "none", "null", "no data"];

fn harmonize_undefined(
    spectrum: &Spectrum,
    key: &str,
    aliases: Option<&[String]>,
    undefined: &str,
    extra_aliases: &[&str],
) -> Option<Spectrum> {
    let mut out = spectrum.clone();
    let is_alias = |value: &str| {
        let value = value.trim();
        let configured = match aliases {
            Some(list) => list.iter().any(|a| a.trim().eq_ignore_ascii_case(value)),
            None => DEFAULT_UNDEFINED_ALIASES
                .iter()
                .any(|a| a.eq_ignore_ascii_case(value)),
        };
        configured || extra_aliases.iter().any(|a| a.eq_ignore_ascii_case(value))
    };

    match spectrum.get(key) {
        None => out.set(key, undefined),
        Some(Value::Utf8(value)) if value != undefined && is_alias(value) => out.set(key, undefined),
        Some(_) => {}
    }
    Some(out)
}

/// Replace missing or placeholder InChIKeys with `undefined`.
pub fn harmonize_undefined_inchikey(
    spectrum: &Spectrum,
    aliases: Option<&[String]>,
    undefined: &str,
) -> Option<Spectrum> {
    harmonize_undefined(spectrum, "inchikey", aliases, undefined, &[])
}

/// Replace missing or placeholder InChIs (including a bare `InChI=`) with `undefined`.
pub fn harmonize_undefined_inchi(
    spectrum: &Spectrum,
    aliases: Option<&[String]>,
    undefined: &str,
) -> Option<Spectrum> {
    harmonize_undefined(spectrum, "inchi", aliases, undefined, &["InChI="])
}

/// Replace missing or placeholder SMILES with `undefined`.
pub fn harmonize_undefined_smiles(
    spectrum: &Spectrum,
    aliases: Option<&[String]>,
    undefined: &str,
) -> Option<Spectrum> {
    harmonize_undefined(spectrum, "smiles", aliases, undefined, &[])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdentifierKind {
    Smiles,
    Inchi,
    Inchikey,
}

impl IdentifierKind {
    fn key(self) -> &'static str {
        match self {
            IdentifierKind::Smiles => "smiles",
            IdentifierKind::Inchi => "inchi",
            IdentifierKind::Inchikey => "inchikey",
        }
    }

    // InChI and InChIKey are checked first: the SMILES alphabet also accepts InChIKeys.
    fn classify(value: &str) -> Option<Self> {
        if looks_like_inchi(value) {
            Some(IdentifierKind::Inchi)
        } else if looks_like_inchikey(value) {
            Some(IdentifierKind::Inchikey)
        } else if looks_like_smiles(value) {
            Some(IdentifierKind::Smiles)
        } else {
            None
        }
    }
}

/// Move identifiers stored under the wrong key (e.g. an InChI in `smiles`) to the right one.
///
/// A value is only moved into an empty target field; the source field is cleared to `""`.
pub fn repair_inchi_inchikey_smiles(spectrum: &Spectrum) -> Option<Spectrum> {
    let mut out = spectrum.clone();
    for source in [IdentifierKind::Inchi, IdentifierKind::Inchikey, IdentifierKind::Smiles] {
        let Some(value) = out.get_str(source.key()).map(|v| v.trim().to_string()) else {
            continue;
        };
        if value.is_empty() {
            continue;
        }
        let Some(kind) = IdentifierKind::classify(&value) else {
            continue;
        };
        if kind == source {
            continue;
        }
        let target_empty = out
            .get_str(kind.key())
            .is_none_or(|v| v.trim().is_empty());
        if target_empty {
            info!("Moved {} from '{}' to '{}'.", value, source.key(), kind.key());
            out.set(kind.key(), value);
            out.set(source.key(), "");
        }
    }
    Some(out)
}

/// Keep only spectra whose SMILES, InChI and InChIKey are valid and describe the same molecular
/// skeleton.
///
/// Checks run in order and stop at the first failure:
///
/// 1. SMILES is valid
/// 2. InChIKey is valid
/// 3. InChI is valid
/// 4. the InChIKey skeleton (first 14 characters) matches the key derived from the InChI
/// 5. the InChIKey skeleton matches the key derived from the SMILES (via InChI)
///
/// Only the skeleton layer is compared, so stereochemistry or protonation differences do not
/// cause a removal.
///
/// Checks 4 and 5 need a toolkit that can convert identifiers. With [`SyntacticToolkit`], the
/// toolkit of [`FilterCatalog::builtin`](crate::processing::FilterCatalog::builtin), every
/// conversion fails and every spectrum is removed; each such removal is logged at `error`.
/// Bind a real toolkit through
/// [`FilterCatalog::with_environment`](crate::processing::FilterCatalog::with_environment).
///
/// [`SyntacticToolkit`]: crate::chemistry::SyntacticToolkit
pub fn require_annotation(spectrum: &Spectrum, toolkit: &dyn StructureToolkit) -> Option<Spectrum> {
    let smiles = spectrum.get_str("smiles").unwrap_or_default();
    let inchi = spectrum.get_str("inchi").unwrap_or_default();
    let inchikey = spectrum.get_str("inchikey").unwrap_or_default();

    if !toolkit.is_valid_smiles(smiles) {
        info!("Removed spectrum since smiles is not valid. Incorrect smiles = {smiles}");
        return None;
    }
    if !toolkit.is_valid_inchikey(inchikey) {
        info!("Removed spectrum since inchikey is not valid. Incorrect inchikey = {inchikey}");
        return None;
    }
    if !toolkit.is_valid_inchi(inchi) {
        info!("Removed spectrum since inchi is not valid. Incorrect inchi = {inchi}");
        return None;
    }
    let Some(skeleton) = inchikey_skeleton(inchikey) else {
        info!("Removed spectrum since inchikey is too short. Incorrect inchikey = {inchikey}");
        return None;
    };

    let from_inchi = toolkit.inchi_to_inchikey(inchi);
    if from_inchi.is_none() {
        error!("Removed spectrum since the structure toolkit could not convert inchi {inchi} to an inchikey.");
        return None;
    }
    if from_inchi.as_deref().and_then(inchikey_skeleton) != Some(skeleton) {
        warn!(
            "Removed spectrum since inchi and inchikey do not match. \
             inchi = {inchi}, inchikey = {inchikey}, expected_inchikey = {}",
            from_inchi.as_deref().unwrap_or("<conversion failed>")
        );
        return None;
    }

    let from_smiles = toolkit
        .smiles_to_inchi(smiles)
        .and_then(|converted| toolkit.inchi_to_inchikey(&converted));
    if from_smiles.is_none() {
        error!("Removed spectrum since the structure toolkit could not convert smiles {smiles} to an inchikey.");
        return None;
    }
    if from_smiles.as_deref().and_then(inchikey_skeleton) != Some(skeleton) {
        warn!(
            "Removed spectrum since smiles does not match the inchikey. \
             inchikey = {inchikey}, smiles = {smiles}, expected_inchikey = {}",
            from_smiles.as_deref().unwrap_or("<conversion failed>")
        );
        return None;
    }

    Some(spectrum.clone())
}
