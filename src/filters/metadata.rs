//! Metadata harmonization filters: charge, precursor m/z, ion mode and compound names.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use log::{info, warn};
use regex::Regex;

use crate::adducts::{clean_adduct, AdductTable};
use crate::types::{Spectrum, Value};

use super::mass::{derive_parent_mass, derive_precursor_mz};
use super::to_f64;

static ADDUCT_IN_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\s)(\[[^\[\]]*M[^\[\]]*\]\d*[+\-]?|\d*M[+\-][A-Za-z0-9+\-]+)\s*$")
        .expect("valid adduct regex")
});
static FORMULA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[A-Z][a-z]?\d*){2,}$").expect("valid formula regex")
});
static ELEMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Z][a-z]?").expect("valid element regex"));
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Charges beyond this magnitude are treated as unparseable.
pub const MAX_ABS_CHARGE: i64 = 1000;

const ELEMENTS: &[&str] = &[
    "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S", "Cl",
    "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge", "As",
    "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In",
    "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd", "Tb",
    "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg", "Tl",
    "Pb", "Bi", "Po", "At", "Rn", "Fr", "Ra", "Ac", "Th", "Pa", "U", "Np", "Pu", "D",
];

const NAME_PREFIXES: &[&str] = &[
    "massbankeu:",
    "massbank:",
    "mona:",
    "hmdb:",
    "respect:",
    "gnps:",
    "name:",
    "spectral match to ",
    "match to ",
];

/// Parse a charge written as `1`, `-1`, `+1`, `1+`, `2-`, `1.0` or `+`.
///
/// Charges with a magnitude above [`MAX_ABS_CHARGE`] give `None`.
pub fn parse_charge(value: &Value) -> Option<i64> {
    let charge = match value {
        Value::Int64(i) => Some(*i),
        Value::Float64(_) => value.as_i64(),
        Value::Utf8(s) => parse_charge_text(s),
        Value::List(items) => items.first().and_then(parse_charge),
        Value::Null | Value::Bool(_) => None,
    };
    charge.filter(|c| c.unsigned_abs() <= MAX_ABS_CHARGE as u64)
}

fn parse_charge_text(text: &str) -> Option<i64> {
    let t = text.trim();
    if t.is_empty() {
        return None;
    }
    let (sign, digits) = if let Some(rest) = t.strip_suffix('+') {
        (1, rest)
    } else if let Some(rest) = t.strip_suffix('-') {
        (-1, rest)
    } else if let Some(rest) = t.strip_prefix('+') {
        (1, rest)
    } else if let Some(rest) = t.strip_prefix('-') {
        (-1, rest)
    } else {
        (1, t)
    };
    let digits = digits.trim();
    if digits.is_empty() {
        return Some(sign);
    }
    digits
        .parse::<i64>()
        .ok()
        .or_else(|| {
            digits
                .parse::<f64>()
                .ok()
                .filter(|v| v.fract() == 0.0 && v.is_finite())
                .map(|v| v as i64)
        })
        .filter(|n| *n >= 0)
        .map(|n| sign * n)
}

/// Convert `charge` to an integer.
pub fn make_charge_int(spectrum: &Spectrum) -> Option<Spectrum> {
    let mut out = spectrum.clone();
    match spectrum.get("charge") {
        None | Some(Value::Int64(_)) => {}
        Some(v) => match parse_charge(v) {
            Some(charge) => out.set("charge", charge),
            None => warn!("Found charge ({v}) cannot be converted to integer."),
        },
    }
    Some(out)
}

/// Fill `compound_name` from `name` or `title` when missing.
pub fn add_compound_name(spectrum: &Spectrum) -> Option<Spectrum> {
    let mut out = spectrum.clone();
    if spectrum.get_str("compound_name").is_some_and(|n| !n.trim().is_empty()) {
        return Some(out);
    }
    let found = ["name", "title"]
        .into_iter()
        .filter_map(|key| spectrum.get_str(key))
        .map(str::trim)
        .find(|n| !n.is_empty());
    match found {
        Some(name) => out.set("compound_name", name),
        None => info!("No compound name found in metadata."),
    }
    Some(out)
}

/// Move a trailing adduct (`Cocaine [M+H]+`) from `compound_name` into `adduct`.
///
/// An existing `adduct` entry is kept. The adduct is cut from the name only when
/// `remove_adduct_from_name` is set.
pub fn derive_adduct_from_name(spectrum: &Spectrum, remove_adduct_from_name: bool) -> Option<Spectrum> {
    let mut out = spectrum.clone();
    let Some(name) = spectrum.get_str("compound_name") else {
        return Some(out);
    };
    let Some(caps) = ADDUCT_IN_NAME_RE.captures(name) else {
        return Some(out);
    };
    let Some(found) = caps.get(1) else {
        return Some(out);
    };

    if !spectrum.get_str("adduct").is_some_and(|a| !a.trim().is_empty()) {
        if let Some(adduct) = clean_adduct(found.as_str()) {
            info!("Added adduct {adduct} to metadata.");
            out.set("adduct", adduct);
        }
    }
    if remove_adduct_from_name {
        let stripped = name[..found.start()].trim_end().to_string();
        info!("Removed adduct {} from compound name.", found.as_str());
        out.set("compound_name", stripped);
    }
    Some(out)
}

/// Move a trailing molecular formula token (`Glucose C6H12O6`) from `compound_name` into
/// `formula`.
pub fn derive_formula_from_name(spectrum: &Spectrum, remove_formula_from_name: bool) -> Option<Spectrum> {
    let mut out = spectrum.clone();
    let Some(name) = spectrum.get_str("compound_name") else {
        return Some(out);
    };
    let trimmed = name.trim_end();
    let Some((head, last)) = trimmed.rsplit_once(char::is_whitespace) else {
        return Some(out);
    };
    if !looks_like_formula(last) {
        return Some(out);
    }

    if !spectrum.get_str("formula").is_some_and(|f| !f.trim().is_empty()) {
        info!("Added formula {last} to metadata.");
        out.set("formula", last);
    }
    if remove_formula_from_name {
        out.set("compound_name", head.trim_end());
    }
    Some(out)
}

// At least two element groups, every symbol a known element, and at least one count.
fn looks_like_formula(token: &str) -> bool {
    FORMULA_RE.is_match(token)
        && token.chars().any(|c| c.is_ascii_digit())
        && ELEMENT_RE
            .find_iter(token)
            .all(|symbol| ELEMENTS.contains(&symbol.as_str()))
}

/// Strip database prefixes from `compound_name` and collapse whitespace.
pub fn clean_compound_name(spectrum: &Spectrum) -> Option<Spectrum> {
    let mut out = spectrum.clone();
    let Some(name) = spectrum.get_str("compound_name") else {
        return Some(out);
    };

    let mut cleaned = name.trim();
    while let Some(prefix) = NAME_PREFIXES.iter().find(|prefix| {
        cleaned
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
    }) {
        cleaned = cleaned[prefix.len()..].trim_start();
    }
    let cleaned = WHITESPACE_RE.replace_all(cleaned, " ").trim().to_string();
    if cleaned != name {
        info!("Cleaned compound name from '{name}' to '{cleaned}'.");
        out.set("compound_name", cleaned);
    }
    Some(out)
}

/// Interpret `pepmass` (`mz`, `mz intensity`, `mz intensity charge`, or a list of those) into
/// `precursor_mz`, `precursor_intensity` and `charge`.
///
/// Existing entries are not overwritten. A readable `pepmass` entry is removed afterwards.
pub fn interpret_pepmass(spectrum: &Spectrum) -> Option<Spectrum> {
    let mut out = spectrum.clone();
    let Some(pepmass) = spectrum.get("pepmass") else {
        return Some(out);
    };
    let Some((mz, intensity, charge)) = parse_pepmass(pepmass) else {
        warn!("Pepmass ({pepmass}) could not be interpreted.");
        return Some(out);
    };

    match spectrum.get("precursor_mz").and_then(to_f64) {
        None => out.set("precursor_mz", mz),
        Some(existing) if (existing - mz).abs() > 1e-6 => {
            warn!("Precursor m/z {existing} differs from pepmass {mz}; keeping precursor m/z.")
        }
        Some(_) => {}
    }
    if let Some(intensity) = intensity {
        if spectrum.get("precursor_intensity").is_none() {
            out.set("precursor_intensity", intensity);
        }
    }
    if let Some(charge) = charge {
        if spectrum.get("charge").is_none() {
            out.set("charge", charge);
        }
    }
    out.remove("pepmass");
    Some(out)
}

fn parse_pepmass(value: &Value) -> Option<(f64, Option<f64>, Option<i64>)> {
    let parts: Vec<Value> = match value {
        Value::Int64(_) | Value::Float64(_) => vec![value.clone()],
        Value::Utf8(s) => s
            .split(|c: char| c.is_whitespace() || matches!(c, ',' | '(' | ')' | '[' | ']'))
            .filter(|t| !t.is_empty() && !t.eq_ignore_ascii_case("none"))
            .map(|t| Value::Utf8(t.to_string()))
            .collect(),
        Value::List(items) => items.clone(),
        Value::Null | Value::Bool(_) => return None,
    };
    let mz = parts.first().and_then(to_f64)?;
    let intensity = parts.get(1).and_then(to_f64);
    let charge = parts.get(2).and_then(parse_charge);
    Some((mz, intensity, charge))
}

/// Ensure `precursor_mz` is numeric, filling it from `precursormz` / `precursor_mass` aliases.
pub fn add_precursor_mz(spectrum: &Spectrum) -> Option<Spectrum> {
    let mut out = spectrum.clone();
    match spectrum.get("precursor_mz") {
        Some(Value::Float64(_)) => {}
        Some(Value::Int64(i)) => out.set("precursor_mz", *i as f64),
        Some(other) => match to_f64(other) {
            Some(mz) => out.set("precursor_mz", mz),
            None => warn!("Precursor m/z ({other}) could not be converted to a number."),
        },
        None => {
            let alias = ["precursormz", "precursor_mass"]
                .into_iter()
                .find_map(|key| spectrum.get(key).and_then(to_f64));
            match alias {
                Some(mz) => out.set("precursor_mz", mz),
                None => info!("No precursor m/z found in metadata."),
            }
        }
    }
    Some(out)
}

/// Derive `ionmode` from the adduct when it is not already `positive`/`negative`.
///
/// When no ion mode can be derived, a missing entry is set to `"n/a"`.
pub fn derive_ionmode(spectrum: &Spectrum, adducts: &AdductTable) -> Option<Spectrum> {
    let mut out = spectrum.clone();
    let current = spectrum.get_str("ionmode").map(|m| m.trim().to_lowercase());
    if let Some(mode) = current.as_deref().filter(|m| matches!(*m, "positive" | "negative")) {
        if spectrum.get_str("ionmode") != Some(mode) {
            out.set("ionmode", mode);
        }
        return Some(out);
    }

    let derived = spectrum.get_str("adduct").and_then(|adduct| {
        if let Some(entry) = adducts.lookup(adduct) {
            return Some(entry.ionmode.clone());
        }
        let canonical = clean_adduct(adduct)?;
        if canonical.ends_with('+') {
            Some("positive".to_string())
        } else if canonical.ends_with('-') {
            Some("negative".to_string())
        } else {
            None
        }
    });

    match derived {
        Some(mode) => {
            info!("Added ionmode '{mode}' based on adduct.");
            out.set("ionmode", mode);
        }
        None if current.as_deref() != Some("n/a") => out.set("ionmode", "n/a"),
        None => {}
    }
    Some(out)
}

/// Make `charge` consistent with `ionmode`: fill a missing/zero charge with `±1` and flip a sign
/// that contradicts the ion mode.
pub fn correct_charge(spectrum: &Spectrum) -> Option<Spectrum> {
    let mut out = spectrum.clone();
    let sign = match spectrum.get_str("ionmode") {
        Some("positive") => 1,
        Some("negative") => -1,
        _ => return Some(out),
    };
    match spectrum.get("charge").and_then(parse_charge) {
        None | Some(0) => {
            info!("Guessed charge {sign} from ionmode.");
            out.set("charge", sign);
        }
        Some(charge) if charge.signum() != sign => {
            warn!("Changed sign of charge {charge} to match ionmode.");
            out.set("charge", -charge);
        }
        Some(_) => {}
    }
    Some(out)
}

/// Ion modes accepted by [`require_correct_ionmode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IonModeSelection {
    Positive,
    Negative,
    Both,
}

impl IonModeSelection {
    pub fn as_str(&self) -> &'static str {
        match self {
            IonModeSelection::Positive => "positive",
            IonModeSelection::Negative => "negative",
            IonModeSelection::Both => "both",
        }
    }
}

impl fmt::Display for IonModeSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IonModeSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "positive" => Ok(Self::Positive),
            "negative" => Ok(Self::Negative),
            "both" => Ok(Self::Both),
            other => Err(format!(
                "expected 'positive', 'negative' or 'both', got '{other}'"
            )),
        }
    }
}

/// Discard spectra whose `ionmode` is not the selected one.
pub fn require_correct_ionmode(spectrum: &Spectrum, ion_mode_to_keep: IonModeSelection) -> Option<Spectrum> {
    let ionmode = spectrum.get_str("ionmode");
    let keep = match ion_mode_to_keep {
        IonModeSelection::Both => matches!(ionmode, Some("positive" | "negative")),
        IonModeSelection::Positive => ionmode == Some("positive"),
        IonModeSelection::Negative => ionmode == Some("negative"),
    };
    if !keep {
        info!(
            "Spectrum removed: ionmode {:?} does not match required ionmode '{ion_mode_to_keep}'.",
            ionmode
        );
        return None;
    }
    Some(spectrum.clone())
}

/// Discard spectra without `precursor_mz` or with a precursor below `minimum_accepted_mz`.
pub fn require_precursor_mz(spectrum: &Spectrum, minimum_accepted_mz: f64) -> Option<Spectrum> {
    match spectrum.get("precursor_mz").and_then(to_f64) {
        None => {
            info!("Spectrum removed: no precursor m/z.");
            None
        }
        Some(mz) if mz < minimum_accepted_mz => {
            info!("Spectrum removed: precursor m/z {mz} is below {minimum_accepted_mz}.");
            None
        }
        Some(_) => Some(spectrum.clone()),
    }
}

/// Add `parent_mass` derived from `precursor_mz` (see [`derive_parent_mass`]).
pub fn add_parent_mass(
    spectrum: &Spectrum,
    estimate_from_adduct: bool,
    overwrite_existing_entry: bool,
    adducts: &AdductTable,
) -> Option<Spectrum> {
    let mut out = spectrum.clone();
    if spectrum.get("parent_mass").is_some() && !overwrite_existing_entry {
        return Some(out);
    }
    match derive_parent_mass(spectrum, estimate_from_adduct, adducts) {
        Some(parent_mass) => out.set("parent_mass", parent_mass),
        None => warn!("Not sufficient spectrum metadata to derive parent mass."),
    }
    Some(out)
}

/// Add `precursor_mz` derived from `parent_mass` (see [`derive_precursor_mz`]).
pub fn add_precursor_mz_from_parent_mass(
    spectrum: &Spectrum,
    overwrite_existing_entry: bool,
    adducts: &AdductTable,
) -> Option<Spectrum> {
    let mut out = spectrum.clone();
    if spectrum.get("precursor_mz").is_some() && !overwrite_existing_entry {
        return Some(out);
    }
    if let Some(precursor_mz) = derive_precursor_mz(spectrum, adducts) {
        out.set("precursor_mz", precursor_mz);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s<const N: usize>(pairs: [(&str, Value); N]) -> Spectrum {
        Spectrum::from_metadata(pairs)
    }

    #[test]
    fn charge_text_is_parsed() {
        assert_eq!(parse_charge(&"+1".into()), Some(1));
        assert_eq!(parse_charge(&"2-".into()), Some(-2));
        assert_eq!(parse_charge(&"-1".into()), Some(-1));
        assert_eq!(parse_charge(&"1.0".into()), Some(1));
        assert_eq!(parse_charge(&"+".into()), Some(1));
        assert_eq!(parse_charge(&Value::Float64(-2.0)), Some(-2));
        assert_eq!(parse_charge(&"abc".into()), None);
    }

    #[test]
    fn implausible_charges_are_rejected() {
        assert_eq!(parse_charge(&Value::Int64(i64::MIN)), None);
        assert_eq!(parse_charge(&Value::Int64(1001)), None);
        assert_eq!(parse_charge(&"-5000".into()), None);
        assert_eq!(parse_charge(&Value::Int64(-1000)), Some(-1000));

        let positive = s([("ionmode", "positive".into()), ("charge", Value::Int64(i64::MIN))]);
        let out = correct_charge(&positive).unwrap();
        assert_eq!(out.get_i64("charge"), Some(1));
    }

    #[test]
    fn make_charge_int_leaves_integers_and_garbage_alone() {
        let out = make_charge_int(&s([("charge", "2+".into())])).unwrap();
        assert_eq!(out.get("charge"), Some(&Value::Int64(2)));

        let int = s([("charge", Value::Int64(-1))]);
        assert_eq!(make_charge_int(&int).unwrap(), int);

        let bad = s([("charge", "high".into())]);
        assert_eq!(make_charge_int(&bad).unwrap(), bad);
    }

    #[test]
    fn compound_name_from_name_or_title() {
        let out = add_compound_name(&s([("title", "Caffeine".into())])).unwrap();
        assert_eq!(out.get_str("compound_name"), Some("Caffeine"));

        let out = add_compound_name(&s([("name", "Aspirin".into()), ("title", "other".into())])).unwrap();
        assert_eq!(out.get_str("compound_name"), Some("Aspirin"));

        let kept = s([("compound_name", "Kept".into()), ("name", "other".into())]);
        assert_eq!(add_compound_name(&kept).unwrap(), kept);
    }

    #[test]
    fn adduct_is_taken_from_name() {
        let spectrum = s([("compound_name", "Cocaine [M+H]+".into())]);
        let out = derive_adduct_from_name(&spectrum, true).unwrap();
        assert_eq!(out.get_str("adduct"), Some("[M+H]+"));
        assert_eq!(out.get_str("compound_name"), Some("Cocaine"));

        let out = derive_adduct_from_name(&spectrum, false).unwrap();
        assert_eq!(out.get_str("compound_name"), Some("Cocaine [M+H]+"));

        let with_adduct = s([("compound_name", "Cocaine M+Na".into()), ("adduct", "[M+K]+".into())]);
        let out = derive_adduct_from_name(&with_adduct, true).unwrap();
        assert_eq!(out.get_str("adduct"), Some("[M+K]+"));
        assert_eq!(out.get_str("compound_name"), Some("Cocaine"));

        let plain = s([("compound_name", "Glucose".into())]);
        assert_eq!(derive_adduct_from_name(&plain, true).unwrap(), plain);
    }

    #[test]
    fn formula_is_taken_from_name() {
        let out = derive_formula_from_name(&s([("compound_name", "Glucose C6H12O6".into())]), true).unwrap();
        assert_eq!(out.get_str("formula"), Some("C6H12O6"));
        assert_eq!(out.get_str("compound_name"), Some("Glucose"));

        let plain = s([("compound_name", "Vitamin C".into())]);
        assert_eq!(derive_formula_from_name(&plain, true).unwrap(), plain);
    }

    #[test]
    fn name_tokens_that_are_not_formulas_stay_in_the_name() {
        for name in ["Vitamin B12", "Coenzyme Q10", "Compound X2Y3", "Sample 2024"] {
            let spectrum = s([("compound_name", name.into())]);
            assert_eq!(derive_formula_from_name(&spectrum, true).unwrap(), spectrum, "{name}");
        }
        let out = derive_formula_from_name(&s([("compound_name", "Methane CH4".into())]), true).unwrap();
        assert_eq!(out.get_str("formula"), Some("CH4"));
    }

    #[test]
    fn compound_name_prefixes_are_stripped() {
        let out = clean_compound_name(&s([("compound_name", "MassbankEU:  Caffeine   anhydrous".into())])).unwrap();
        assert_eq!(out.get_str("compound_name"), Some("Caffeine anhydrous"));
    }

    #[test]
    fn pepmass_fills_precursor_fields() {
        let out = interpret_pepmass(&s([("pepmass", "445.12 1200.0 2+".into())])).unwrap();
        assert_eq!(out.get_f64("precursor_mz"), Some(445.12));
        assert_eq!(out.get_f64("precursor_intensity"), Some(1200.0));
        assert_eq!(out.get_i64("charge"), Some(2));
        assert!(out.get("pepmass").is_none());

        let list = Value::List(vec![Value::Float64(100.0), Value::Null, Value::Null]);
        let out = interpret_pepmass(&s([("pepmass", list), ("charge", Value::Int64(-1))])).unwrap();
        assert_eq!(out.get_f64("precursor_mz"), Some(100.0));
        assert_eq!(out.get_i64("charge"), Some(-1));
        assert!(out.get("precursor_intensity").is_none());
    }

    #[test]
    fn pepmass_does_not_overwrite_precursor_mz() {
        let out = interpret_pepmass(&s([("pepmass", Value::Float64(200.0)), ("precursor_mz", Value::Float64(201.0))])).unwrap();
        assert_eq!(out.get_f64("precursor_mz"), Some(201.0));
    }

    #[test]
    fn precursor_mz_from_alias_and_text() {
        let out = add_precursor_mz(&s([("precursormz", "312.5".into())])).unwrap();
        assert_eq!(out.get("precursor_mz"), Some(&Value::Float64(312.5)));

        let out = add_precursor_mz(&s([("precursor_mz", Value::Int64(300))])).unwrap();
        assert_eq!(out.get("precursor_mz"), Some(&Value::Float64(300.0)));
    }

    #[test]
    fn ionmode_from_adduct_or_placeholder() {
        let table = AdductTable::builtin();
        let out = derive_ionmode(&s([("adduct", "[M-H]-".into())]), &table).unwrap();
        assert_eq!(out.get_str("ionmode"), Some("negative"));

        let out = derive_ionmode(&s([("ionmode", "Positive".into())]), &table).unwrap();
        assert_eq!(out.get_str("ionmode"), Some("positive"));

        let out = derive_ionmode(&Spectrum::default(), &table).unwrap();
        assert_eq!(out.get_str("ionmode"), Some("n/a"));
    }

    #[test]
    fn charge_follows_ionmode() {
        let out = correct_charge(&s([("ionmode", "negative".into())])).unwrap();
        assert_eq!(out.get_i64("charge"), Some(-1));

        let out = correct_charge(&s([("ionmode", "negative".into()), ("charge", Value::Int64(2))])).unwrap();
        assert_eq!(out.get_i64("charge"), Some(-2));

        let unknown = s([("ionmode", "n/a".into()), ("charge", Value::Int64(0))]);
        assert_eq!(correct_charge(&unknown).unwrap(), unknown);
    }

    #[test]
    fn ionmode_requirement() {
        let pos = s([("ionmode", "positive".into())]);
        assert!(require_correct_ionmode(&pos, IonModeSelection::Positive).is_some());
        assert!(require_correct_ionmode(&pos, IonModeSelection::Negative).is_none());
        assert!(require_correct_ionmode(&pos, IonModeSelection::Both).is_some());
        let na = s([("ionmode", "n/a".into())]);
        assert!(require_correct_ionmode(&na, IonModeSelection::Both).is_none());
        assert_eq!("Both".parse::<IonModeSelection>(), Ok(IonModeSelection::Both));
        assert!("all".parse::<IonModeSelection>().is_err());
    }

    #[test]
    fn precursor_mz_requirement() {
        assert!(require_precursor_mz(&Spectrum::default(), 10.0).is_none());
        assert!(require_precursor_mz(&s([("precursor_mz", Value::Float64(9.5))]), 10.0).is_none());
        assert!(require_precursor_mz(&s([("precursor_mz", Value::Float64(10.0))]), 10.0).is_some());
    }

    #[test]
    fn parent_mass_is_added_but_not_overwritten() {
        let table = AdductTable::builtin();
        let spectrum = s([("precursor_mz", Value::Float64(101.0)), ("charge", Value::Int64(1))]);
        let out = add_parent_mass(&spectrum, true, false, &table).unwrap();
        assert!((out.get_f64("parent_mass").unwrap() - (101.0 - 1.007_276_47)).abs() < 1e-9);

        let existing = s([("precursor_mz", Value::Float64(101.0)), ("charge", Value::Int64(1)), ("parent_mass", Value::Float64(1.0))]);
        assert_eq!(add_parent_mass(&existing, true, false, &table).unwrap(), existing);
        let out = add_parent_mass(&existing, true, true, &table).unwrap();
        assert!(out.get_f64("parent_mass").unwrap() > 99.0);
    }

    #[test]
    fn precursor_mz_from_parent_mass() {
        let table = AdductTable::builtin();
        let spectrum = s([("parent_mass", Value::Float64(180.0)), ("adduct", "[M+H]+".into())]);
        let out = add_precursor_mz_from_parent_mass(&spectrum, false, &table).unwrap();
        assert!((out.get_f64("precursor_mz").unwrap() - 181.007276).abs() < 1e-9);
    }
}
