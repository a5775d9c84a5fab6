//! Structural identifier predicates and conversions.
//!
//! Checking whether a SMILES/InChI/InChIKey denotes a real structure, and converting between
//! them, needs a cheminformatics toolkit. The filters only depend on the [`StructureToolkit`]
//! trait; callers with access to such a toolkit plug it in through
//! [`crate::filters::FilterEnvironment`].
//!
//! [`SyntacticToolkit`] is the default: it validates identifiers by their textual shape and
//! cannot convert between them.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static INCHIKEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{14}-[A-Z]{10}-[A-Z]$").expect("valid inchikey regex"));
static INCHI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^InChI=1S?/[A-Za-z0-9.]+(?:/\S*)?$").expect("valid inchi regex")
});
static SMILES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9@+\-\[\]()\\/%=#$.:*~]+$").expect("valid smiles regex")
});

/// Predicates and conversions over structural identifiers.
pub trait StructureToolkit: Send + Sync {
    fn is_valid_smiles(&self, smiles: &str) -> bool;
    fn is_valid_inchi(&self, inchi: &str) -> bool;
    fn is_valid_inchikey(&self, inchikey: &str) -> bool;

    /// Convert SMILES to InChI; `None` if the conversion fails or is unsupported.
    fn smiles_to_inchi(&self, smiles: &str) -> Option<String>;

    /// Convert InChI to InChIKey; `None` if the conversion fails or is unsupported.
    fn inchi_to_inchikey(&self, inchi: &str) -> Option<String>;
}

/// Shape-only validation without conversion support.
#[derive(Debug, Default, Clone, Copy)]
pub struct SyntacticToolkit;

impl StructureToolkit for SyntacticToolkit {
    fn is_valid_smiles(&self, smiles: &str) -> bool {
        looks_like_smiles(smiles)
    }

    fn is_valid_inchi(&self, inchi: &str) -> bool {
        looks_like_inchi(inchi)
    }

    fn is_valid_inchikey(&self, inchikey: &str) -> bool {
        looks_like_inchikey(inchikey)
    }

    fn smiles_to_inchi(&self, _smiles: &str) -> Option<String> {
        None
    }

    fn inchi_to_inchikey(&self, _inchi: &str) -> Option<String> {
        None
    }
}

impl fmt::Debug for dyn StructureToolkit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StructureToolkit")
    }
}

/// `AAAAAAAAAAAAAA-BBBBBBBBBB-C`.
pub fn looks_like_inchikey(s: &str) -> bool {
    INCHIKEY_RE.is_match(s.trim())
}

/// Standard or non-standard InChI with at least a formula layer.
pub fn looks_like_inchi(s: &str) -> bool {
    INCHI_RE.is_match(s.trim())
}

/// SMILES alphabet with balanced brackets and parentheses. InChI strings are excluded.
pub fn looks_like_smiles(s: &str) -> bool {
    let s = s.trim();
    if s.is_empty() || s.starts_with("InChI=") || !SMILES_RE.is_match(s) {
        return false;
    }
    if !s.chars().any(|c| c.is_ascii_alphabetic()) {
        return false;
    }
    let mut parens = 0i32;
    let mut in_bracket = false;
    for c in s.chars() {
        match c {
            '(' => parens += 1,
            ')' => {
                parens -= 1;
                if parens < 0 {
                    return false;
                }
            }
            '[' if in_bracket => return false,
            '[' => in_bracket = true,
            ']' if !in_bracket => return false,
            ']' => in_bracket = false,
            _ => {}
        }
    }
    parens == 0 && !in_bracket
}

/// The first 14 characters of an InChIKey, which encode the connectivity layer only.
pub fn inchikey_skeleton(inchikey: &str) -> Option<&str> {
    inchikey.trim().get(..14)
}
