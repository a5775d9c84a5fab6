//! Peak-list filters.

use log::warn;

use crate::types::Spectrum;

/// Scale intensities so the most intense peak is `1.0`.
///
/// Spectra without peaks, or whose maximum intensity is not positive, are returned unchanged.
pub fn normalize_intensities(spectrum: &Spectrum) -> Option<Spectrum> {
    if spectrum.intensities.is_empty() {
        return Some(spectrum.clone());
    }
    let max = spectrum
        .intensities
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    if max <= 0.0 || !max.is_finite() {
        warn!("Spectrum has no positive intensities; skipping normalization.");
        return Some(spectrum.clone());
    }

    let mut out = spectrum.clone();
    for intensity in &mut out.intensities {
        *intensity /= max;
    }
    Some(out)
}
