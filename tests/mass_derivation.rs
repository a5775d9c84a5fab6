use rust_spectrum_processing::adducts::AdductTable;
use rust_spectrum_processing::filters::{
    add_parent_mass, add_precursor_mz_from_parent_mass, derive_parent_mass, PROTON_MASS,
};
use rust_spectrum_processing::processing::{Preset, SpectrumProcessor};
use rust_spectrum_processing::types::{params, Spectrum, Value};

fn assert_close(actual: Option<f64>, expected: f64) {
    let actual = actual.expect("value present");
    assert!((actual - expected).abs() < 1e-6, "{actual} != {expected}");
}

#[test]
fn parent_mass_and_precursor_mz_are_inverses() {
    let table = AdductTable::builtin();
    let cases: [(&str, Option<&str>, Value); 5] = [
        ("[M+H]+", Some("[M+H]+"), Value::Int64(1)),
        ("[M+Na]+", Some("[M+Na]+"), Value::Int64(1)),
        ("[M-H]-", Some("[M-H]-"), Value::Int64(-1)),
        ("[2M+H]+", Some("[2M+H]+"), Value::Int64(1)),
        ("charge 2", None, Value::Int64(2)),
    ];
    for (label, adduct, charge) in cases {
        let mut spectrum = Spectrum::from_metadata([("precursor_mz", Value::Float64(445.12)), ("charge", charge)]);
        if let Some(adduct) = adduct {
            spectrum.set("adduct", adduct);
        }

        let with_parent = add_parent_mass(&spectrum, true, false, &table).unwrap();
        assert!(with_parent.get_f64("parent_mass").is_some(), "{label}");

        let mut stripped = with_parent.clone();
        stripped.remove("precursor_mz");
        let restored = add_precursor_mz_from_parent_mass(&stripped, false, &table).unwrap();
        assert_close(restored.get_f64("precursor_mz"), 445.12);
    }
}

#[test]
fn adduct_table_drives_multiply_charged_ions() {
    let table = AdductTable::builtin();
    let spectrum = Spectrum::from_metadata([
        ("precursor_mz", Value::Float64(300.0)),
        ("adduct", Value::from("[M+2H]2+")),
        ("charge", Value::Int64(2)),
    ]);
    let from_adduct = derive_parent_mass(&spectrum, true, &table);
    let from_charge = derive_parent_mass(&spectrum, false, &table);
    assert_close(from_adduct, (300.0 - 1.007276) / 0.5);
    assert_close(from_charge, 600.0 - 2.0 * PROTON_MASS);
}

#[test]
fn default_preset_adds_parent_mass() {
    let processor = SpectrumProcessor::new(Some(Preset::Default)).unwrap();
    let spectrum = Spectrum::from_metadata([
        ("compound_name", Value::from("Caffeine [M+H]+")),
        ("pepmass", Value::Float64(195.0877)),
    ])
    .with_peaks(vec![100.0, 138.07], vec![10.0, 50.0]);

    let out = processor.process_spectrum(&spectrum, None).unwrap().unwrap();
    assert_eq!(out.get_str("adduct"), Some("[M+H]+"));
    assert_eq!(out.get_str("ionmode"), Some("positive"));
    assert_eq!(out.get_i64("charge"), Some(1));
    assert_close(out.get_f64("parent_mass"), 195.0877 - 1.007276);
    assert_eq!(out.intensities, vec![0.2, 1.0]);
}

#[test]
fn low_precursor_is_removed_by_default_preset() {
    let processor = SpectrumProcessor::new(Some(Preset::Default)).unwrap();
    let spectrum = Spectrum::from_metadata([("pepmass", Value::Float64(5.0)), ("charge", Value::Int64(1))]);
    let (kept, report) = processor.process_spectrums(&[spectrum], true).unwrap();
    assert!(kept.is_empty());
    assert_eq!(report.unwrap().removed("require_precursor_mz"), 1);
}

#[test]
fn precursor_from_parent_mass_respects_existing_value() {
    let mut processor = SpectrumProcessor::new(None).unwrap();
    processor
        .add_filter((
            "derive_precursor_mz_from_parent_mass",
            params([("overwrite_existing_entry", false)]),
        ))
        .unwrap();
    let spectrum = Spectrum::from_metadata([
        ("parent_mass", Value::Float64(100.0)),
        ("precursor_mz", Value::Float64(50.0)),
        ("charge", Value::Int64(1)),
    ]);
    let out = processor.process_spectrum(&spectrum, None).unwrap().unwrap();
    assert_eq!(out.get_f64("precursor_mz"), Some(50.0));
}

#[test]
fn default_preset_keeps_vitamin_names_intact() {
    let processor = SpectrumProcessor::new(Some(Preset::Default)).unwrap();
    let spectrum = Spectrum::from_metadata([
        ("compound_name", Value::from("Vitamin B12 [M+H]+")),
        ("pepmass", Value::Float64(1355.57)),
    ])
    .with_peaks(vec![100.0], vec![1.0]);
    let out = processor.process_spectrum(&spectrum, None).unwrap().unwrap();
    assert_eq!(out.get_str("compound_name"), Some("Vitamin B12"));
    assert_eq!(out.get("formula"), None);
}

#[test]
fn extreme_charge_does_not_abort_a_batch() {
    let processor = SpectrumProcessor::new(Some(Preset::Default)).unwrap();
    let spectra = vec![
        Spectrum::from_metadata([
            ("ionmode", Value::from("positive")),
            ("charge", Value::Int64(i64::MIN)),
            ("precursor_mz", Value::Float64(250.0)),
        ])
        .with_peaks(vec![100.0], vec![1.0]),
        Spectrum::from_metadata([
            ("charge", Value::Int64(i64::MAX)),
            ("precursor_mz", Value::Float64(300.0)),
        ])
        .with_peaks(vec![100.0], vec![1.0]),
    ];
    let (kept, _) = processor.process_spectrums(&spectra, true).unwrap();
    assert_eq!(kept.len(), 2);
    assert_eq!(kept[0].get_i64("charge"), Some(1));
    assert_close(kept[0].get_f64("parent_mass"), 250.0 - PROTON_MASS);
    assert_eq!(kept[1].get("parent_mass"), None);
}
