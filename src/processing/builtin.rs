//! Registration of the shipped filters and preset definitions.

use std::sync::Arc;

use crate::error::ProcessingResult;
use crate::filters::{self, FilterEnvironment, IonModeSelection};
use crate::types::{params, Params, Spectrum, Value};

use super::catalog::{FilterCatalog, FilterFn, ParamReader};
use super::Preset;

fn plain(
    filter: fn(&Spectrum) -> Option<Spectrum>,
) -> impl Fn(&ParamReader<'_>) -> ProcessingResult<FilterFn> + Send + Sync + 'static {
    move |_: &ParamReader<'_>| Ok(Arc::new(filter) as FilterFn)
}

fn no_params() -> Option<Params> {
    Some(Params::new())
}

fn undefined_defaults() -> Option<Params> {
    Some(params([("aliases", Value::Null), ("undefined", Value::from(""))]))
}

/// Register every shipped filter in canonical order.
pub(crate) fn register_all(catalog: &mut FilterCatalog, env: &FilterEnvironment) -> ProcessingResult<()> {
    catalog.register("make_charge_int", no_params(), &[], plain(filters::make_charge_int))?;
    catalog.register("add_compound_name", no_params(), &[], plain(filters::add_compound_name))?;
    catalog.register(
        "derive_adduct_from_name",
        Some(params([("remove_adduct_from_name", true)])),
        &[],
        |p| {
            let remove = p.bool("remove_adduct_from_name")?;
            Ok(Arc::new(move |s: &Spectrum| filters::derive_adduct_from_name(s, remove)) as FilterFn)
        },
    )?;
    catalog.register(
        "derive_formula_from_name",
        Some(params([("remove_formula_from_name", true)])),
        &[],
        |p| {
            let remove = p.bool("remove_formula_from_name")?;
            Ok(Arc::new(move |s: &Spectrum| filters::derive_formula_from_name(s, remove)) as FilterFn)
        },
    )?;
    catalog.register("clean_compound_name", no_params(), &[], plain(filters::clean_compound_name))?;
    catalog.register("interpret_pepmass", no_params(), &[], plain(filters::interpret_pepmass))?;
    catalog.register("add_precursor_mz", no_params(), &[], plain(filters::add_precursor_mz))?;

    let adducts = Arc::clone(&env.adducts);
    catalog.register("derive_ionmode", no_params(), &[], move |_| {
        let adducts = Arc::clone(&adducts);
        Ok(Arc::new(move |s: &Spectrum| filters::derive_ionmode(s, &adducts)) as FilterFn)
    })?;
    catalog.register("correct_charge", no_params(), &[], plain(filters::correct_charge))?;
    catalog.register("require_correct_ionmode", None, &["ion_mode_to_keep"], |p| {
        let mode: IonModeSelection = p.parse("ion_mode_to_keep")?;
        Ok(Arc::new(move |s: &Spectrum| filters::require_correct_ionmode(s, mode)) as FilterFn)
    })?;

    let adducts = Arc::clone(&env.adducts);
    catalog.register(
        "derive_precursor_mz_from_parent_mass",
        Some(params([("overwrite_existing_entry", false)])),
        &[],
        move |p| {
            let overwrite = p.bool("overwrite_existing_entry")?;
            let adducts = Arc::clone(&adducts);
            Ok(Arc::new(move |s: &Spectrum| {
                filters::add_precursor_mz_from_parent_mass(s, overwrite, &adducts)
            }) as FilterFn)
        },
    )?;
    catalog.register(
        "require_precursor_mz",
        Some(params([("minimum_accepted_mz", 10.0)])),
        &[],
        |p| {
            let minimum = p.f64("minimum_accepted_mz")?;
            Ok(Arc::new(move |s: &Spectrum| filters::require_precursor_mz(s, minimum)) as FilterFn)
        },
    )?;

    let adducts = Arc::clone(&env.adducts);
    catalog.register(
        "add_parent_mass",
        Some(params([
            ("estimate_from_adduct", true),
            ("overwrite_existing_entry", false),
        ])),
        &[],
        move |p| {
            let from_adduct = p.bool("estimate_from_adduct")?;
            let overwrite = p.bool("overwrite_existing_entry")?;
            let adducts = Arc::clone(&adducts);
            Ok(Arc::new(move |s: &Spectrum| {
                filters::add_parent_mass(s, from_adduct, overwrite, &adducts)
            }) as FilterFn)
        },
    )?;

    type Harmonizer = fn(&Spectrum, Option<&[String]>, &str) -> Option<Spectrum>;
    let harmonizers: [(&str, Harmonizer); 3] = [
        ("harmonize_undefined_inchikey", filters::harmonize_undefined_inchikey),
        ("harmonize_undefined_inchi", filters::harmonize_undefined_inchi),
        ("harmonize_undefined_smiles", filters::harmonize_undefined_smiles),
    ];
    for (name, harmonize) in harmonizers {
        catalog.register(name, undefined_defaults(), &[], move |p| {
            let aliases = p.optional_str_list("aliases")?;
            let undefined = p.str("undefined")?.to_string();
            Ok(Arc::new(move |s: &Spectrum| harmonize(s, aliases.as_deref(), &undefined)) as FilterFn)
        })?;
    }

    catalog.register(
        "repair_inchi_inchikey_smiles",
        no_params(),
        &[],
        plain(filters::repair_inchi_inchikey_smiles),
    )?;

    let toolkit = Arc::clone(&env.toolkit);
    catalog.register("require_annotation", no_params(), &[], move |_| {
        let toolkit = Arc::clone(&toolkit);
        Ok(Arc::new(move |s: &Spectrum| filters::require_annotation(s, &*toolkit)) as FilterFn)
    })?;
    catalog.register("normalize_intensities", no_params(), &[], plain(filters::normalize_intensities))?;
    Ok(())
}

/// `(name, overrides)` for every step of a preset.
pub(crate) fn preset_steps(preset: Preset) -> Vec<(&'static str, Params)> {
    let bare = |name: &'static str| (name, Params::new());
    match preset {
        Preset::Minimal => vec![
            bare("make_charge_int"),
            bare("interpret_pepmass"),
            bare("derive_ionmode"),
            bare("correct_charge"),
        ],
        Preset::Default => vec![
            bare("make_charge_int"),
            bare("add_compound_name"),
            ("derive_adduct_from_name", params([("remove_adduct_from_name", true)])),
            ("derive_formula_from_name", params([("remove_formula_from_name", true)])),
            bare("clean_compound_name"),
            bare("interpret_pepmass"),
            bare("add_precursor_mz"),
            bare("derive_ionmode"),
            bare("correct_charge"),
            ("require_precursor_mz", params([("minimum_accepted_mz", 10.0)])),
            (
                "add_parent_mass",
                params([("estimate_from_adduct", true), ("overwrite_existing_entry", false)]),
            ),
            bare("harmonize_undefined_inchikey"),
            bare("harmonize_undefined_inchi"),
            bare("harmonize_undefined_smiles"),
            bare("repair_inchi_inchikey_smiles"),
            bare("normalize_intensities"),
        ],
    }
}
