//! Per-filter accounting of removed spectra and changed/added metadata.

use std::fmt;
use std::io;

use indexmap::{IndexMap, IndexSet};
use polars::prelude::{df, DataFrame};
use serde::Serialize;

use crate::error::ProcessingResult;
use crate::types::Spectrum;

/// Counts which filter removed a spectrum or touched its metadata.
///
/// Changed and added counts are per spectrum: a filter that adds three fields to one spectrum
/// counts once in `added`. Rows appear in the order filters were first reported.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessingReport {
    counter_number_processed: u64,
    filter_applications: u64,
    counter_removed_spectrums: IndexMap<String, u64>,
    counter_changed_field: IndexMap<String, u64>,
    counter_added_field: IndexMap<String, u64>,
    filters: IndexSet<String>,
}

/// One line of [`ProcessingReport::rows`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub filter: String,
    pub removed_spectra: u64,
    pub changed_metadata: u64,
    pub added_metadata: u64,
}

impl ProcessingReport {
    /// An empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one spectrum entering the pipeline.
    pub fn count_spectrum(&mut self) {
        self.counter_number_processed += 1;
    }

    /// Record the outcome of one filter on one spectrum.
    ///
    /// A removal is attributed to `filter_name` without diffing. Otherwise metadata keys present
    /// only in `after` count as added and keys present in both with different values count as
    /// changed.
    pub fn add_to_report(&mut self, before: &Spectrum, after: Option<&Spectrum>, filter_name: &str) {
        self.filter_applications += 1;
        let Some(after) = after else {
            bump(&mut self.counter_removed_spectrums, filter_name, 1);
            self.filters.insert(filter_name.to_string());
            return;
        };

        let mut added = false;
        let mut changed = false;
        for (key, value) in after.metadata().iter().filter(|(_, v)| !v.is_null()) {
            match before.get(key) {
                None => added = true,
                Some(old) if old != value => changed = true,
                Some(_) => {}
            }
        }
        if added {
            bump(&mut self.counter_added_field, filter_name, 1);
        }
        if changed {
            bump(&mut self.counter_changed_field, filter_name, 1);
        }
        if added || changed {
            self.filters.insert(filter_name.to_string());
        }
    }

    /// Add the counters of `other`. Filters first seen in `other` are appended.
    pub fn merge(&mut self, other: ProcessingReport) {
        self.counter_number_processed += other.counter_number_processed;
        self.filter_applications += other.filter_applications;
        for (name, count) in other.counter_removed_spectrums {
            bump(&mut self.counter_removed_spectrums, &name, count);
        }
        for (name, count) in other.counter_changed_field {
            bump(&mut self.counter_changed_field, &name, count);
        }
        for (name, count) in other.counter_added_field {
            bump(&mut self.counter_added_field, &name, count);
        }
        self.filters.extend(other.filters);
    }

    /// Spectra that entered the pipeline.
    pub fn counter_number_processed(&self) -> u64 {
        self.counter_number_processed
    }

    /// Filter invocations across all spectra.
    pub fn filter_applications(&self) -> u64 {
        self.filter_applications
    }

    /// Removed spectra per filter, in first-seen order.
    pub fn counter_removed_spectrums(&self) -> &IndexMap<String, u64> {
        &self.counter_removed_spectrums
    }

    /// Spectra with changed metadata per filter.
    pub fn counter_changed_field(&self) -> &IndexMap<String, u64> {
        &self.counter_changed_field
    }

    /// Spectra with added metadata per filter.
    pub fn counter_added_field(&self) -> &IndexMap<String, u64> {
        &self.counter_added_field
    }

    /// Spectra removed by `filter_name`.
    pub fn removed(&self, filter_name: &str) -> u64 {
        self.counter_removed_spectrums.get(filter_name).copied().unwrap_or(0)
    }

    /// Spectra whose metadata `filter_name` changed.
    pub fn changed(&self, filter_name: &str) -> u64 {
        self.counter_changed_field.get(filter_name).copied().unwrap_or(0)
    }

    /// Spectra that `filter_name` added metadata to.
    pub fn added(&self, filter_name: &str) -> u64 {
        self.counter_added_field.get(filter_name).copied().unwrap_or(0)
    }

    /// One row per reported filter, in first-seen order.
    pub fn rows(&self) -> Vec<ReportRow> {
        self.filters
            .iter()
            .map(|name| ReportRow {
                filter: name.clone(),
                removed_spectra: self.removed(name),
                changed_metadata: self.changed(name),
                added_metadata: self.added(name),
            })
            .collect()
    }

    /// The report as a `DataFrame` with one row per filter.
    pub fn to_table(&self) -> ProcessingResult<DataFrame> {
        let rows = self.rows();
        let filter: Vec<&str> = rows.iter().map(|r| r.filter.as_str()).collect();
        let removed: Vec<u64> = rows.iter().map(|r| r.removed_spectra).collect();
        let changed: Vec<u64> = rows.iter().map(|r| r.changed_metadata).collect();
        let added: Vec<u64> = rows.iter().map(|r| r.added_metadata).collect();
        let table = df!(
            "filter" => filter,
            "removed_spectra" => removed,
            "changed_metadata" => changed,
            "added_metadata" => added,
        )?;
        Ok(table)
    }

    /// Write the rows as CSV with a header line.
    pub fn to_csv<W: io::Write>(&self, writer: W) -> ProcessingResult<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        for row in self.rows() {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

fn bump(counter: &mut IndexMap<String, u64>, name: &str, by: u64) {
    match counter.get_mut(name) {
        Some(count) => *count += by,
        None => {
            counter.insert(name.to_string(), by);
        }
    }
}

impl fmt::Display for ProcessingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "----- Processing report -----")?;
        writeln!(f, "Processed {} spectra", self.counter_number_processed)?;
        let rows = self.rows();
        let width = rows
            .iter()
            .map(|r| r.filter.len())
            .chain(std::iter::once("filter".len()))
            .max()
            .unwrap_or(0);
        write!(
            f,
            "{:<width$}  {:>15}  {:>16}  {:>14}",
            "filter", "removed_spectra", "changed_metadata", "added_metadata"
        )?;
        for row in rows {
            write!(
                f,
                "\n{:<width$}  {:>15}  {:>16}  {:>14}",
                row.filter, row.removed_spectra, row.changed_metadata, row.added_metadata
            )?;
        }
        Ok(())
    }
}
