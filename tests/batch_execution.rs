use std::sync::{Arc, Mutex};

use rust_spectrum_processing::execution::{
    BatchExecutor, ExecutionEvent, ExecutionObserver, ExecutionOptions, LogExecutionObserver,
};
use rust_spectrum_processing::processing::{Preset, SpectrumProcessor};
use rust_spectrum_processing::types::{params, Spectrum, Value};

fn spectra(n: usize) -> Vec<Spectrum> {
    (0..n)
        .map(|i| {
            let adduct = if i % 2 == 0 { "[M+H]+" } else { "[M-H]-" };
            Spectrum::from_metadata([
                ("compound_name", Value::from(format!("compound {i}"))),
                ("adduct", Value::from(adduct)),
                ("precursor_mz", Value::Float64(150.0 + i as f64)),
            ])
            .with_peaks(vec![50.0, 75.0, 100.0], vec![1.0, 3.0, 2.0])
        })
        .collect()
}

#[derive(Default)]
struct ChunkRecorder {
    finished: Mutex<Vec<(usize, usize)>>,
}

impl ExecutionObserver for ChunkRecorder {
    fn on_event(&self, event: &ExecutionEvent) {
        if let ExecutionEvent::ChunkFinished { start, kept } = event {
            self.finished.lock().unwrap().push((*start, *kept));
        }
    }
}

#[test]
fn parallel_processing_matches_sequential_processing() {
    let mut processor = SpectrumProcessor::new(Some(Preset::Default)).unwrap();
    processor
        .add_filter(("require_correct_ionmode", params([("ion_mode_to_keep", "positive")])))
        .unwrap();
    let input = spectra(101);

    let (expected, expected_report) = processor.process_spectrums(&input, true).unwrap();
    let executor = BatchExecutor::new(ExecutionOptions {
        num_threads: Some(3),
        chunk_size: 7,
    })
    .unwrap()
    .with_observer(Arc::new(LogExecutionObserver));
    let (kept, report) = executor.process_spectrums(&processor, &input, true).unwrap();

    assert_eq!(kept.len(), 51);
    assert_eq!(kept, expected);
    let report = report.unwrap();
    let expected_report = expected_report.unwrap();
    assert_eq!(report.counter_number_processed(), 101);
    assert_eq!(report.removed("require_correct_ionmode"), 50);
    assert_eq!(report.rows(), expected_report.rows());
}

#[test]
fn every_chunk_reports_once() {
    let recorder = Arc::new(ChunkRecorder::default());
    let processor = SpectrumProcessor::new(Some(Preset::Minimal)).unwrap();
    let executor = BatchExecutor::new(ExecutionOptions {
        num_threads: Some(2),
        chunk_size: 10,
    })
    .unwrap()
    .with_observer(recorder.clone());

    let (kept, _) = executor.process_spectrums(&processor, &spectra(25), false).unwrap();
    assert_eq!(kept.len(), 25);

    let mut finished = recorder.finished.lock().unwrap().clone();
    finished.sort();
    assert_eq!(finished, vec![(0, 10), (10, 10), (20, 5)]);

    let snapshot = executor.metrics().snapshot();
    assert_eq!(snapshot.spectra_processed, 25);
    assert!(snapshot.elapsed.is_some());
}

#[test]
fn empty_input_produces_empty_report() {
    let processor = SpectrumProcessor::new(Some(Preset::Minimal)).unwrap();
    let executor = BatchExecutor::new(ExecutionOptions::default()).unwrap();
    let (kept, report) = executor.process_spectrums(&processor, &[], true).unwrap();
    assert!(kept.is_empty());
    assert_eq!(report.unwrap().counter_number_processed(), 0);
}
