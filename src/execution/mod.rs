//! Parallel batch execution of a [`SpectrumProcessor`].
//!
//! This module sits "above" [`crate::processing`] and provides:
//!
//! - Chunked execution of `process_spectrums` on a dedicated rayon pool
//! - One report per chunk, merged in chunk order, so results match a sequential run
//! - Real-time metrics + observer hooks for monitoring
//!
//! Panics raised by a filter are not caught; they abort the batch.

mod observer;

use std::ops::Range;
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::{ProcessingError, ProcessingResult};
use crate::processing::{ProcessingReport, SpectrumProcessor};
use crate::types::Spectrum;

pub use observer::{
    ExecutionEvent, ExecutionMetrics, ExecutionMetricsSnapshot, ExecutionObserver, LogExecutionObserver,
};

/// Configuration for the [`BatchExecutor`].
#[derive(Debug, Clone)]
pub struct ExecutionOptions {
    /// Number of worker threads.
    ///
    /// If `None`, uses the platform's available parallelism.
    pub num_threads: Option<usize>,
    /// Number of spectra per chunk.
    pub chunk_size: usize,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        let n = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        Self {
            num_threads: Some(n),
            chunk_size: 256,
        }
    }
}

/// Runs a [`SpectrumProcessor`] over many spectra in parallel.
pub struct BatchExecutor {
    pool: ThreadPool,
    opts: ExecutionOptions,
    observer: Option<Arc<dyn ExecutionObserver>>,
    metrics: Arc<ExecutionMetrics>,
}

impl BatchExecutor {
    /// Create a new executor with its own thread pool.
    ///
    /// # Panics
    ///
    /// Panics if `chunk_size == 0` or `num_threads == Some(0)`.
    pub fn new(opts: ExecutionOptions) -> ProcessingResult<Self> {
        assert!(opts.chunk_size > 0, "chunk_size must be > 0");
        if let Some(n) = opts.num_threads {
            assert!(n > 0, "num_threads must be > 0 when set");
        }

        let n_threads = opts
            .num_threads
            .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
            .max(1);
        let pool = ThreadPoolBuilder::new().num_threads(n_threads).build()?;

        Ok(Self {
            pool,
            opts,
            observer: None,
            metrics: Arc::new(ExecutionMetrics::new()),
        })
    }

    /// Attach an observer for execution events.
    pub fn with_observer(mut self, observer: Arc<dyn ExecutionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Get a handle to real-time execution metrics.
    pub fn metrics(&self) -> Arc<ExecutionMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Options the executor was built with.
    pub fn options(&self) -> &ExecutionOptions {
        &self.opts
    }

    /// Parallel counterpart of [`SpectrumProcessor::process_spectrums`].
    ///
    /// Surviving spectra keep their input order and the report equals the one a sequential
    /// run would produce.
    pub fn process_spectrums(
        &self,
        processor: &SpectrumProcessor,
        spectra: &[Spectrum],
        create_report: bool,
    ) -> ProcessingResult<(Vec<Spectrum>, Option<ProcessingReport>)> {
        if processor.is_empty() {
            return Err(ProcessingError::NoFilters);
        }
        self.pool
            .install(|| self.process_impl(processor, spectra, create_report))
    }

    fn process_impl(
        &self,
        processor: &SpectrumProcessor,
        spectra: &[Spectrum],
        create_report: bool,
    ) -> ProcessingResult<(Vec<Spectrum>, Option<ProcessingReport>)> {
        let start = Instant::now();
        let ranges = chunk_ranges(spectra.len(), self.opts.chunk_size);
        self.metrics.begin_run();
        self.emit(ExecutionEvent::RunStarted {
            spectra: spectra.len(),
            chunks: ranges.len(),
        });

        let per_chunk: Vec<ProcessingResult<(Vec<Spectrum>, Option<ProcessingReport>)>> = ranges
            .into_par_iter()
            .map(|range| {
                self.metrics.on_chunk_start();
                self.emit(ExecutionEvent::ChunkStarted {
                    start: range.start,
                    len: range.len(),
                });

                let chunk_start = range.start;
                let mut report = create_report.then(ProcessingReport::new);
                let mut kept = Vec::with_capacity(range.len());
                for spectrum in &spectra[range] {
                    let out = processor.process_spectrum(spectrum, report.as_mut())?;
                    self.metrics.on_spectrum_processed(out.is_some());
                    kept.extend(out);
                }

                self.emit(ExecutionEvent::ChunkFinished {
                    start: chunk_start,
                    kept: kept.len(),
                });
                self.metrics.on_chunk_end();
                Ok((kept, report))
            })
            .collect();

        let mut kept = Vec::with_capacity(spectra.len());
        let mut report = create_report.then(ProcessingReport::new);
        for chunk in per_chunk {
            let (chunk_kept, chunk_report) = chunk?;
            kept.extend(chunk_kept);
            if let (Some(total), Some(part)) = (report.as_mut(), chunk_report) {
                total.merge(part);
            }
        }

        self.metrics.end_run();
        self.emit(ExecutionEvent::RunFinished {
            elapsed: start.elapsed(),
            metrics: self.metrics.snapshot(),
        });
        Ok((kept, report))
    }

    fn emit(&self, event: ExecutionEvent) {
        if let Some(obs) = &self.observer {
            obs.on_event(&event);
        }
    }
}

fn chunk_ranges(len: usize, chunk_size: usize) -> Vec<Range<usize>> {
    (0..len)
        .step_by(chunk_size)
        .map(|start| start..(start + chunk_size).min(len))
        .collect()
}
