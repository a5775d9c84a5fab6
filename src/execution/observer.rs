use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use log::{debug, info};

/// Execution events emitted by the [`super::BatchExecutor`].
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    RunStarted { spectra: usize, chunks: usize },
    ChunkStarted { start: usize, len: usize },
    ChunkFinished { start: usize, kept: usize },
    RunFinished {
        elapsed: Duration,
        metrics: ExecutionMetricsSnapshot,
    },
}

/// Observer hook for execution events.
pub trait ExecutionObserver: Send + Sync {
    fn on_event(&self, event: &ExecutionEvent);
}

/// Forwards execution events to the `log` facade.
///
/// Run boundaries are logged at `info`, chunk events at `debug`.
#[derive(Debug, Default)]
pub struct LogExecutionObserver;

impl ExecutionObserver for LogExecutionObserver {
    fn on_event(&self, event: &ExecutionEvent) {
        match event {
            ExecutionEvent::RunStarted { spectra, chunks } => {
                info!("Processing {spectra} spectra in {chunks} chunks.")
            }
            ExecutionEvent::ChunkStarted { start, len } => {
                debug!("Chunk at {start} started ({len} spectra).")
            }
            ExecutionEvent::ChunkFinished { start, kept } => {
                debug!("Chunk at {start} finished ({kept} spectra kept).")
            }
            ExecutionEvent::RunFinished { elapsed, metrics } => {
                info!("Processing finished in {elapsed:?}: {metrics}")
            }
        }
    }
}

/// Real-time metrics for a batch run.
///
/// The executor updates these counters while it runs; callers can snapshot them at any time.
/// Counters are independent of each other, so a snapshot taken mid-run may be slightly skewed.
#[derive(Default)]
pub struct ExecutionMetrics {
    run_id: AtomicU64,
    clock: Mutex<RunClock>,
    spectra_processed: AtomicU64,
    spectra_kept: AtomicU64,
    chunks_started: AtomicU64,
    chunks_finished: AtomicU64,
    active_chunks: AtomicUsize,
    max_active_chunks: AtomicUsize,
}

#[derive(Debug, Default, Clone, Copy)]
struct RunClock {
    started: Option<Instant>,
    elapsed: Option<Duration>,
}

impl ExecutionMetrics {
    /// Zeroed metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the counters and start the clock for a new run.
    pub fn begin_run(&self) {
        self.run_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut clock) = self.clock.lock() {
            *clock = RunClock {
                started: Some(Instant::now()),
                elapsed: None,
            };
        }
        for counter in [
            &self.spectra_processed,
            &self.spectra_kept,
            &self.chunks_started,
            &self.chunks_finished,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        self.active_chunks.store(0, Ordering::Relaxed);
        self.max_active_chunks.store(0, Ordering::Relaxed);
    }

    /// Stop the clock.
    pub fn end_run(&self) {
        if let Ok(mut clock) = self.clock.lock() {
            clock.elapsed = clock.started.map(|t| t.elapsed());
        }
    }

    /// Count one spectrum leaving the pipeline.
    pub fn on_spectrum_processed(&self, kept: bool) {
        self.spectra_processed.fetch_add(1, Ordering::Relaxed);
        if kept {
            self.spectra_kept.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Count a chunk starting.
    pub fn on_chunk_start(&self) {
        self.chunks_started.fetch_add(1, Ordering::Relaxed);
        let active = self.active_chunks.fetch_add(1, Ordering::AcqRel) + 1;
        self.max_active_chunks.fetch_max(active, Ordering::AcqRel);
    }

    /// Count a chunk finishing.
    pub fn on_chunk_end(&self) {
        self.chunks_finished.fetch_add(1, Ordering::Relaxed);
        self.active_chunks.fetch_sub(1, Ordering::AcqRel);
    }

    /// Copy the current counters.
    pub fn snapshot(&self) -> ExecutionMetricsSnapshot {
        let clock = self.clock.lock().map(|c| *c).unwrap_or_default();
        let spectra_processed = self.spectra_processed.load(Ordering::Relaxed);
        let spectra_kept = self.spectra_kept.load(Ordering::Relaxed);
        ExecutionMetricsSnapshot {
            run_id: self.run_id.load(Ordering::Relaxed),
            elapsed: clock.elapsed,
            spectra_processed,
            spectra_kept,
            spectra_removed: spectra_processed.saturating_sub(spectra_kept),
            chunks_started: self.chunks_started.load(Ordering::Relaxed),
            chunks_finished: self.chunks_finished.load(Ordering::Relaxed),
            max_active_chunks: self.max_active_chunks.load(Ordering::Acquire),
        }
    }
}

impl fmt::Debug for ExecutionMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ExecutionMetrics").field(&self.snapshot()).finish()
    }
}

/// Point-in-time copy of [`ExecutionMetrics`]. `elapsed` is `None` until the run has finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionMetricsSnapshot {
    pub run_id: u64,
    pub elapsed: Option<Duration>,
    pub spectra_processed: u64,
    pub spectra_kept: u64,
    pub spectra_removed: u64,
    pub chunks_started: u64,
    pub chunks_finished: u64,
    pub max_active_chunks: usize,
}

impl fmt::Display for ExecutionMetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run {}: {} spectra, {} kept, {} removed, {}/{} chunks, peak parallelism {}",
            self.run_id,
            self.spectra_processed,
            self.spectra_kept,
            self.spectra_removed,
            self.chunks_finished,
            self.chunks_started,
            self.max_active_chunks,
        )?;
        if let Some(elapsed) = self.elapsed {
            write!(f, ", {elapsed:?}")?;
        }
        Ok(())
    }
}
