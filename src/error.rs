use thiserror::Error;

/// Convenience result type for pipeline construction and execution.
pub type ProcessingResult<T> = Result<T, ProcessingError>;

/// Error type returned by catalog, processor and loader functions.
///
/// Every variant is a configuration or infrastructure problem. Data-quality problems on a
/// single spectrum are never reported through this type: filters discard the spectrum by
/// returning `None` and log the reason instead.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// A filter name that is not registered in the catalog.
    #[error("unknown filter '{name}'")]
    UnknownFilter { name: String },

    /// A filter without stored defaults was configured without all of its parameters.
    #[error("filter '{filter}' requires parameters that were not given: {}", .missing.join(", "))]
    MissingParameters { filter: String, missing: Vec<String> },

    /// A parameter has the wrong type or an unsupported value.
    #[error("invalid parameter '{param}' for filter '{filter}': {message}")]
    InvalidParameter {
        filter: String,
        param: String,
        message: String,
    },

    /// A preset name that does not match any known pipeline.
    #[error("Unknown processing pipeline '{name}'. Available pipelines: default, minimal")]
    UnknownPipeline { name: String },

    /// The same filter name was registered twice.
    #[error("filter '{name}' is already registered")]
    DuplicateFilter { name: String },

    /// `process_spectrum` was invoked on a processor without any filters.
    #[error("No filters to process")]
    NoFilters,

    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV read/write error (adduct tables, report export).
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON (de)serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// An adduct table row could not be interpreted.
    #[error("invalid adduct table at line {line}: {message}")]
    AdductTable { line: usize, message: String },

    /// Spectrum import failed because the input does not describe spectra.
    #[error("invalid spectrum input: {message}")]
    InvalidInput { message: String },

    /// The worker pool for batch execution could not be created.
    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// Report rendering failed inside polars.
    #[error("polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),
}
