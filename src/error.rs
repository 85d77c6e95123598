use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: `{token}` is not a number")]
    Parse { line: usize, token: String },
    #[error("line {line}: column {column} requested but the row only has {found} columns")]
    MissingColumn {
        line: usize,
        column: usize,
        found: usize,
    },
    #[error("line {line}: timestamp {value} cannot be represented as a date")]
    InvalidTimestamp { line: usize, value: f64 },
    #[error("input contains no numeric rows")]
    EmptyInput,
    #[error("heart rate series is empty")]
    EmptySeries,
    #[error("elapsed time goes backwards at sample {index} ({previous}s -> {current}s)")]
    NonMonotonicTime {
        index: usize,
        previous: f64,
        current: f64,
    },
    /// A step, or a sample's elapsed time, strays from the measured interval
    #[error(
        "sampling is irregular at sample {index}: {found}s, expected {expected}s within {tolerance}"
    )]
    IrregularSampling {
        index: usize,
        found: f64,
        expected: f64,
        tolerance: f64,
    },
    #[error("radius {radius}s maps to sample {index} but the series only has {len} samples")]
    OutOfCoverage { radius: f64, index: usize, len: usize },
    #[error("signal has {len} samples, at least {required} needed")]
    SignalTooShort { len: usize, required: usize },
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("failed to render plot: {0}")]
    Plot(String),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for Error
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        Error::Plot(format!("{value:?}"))
    }
}
