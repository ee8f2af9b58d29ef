//! The error type shared by every fallible operation of the engine.

use crate::options::{OptionId, ValueKind};
use std::path::PathBuf;

/// An error raised while loading, configuring or querying a road surface.
#[derive(Debug, thiserror::Error)]
pub enum CrgError {
    #[error("unknown data set handle")]
    UnknownDataSet,

    #[error("unknown contact point handle")]
    UnknownContactPoint,

    #[error("data set is still referenced by {0} contact point(s)")]
    DataSetInUse(usize),

    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("format error at line {line}: {reason}")]
    Format { line: usize, reason: String },

    #[error("unrecognized record format tag {0:?}")]
    UnknownRecordFormat(String),

    #[error("data section truncated after {records} complete record(s)")]
    TruncatedData { records: usize },

    #[error("no data section found")]
    NoData,

    #[error("inconsistent data definition: {0}")]
    Inconsistent(String),

    #[error("option {option:?} takes values of kind {expected:?}")]
    TypeMismatch { option: OptionId, expected: ValueKind },

    #[error("invalid value for {option:?}: {reason}")]
    InvalidValue { option: OptionId, reason: String },

    #[error("conflicting modifiers: {0}")]
    ConflictingModifiers(String),

    #[error("{axis} = {value} lies outside the valid range and border mode is none")]
    OutOfRange { axis: char, value: f64 },
}

/// The result of an engine operation.
pub type Result<T> = std::result::Result<T, CrgError>;

impl CrgError {
    pub(crate) fn format(line: usize, reason: impl Into<String>) -> Self {
        Self::Format {
            line,
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid(option: OptionId, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            option,
            reason: reason.into(),
        }
    }
}
