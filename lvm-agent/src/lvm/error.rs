use std::num::ParseIntError;
use std::path::PathBuf;

use thiserror::Error;

/// A size string that is not a plain byte count.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SizeFormatError {
    #[error("cannot parse size {0:?} (unknown suffix)")]
    UnknownSuffix(String),

    #[error("error parsing size {value:?}: {source}")]
    InvalidNumber {
        value: String,
        #[source]
        source: ParseIntError,
    },
}

/// The structured `lvs` report did not have the expected shape.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("invalid report json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("got {0} reports, expected exactly 1")]
    SectionCount(usize),

    #[error("logical volume {name:?}: {source}")]
    Size {
        name: String,
        #[source]
        source: SizeFormatError,
    },
}

#[derive(Error, Debug)]
pub enum LvmError {
    #[error("error running command {command} ({status}, stdout={stdout:?}, stderr={stderr:?})")]
    CommandFailed {
        command: String,
        status: String,
        stdout: String,
        stderr: String,
    },

    #[error("command {command} was cancelled")]
    Cancelled { command: String },

    #[error("failed to execute {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("error parsing output from command {command} (stdout={stdout:?}, stderr={stderr:?}): {source}")]
    MalformedOutput {
        command: String,
        stdout: String,
        stderr: String,
        #[source]
        source: ReportError,
    },

    #[error("error creating mount directory {path:?}: {source}")]
    MountDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid name: {0}")]
    InvalidName(String),

    #[error("path {0:?} is not valid UTF-8")]
    NonUtf8Path(PathBuf),
}

impl LvmError {
    /// True when the error came from the caller aborting the invocation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, LvmError::Cancelled { .. })
    }
}

pub type Result<T> = std::result::Result<T, LvmError>;
