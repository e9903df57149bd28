use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::lvm::LvmError;

/// Manager-level operations, named in every surfaced error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Find,
    Create,
    Delete,
    List,
    CheckPool,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Find => "find",
            Operation::Create => "create",
            Operation::Delete => "delete",
            Operation::List => "list",
            Operation::CheckPool => "check_pool",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse classification of a [`VolumeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A command failed in a way that is not an expected state
    Execution,
    /// The caller cancelled an in-flight command
    Cancelled,
    /// `lvs` output did not have the expected shape
    MalformedOutput,
    /// The backing store contradicted a guaranteed post-condition
    Consistency,
    /// Filesystem statistics could not be read
    StatsUnavailable,
    /// The request named an unusable volume
    InvalidArgument,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Execution => "execution_error",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::MalformedOutput => "malformed_output",
            ErrorKind::Consistency => "consistency_error",
            ErrorKind::StatsUnavailable => "stats_unavailable",
            ErrorKind::InvalidArgument => "invalid_argument",
        }
    }
}

#[derive(Error, Debug)]
pub enum VolumeError {
    #[error("{operation} volume '{volume}': {source}")]
    Backend {
        operation: Operation,
        volume: String,
        #[source]
        source: LvmError,
    },

    #[error("{operation} volume '{volume}': unexpectedly found {count} logical volumes, expected at most 1")]
    DuplicateVolume {
        operation: Operation,
        volume: String,
        count: usize,
    },

    #[error("create volume '{volume}': could not find LV info for newly created volume")]
    Inconsistent { volume: String },

    #[error("stats unavailable for volume '{volume}' at {path:?}: {source}")]
    StatsUnavailable {
        volume: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("thin pool '{pool}' not found in volume group '{volume_group}'")]
    PoolNotFound { volume_group: String, pool: String },
}

impl VolumeError {
    pub(crate) fn backend(operation: Operation, volume: &str, source: LvmError) -> Self {
        VolumeError::Backend {
            operation,
            volume: volume.to_string(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            VolumeError::Backend { source, .. } => match source {
                LvmError::Cancelled { .. } => ErrorKind::Cancelled,
                LvmError::MalformedOutput { .. } => ErrorKind::MalformedOutput,
                LvmError::InvalidName(_) | LvmError::NonUtf8Path(_) => ErrorKind::InvalidArgument,
                LvmError::CommandFailed { .. }
                | LvmError::Spawn { .. }
                | LvmError::MountDirectory { .. } => ErrorKind::Execution,
            },
            VolumeError::DuplicateVolume { .. }
            | VolumeError::Inconsistent { .. }
            | VolumeError::PoolNotFound { .. } => ErrorKind::Consistency,
            VolumeError::StatsUnavailable { .. } => ErrorKind::StatsUnavailable,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind() == ErrorKind::Cancelled
    }
}

pub type Result<T> = std::result::Result<T, VolumeError>;
