use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures a split can end with. Each kind maps to its own process exit
/// code so scripts can tell them apart.
#[derive(Debug, Error)]
pub enum SplitError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("input file not found: {}", .path.display())]
    MissingInput { path: PathBuf },

    #[error("cannot read {}: {source}", .path.display())]
    ReadInput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed XML in {}: {message} (byte {position})", .path.display())]
    MalformedInput {
        path: PathBuf,
        message: String,
        position: usize,
    },

    #[error("cannot create output directory {}: {source}", .path.display())]
    CreateOutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("refusing to overwrite existing file {}", .path.display())]
    OutputExists { path: PathBuf },

    #[error("cannot write {}: {source}", .path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config {}: {message}", .path.display())]
    Config { path: PathBuf, message: String },
}

impl SplitError {
    pub fn exit_code(&self) -> i32 {
        match self {
            SplitError::InvalidArgument(_) | SplitError::Config { .. } => 1,
            SplitError::MalformedInput { .. } => 2,
            SplitError::MissingInput { .. } => 3,
            SplitError::CreateOutputDir { .. }
            | SplitError::OutputExists { .. }
            | SplitError::OutputWrite { .. } => 4,
            SplitError::ReadInput { .. } => 5,
        }
    }
}
