//! Error types for mesh loading

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for STL operations
pub type StlResult<T> = Result<T, StlError>;

/// Errors that can occur while reading a binary STL file
#[derive(Error, Debug)]
pub enum StlError {
    #[error("cannot open {path:?}: {source}")]
    InvalidPath {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("file too small to be a binary STL: {len} bytes, header needs 84")]
    TruncatedHeader { len: usize },

    #[error("file truncated: header declares {declared} triangles, only {complete} are complete")]
    Truncated { declared: u32, complete: u32 },
}
