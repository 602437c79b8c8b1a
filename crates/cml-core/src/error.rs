//! Infrastructure errors. Validation findings are `Issue`s, never errors.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CmlError {
    /// A file or directory could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A CSV table could not be decoded.
    #[error("failed to read CSV {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

pub type Result<T> = std::result::Result<T, CmlError>;
