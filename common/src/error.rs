use std::path::PathBuf;

use thiserror::Error;

/// Failures while preparing the list of ranges to audit.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("range file {path} could not be read: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("range file {path} is empty")]
    EmptyFile { path: PathBuf },

    #[error("range file {path} has no valid ranges ({invalid} invalid line(s) skipped)")]
    NoValidRanges { path: PathBuf, invalid: usize },
}
