use std::path::PathBuf;

use thiserror::Error;

/// Failures while turning a results directory into a table. The run aborts on
/// the first error; there is no per-file recovery.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Results directory {0} does not exist or is not a directory")]
    Discovery(PathBuf),
    #[error("No result files found in {0}")]
    NoResults(PathBuf),
    #[error("Invalid concurrency in filename {name}: {reason}")]
    Concurrency { name: String, reason: String },
    #[error("Failed to read {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse {name}: {source}")]
    Parse {
        name: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Missing data in {name}: {reason}")]
    MissingData { name: String, reason: String },
}
