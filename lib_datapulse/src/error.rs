use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias used across the library.
pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

/// Every failure a pipeline stage can surface to its caller.
///
/// Collectors and the processing stage mostly swallow these into log lines;
/// only the final document write lets one escape to `main`.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}: {body}")]
    Status { url: String, status: u16, body: String },

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Unexpected payload: {0}")]
    Payload(String),

    #[error("Invalid glob pattern: {0}")]
    Glob(#[from] glob::PatternError),

    #[error("Malformed delimited text in {path} at line {line}: {reason}")]
    Csv {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Section markers overlap: `{first}` and `{second}`")]
    MarkerOverlap { first: String, second: String },
}

impl PipelineError {
    /// Wraps an [`std::io::Error`] with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Wraps a [`serde_json::Error`] with the file it came from.
    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}
