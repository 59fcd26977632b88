//! Run-fatal errors
//!
//! Every variant terminates the run that raised it. There is no local recovery:
//! a corrupted numeric state would silently invalidate a whole evolutionary run.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Missing or malformed setting, unknown distribution/operation name.
    #[error("Configuration error at `{path}`: {reason}")]
    Configuration { path: String, reason: String },

    /// Arity or width mismatch, rule-evaluator stack underflow or leftover.
    #[error("Data shape mismatch: {0}")]
    DataShape(String),

    /// Broken running invariant over simulation or smoothing state.
    #[error("Invariant violated: {0}")]
    Invariant(String),

    /// The noisy-fitness parameter fit did not converge.
    #[error("Optimizer failure: {0}")]
    Optimizer(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    pub fn config(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn shape(reason: impl Into<String>) -> Self {
        Self::DataShape(reason.into())
    }

    pub fn invariant(reason: impl Into<String>) -> Self {
        Self::Invariant(reason.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
