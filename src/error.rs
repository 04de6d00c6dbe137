//! Error types for the bootstrap pipeline

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Pipeline stage an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Configuration,
    Input,
    Sampling,
    Interpolation,
    Aggregation,
    Writing,
    Reprojection,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Configuration => "configuration",
            Stage::Input => "input",
            Stage::Sampling => "sampling",
            Stage::Interpolation => "interpolation",
            Stage::Aggregation => "aggregation",
            Stage::Writing => "writing",
            Stage::Reprojection => "reprojection",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Input error: {0}")]
    Input(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Sampling failed{}: {reason}", realization_suffix(.realization))]
    Sampling {
        realization: Option<usize>,
        reason: String,
    },

    #[error("Interpolation failed{}: {reason}", realization_suffix(.realization))]
    Interpolation {
        realization: Option<usize>,
        reason: String,
    },

    #[error("Grid shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("Failed to write {}: {reason}", .path.display())]
    Output { path: PathBuf, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Reprojection of {} to {} failed (exit code {}): {stderr}", .input.display(), .output.display(), exit_code(.code))]
    Reprojection {
        input: PathBuf,
        output: PathBuf,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Cannot read config {}: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Run cancelled after {completed} realizations")]
    Cancelled { completed: usize },
}

impl Error {
    pub fn invalid_parameter(
        name: &'static str,
        value: impl fmt::Display,
        reason: impl Into<String>,
    ) -> Self {
        Error::InvalidParameter {
            name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Stage of the pipeline that produced this error.
    pub fn stage(&self) -> Stage {
        match self {
            Error::Input(_) | Error::Csv(_) => Stage::Input,
            Error::InvalidParameter { .. } | Error::Config(_) | Error::ConfigRead { .. } => {
                Stage::Configuration
            }
            Error::Sampling { .. } => Stage::Sampling,
            Error::Interpolation { .. } => Stage::Interpolation,
            Error::ShapeMismatch { .. } | Error::Cancelled { .. } => Stage::Aggregation,
            Error::Output { .. } | Error::Io(_) => Stage::Writing,
            Error::Reprojection { .. } => Stage::Reprojection,
        }
    }
}

fn realization_suffix(realization: &Option<usize>) -> String {
    realization
        .map(|r| format!(" in realization {r}"))
        .unwrap_or_default()
}

fn exit_code(code: &Option<i32>) -> String {
    code.map(|c| c.to_string()).unwrap_or_else(|| "none".into())
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn interpolation_message_names_realization() {
        let err = Error::Interpolation {
            realization: Some(7),
            reason: "radius too small".into(),
        };
        assert_eq!(
            err.to_string(),
            "Interpolation failed in realization 7: radius too small"
        );
        assert_eq!(err.stage(), Stage::Interpolation);
    }

    #[test]
    fn sampling_errors_report_sampling_stage() {
        let err = Error::Sampling {
            realization: Some(2),
            reason: "fraction 0.8 selects no points from a dataset of 1".into(),
        };
        assert_eq!(err.stage(), Stage::Sampling);
        assert!(err.to_string().starts_with("Sampling failed in realization 2"));
    }

    #[test]
    fn reprojection_message_carries_exit_code() {
        let err = Error::Reprojection {
            input: "a.tiff".into(),
            output: "b.tiff".into(),
            code: Some(1),
            stderr: "ERROR 1: bad srs".into(),
        };
        assert!(err.to_string().contains("exit code 1"));
        assert_eq!(err.stage(), Stage::Reprojection);
    }
}
