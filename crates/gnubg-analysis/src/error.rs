//! Error taxonomy for position analysis.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while analysing positions with the engine.
///
/// Every variant except [`AnalysisError::EngineNotFound`] is scoped to the
/// request(s) of a single invocation; the coordinator records them per
/// position and carries on with the rest of the batch.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// No console build of the engine could be resolved.
    #[error("analysis engine not found: {0}")]
    EngineNotFound(String),
    /// The engine exceeded its time bound and was killed.
    #[error("engine did not finish within {0:?} and was terminated")]
    EngineTimeout(Duration),
    /// The engine exited with a non-zero status or was killed by a signal.
    #[error("engine exited abnormally ({status}): {diagnostics}")]
    EngineCrashed {
        /// Exit status as reported by the OS.
        status: String,
        /// Tail of the engine's stdout and stderr.
        diagnostics: String,
    },
    /// The engine exited cleanly without writing its result.
    #[error("engine exited without writing a result to {}", .0.display())]
    ChannelEmpty(PathBuf),
    /// The engine wrote something that is not a valid result document.
    #[error("engine result is unreadable: {0}")]
    ChannelCorrupt(String),
    /// Local I/O failure (temporary file allocation, process spawn).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A worker slot stopped before reporting its outcome.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Machine-readable failure category, used in batch reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    EngineNotFound,
    EngineTimeout,
    EngineCrashed,
    ChannelEmpty,
    ChannelCorrupt,
    Io,
    Internal,
}

impl AnalysisError {
    /// Returns the failure category of this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            AnalysisError::EngineNotFound(_) => FailureKind::EngineNotFound,
            AnalysisError::EngineTimeout(_) => FailureKind::EngineTimeout,
            AnalysisError::EngineCrashed { .. } => FailureKind::EngineCrashed,
            AnalysisError::ChannelEmpty(_) => FailureKind::ChannelEmpty,
            AnalysisError::ChannelCorrupt(_) => FailureKind::ChannelCorrupt,
            AnalysisError::Io(_) => FailureKind::Io,
            AnalysisError::Internal(_) => FailureKind::Internal,
        }
    }

    /// Rebuilds an equivalent error so one invocation failure can be
    /// recorded against every request it covered.
    pub(crate) fn duplicate(&self) -> Self {
        match self {
            AnalysisError::EngineNotFound(msg) => AnalysisError::EngineNotFound(msg.clone()),
            AnalysisError::EngineTimeout(bound) => AnalysisError::EngineTimeout(*bound),
            AnalysisError::EngineCrashed {
                status,
                diagnostics,
            } => AnalysisError::EngineCrashed {
                status: status.clone(),
                diagnostics: diagnostics.clone(),
            },
            AnalysisError::ChannelEmpty(path) => AnalysisError::ChannelEmpty(path.clone()),
            AnalysisError::ChannelCorrupt(msg) => AnalysisError::ChannelCorrupt(msg.clone()),
            AnalysisError::Io(err) => {
                AnalysisError::Io(std::io::Error::new(err.kind(), err.to_string()))
            }
            AnalysisError::Internal(msg) => AnalysisError::Internal(msg.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let not_found = AnalysisError::EngineNotFound("`gnubg` is not on PATH".to_string());
        assert!(not_found.to_string().contains("`gnubg` is not on PATH"));

        let timeout = AnalysisError::EngineTimeout(Duration::from_secs(5));
        assert_eq!(
            timeout.to_string(),
            "engine did not finish within 5s and was terminated"
        );

        let crashed = AnalysisError::EngineCrashed {
            status: "exit status: 3".to_string(),
            diagnostics: "Segmentation fault".to_string(),
        };
        assert!(crashed.to_string().contains("exit status: 3"));
        assert!(crashed.to_string().contains("Segmentation fault"));

        let empty = AnalysisError::ChannelEmpty(PathBuf::from("/tmp/gnubg_result_1.json"));
        assert!(empty.to_string().contains("/tmp/gnubg_result_1.json"));
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            AnalysisError::ChannelCorrupt("x".to_string()).kind(),
            FailureKind::ChannelCorrupt
        );
        assert_eq!(
            AnalysisError::Io(std::io::Error::other("disk full")).kind(),
            FailureKind::Io
        );
        assert_eq!(
            AnalysisError::Internal("lost".to_string()).kind(),
            FailureKind::Internal
        );
    }

    #[test]
    fn test_failure_kind_serializes_snake_case() {
        let json = serde_json::to_string(&FailureKind::EngineTimeout).unwrap();
        assert_eq!(json, "\"engine_timeout\"");
    }

    #[test]
    fn test_duplicate_preserves_kind_and_message() {
        let original = AnalysisError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "access denied",
        ));
        let copy = original.duplicate();
        assert_eq!(copy.kind(), FailureKind::Io);
        assert_eq!(copy.to_string(), original.to_string());
    }
}
