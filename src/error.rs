//! Errors of every stage of a fetch.
//!
//! Every failure is fatal to the stage that raised it; [`crate::fetcher`] decides whether it is
//! fatal to the whole run.

use std::path::PathBuf;

/// An error raised while fetching runs, downloading artifacts or plotting.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Credentials for the CI platform are missing or rejected.
    #[error("authentication failed: {message}")]
    Authentication {
        /// What the platform reported.
        message: String,
    },

    /// The CI platform could not be reached, or answered with garbage.
    #[error("network error: {0}")]
    Network(String),

    /// The repository or workflow does not exist.
    #[error("not found: {message}")]
    NotFound {
        /// What could not be found.
        message: String,
    },

    /// The run has no artifact with the requested name.
    #[error("artifact {artifact:?} not found on run {run}")]
    ArtifactNotFound {
        /// The requested artifact name.
        artifact: String,
        /// The run number the artifact was requested from.
        run: u64,
    },

    /// An external executable is missing or exited unsuccessfully.
    #[error("{tool} failed{}: {message}", .code.map(|c| format!(" with exit code {c}")).unwrap_or_default())]
    ExternalTool {
        /// The executable that failed.
        tool: String,
        /// The exit code, if the tool ran to completion.
        code: Option<i32>,
        /// The captured error output or spawn error.
        message: String,
    },

    /// The configuration is invalid.
    #[error("config error: {message}")]
    Configuration {
        /// What is wrong with the configuration.
        message: String,
    },

    /// Filesystem I/O failed.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        /// The path being accessed.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },

    /// A downloaded artifact is broken or lacks expected content.
    #[error("broken artifact for run {run}: {message}")]
    CorruptArtifact {
        /// The run number of the artifact.
        run: u64,
        /// What is wrong with it.
        message: String,
    },

    /// The run was cancelled by a signal or the overall timeout.
    #[error("interrupted: {0}")]
    Interrupted(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FetchError>;

impl FetchError {
    /// Creates an authentication error from any displayable message.
    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::Authentication {
            message: msg.into(),
        }
    }

    /// Creates a not-found error from any displayable message.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound {
            message: msg.into(),
        }
    }

    /// Creates a configuration error from any displayable message.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration {
            message: msg.into(),
        }
    }

    /// Wraps a [`std::io::Error`] with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// The process exit code this error should end the program with.
    ///
    /// External tools that exited unsuccessfully propagate their own code.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::ExternalTool {
                code: Some(code), ..
            } => u8::try_from(*code).ok().filter(|c| *c != 0).unwrap_or(1),
            Self::Configuration { .. } => 2,
            Self::Interrupted(_) => 130,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = FetchError::configuration("run count must be positive");
        assert_eq!(err.to_string(), "config error: run count must be positive");

        let err = FetchError::ArtifactNotFound {
            artifact: "run-log".into(),
            run: 42,
        };
        assert_eq!(err.to_string(), "artifact \"run-log\" not found on run 42");

        let err = FetchError::ExternalTool {
            tool: "gh".into(),
            code: Some(4),
            message: "boom".into(),
        };
        assert_eq!(err.to_string(), "gh failed with exit code 4: boom");

        let err = FetchError::ExternalTool {
            tool: "plot".into(),
            code: None,
            message: "No such file or directory".into(),
        };
        assert_eq!(err.to_string(), "plot failed: No such file or directory");
    }

    #[test]
    fn exit_codes_propagate_external_tools() {
        let tool = |code| FetchError::ExternalTool {
            tool: "plot".into(),
            code,
            message: String::new(),
        };
        assert_eq!(tool(Some(3)).exit_code(), 3);
        assert_eq!(tool(Some(-1)).exit_code(), 1);
        assert_eq!(tool(None).exit_code(), 1);
        assert_eq!(FetchError::configuration("x").exit_code(), 2);
        assert_eq!(FetchError::Interrupted("ctrl-c".into()).exit_code(), 130);
        assert_eq!(FetchError::Network("down".into()).exit_code(), 1);
    }
}
