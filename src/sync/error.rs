use std::path::PathBuf;

/// Failures of a remote sync. Every message carries scrubbed URLs only.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("GitHub repository URL is empty")]
    MissingRepository,

    #[error("{action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("command `{command}` failed with exit code {exit_code}: {stderr}")]
    Command {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("sync task failed: {0}")]
    Join(String),
}

impl SyncError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }
}
