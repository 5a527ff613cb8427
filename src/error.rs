use std::path::PathBuf;
use thiserror::Error;

/// Errors the resume engine reports to its caller.
///
/// Everything here is a typed outcome, not a panic: the presentation layer
/// decides how to surface each case. A failed run never touches the prior
/// persisted session record.
#[derive(Debug, Error)]
pub enum EngineError {
    /// ResumeLast with an empty store. Recoverable: pick new media.
    #[error("no prior session to resume")]
    NoPriorSession,

    /// The requested file or folder vanished before launch. Recoverable.
    #[error("target no longer exists: {0}")]
    TargetMissing(PathBuf),

    /// The folder contains no files matching the media extension set.
    #[error("no playable media found in {0}")]
    EmptyPlaylist(PathBuf),

    /// The store exists but cannot be parsed. Callers treat the session as
    /// absent after surfacing a warning.
    #[error("session store is corrupt: {source}")]
    CorruptState {
        #[source]
        source: anyhow::Error,
    },

    /// The store could not be written. Fails only the save attempt; playback
    /// already happened and is not undone.
    #[error("failed to persist session: {source}")]
    PersistError {
        #[source]
        source: std::io::Error,
    },

    /// The control script or report file could not be created. Fails before
    /// any child process is started.
    #[error("failed to prepare control script: {source}")]
    ScriptError {
        #[source]
        source: std::io::Error,
    },

    /// The player process could not be started at all. The one hard failure:
    /// nothing ran, so there is no state to capture.
    #[error("failed to start player '{player}': {source}")]
    SpawnFailed {
        player: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    /// Whether the caller can recover by re-prompting the user, as opposed to
    /// an environmental failure worth surfacing verbatim.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EngineError::NoPriorSession
                | EngineError::TargetMissing(_)
                | EngineError::EmptyPlaylist(_)
        )
    }
}
