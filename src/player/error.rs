//! Error types for the playback module

use thiserror::Error;

/// Failure to derive any candidate source for a stream
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    #[error("Stream has no direct source and no server is configured")]
    NoOrigin,

    #[error("No supported video format found for '{name}'")]
    NoCandidates { name: String },
}

/// Broad class of a backend error, used to pick a recovery action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Manifest or segment loading failed
    Network,
    /// Decoder or media pipeline failure
    Media,
    /// Anything the backend cannot recover from locally
    Other,
}

/// Error reported by a playback backend, already translated from the engine's taxonomy
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{class:?} error{}: {message}", fatal_suffix(.fatal))]
pub struct BackendError {
    pub fatal: bool,
    pub class: ErrorClass,
    pub message: String,
}

impl BackendError {
    pub fn fatal(class: ErrorClass, message: impl Into<String>) -> Self {
        Self { fatal: true, class, message: message.into() }
    }

    pub fn transient(class: ErrorClass, message: impl Into<String>) -> Self {
        Self { fatal: false, class, message: message.into() }
    }

    /// Setup failure that should make the session move on to the next candidate
    pub fn setup(message: impl Into<String>) -> Self {
        Self::fatal(ErrorClass::Other, message)
    }
}

fn fatal_suffix(fatal: &bool) -> &'static str {
    if *fatal { " (fatal)" } else { "" }
}

/// Rejection of a play request by the media element
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlayError {
    /// Autoplay policy refused to start playback without user interaction
    #[error("Playback was not allowed: {0}")]
    NotAllowed(String),

    /// A newer load replaced the source before playback started
    #[error("Playback request was aborted by a new load")]
    Aborted,

    #[error("{0}")]
    Failed(String),
}
