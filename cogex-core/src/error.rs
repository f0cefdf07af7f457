use std::path::PathBuf;
use thiserror::Error;

use crate::stimulus::AssetKind;

/// Unknown value in a type column
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown stimulus type {0:?}")]
pub struct ParseKindError(pub String);

/// Failure to build a stimulus before the session starts
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("stimulus file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("cannot load {kind} stimulus {key:?}: {reason}")]
    Decode {
        kind: AssetKind,
        key: String,
        reason: String,
    },

    #[error("{kind} stimuli are not supported by this backend")]
    Unsupported { kind: AssetKind },
}

/// Failure reported by the presentation backend during a session
#[derive(Debug, Error)]
pub enum PresentError {
    #[error("display surface error: {0}")]
    Surface(String),

    #[error("audio output error: {0}")]
    Audio(String),

    #[error("backend cannot present {0}")]
    Unsupported(String),
}
