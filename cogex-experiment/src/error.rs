use std::path::PathBuf;

use cogex_core::{LoadError, PresentError};
use thiserror::Error;

/// Malformed or unreadable script file
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: expected {expected} tab-separated fields, found {found}")]
    MissingFields {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: invalid {column} {value:?}")]
    InvalidNumber {
        line: usize,
        column: &'static str,
        value: String,
    },

    #[error("line {line}: unknown stimulus type {value:?}")]
    UnknownType { line: usize, value: String },
}

/// Anything that prevents a session from starting. Raised before the
/// trigger, never mid-session.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error("line {line}: {source}")]
    Stimulus {
        line: usize,
        #[source]
        source: LoadError,
    },

    #[error("line {line}: onset {onset_ms} plus {offset_ms} ms overflows the session clock")]
    OnsetOverflow {
        line: usize,
        onset_ms: u64,
        offset_ms: u64,
    },

    #[error("cannot prepare {what}: {source}")]
    Builtin {
        what: &'static str,
        #[source]
        source: LoadError,
    },
}

/// Failure during a running session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("presentation of {id:?} (target {target_onset_ms} ms) failed: {source}")]
    Presentation {
        id: String,
        target_onset_ms: u64,
        #[source]
        source: PresentError,
    },

    #[error("presentation failed: {0}")]
    Screen(#[from] PresentError),
}

pub type SetupResult<T> = Result<T, SetupError>;

pub type SessionResult<T> = Result<T, SessionError>;
