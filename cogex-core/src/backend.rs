//! Seams between the timeline engine and the machinery that actually loads,
//! shows and plays stimuli and reads the keyboard.

use std::path::PathBuf;

use crate::error::{LoadError, PresentError};
use crate::event::StimulusRef;
use crate::stimulus::AssetKind;

/// Request for a catalog entry: a resolved file path for file-backed kinds,
/// the literal text otherwise
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetRequest {
    pub kind: AssetKind,
    pub key: String,
}

impl AssetRequest {
    pub fn new(kind: AssetKind, key: impl Into<String>) -> Self {
        Self {
            kind,
            key: key.into(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(AssetKind::Text, text)
    }

    pub fn path(&self) -> Option<PathBuf> {
        self.kind.is_file().then(|| PathBuf::from(&self.key))
    }
}

/// Builds ready-to-present stimuli. Called only during setup, never while
/// the dispatch loop is running.
pub trait StimulusLoader {
    type Handle: Clone;

    fn load(&mut self, request: &AssetRequest) -> Result<Self::Handle, LoadError>;
}

/// Shows or plays a stimulus. Returns once the stimulus is on screen (or
/// audible), so the caller can timestamp it.
pub trait Presenter<H> {
    fn present(&mut self, stimulus: StimulusRef<'_, H>) -> Result<(), PresentError>;
}

/// Input observed by a non-blocking poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Key(String),
    /// Operator abort (Escape, window closed)
    Abort,
}

pub trait KeySource {
    /// Returns the oldest pending input, if any. Never blocks.
    fn poll_key(&mut self) -> Option<Input>;
}
