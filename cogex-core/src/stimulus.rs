use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ParseKindError;

/// Stimulus type column of an event script row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StimulusType {
    Sound,
    Picture,
    Video,
    Text,
    /// Comma-separated words shown one after the other
    Rsvp,
    /// Comma-separated pictures shown one after the other
    PictSeq,
}

impl StimulusType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StimulusType::Sound => "sound",
            StimulusType::Picture => "picture",
            StimulusType::Video => "video",
            StimulusType::Text => "text",
            StimulusType::Rsvp => "rsvp",
            StimulusType::PictSeq => "pictseq",
        }
    }

    /// Sequence rows carry a comma-separated payload
    pub fn is_sequence(&self) -> bool {
        matches!(self, StimulusType::Rsvp | StimulusType::PictSeq)
    }
}

impl FromStr for StimulusType {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "sound" => StimulusType::Sound,
            "picture" => StimulusType::Picture,
            "video" => StimulusType::Video,
            "text" => StimulusType::Text,
            "rsvp" => StimulusType::Rsvp,
            "pictseq" => StimulusType::PictSeq,
            other => return Err(ParseKindError(other.to_string())),
        })
    }
}

impl fmt::Display for StimulusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type of a single timed presentation, as written to the session log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Sound,
    Picture,
    Video,
    Text,
    Blank,
    Fs,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Sound => "sound",
            EventType::Picture => "picture",
            EventType::Video => "video",
            EventType::Text => "text",
            EventType::Blank => "blank",
            EventType::Fs => "fs",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a loader has to build for a catalog entry.
///
/// `Text` is a single line, `TextBox` wraps on explicit newlines and fills
/// the screen width (instruction screens).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Sound,
    Picture,
    Video,
    Text,
    TextBox,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Sound => "sound",
            AssetKind::Picture => "picture",
            AssetKind::Video => "video",
            AssetKind::Text => "text",
            AssetKind::TextBox => "text box",
        }
    }

    /// File-backed kinds resolve their key against a directory
    pub fn is_file(&self) -> bool {
        matches!(self, AssetKind::Sound | AssetKind::Picture | AssetKind::Video)
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
