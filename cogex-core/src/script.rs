use std::sync::Arc;

use crate::stimulus::StimulusType;

/// One row of an event script: `condition, onset, type, payload`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRow {
    /// 1-based line in the source file
    pub line: usize,
    pub condition: Arc<str>,
    pub onset_ms: u64,
    pub stimulus_type: StimulusType,
    pub payload: String,
}

impl ScriptRow {
    pub fn new(
        line: usize,
        condition: &str,
        onset_ms: u64,
        stimulus_type: StimulusType,
        payload: &str,
    ) -> Self {
        Self {
            line,
            condition: Arc::from(condition),
            onset_ms,
            stimulus_type,
            payload: payload.to_string(),
        }
    }

    /// Items of a sequence payload in presentation order; a single item for
    /// non-sequence rows
    pub fn items(&self) -> Vec<&str> {
        if self.stimulus_type.is_sequence() {
            self.payload.split(',').collect()
        } else {
            vec![self.payload.as_str()]
        }
    }
}

/// Screen type of an instruction script row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionKind {
    /// Multi-line text filling the screen
    Box,
    Text,
    Sound,
    Pict,
}

/// One row of an instruction script: `duration, type, content`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionRow {
    pub line: usize,
    pub duration_ms: u64,
    pub kind: InstructionKind,
    pub content: String,
}
