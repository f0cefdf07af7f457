use std::sync::Arc;

use crate::stimulus::EventType;

/// Condition column written for key press records
pub const KEYPRESS_CONDITION: &str = "keypressed";

/// One entry of the session log
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogRecord {
    Presentation {
        condition: Arc<str>,
        clock_time_ms: u64,
        event_type: EventType,
        id: Arc<str>,
        target_onset_ms: u64,
    },
    KeyPress {
        clock_time_ms: u64,
        key: String,
    },
}

impl LogRecord {
    pub fn clock_time_ms(&self) -> u64 {
        match self {
            LogRecord::Presentation { clock_time_ms, .. }
            | LogRecord::KeyPress { clock_time_ms, .. } => *clock_time_ms,
        }
    }

    pub fn is_presentation(&self) -> bool {
        matches!(self, LogRecord::Presentation { .. })
    }

    /// Measured presentation latency (actual minus nominal onset); negative
    /// when the stimulus went out inside the lookahead window
    pub fn latency_ms(&self) -> Option<i64> {
        match self {
            LogRecord::Presentation {
                clock_time_ms,
                target_onset_ms,
                ..
            } => Some(*clock_time_ms as i64 - *target_onset_ms as i64),
            LogRecord::KeyPress { .. } => None,
        }
    }
}
