use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Durations used to expand script rows into timed events (ms)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingConfig {
    pub word_duration_ms: u64,
    pub word_isi_ms: u64,
    pub picture_duration_ms: u64,
    pub picture_isi_ms: u64,
    pub text_duration_ms: u64,
    /// Gap between the end of a sequence and its fixation cross
    pub fs_delay_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            word_duration_ms: 450,
            word_isi_ms: 200,
            picture_duration_ms: 1000,
            picture_isi_ms: 0,
            text_duration_ms: 3000,
            fs_delay_ms: 100,
        }
    }
}

/// Parameters of the live loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Present once the clock is within this margin of the onset
    pub lookahead_ms: u64,
    /// Sleep slice between key polls while waiting for an onset
    pub poll_interval: Duration,
    /// Sleep slice while resting after the last event
    pub rest_interval: Duration,
    /// Keep the session open until this clock time; `None` ends right
    /// after the last event
    pub total_duration_ms: Option<u64>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            lookahead_ms: 10,
            poll_interval: Duration::from_millis(1),
            rest_interval: Duration::from_millis(100),
            total_duration_ms: None,
        }
    }
}

impl DispatchConfig {
    /// `-1` on the command line disables the bound
    pub fn with_total_duration(mut self, total_ms: i64) -> Self {
        self.total_duration_ms = u64::try_from(total_ms).ok();
        self
    }
}

/// Everything a session run needs besides the script and the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub subject: String,
    /// Key standing in for the scanner trigger
    pub trigger_key: String,
    pub waiting_message: String,
    pub closing_message: String,
    pub closing_delay_ms: u64,
    pub timing: TimingConfig,
    pub dispatch: DispatchConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            subject: "1".to_string(),
            trigger_key: "t".to_string(),
            waiting_message: "Waiting for scanner sync (or press 't')".to_string(),
            closing_message: "Merci !".to_string(),
            closing_delay_ms: 2000,
            timing: TimingConfig::default(),
            dispatch: DispatchConfig::default(),
        }
    }
}
