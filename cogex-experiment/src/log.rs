use std::io::Write;
use std::sync::Arc;

use cogex_core::{AtomicEvent, LogRecord, KEYPRESS_CONDITION};
use cogex_timing::LatencyStats;
use serde::Serialize;

/// Append-only record of what was shown and pressed during one session
#[derive(Debug, Clone)]
pub struct SessionLog {
    subject: String,
    script: String,
    records: Vec<LogRecord>,
}

/// Flat CSV layout: key presses put the key in the `stype` column
#[derive(Serialize)]
struct CsvRow<'a> {
    subject: &'a str,
    script: &'a str,
    condition: &'a str,
    time: u64,
    stype: &'a str,
    id: &'a str,
    target_time: Option<u64>,
}

impl SessionLog {
    pub fn new(subject: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            script: script.into(),
            records: Vec::with_capacity(1024),
        }
    }

    pub fn push_presentation<H>(&mut self, event: &AtomicEvent<H>, clock_time_ms: u64) {
        self.records.push(LogRecord::Presentation {
            condition: event.condition.clone(),
            clock_time_ms,
            event_type: event.event_type(),
            id: Arc::from(event.id()),
            target_onset_ms: event.onset_ms,
        });
    }

    pub fn push_keypress(&mut self, clock_time_ms: u64, key: impl Into<String>) {
        self.records.push(LogRecord::KeyPress {
            clock_time_ms,
            key: key.into(),
        });
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    pub fn presentations(&self) -> impl Iterator<Item = &LogRecord> {
        self.records.iter().filter(|r| r.is_presentation())
    }

    pub fn key_presses(&self) -> impl Iterator<Item = &LogRecord> {
        self.records.iter().filter(|r| !r.is_presentation())
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn script(&self) -> &str {
        &self.script
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn latency_stats(&self) -> LatencyStats {
        let samples: Vec<i64> = self.records.iter().filter_map(LogRecord::latency_ms).collect();
        LatencyStats::from_samples(&samples)
    }

    /// Writes every record as CSV with a header row
    pub fn write_csv<W: Write>(&self, writer: W) -> csv::Result<()> {
        let mut out = csv::Writer::from_writer(writer);
        for record in &self.records {
            let row = match record {
                LogRecord::Presentation {
                    condition,
                    clock_time_ms,
                    event_type,
                    id,
                    target_onset_ms,
                } => CsvRow {
                    subject: &self.subject,
                    script: &self.script,
                    condition,
                    time: *clock_time_ms,
                    stype: event_type.as_str(),
                    id,
                    target_time: Some(*target_onset_ms),
                },
                LogRecord::KeyPress { clock_time_ms, key } => CsvRow {
                    subject: &self.subject,
                    script: &self.script,
                    condition: KEYPRESS_CONDITION,
                    time: *clock_time_ms,
                    stype: key,
                    id: "",
                    target_time: None,
                },
            };
            out.serialize(row)?;
        }
        out.flush()?;
        Ok(())
    }
}
