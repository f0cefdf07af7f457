use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use cogex_experiment::{SessionConfig, SessionLog};
use cogex_render::DisplayConfig;
use cogex_timing::LatencyStats;
use serde::Serialize;

/// How a run ended, as recorded in the summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Completed,
    Interrupted,
    Failed,
}

#[derive(Serialize)]
struct Summary<'a> {
    subject: &'a str,
    script: &'a str,
    started_at: String,
    status: RunStatus,
    presentations: usize,
    key_presses: usize,
    latency_ms: LatencyStats,
    session: &'a SessionConfig,
    display: &'a DisplayConfig,
}

pub struct OutputFiles {
    pub log: PathBuf,
    pub summary: PathBuf,
}

/// `<script stem>_sub-<subject>_<YYYYmmdd-HHMMSS>`
pub fn output_stem(script: &Path, subject: &str, started: &DateTime<Local>) -> String {
    let stem = script
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "session".to_string());
    format!("{stem}_sub-{subject}_{}", started.format("%Y%m%d-%H%M%S"))
}

/// Writes the event log as CSV and a JSON summary next to it
pub fn write_session_outputs(
    dir: &Path,
    script: &Path,
    log: &SessionLog,
    status: RunStatus,
    session: &SessionConfig,
    display: &DisplayConfig,
    started: &DateTime<Local>,
) -> Result<OutputFiles> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let stem = output_stem(script, log.subject(), started);
    let files = OutputFiles {
        log: dir.join(format!("{stem}.csv")),
        summary: dir.join(format!("{stem}.json")),
    };

    let file = File::create(&files.log)
        .with_context(|| format!("creating {}", files.log.display()))?;
    log.write_csv(BufWriter::new(file))
        .with_context(|| format!("writing {}", files.log.display()))?;

    let summary = Summary {
        subject: log.subject(),
        script: log.script(),
        started_at: started.to_rfc3339(),
        status,
        presentations: log.presentations().count(),
        key_presses: log.key_presses().count(),
        latency_ms: log.latency_stats(),
        session,
        display,
    };
    let mut writer = BufWriter::new(
        File::create(&files.summary)
            .with_context(|| format!("creating {}", files.summary.display()))?,
    );
    serde_json::to_writer_pretty(&mut writer, &summary)
        .with_context(|| format!("writing {}", files.summary.display()))?;
    writer.flush()?;

    Ok(files)
}
