//! Readers for the tab-separated event and instruction scripts.

use std::fs;
use std::path::Path;

use cogex_core::{InstructionKind, InstructionRow, ScriptRow, StimulusType};
use csv::StringRecord;

use crate::error::ScriptError;

const BOM: char = '\u{feff}';

/// Reads an event script (`condition, onset_ms, type, payload`)
pub fn read_event_script(path: &Path) -> Result<Vec<ScriptRow>, ScriptError> {
    let text = read_script_file(path)?;
    parse_event_script(&text)
}

pub fn parse_event_script(text: &str) -> Result<Vec<ScriptRow>, ScriptError> {
    records(text)
        .into_iter()
        .map(|(line, record)| parse_event_row(line, &record))
        .collect()
}

/// Reads an instruction script (`duration_ms, type, content`)
pub fn read_instruction_script(path: &Path) -> Result<Vec<InstructionRow>, ScriptError> {
    let text = read_script_file(path)?;
    parse_instruction_script(&text)
}

pub fn parse_instruction_script(text: &str) -> Result<Vec<InstructionRow>, ScriptError> {
    records(text)
        .into_iter()
        .map(|(line, record)| parse_instruction_row(line, &record))
        .collect()
}

fn read_script_file(path: &Path) -> Result<String, ScriptError> {
    fs::read_to_string(path).map_err(|source| ScriptError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Non-empty records with their 1-based line numbers; blank lines still
/// count
fn records(text: &str) -> Vec<(usize, StringRecord)> {
    let text = text.strip_prefix(BOM).unwrap_or(text);
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| (i + 1, line.split('\t').collect::<StringRecord>()))
        .collect()
}

fn parse_event_row(line: usize, record: &StringRecord) -> Result<ScriptRow, ScriptError> {
    if record.len() < 4 {
        return Err(ScriptError::MissingFields {
            line,
            expected: 4,
            found: record.len(),
        });
    }
    let onset = record[1].trim();
    let onset_ms = onset.parse::<u64>().map_err(|_| ScriptError::InvalidNumber {
        line,
        column: "onset",
        value: onset.to_string(),
    })?;
    let stimulus_type =
        record[2]
            .trim()
            .parse::<StimulusType>()
            .map_err(|e| ScriptError::UnknownType {
                line,
                value: e.0,
            })?;
    Ok(ScriptRow::new(
        line,
        &record[0],
        onset_ms,
        stimulus_type,
        &record[3],
    ))
}

fn parse_instruction_row(line: usize, record: &StringRecord) -> Result<InstructionRow, ScriptError> {
    if record.len() < 3 {
        return Err(ScriptError::MissingFields {
            line,
            expected: 3,
            found: record.len(),
        });
    }
    let duration = record[0].trim();
    let duration_ms = duration.parse::<u64>().map_err(|_| ScriptError::InvalidNumber {
        line,
        column: "duration",
        value: duration.to_string(),
    })?;
    let kind = match record[1].trim() {
        "box" => InstructionKind::Box,
        "text" => InstructionKind::Text,
        "sound" => InstructionKind::Sound,
        "pict" => InstructionKind::Pict,
        other => {
            return Err(ScriptError::UnknownType {
                line,
                value: other.to_string(),
            });
        }
    };
    let content = match kind {
        InstructionKind::Box => record[2].replace("\\n", "\n"),
        _ => record[2].to_string(),
    };
    Ok(InstructionRow {
        line,
        duration_ms,
        kind,
        content,
    })
}
