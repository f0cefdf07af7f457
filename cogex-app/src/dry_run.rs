use std::io::Write;
use std::path::Path;

use anyhow::Result;
use cogex_cache::StimulusCatalog;
use cogex_core::{AssetKind, AssetRequest, LoadError, ScriptRow, StimulusLoader};
use cogex_experiment::{TimelineCompiler, TimingConfig};

/// Loader that renders nothing. It checks that stimulus files exist and
/// rejects the kinds the window backend cannot present.
#[derive(Debug, Default)]
pub struct CheckingLoader;

impl StimulusLoader for CheckingLoader {
    type Handle = ();

    fn load(&mut self, request: &AssetRequest) -> Result<(), LoadError> {
        if request.kind == AssetKind::Video {
            return Err(LoadError::Unsupported { kind: AssetKind::Video });
        }
        match request.path() {
            Some(path) if !path.exists() => Err(LoadError::NotFound(path)),
            _ => Ok(()),
        }
    }
}

/// Compiles `rows` and writes the events in dispatch order as TSV
/// (`onset, condition, type, id`). Returns the number of events.
pub fn print_timeline<W: Write>(
    rows: &[ScriptRow],
    base_dir: &Path,
    timing: &TimingConfig,
    mut out: W,
) -> Result<usize> {
    let mut catalog = StimulusCatalog::new();
    let mut loader = CheckingLoader;
    let mut queue = TimelineCompiler::new(timing, base_dir, &mut catalog, &mut loader).compile(rows)?;

    writeln!(out, "onset\tcondition\ttype\tid")?;
    let mut count = 0;
    for event in queue.drain_ordered() {
        writeln!(
            out,
            "{}\t{}\t{}\t{}",
            event.onset_ms,
            event.condition,
            event.event_type(),
            event.id()
        )?;
        count += 1;
    }
    out.flush()?;
    Ok(count)
}
