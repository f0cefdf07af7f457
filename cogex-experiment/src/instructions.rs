//! Pre-run screens: instruction scripts, the single-picture splash, and
//! the sound calibration check.

use std::path::{Path, PathBuf};
use std::time::Duration;

use cogex_cache::StimulusCatalog;
use cogex_core::{
    AssetKind, AssetRequest, InstructionKind, InstructionRow, KeySource, Presenter, StimulusLoader,
    StimulusRef,
};
use cogex_timing::Clock;
use tracing::{debug, info};

use crate::dispatch::{wait_for_key, wait_until, Flow};
use crate::error::{SessionResult, SetupError, SetupResult};

pub const CALIBRATION_MESSAGE: &str = "Calibration: we are going to play a sound";
pub const CALIBRATION_SOUND: &str = "ph10.wav";
pub const SPLASH_KEY: &str = " ";

/// How long a step stays up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hold {
    For(u64),
    UntilKey(String),
}

#[derive(Debug, Clone)]
struct Step<H> {
    stimulus: H,
    /// Cover the screen with the fixation cross once presented (sounds)
    then_fixation: bool,
    hold: Hold,
}

/// A preloaded sequence of screens shown before the acquisition starts
#[derive(Debug, Clone)]
pub struct Instructions<H> {
    steps: Vec<Step<H>>,
}

/// Directory holding instruction media: `<instruction dir>/<stim_dir>`, or
/// the instruction dir alone when `stim_dir` is empty
pub fn media_dir(instruction_script: &Path, stim_dir: &str) -> PathBuf {
    let base = instruction_script.parent().unwrap_or(Path::new(""));
    if stim_dir.is_empty() {
        base.to_path_buf()
    } else {
        base.join(stim_dir)
    }
}

/// Splash fallback: anything that is not a `.csv` file is a picture
pub fn is_instruction_script(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

impl<H: Clone> Instructions<H> {
    /// Loads every row of an instruction script. Sound and picture rows
    /// resolve against `media_dir`.
    pub fn prepare<L>(rows: &[InstructionRow], media_dir: &Path, loader: &mut L) -> SetupResult<Self>
    where
        L: StimulusLoader<Handle = H>,
    {
        let mut catalog = StimulusCatalog::new();
        let mut steps = Vec::with_capacity(rows.len());
        for row in rows {
            let (kind, key) = match row.kind {
                InstructionKind::Box => (AssetKind::TextBox, row.content.clone()),
                InstructionKind::Text => (AssetKind::Text, row.content.clone()),
                InstructionKind::Sound => (AssetKind::Sound, file_key(media_dir, &row.content)),
                InstructionKind::Pict => (AssetKind::Picture, file_key(media_dir, &row.content)),
            };
            let stimulus = catalog
                .resolve_and_load(loader, &AssetRequest::new(kind, key))
                .map_err(|source| SetupError::Stimulus {
                    line: row.line,
                    source,
                })?;
            steps.push(Step {
                stimulus,
                then_fixation: row.kind == InstructionKind::Sound,
                hold: Hold::For(row.duration_ms),
            });
        }
        debug!(steps = steps.len(), stimuli = catalog.len(), "instructions prepared");
        Ok(Self { steps })
    }

    /// A single picture held until the space bar
    pub fn splash<L>(picture: &Path, loader: &mut L) -> SetupResult<Self>
    where
        L: StimulusLoader<Handle = H>,
    {
        let request = AssetRequest::new(AssetKind::Picture, picture.to_string_lossy());
        let stimulus = loader
            .load(&request)
            .map_err(|source| SetupError::Builtin {
                what: "splash picture",
                source,
            })?;
        Ok(Self {
            steps: vec![Step {
                stimulus,
                then_fixation: false,
                hold: Hold::UntilKey(SPLASH_KEY.to_string()),
            }],
        })
    }

    /// Announcement for 1.5 s, then the calibration sound under the
    /// fixation cross for 2.1 s
    pub fn calibration<L>(stim_dir: &Path, loader: &mut L) -> SetupResult<Self>
    where
        L: StimulusLoader<Handle = H>,
    {
        let message = loader
            .load(&AssetRequest::text(CALIBRATION_MESSAGE))
            .map_err(|source| SetupError::Builtin {
                what: "calibration message",
                source,
            })?;
        let sound = loader
            .load(&AssetRequest::new(
                AssetKind::Sound,
                file_key(stim_dir, CALIBRATION_SOUND),
            ))
            .map_err(|source| SetupError::Builtin {
                what: "calibration sound",
                source,
            })?;
        Ok(Self {
            steps: vec![
                Step {
                    stimulus: message,
                    then_fixation: false,
                    hold: Hold::For(1500),
                },
                Step {
                    stimulus: sound,
                    then_fixation: true,
                    hold: Hold::For(2100),
                },
            ],
        })
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Shows every step in order. Key presses are ignored apart from the
    /// ones a step waits for; an abort stops early.
    pub fn run<B, C>(&self, backend: &mut B, clock: &C, slice: Duration) -> SessionResult<Flow>
    where
        B: Presenter<H> + KeySource,
        C: Clock,
    {
        info!(steps = self.steps.len(), "showing instructions");
        for step in &self.steps {
            backend.present(StimulusRef::Asset(&step.stimulus))?;
            if step.then_fixation {
                backend.present(StimulusRef::<H>::FixationCross)?;
            }
            let flow = match &step.hold {
                Hold::For(ms) => {
                    let until = clock.now_ms() + ms;
                    wait_until(backend, clock, until, slice, |_, _| {})
                }
                Hold::UntilKey(key) => wait_for_key(backend, clock, key, slice),
            };
            if flow == Flow::Abort {
                info!("instructions aborted");
                return Ok(Flow::Abort);
            }
        }
        Ok(Flow::Continue)
    }
}

fn file_key(dir: &Path, name: &str) -> String {
    dir.join(name).to_string_lossy().into_owned()
}
