use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use cogex_experiment::{DispatchConfig, SessionConfig, TimingConfig};
use cogex_render::{DisplayConfig, Rgb};

/// Timed stimulus presentation for functional localizer acquisitions
#[derive(Parser, Debug)]
#[command(name = "cogex-localizer")]
#[command(author, version, long_about = None)]
pub struct Cli {
    /// Logging verbosity level
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one acquisition session from an event script
    Run {
        /// Tab-separated event script (condition, onset, type, payload)
        script: PathBuf,

        /// Subject identifier written to every log row
        #[arg(long, env = "SUBJECT")]
        subject: String,

        /// Key standing in for the scanner trigger
        #[arg(long, default_value = "t")]
        trigger_key: String,

        /// Keep the session open until this time (ms), -1 to stop after
        /// the last event
        #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
        total_duration: i64,

        /// Directory for the CSV log and JSON summary
        #[arg(long, default_value = "data")]
        output_dir: PathBuf,

        #[command(flatten)]
        timing: TimingArgs,

        #[command(flatten)]
        display: DisplayArgs,
    },

    /// Show an instruction script, or a single splash picture held until space
    Instructions {
        /// `.csv` instruction script (duration, type, content) or a picture
        script: PathBuf,

        /// Instruction media directory, relative to the script
        #[arg(long, default_value = "STIM_DIR")]
        stim_dir: String,

        #[command(flatten)]
        display: DisplayArgs,
    },

    /// Announce and play the calibration sound
    Calibrate {
        /// Directory holding ph10.wav
        #[arg(long, default_value = "STIM_DIR")]
        stim_dir: PathBuf,

        #[command(flatten)]
        display: DisplayArgs,
    },

    /// Print the compiled timeline of a script without opening a window
    Timeline {
        script: PathBuf,

        #[command(flatten)]
        timing: TimingArgs,
    },
}

#[derive(Args, Debug, Clone)]
pub struct TimingArgs {
    /// Display time of each rsvp word (ms)
    #[arg(long, default_value_t = 450)]
    pub rsvp_display_time: u64,

    /// Blank between rsvp words (ms)
    #[arg(long, default_value_t = 200)]
    pub rsvp_display_isi: u64,

    /// Display time of pictures (ms)
    #[arg(long, default_value_t = 1000)]
    pub picture_display_time: u64,

    /// Blank between pictures of a pictseq (ms)
    #[arg(long, default_value_t = 0)]
    pub picture_isi: u64,

    /// Display time of text stimuli (ms)
    #[arg(long, default_value_t = 3000)]
    pub text_duration: u64,

    /// Delay between the end of a sequence and its fixation cross (ms)
    #[arg(long, alias = "fs_delay_time", default_value_t = 100)]
    pub fs_delay_time: u64,
}

impl From<&TimingArgs> for TimingConfig {
    fn from(args: &TimingArgs) -> Self {
        TimingConfig {
            word_duration_ms: args.rsvp_display_time,
            word_isi_ms: args.rsvp_display_isi,
            picture_duration_ms: args.picture_display_time,
            picture_isi_ms: args.picture_isi,
            text_duration_ms: args.text_duration,
            fs_delay_ms: args.fs_delay_time,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct DisplayArgs {
    #[arg(long, num_args = 3, value_names = ["R", "G", "B"], default_values_t = [240u8, 240, 240])]
    pub background_color: Vec<u8>,

    #[arg(long, num_args = 3, value_names = ["R", "G", "B"], default_values_t = [0u8, 0, 0])]
    pub text_color: Vec<u8>,

    /// Font file name, looked up in --font-dir
    #[arg(long, default_value = "ARIALN.TTF")]
    pub text_font: String,

    #[arg(long, default_value = "fonts")]
    pub font_dir: PathBuf,

    /// Text height (px)
    #[arg(long, default_value_t = 48)]
    pub text_size: u32,

    /// Use a window instead of fullscreen
    #[arg(long)]
    pub window_mode: bool,

    /// Window size in window mode
    #[arg(long, num_args = 2, value_names = ["W", "H"], default_values_t = [1220u32, 700])]
    pub window_size: Vec<u32>,

    /// Monitor index for fullscreen
    #[arg(long, env = "EXPYRIMENT_DISPLAY")]
    pub display: Option<usize>,

    /// Fullscreen resolution, e.g. 1920x1080
    #[arg(long, env = "EXPYRIMENT_DISPLAY_RESOLUTION", value_parser = parse_resolution)]
    pub resolution: Option<(u32, u32)>,
}

impl DisplayArgs {
    pub fn to_config(&self) -> Result<DisplayConfig> {
        Ok(DisplayConfig {
            background: rgb(&self.background_color, "--background-color")?,
            text_color: rgb(&self.text_color, "--text-color")?,
            font_path: self.font_dir.join(&self.text_font),
            text_size: self.text_size as f32,
            window_mode: self.window_mode,
            window_size: match self.window_size[..] {
                [w, h] => (w, h),
                _ => bail!("--window-size takes a width and a height"),
            },
            display: self.display,
            resolution: self.resolution,
        })
    }
}

fn rgb(values: &[u8], flag: &str) -> Result<Rgb> {
    match values {
        [r, g, b] => Ok(Rgb(*r, *g, *b)),
        _ => bail!("{flag} takes three values (R G B)"),
    }
}

fn parse_resolution(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s:?}"))?;
    let parse = |v: &str| v.trim().parse::<u32>().map_err(|e| format!("{v:?}: {e}"));
    Ok((parse(w)?, parse(h)?))
}

/// Session settings from the `run` arguments
pub fn session_config(
    subject: &str,
    trigger_key: &str,
    total_duration: i64,
    timing: &TimingArgs,
) -> SessionConfig {
    SessionConfig {
        subject: subject.to_string(),
        // the window reports keys lowercased
        trigger_key: trigger_key.to_lowercase(),
        timing: timing.into(),
        dispatch: DispatchConfig::default().with_total_duration(total_duration),
        ..SessionConfig::default()
    }
}
