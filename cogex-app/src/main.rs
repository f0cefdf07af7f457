use std::io;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use cogex_experiment::{
    DispatchOutcome, Instructions, Session, is_instruction_script, media_dir, read_event_script,
    read_instruction_script,
};
use cogex_timing::HighPrecisionTimer;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

mod app;
mod audio;
mod cli;
mod dry_run;
mod output;
mod stimulus;

use app::WindowBackend;
use cli::{Cli, Commands, DisplayArgs, TimingArgs, session_config};
use output::{RunStatus, write_session_outputs};

const INSTRUCTION_SLICE: Duration = Duration::from_millis(1);

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("cogex localizer v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Run {
            script,
            subject,
            trigger_key,
            total_duration,
            output_dir,
            timing,
            display,
        } => run_session(
            &script,
            &subject,
            &trigger_key,
            total_duration,
            &output_dir,
            &timing,
            &display,
        ),
        Commands::Instructions {
            script,
            stim_dir,
            display,
        } => run_instructions(&script, &stim_dir, &display),
        Commands::Calibrate { stim_dir, display } => run_calibration(&stim_dir, &display),
        Commands::Timeline { script, timing } => {
            let rows = read_event_script(&script)?;
            let base_dir = script.parent().unwrap_or(Path::new(""));
            let events =
                dry_run::print_timeline(&rows, base_dir, &(&timing).into(), io::stdout().lock())?;
            info!(events, "timeline checked");
            Ok(())
        }
    }
}

fn run_session(
    script: &Path,
    subject: &str,
    trigger_key: &str,
    total_duration: i64,
    output_dir: &Path,
    timing: &TimingArgs,
    display: &DisplayArgs,
) -> Result<()> {
    let rows = read_event_script(script)?;
    let base_dir = script.parent().unwrap_or(Path::new(""));
    let script_name = script
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let config = session_config(subject, trigger_key, total_duration, timing);
    let display = display.to_config()?;

    let mut backend = WindowBackend::open(&display)?;
    let mut session = Session::prepare(config, &script_name, &rows, base_dir, &mut backend)
        .with_context(|| format!("preparing {}", script.display()))?;
    info!(
        subject,
        events = session.pending(),
        stimuli = session.stimuli_loaded(),
        "ready"
    );

    let started = Local::now();
    let mut clock = HighPrecisionTimer::new();
    let result = session.run(&mut backend, &mut clock);
    drop(backend);

    let status = match &result {
        Ok(DispatchOutcome::Completed) => RunStatus::Completed,
        Ok(DispatchOutcome::Interrupted) => RunStatus::Interrupted,
        Err(e) => {
            error!(error = %e, "session failed");
            RunStatus::Failed
        }
    };
    if status == RunStatus::Interrupted {
        warn!(pending = session.pending(), "session interrupted by the operator");
    }

    let files = write_session_outputs(
        output_dir,
        script,
        session.log(),
        status,
        session.config(),
        &display,
        &started,
    )?;
    info!(
        log = %files.log.display(),
        summary = %files.summary.display(),
        records = session.log().len(),
        "session log written"
    );

    result?;
    Ok(())
}

fn run_instructions(script: &Path, stim_dir: &str, display: &DisplayArgs) -> Result<()> {
    let mut backend = WindowBackend::open(&display.to_config()?)?;
    let instructions = if is_instruction_script(script) {
        let rows = read_instruction_script(script)?;
        Instructions::prepare(&rows, &media_dir(script, stim_dir), &mut backend)?
    } else {
        Instructions::splash(script, &mut backend)?
    };
    let clock = HighPrecisionTimer::new();
    instructions.run(&mut backend, &clock, INSTRUCTION_SLICE)?;
    Ok(())
}

fn run_calibration(stim_dir: &Path, display: &DisplayArgs) -> Result<()> {
    let mut backend = WindowBackend::open(&display.to_config()?)?;
    let calibration = Instructions::calibration(stim_dir, &mut backend)?;
    let clock = HighPrecisionTimer::new();
    calibration.run(&mut backend, &clock, INSTRUCTION_SLICE)?;
    Ok(())
}
