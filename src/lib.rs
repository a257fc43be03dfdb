//! ShadowWipe - duplicate and similar-image finder
//!
//! Finds byte-identical files (size, then a partial BLAKE3 fingerprint, then
//! a full BLAKE3 hash) and visually similar images (64-bit perceptual hash,
//! clustered by Hamming distance), and moves unwanted copies to the system
//! trash.
//!
//! The library surface is [`session::Engine`]; the `shadowwipe` binary is a
//! thin CLI over it.

pub mod actions;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod session;
pub mod signal;
pub mod thumbnail;

use std::io::{self, IsTerminal, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossbeam_channel::RecvTimeoutError;

use crate::actions::{open_path, DeleteExecutor, OpenMode, SystemTrash};
use crate::cli::{Cli, Commands, DeleteArgs, OpenArgs, OutputFormat, ScanArgs, SettingsArgs};
use crate::config::{JsonSettingsStore, ScanSettings, SettingsStore};
use crate::duplicates::FinderError;
use crate::error::ExitCode;
use crate::output::{JsonOutput, TextOutput};
use crate::progress::{ChannelSink, Progress, ProgressSink};
use crate::session::{Engine, SessionState};

/// How often the CLI checks for Ctrl+C while waiting for scan events.
const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Run the parsed command line.
///
/// # Errors
///
/// Returns an error for invalid settings, engine faults, I/O failures,
/// and [`FinderError::Interrupted`] when the scan was cancelled.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);
    if cli.no_color || !io::stdout().is_terminal() {
        yansi::disable();
    }

    let store = match &cli.settings_file {
        Some(path) => JsonSettingsStore::at(path),
        None => JsonSettingsStore::new()?,
    };
    log::debug!("Settings file: {}", store.path().display());

    match &cli.command {
        Commands::Scan(args) => run_scan(args, &store, cli.quiet),
        Commands::Delete(args) => run_delete(args),
        Commands::Open(args) => run_open(args),
        Commands::Settings(args) => run_settings(args, &store),
    }
}

fn run_scan(args: &ScanArgs, store: &dyn SettingsStore, quiet: bool) -> Result<ExitCode> {
    let settings = args.apply_to(store.load());
    settings.validate().context("Invalid scan settings")?;
    if args.save_settings {
        store.save(&settings).context("Failed to save settings")?;
    }

    let interrupt = signal::install_handler();
    let (sink, events) = ChannelSink::new();
    let engine = Engine::new(Arc::new(sink));
    let bars = Progress::new(quiet || args.output == OutputFormat::Json);

    engine.start_scan(settings)?;
    loop {
        match events.recv_timeout(EVENT_POLL_INTERVAL) {
            Ok(event) => {
                let terminal = event.is_terminal();
                bars.emit(event);
                if terminal {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        if interrupt.is_cancelled() {
            engine.cancel_scan();
        }
    }

    match engine.wait() {
        SessionState::Complete => {}
        SessionState::Cancelled => return Err(FinderError::Interrupted.into()),
        state => {
            let message = engine
                .last_error()
                .unwrap_or_else(|| format!("scan ended in state {state}"));
            anyhow::bail!("Scan failed: {message}");
        }
    }

    let groups = engine.duplicate_groups();
    let summary = engine.summary().unwrap_or_default();
    let exit_code = if groups.is_empty() {
        ExitCode::NoDuplicates
    } else {
        ExitCode::Success
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match args.output {
        OutputFormat::Json => JsonOutput::new(&groups, &summary, exit_code)
            .write_to(&mut out, true)
            .context("Failed to write JSON output")?,
        OutputFormat::Text => {
            if !quiet {
                TextOutput::new(&groups, &summary)
                    .write_to(&mut out)
                    .context("Failed to write report")?;
            }
        }
    }
    out.flush()?;
    Ok(exit_code)
}

fn run_delete(args: &DeleteArgs) -> Result<ExitCode> {
    let op = DeleteExecutor::new(Arc::new(SystemTrash)).execute(&args.paths);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match args.output {
        OutputFormat::Json => output::json::write_delete_operation(&op, &mut out)
            .context("Failed to write JSON output")?,
        OutputFormat::Text => output::text::write_delete_operation(&mut out, &op)
            .context("Failed to write report")?,
    }
    out.flush()?;

    Ok(if op.all_succeeded() {
        ExitCode::Success
    } else {
        ExitCode::PartialSuccess
    })
}

fn run_open(args: &OpenArgs) -> Result<ExitCode> {
    let mode = if args.reveal {
        OpenMode::Reveal
    } else {
        OpenMode::Open
    };
    open_path(&args.path, mode)?;
    Ok(ExitCode::Success)
}

fn run_settings(args: &SettingsArgs, store: &dyn SettingsStore) -> Result<ExitCode> {
    let settings = if args.reset {
        let defaults = ScanSettings::default();
        store.save(&defaults).context("Failed to reset settings")?;
        log::info!("Settings reset to defaults");
        defaults
    } else {
        store.load()
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, &settings)?;
    writeln!(out)?;
    Ok(ExitCode::Success)
}
