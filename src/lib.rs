//! photoprune - duplicate photo detection and month-by-month triage
//!
//! Fingerprints a photo library with a 64-bit perceptual hash, groups exact
//! hash matches captured close together in time, estimates the storage that
//! removing the extra copies would free, and drives a keep/delete review of
//! the library one month at a time.

pub mod actions;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod engine;
pub mod error;
pub mod index;
pub mod library;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;
pub mod triage;

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Local;

use crate::actions::{DeleteConfig, TrashDeleter};
use crate::cli::{
    Cli, Commands, DeleteArgs, DetectArgs, MonthsArgs, OutputFormat, ScanArgs, TriageArgs,
};
use crate::config::Config;
use crate::duplicates::StorageEstimator;
use crate::engine::Engine;
use crate::error::ExitCode;
use crate::index::{AssetId, IndexStore};
use crate::library::FsLibrary;
use crate::output::{JsonOutput, TextOutput};
use crate::progress::{Progress, ProgressCallback};
use crate::signal::ShutdownHandler;

/// Settings shared by every subcommand.
struct Globals {
    quiet: bool,
    accessible: bool,
    text: TextOutput,
}

/// Run the command line application.
///
/// # Errors
///
/// Returns configuration, engine and I/O errors. Engine errors are returned
/// unwrapped so [`error::exit_code_for`] can classify them.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    let Cli {
        verbose,
        quiet,
        no_color,
        accessible,
        json_errors: _,
        config: config_file,
        index,
        command,
    } = cli;

    logging::init_logging(verbose, quiet);

    let mut config = Config::load(config_file.as_deref())?;
    if let Some(path) = index {
        config.index_path = Some(path);
    }

    let globals = Globals {
        quiet,
        accessible,
        text: TextOutput::new(!no_color && io::stdout().is_terminal()),
    };

    match command {
        Commands::Scan(args) => run_scan(&globals, config, args),
        Commands::Detect(args) => run_detect(&globals, config, args),
        Commands::Months(args) => run_months(&globals, &config, args),
        Commands::Triage(args) => run_triage_command(&config, args),
        Commands::Delete(args) => run_delete(&globals, &config, args),
        Commands::Config => {
            let mut stdout = io::stdout().lock();
            write!(stdout, "{}", config.to_toml()?)?;
            Ok(ExitCode::Success)
        }
    }
}

/// Wire the filesystem library, deleter and index store into an engine.
fn build_engine(
    config: &Config,
    library_root: &Path,
    delete_config: DeleteConfig,
) -> Result<(Engine, Arc<TrashDeleter>)> {
    let library = FsLibrary::new(library_root);
    let deleter = Arc::new(TrashDeleter::new(library.clone(), delete_config));
    let store = IndexStore::new(config.resolved_index_path()?);
    log::debug!(
        "Library {}, index {}",
        library_root.display(),
        store.path().display()
    );

    let engine = Engine::new(
        Arc::new(library.clone()),
        deleter.clone(),
        Arc::new(library),
        store,
    )
    .with_detector_config(config.detector_config())
    .with_estimator(StorageEstimator::new(config.jpeg_factor))
    .with_scan_config(config.scan_config())
    .with_thumbnail_size(config.thumbnail_size);
    Ok((engine, deleter))
}

fn run_scan(globals: &Globals, mut config: Config, args: ScanArgs) -> Result<ExitCode> {
    if args.full {
        config.reuse_existing = false;
    }
    if let Some(threads) = args.threads {
        config.scan_threads = threads;
    }
    if args.allow_network {
        config.allow_network_for_hashing = true;
    }
    config.validate()?;

    let (engine, _) = build_engine(&config, &args.library, DeleteConfig::trash())?;

    let handler = match signal::install_handler() {
        Ok(handler) => handler,
        Err(e) => {
            log::warn!("{}", e);
            ShutdownHandler::new()
        }
    };
    let progress: Arc<dyn ProgressCallback> =
        Arc::new(Progress::with_accessible(globals.quiet, globals.accessible));

    let outcome = engine.scan(Some(handler.get_flag()), Some(progress))?;
    if !globals.quiet {
        globals
            .text
            .write_scan_summary(&mut io::stdout().lock(), &outcome)?;
    }

    Ok(if outcome.cancelled {
        ExitCode::Interrupted
    } else if outcome.is_partial() {
        ExitCode::PartialSuccess
    } else {
        ExitCode::Success
    })
}

fn run_detect(globals: &Globals, mut config: Config, args: DetectArgs) -> Result<ExitCode> {
    if let Some(window) = args.window {
        config.creation_window_secs = window;
    }
    let (engine, _) = build_engine(&config, &args.library, DeleteConfig::trash())?;

    let require_same_dimensions = args.any_dimensions.then_some(false);
    let report = engine.detect(require_same_dimensions)?;
    let code = if report.is_empty() {
        ExitCode::NoDuplicates
    } else {
        ExitCode::Success
    };

    let mut stdout = io::stdout().lock();
    match args.output {
        OutputFormat::Json => JsonOutput::new(&report, code).write_to(&mut stdout, true)?,
        OutputFormat::Text => globals.text.write_detection_report(&mut stdout, &report)?,
    }
    Ok(code)
}

fn run_months(globals: &Globals, config: &Config, args: MonthsArgs) -> Result<ExitCode> {
    let (engine, _) = build_engine(config, &args.library, DeleteConfig::trash())?;
    let catalog = engine.months(&Local)?;
    let summaries = catalog.summaries();

    let mut stdout = io::stdout().lock();
    match args.output {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut stdout, &summaries)?;
            writeln!(stdout)?;
        }
        OutputFormat::Text => globals.text.write_months(&mut stdout, &summaries)?,
    }
    Ok(ExitCode::Success)
}

fn run_triage_command(config: &Config, args: TriageArgs) -> Result<ExitCode> {
    let delete_config = if args.permanent {
        DeleteConfig::permanent()
    } else {
        DeleteConfig::trash()
    };
    let (engine, deleter) = build_engine(config, &args.library, delete_config)?;
    let catalog = engine.months(&Local)?;

    let Some(mut session) = engine.triage_session(&catalog, &args.month) else {
        bail!(
            "no photos in month '{}'; run `photoprune months` to list months",
            args.month
        );
    };

    let report = triage::run_triage(
        &mut session,
        deleter.as_ref(),
        io::stdin().lock(),
        &mut io::stdout().lock(),
    )?;
    log::info!(
        "Triage of {} finished: {} decisions, {} deleted, {} pending",
        args.month,
        report.decisions,
        report.deleted,
        report.pending
    );
    Ok(ExitCode::Success)
}

fn run_delete(globals: &Globals, config: &Config, args: DeleteArgs) -> Result<ExitCode> {
    let delete_config = if args.permanent {
        DeleteConfig::permanent()
    } else {
        DeleteConfig::trash()
    };
    let (engine, _) = build_engine(config, &args.library, delete_config)?;
    let ids: Vec<AssetId> = args.ids.iter().map(AssetId::new).collect();

    if !args.yes {
        if !io::stdin().is_terminal() {
            bail!("refusing to delete without confirmation; pass --yes to skip the prompt");
        }
        let verb = if args.permanent {
            "Permanently delete"
        } else {
            "Move to trash"
        };
        let question = format!("{} {} photo(s)? [y/N] ", verb, ids.len());
        if !confirm(&question, io::stdin().lock(), &mut io::stderr())? {
            eprintln!("Cancelled.");
            return Ok(ExitCode::Success);
        }
    }

    let count = engine.delete_assets(&ids)?;
    if !globals.quiet {
        println!("Deleted {} photos.", count);
    }
    Ok(ExitCode::Success)
}

/// Ask a yes/no question; anything but `y` or `yes` is a no.
fn confirm<R: BufRead, W: Write>(question: &str, mut input: R, output: &mut W) -> Result<bool> {
    write!(output, "{}", question)?;
    output.flush()?;
    let mut answer = String::new();
    input
        .read_line(&mut answer)
        .context("failed to read confirmation")?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}
