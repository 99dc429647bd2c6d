//! Command-line interface definitions for photoprune.
//!
//! Global options (verbosity, color, config file, index location) apply to
//! every subcommand. Values given here override the configuration file and
//! `PHOTOPRUNE_*` environment variables.
//!
//! # Example
//!
//! ```bash
//! # Fingerprint a photo folder
//! photoprune scan ~/Pictures
//!
//! # List duplicates as JSON, grouping across resolutions
//! photoprune detect ~/Pictures --output json --any-dimensions
//!
//! # Review March 2024 one photo at a time
//! photoprune triage ~/Pictures 2024-03
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Find near-identical photo bursts and prune a library month by month.
///
/// photoprune fingerprints every image with a perceptual hash, groups exact
/// hash matches taken close together in time, and estimates how much space
/// removing the extra copies would free.
#[derive(Debug, Parser)]
#[command(name = "photoprune")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Plain progress output for screen readers
    #[arg(long, global = true)]
    pub accessible: bool,

    /// Print errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Configuration file (default: config.toml in the platform config dir)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Fingerprint index location
    #[arg(long, global = true, value_name = "FILE")]
    pub index: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Fingerprint every photo and write the index
    Scan(ScanArgs),
    /// Report duplicate groups from the index
    Detect(DetectArgs),
    /// List review months
    Months(MonthsArgs),
    /// Review one month interactively
    Triage(TriageArgs),
    /// Delete specific photos
    Delete(DeleteArgs),
    /// Print the effective configuration as TOML
    Config,
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Photo library directory
    #[arg(value_name = "LIBRARY")]
    pub library: PathBuf,

    /// Hash every photo again instead of reusing unchanged fingerprints
    #[arg(long)]
    pub full: bool,

    /// Number of hashing threads
    #[arg(long, value_name = "N")]
    pub threads: Option<usize>,

    /// Allow fetching originals that are not stored locally
    #[arg(long)]
    pub allow_network: bool,
}

/// Arguments for the detect subcommand.
#[derive(Debug, Args)]
pub struct DetectArgs {
    /// Photo library directory
    #[arg(value_name = "LIBRARY")]
    pub library: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Group matching photos even when their resolutions differ
    #[arg(long)]
    pub any_dimensions: bool,

    /// Largest capture-time gap inside a group (e.g. 90, 90s, 5m, 1h)
    #[arg(long, value_name = "DURATION", value_parser = parse_duration_secs)]
    pub window: Option<u64>,
}

/// Arguments for the months subcommand.
#[derive(Debug, Args)]
pub struct MonthsArgs {
    /// Photo library directory
    #[arg(value_name = "LIBRARY")]
    pub library: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for the triage subcommand.
#[derive(Debug, Args)]
pub struct TriageArgs {
    /// Photo library directory
    #[arg(value_name = "LIBRARY")]
    pub library: PathBuf,

    /// Month to review, as listed by `photoprune months` (e.g. 2024-03)
    #[arg(value_name = "MONTH")]
    pub month: String,

    /// Use permanent deletion instead of moving to trash
    ///
    /// Warning: Files cannot be recovered after permanent deletion.
    #[arg(long)]
    pub permanent: bool,
}

/// Arguments for the delete subcommand.
#[derive(Debug, Args)]
pub struct DeleteArgs {
    /// Photo library directory
    #[arg(value_name = "LIBRARY")]
    pub library: PathBuf,

    /// Photo identifiers (paths relative to the library)
    #[arg(value_name = "ID", required = true)]
    pub ids: Vec<String>,

    /// Use permanent deletion instead of moving to trash
    ///
    /// Warning: Files cannot be recovered after permanent deletion.
    #[arg(long)]
    pub permanent: bool,

    /// Skip the confirmation prompt (required when stdin is not a terminal)
    #[arg(short = 'y', long)]
    pub yes: bool,
}

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary
    Text,
    /// JSON for scripting
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Parse a human-readable duration into whole seconds.
///
/// Supports suffixes: s, m, h (case-insensitive). Numbers without suffix are
/// seconds. Zero is rejected.
///
/// # Examples
///
/// ```
/// use photoprune::cli::parse_duration_secs;
///
/// assert_eq!(parse_duration_secs("90").unwrap(), 90);
/// assert_eq!(parse_duration_secs("5m").unwrap(), 300);
/// assert_eq!(parse_duration_secs("1.5h").unwrap(), 5400);
/// ```
///
/// # Errors
///
/// Returns an error if the string is empty, not a positive number, or has an
/// unknown suffix.
pub fn parse_duration_secs(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Duration cannot be empty".to_string());
    }

    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_lowercase()),
        None => (s, String::new()),
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    let multiplier: f64 = match suffix.as_str() {
        "" | "s" | "sec" => 1.0,
        "m" | "min" => 60.0,
        "h" => 3600.0,
        _ => return Err(format!("Unknown duration suffix: '{suffix}'")),
    };

    let seconds = (num * multiplier).round() as u64;
    if seconds == 0 {
        return Err("Duration must be at least one second".to_string());
    }
    Ok(seconds)
}
