//! Command-line interface definitions for ShadowWipe.
//!
//! Options left out on the command line fall back to the stored settings
//! (see [`crate::config::JsonSettingsStore`]).
//!
//! # Example
//!
//! ```bash
//! # Exact duplicates under two trees
//! shadowwipe scan ~/Pictures ~/Backup/Pictures
//!
//! # Also match re-encoded or resized photos, JSON for scripting
//! shadowwipe scan ~/Pictures --similarity 8 --output json
//!
//! # Move files to the trash
//! shadowwipe delete ~/Backup/Pictures/IMG_0001.jpg
//!
//! # Show a duplicate in the file manager
//! shadowwipe open --reveal ~/Backup/Pictures/IMG_0001.jpg
//!
//! # Show stored settings
//! shadowwipe settings
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::{ScanSettings, SizeUnit, MAX_SIMILARITY_THRESHOLD};

/// Duplicate and similar-image finder with recoverable deletion.
///
/// ShadowWipe groups byte-identical files (BLAKE3) and visually similar
/// images (perceptual hash), and moves unwanted copies to the system trash.
#[derive(Debug, Parser)]
#[command(name = "shadowwipe")]
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

    /// Print errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Settings file to use instead of the platform default
    #[arg(long, global = true, value_name = "FILE", env = "SHADOWWIPE_SETTINGS")]
    pub settings_file: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan directories for duplicate files and similar images
    Scan(ScanArgs),
    /// Move files to the system trash
    Delete(DeleteArgs),
    /// Open a file with its default application
    Open(OpenArgs),
    /// Show or reset the stored settings
    Settings(SettingsArgs),
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Directories to scan
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Minimum file size to consider (e.g., 1KB, 1MB, 1GiB)
    ///
    /// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub min_size: Option<u64>,

    /// Skip hidden files and directories
    #[arg(long, conflicts_with = "include_hidden")]
    pub skip_hidden: bool,

    /// Include hidden files and directories
    #[arg(long)]
    pub include_hidden: bool,

    /// Directory names to exclude (can be specified multiple times)
    ///
    /// Added to the stored exclusion list.
    #[arg(short = 'x', long = "exclude", value_name = "NAME")]
    pub exclude: Vec<String>,

    /// Maximum Hamming distance for similar images (0 disables)
    #[arg(
        short,
        long,
        value_name = "N",
        value_parser = clap::value_parser!(u32).range(0..=i64::from(MAX_SIMILARITY_THRESHOLD))
    )]
    pub similarity: Option<u32>,

    /// Number of hashing threads
    #[arg(
        long,
        value_name = "N",
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub io_threads: Option<usize>,

    /// Store the effective settings for later runs
    #[arg(long)]
    pub save_settings: bool,
}

impl ScanArgs {
    /// Overlay these arguments on stored settings.
    #[must_use]
    pub fn apply_to(&self, mut settings: ScanSettings) -> ScanSettings {
        settings.roots.clone_from(&self.paths);
        if let Some(min_size) = self.min_size {
            settings.min_file_size = min_size;
            settings.min_file_size_unit = if min_size >= SizeUnit::Mb.bytes() {
                SizeUnit::Mb
            } else {
                SizeUnit::Kb
            };
        }
        if self.skip_hidden {
            settings.skip_hidden = true;
        }
        if self.include_hidden {
            settings.skip_hidden = false;
        }
        settings
            .excluded_dir_names
            .extend(self.exclude.iter().cloned());
        if let Some(threshold) = self.similarity {
            settings.similarity_threshold = threshold;
        }
        if self.io_threads.is_some() {
            settings.io_threads = self.io_threads;
        }
        settings
    }
}

/// Arguments for the delete subcommand.
#[derive(Debug, Args)]
pub struct DeleteArgs {
    /// Files to move to the trash
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for the open subcommand.
#[derive(Debug, Args)]
pub struct OpenArgs {
    /// File to open
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Show the file in the file manager instead of opening it
    #[arg(long)]
    pub reveal: bool,
}

/// Arguments for the settings subcommand.
#[derive(Debug, Args)]
pub struct SettingsArgs {
    /// Overwrite the stored settings with defaults
    #[arg(long)]
    pub reset: bool,
}

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable report
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

/// Parse a human-readable size string into bytes.
///
/// Suffixes are case-insensitive; a bare number is bytes.
///
/// ```
/// use shadowwipe::cli::parse_size;
///
/// assert_eq!(parse_size("1024").unwrap(), 1024);
/// assert_eq!(parse_size("1KB").unwrap(), 1000);
/// assert_eq!(parse_size("1KiB").unwrap(), 1024);
/// ```
///
/// # Errors
///
/// Returns an error if the string is empty, contains an invalid number,
/// a negative number, or an unknown size suffix.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }
    if s.starts_with('-') {
        return Err("Size cannot be negative".to_string());
    }

    let split = s
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(s.len());
    let (num_str, suffix) = (&s[..split], s[split..].trim().to_ascii_uppercase());

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1_000,
        "KIB" => 1 << 10,
        "MB" | "M" => 1_000_000,
        "MIB" => 1 << 20,
        "GB" | "G" => 1_000_000_000,
        "GIB" => 1 << 30,
        "TB" | "T" => 1_000_000_000_000,
        "TIB" => 1 << 40,
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    Ok((num * multiplier as f64) as u64)
}
