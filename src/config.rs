//! Scan settings and their persistence.
//!
//! [`ScanSettings`] is the input to every scan. The [`SettingsStore`]
//! capability loads and saves it; [`JsonSettingsStore`] keeps a pretty
//! JSON file in the platform config directory and falls back to defaults
//! when the file is missing or unreadable.

use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::scanner::WalkerConfig;

/// Largest accepted similarity threshold (Hamming distance on 64 bits).
pub const MAX_SIMILARITY_THRESHOLD: u32 = 20;

/// Upper bound for the default hashing pool size.
pub const MAX_DEFAULT_IO_THREADS: usize = 8;

/// Directory names excluded by default.
pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &[
    ".git",
    ".svn",
    ".hg",
    "node_modules",
    "vendor",
    "__pycache__",
    ".DS_Store",
    "Thumbs.db",
];

/// Unit used when showing the minimum file size to a user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SizeUnit {
    /// Kibibytes
    #[default]
    #[serde(rename = "KB")]
    Kb,
    /// Mebibytes
    #[serde(rename = "MB")]
    Mb,
}

impl SizeUnit {
    /// Bytes per unit.
    #[must_use]
    pub fn bytes(self) -> u64 {
        match self {
            SizeUnit::Kb => 1024,
            SizeUnit::Mb => 1024 * 1024,
        }
    }
}

/// Settings for one scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// Directories to scan
    pub roots: Vec<PathBuf>,
    /// Files strictly smaller than this many bytes are ignored
    pub min_file_size: u64,
    /// Display unit for `min_file_size`
    pub min_file_size_unit: SizeUnit,
    /// Skip hidden files and prune hidden directories
    pub skip_hidden: bool,
    /// Directory names whose subtrees are pruned
    pub excluded_dir_names: BTreeSet<String>,
    /// Maximum Hamming distance for similar images; 0 disables matching
    pub similarity_threshold: u32,
    /// Hashing pool size; `None` picks one from the machine
    #[serde(skip_serializing_if = "Option::is_none")]
    pub io_threads: Option<usize>,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            min_file_size: 0,
            min_file_size_unit: SizeUnit::Kb,
            skip_hidden: true,
            excluded_dir_names: DEFAULT_EXCLUDED_DIRS.iter().map(|s| (*s).to_string()).collect(),
            similarity_threshold: 0,
            io_threads: None,
        }
    }
}

/// Reasons a [`ScanSettings`] value cannot start a scan.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    /// No roots were given.
    #[error("at least one directory to scan is required")]
    NoRoots,

    /// Threshold outside `0..=20`.
    #[error("similarity threshold {0} is out of range (0-{MAX_SIMILARITY_THRESHOLD})")]
    ThresholdOutOfRange(u32),

    /// A zero-sized thread pool was requested.
    #[error("io_threads must be at least 1")]
    ZeroThreads,
}

impl ScanSettings {
    /// Settings for the given roots with every other field at its default.
    #[must_use]
    pub fn with_roots(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            roots: roots.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Check that these settings can start a scan.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] describing the first problem found.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.roots.is_empty() {
            return Err(SettingsError::NoRoots);
        }
        if self.similarity_threshold > MAX_SIMILARITY_THRESHOLD {
            return Err(SettingsError::ThresholdOutOfRange(self.similarity_threshold));
        }
        if self.io_threads == Some(0) {
            return Err(SettingsError::ZeroThreads);
        }
        Ok(())
    }

    /// Walker filters derived from these settings.
    #[must_use]
    pub fn walker_config(&self) -> WalkerConfig {
        WalkerConfig {
            skip_hidden: self.skip_hidden,
            min_size: self.min_file_size,
            excluded_dir_names: self.excluded_dir_names.clone(),
        }
    }

    /// Threads for the partial and full hashing pools.
    #[must_use]
    pub fn effective_io_threads(&self) -> usize {
        self.io_threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map_or(4, std::num::NonZeroUsize::get)
                .min(MAX_DEFAULT_IO_THREADS)
        })
    }

    /// Threads for the perceptual pool (half the hashing pool, at least 1).
    #[must_use]
    pub fn effective_perceptual_threads(&self) -> usize {
        (self.effective_io_threads() / 2).max(1)
    }

    /// Whether perceptual matching runs at all.
    #[must_use]
    pub fn similarity_enabled(&self) -> bool {
        self.similarity_threshold > 0
    }

    /// Minimum size expressed in the display unit.
    #[must_use]
    pub fn min_file_size_display(&self) -> String {
        let unit = self.min_file_size_unit;
        let value = self.min_file_size as f64 / unit.bytes() as f64;
        let label = match unit {
            SizeUnit::Kb => "KB",
            SizeUnit::Mb => "MB",
        };
        format!("{value:.1} {label}")
    }
}

/// Load/save capability for settings.
pub trait SettingsStore: Send + Sync {
    /// Load settings, falling back to defaults on any problem.
    fn load(&self) -> ScanSettings;

    /// Persist settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings cannot be written.
    fn save(&self, settings: &ScanSettings) -> Result<()>;
}

/// Settings stored as pretty JSON on disk.
#[derive(Debug, Clone)]
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    /// Store at the default platform-specific path.
    ///
    /// # Errors
    ///
    /// Returns an error if no home/config directory can be determined.
    pub fn new() -> Result<Self> {
        let project_dirs = ProjectDirs::from("com", "shadowwipe", "shadowwipe")
            .ok_or_else(|| anyhow::anyhow!("Failed to determine project directories"))?;
        Ok(Self::at(project_dirs.config_dir().join("settings.json")))
    }

    /// Store at an explicit file path.
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The settings file location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_internal(&self) -> Result<ScanSettings> {
        if !self.path.exists() {
            return Ok(ScanSettings::default());
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

impl SettingsStore for JsonSettingsStore {
    fn load(&self) -> ScanSettings {
        match self.load_internal() {
            Ok(settings) => settings,
            Err(e) => {
                log::debug!(
                    "Failed to load settings from {}, using defaults: {}",
                    self.path.display(),
                    e
                );
                ScanSettings::default()
            }
        }
    }

    fn save(&self, settings: &ScanSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(settings)?;
        fs::write(&self.path, content)?;
        log::debug!("Saved settings to {}", self.path.display());
        Ok(())
    }
}
