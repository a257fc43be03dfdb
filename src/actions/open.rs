//! Handing a file to the desktop: open it with its default application,
//! or reveal it in the platform file manager.
//!
//! The launcher is spawned and not waited on; the file manager outlives
//! the CLI.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use thiserror::Error;

/// What to do with a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Open with the default application.
    Open,
    /// Show the containing folder, selecting the file where supported.
    Reveal,
}

/// Errors from [`open_path`].
#[derive(Debug, Error)]
pub enum OpenError {
    /// The path does not exist.
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The path exists but could not be resolved.
    #[error("I/O error for {}: {source}", path.display())]
    Io {
        /// Path being resolved
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// No launcher is known for this platform.
    #[error("opening files is not supported on this platform")]
    Unsupported,

    /// The launcher process could not be started.
    #[error("failed to launch {program}: {source}")]
    Launch {
        /// Launcher program name
        program: String,
        /// The spawn error
        #[source]
        source: io::Error,
    },
}

/// Build the launcher command for `path` on this platform.
///
/// `path` should be absolute; [`open_path`] canonicalizes before calling.
///
/// # Errors
///
/// Returns [`OpenError::Unsupported`] when the platform has no launcher.
pub fn launcher_command(path: &Path, mode: OpenMode) -> Result<Command, OpenError> {
    if cfg!(target_os = "macos") {
        let mut cmd = Command::new("open");
        if mode == OpenMode::Reveal {
            cmd.arg("-R");
        }
        cmd.arg(path);
        Ok(cmd)
    } else if cfg!(windows) {
        let mut cmd = match mode {
            OpenMode::Open => {
                let mut cmd = Command::new("cmd");
                cmd.args(["/c", "start", ""]);
                cmd
            }
            OpenMode::Reveal => {
                let mut cmd = Command::new("explorer");
                cmd.arg("/select,");
                cmd
            }
        };
        cmd.arg(path);
        Ok(cmd)
    } else if cfg!(unix) {
        // xdg-open cannot select a file, so reveal opens the parent folder.
        let target = match mode {
            OpenMode::Open => path,
            OpenMode::Reveal => path.parent().unwrap_or(path),
        };
        let mut cmd = Command::new("xdg-open");
        cmd.arg(target);
        Ok(cmd)
    } else {
        Err(OpenError::Unsupported)
    }
}

/// Open or reveal `path` with the desktop's handler.
///
/// # Errors
///
/// Returns [`OpenError`] if the path is missing or the launcher fails to
/// start. Failures inside the launched application are not reported.
pub fn open_path(path: &Path, mode: OpenMode) -> Result<(), OpenError> {
    let resolved = fs::canonicalize(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => OpenError::NotFound(path.to_path_buf()),
        _ => OpenError::Io {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    let mut cmd = launcher_command(&resolved, mode)?;
    log::debug!("Launching {cmd:?}");
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    cmd.spawn().map(drop).map_err(|source| OpenError::Launch {
        program: cmd.get_program().to_string_lossy().into_owned(),
        source,
    })
}
