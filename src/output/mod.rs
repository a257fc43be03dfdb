//! Output formatters for scan results and delete operations.
//!
//! - [`text`]: colored terminal report
//! - [`json`]: machine-readable output for scripting
//!
//! # Example
//!
//! ```no_run
//! use shadowwipe::config::ScanSettings;
//! use shadowwipe::duplicates::{DuplicateFinder, FinderConfig};
//! use shadowwipe::error::ExitCode;
//! use shadowwipe::output::JsonOutput;
//! use std::path::PathBuf;
//!
//! let settings = ScanSettings::with_roots([PathBuf::from(".")]);
//! let finder = DuplicateFinder::new(FinderConfig::from_settings(&settings));
//! let (groups, summary) = finder.find_duplicates(&settings.roots).unwrap();
//!
//! let output = JsonOutput::new(&groups, &summary, ExitCode::Success);
//! println!("{}", output.to_json_pretty().unwrap());
//! ```

pub mod json;
pub mod text;

pub use json::{JsonOutput, JsonOutputError, JsonSummary};
pub use text::TextOutput;
