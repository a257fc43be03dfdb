//! Scan sessions and the engine that drives them.
//!
//! # Architecture
//!
//! * [`state`]: the `idle → scanning → complete | error | cancelled` lifecycle.
//! * [`engine`]: the command surface (start, cancel, results, delete,
//!   thumbnails) guarding a single active session.

pub mod engine;
pub mod state;

pub use engine::{Engine, EngineError};
pub use state::SessionState;
