//! File actions module.
//!
//! Deletion always goes through a [`TrashBackend`](delete::TrashBackend),
//! so every removal is recoverable from the platform trash. [`open_path`]
//! hands a file to the desktop's default application or file manager.
//!
//! ```no_run
//! use shadowwipe::actions::{DeleteExecutor, SystemTrash};
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! let executor = DeleteExecutor::new(Arc::new(SystemTrash));
//! let op = executor.execute(&[PathBuf::from("/path/to/duplicate.txt")]);
//! println!("{}", op.summary());
//! ```

pub mod delete;
pub mod open;

pub use delete::{
    DeleteError, DeleteExecutor, DeleteOperation, FailedPath, SystemTrash, TrashBackend,
    REASON_NOT_A_FILE, REASON_NOT_FOUND, REASON_NOT_IN_GROUP,
};
pub use open::{open_path, OpenError, OpenMode};
