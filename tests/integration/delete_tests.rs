use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use shadowwipe::actions::{TrashBackend, REASON_NOT_FOUND, REASON_NOT_IN_GROUP};
use shadowwipe::session::{Engine, SessionState};

use super::common::Tree;

/// Records trashed paths and removes them; paths under `pinned/` fail.
#[derive(Default)]
struct RecordingTrash {
    trashed: Mutex<Vec<PathBuf>>,
}

impl TrashBackend for RecordingTrash {
    fn move_to_trash(&self, path: &Path) -> Result<(), String> {
        if path.components().any(|c| c.as_os_str() == "pinned") {
            return Err("file is in use".to_string());
        }
        fs::remove_file(path).map_err(|e| e.to_string())?;
        self.trashed.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}

fn scanned_engine(tree: &Tree, backend: Arc<RecordingTrash>) -> Engine {
    let engine = Engine::default().with_backend(backend);
    engine.start_scan(tree.settings()).unwrap();
    assert_eq!(engine.wait(), SessionState::Complete);
    engine
}

#[test]
fn test_delete_partitions_request() {
    let tree = Tree::new();
    let keep = tree.file("keep.txt", b"duplicate body");
    let copy = tree.file("copy.txt", b"duplicate body");
    let pinned = tree.file("pinned/copy.txt", b"duplicate body");
    let loner = tree.file("loner.txt", b"nothing alike");
    let missing = tree.root.join("missing.txt");

    let backend = Arc::new(RecordingTrash::default());
    let engine = scanned_engine(&tree, backend.clone());
    assert_eq!(engine.duplicate_groups()[0].files.len(), 3);

    let request = vec![copy.clone(), pinned.clone(), loner.clone(), missing.clone()];
    let op = engine.delete_files(&request);

    assert_eq!(op.deleted_paths, vec![copy.clone()]);
    assert_eq!(op.bytes_freed, 14);
    assert_eq!(op.total_count(), request.len());
    assert!(!op.all_succeeded());

    let failed: Vec<(&Path, &str)> = op
        .failed_paths
        .iter()
        .map(|f| (f.path.as_path(), f.reason.as_str()))
        .collect();
    assert_eq!(
        failed,
        vec![
            (pinned.as_path(), "file is in use"),
            (loner.as_path(), REASON_NOT_IN_GROUP),
            (missing.as_path(), REASON_NOT_FOUND),
        ]
    );

    // Every requested path lands in exactly one bucket.
    let mut seen: HashSet<&Path> = op.deleted_paths.iter().map(PathBuf::as_path).collect();
    for (path, _) in &failed {
        assert!(seen.insert(path));
    }
    assert_eq!(seen.len(), request.len());

    assert!(keep.exists());
    assert!(!copy.exists());
    assert!(pinned.exists());
    assert!(loner.exists());
    assert_eq!(*backend.trashed.lock().unwrap(), vec![copy]);
}

#[test]
fn test_history_accumulates_in_order() {
    let tree = Tree::new();
    let a = tree.file("a.bin", &[3; 64]);
    let b = tree.file("b.bin", &[3; 64]);
    let c = tree.file("c.bin", &[3; 64]);

    let engine = scanned_engine(&tree, Arc::new(RecordingTrash::default()));
    let first = engine.delete_files(&[b.clone()]);
    let second = engine.delete_files(&[c.clone(), b.clone()]);

    let history = engine.operation_history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].id, first.id);
    assert_eq!(history[1].id, second.id);
    assert_ne!(first.id, second.id);
    assert!(history[0].timestamp <= history[1].timestamp);

    // The second request repeats a path that is already gone.
    assert_eq!(second.deleted_paths, vec![c]);
    assert_eq!(second.failed_paths[0].path, b);
    assert_eq!(second.failed_paths[0].reason, REASON_NOT_FOUND);
    assert!(a.exists());
}

#[test]
fn test_delete_without_results_skips_membership_check() {
    let tree = Tree::new();
    let lonely = tree.file("lonely.txt", b"only one of me");

    let engine = Engine::default().with_backend(Arc::new(RecordingTrash::default()));
    assert_eq!(engine.state(), SessionState::Idle);
    let op = engine.delete_files(&[lonely.clone()]);
    assert_eq!(op.deleted_paths, vec![lonely.clone()]);
    assert!(!lonely.exists());
}

#[test]
fn test_delete_operation_json_shape() {
    let tree = Tree::new();
    tree.file("x1", b"same same");
    let x2 = tree.file("x2", b"same same");

    let engine = scanned_engine(&tree, Arc::new(RecordingTrash::default()));
    let op = engine.delete_files(&[x2.clone()]);

    let mut out = Vec::new();
    shadowwipe::output::json::write_delete_operation(&op, &mut out).unwrap();
    let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(json["id"], op.id.as_str());
    assert_eq!(json["deletedPaths"][0], x2.to_string_lossy().as_ref());
    assert_eq!(json["bytesFreed"], 9);
    assert!(json["failedPaths"].as_array().unwrap().is_empty());
}
