use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crossbeam_channel::{Receiver, Sender};
use shadowwipe::config::ScanSettings;
use shadowwipe::progress::{ChannelSink, ProgressSink, ScanEvent, Stage};
use shadowwipe::session::{Engine, EngineError, SessionState};

use super::common::Tree;

fn abc_tree() -> Tree {
    let tree = Tree::new();
    tree.file("A", &[b'x'; 100]);
    tree.file("B", &[b'x'; 100]);
    tree.file("C", &[b'y'; 100]);
    tree
}

#[test]
fn test_event_stream_shape() {
    let tree = abc_tree();
    let (sink, rx) = ChannelSink::new();
    let engine = Engine::new(Arc::new(sink));

    engine.start_scan(tree.settings()).unwrap();
    assert_eq!(engine.wait(), SessionState::Complete);
    drop(engine);

    let events: Vec<ScanEvent> = rx.try_iter().collect();
    let terminal_at = events.iter().position(ScanEvent::is_terminal).unwrap();
    assert_eq!(terminal_at, events.len() - 1);
    assert_eq!(
        events[terminal_at],
        ScanEvent::Complete {
            duplicate_group_count: 1
        }
    );

    match &events[0] {
        ScanEvent::Progress(p) => {
            assert_eq!(p.stage, Stage::Walking);
            assert_eq!(p.total, 0);
        }
        other => panic!("expected progress, got {other:?}"),
    }

    // Stages appear in pipeline order and counts never exceed totals.
    let mut last_stage = 0;
    for event in &events[..terminal_at] {
        let ScanEvent::Progress(p) = event else {
            panic!("unexpected event {event:?}");
        };
        let index = Stage::ALL.iter().position(|s| *s == p.stage).unwrap();
        assert!(index >= last_stage);
        last_stage = index;
        if p.total > 0 {
            assert!(p.processed <= p.total);
        }
    }
}

/// Holds the scan thread on the first event of `stage` until released.
struct Gate {
    stage: Stage,
    entered: Sender<()>,
    release: Receiver<()>,
    passed: AtomicBool,
    events: Mutex<Vec<ScanEvent>>,
}

impl ProgressSink for Gate {
    fn emit(&self, event: ScanEvent) {
        let at_stage = matches!(&event, ScanEvent::Progress(p) if p.stage == self.stage);
        let hold = at_stage && !self.passed.swap(true, Ordering::SeqCst);
        self.events.lock().unwrap().push(event);
        if hold {
            self.entered.send(()).unwrap();
            self.release.recv().unwrap();
        }
    }
}

fn gate(stage: Stage) -> (Arc<Gate>, Receiver<()>, Sender<()>) {
    let (entered_tx, entered_rx) = crossbeam_channel::bounded(1);
    let (release_tx, release_rx) = crossbeam_channel::bounded(1);
    let gate = Arc::new(Gate {
        stage,
        entered: entered_tx,
        release: release_rx,
        passed: AtomicBool::new(false),
        events: Mutex::new(Vec::new()),
    });
    (gate, entered_rx, release_tx)
}

#[test]
fn test_cancel_during_hashing() {
    let tree = abc_tree();
    let (sink, entered, release) = gate(Stage::PartialHashing);
    let engine = Engine::new(sink.clone());

    engine.start_scan(tree.settings()).unwrap();
    entered.recv().unwrap();
    assert_eq!(engine.state(), SessionState::Scanning);
    engine.cancel_scan();
    release.send(()).unwrap();

    assert_eq!(engine.wait(), SessionState::Cancelled);
    assert!(engine.duplicate_groups().is_empty());
    assert!(engine.summary().is_none());

    let events = sink.events.lock().unwrap();
    assert_eq!(events.last(), Some(&ScanEvent::Cancelled));
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    // The held partial-hashing event is the last progress report.
    let held_at = events
        .iter()
        .position(|e| matches!(e, ScanEvent::Progress(p) if p.stage == Stage::PartialHashing))
        .unwrap();
    assert_eq!(held_at, events.len() - 2);
}

#[test]
fn test_second_start_is_rejected() {
    let tree = abc_tree();
    let (sink, entered, release) = gate(Stage::Walking);
    let engine = Engine::new(sink);

    engine.start_scan(tree.settings()).unwrap();
    entered.recv().unwrap();
    let err = engine.start_scan(tree.settings()).unwrap_err();
    assert!(matches!(err, EngineError::ScanAlreadyRunning));
    assert_eq!(err.to_string(), "scan already in progress");
    release.send(()).unwrap();

    assert_eq!(engine.wait(), SessionState::Complete);
    assert_eq!(engine.duplicate_groups().len(), 1);
}

#[test]
fn test_invalid_threshold_rejected() {
    let tree = abc_tree();
    let mut settings = tree.settings();
    settings.similarity_threshold = 21;
    let engine = Engine::default();
    assert!(matches!(
        engine.start_scan(settings),
        Err(EngineError::InvalidSettings(_))
    ));
    assert!(matches!(
        engine.start_scan(ScanSettings::default()),
        Err(EngineError::InvalidSettings(_))
    ));
    assert_eq!(engine.state(), SessionState::Idle);
}

#[test]
fn test_results_cleared_by_next_scan() {
    let tree = abc_tree();
    let engine = Engine::default();
    engine.start_scan(tree.settings()).unwrap();
    engine.wait();
    assert_eq!(engine.duplicate_groups().len(), 1);

    let empty = Tree::new();
    engine.start_scan(empty.settings()).unwrap();
    assert_eq!(engine.wait(), SessionState::Complete);
    assert!(engine.duplicate_groups().is_empty());
    assert_eq!(engine.summary().unwrap().total_files, 0);
}

#[test]
fn test_progress_snapshot_after_scan() {
    let tree = abc_tree();
    let engine = Engine::default();
    engine.start_scan(tree.settings()).unwrap();
    engine.wait();

    let progress = engine.progress().unwrap();
    assert_eq!(progress.stage, Stage::FullHashing);
    assert_eq!(progress.processed, progress.total);
}
