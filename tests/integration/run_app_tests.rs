use std::path::Path;

use clap::Parser;
use shadowwipe::cli::Cli;
use shadowwipe::config::{JsonSettingsStore, ScanSettings, SettingsStore};
use shadowwipe::error::ExitCode;
use shadowwipe::run_app;

use super::common::Tree;

fn cli(settings_file: &Path, rest: &[&str]) -> Cli {
    let settings_file = settings_file.to_string_lossy().into_owned();
    let mut args = vec!["shadowwipe", "-q", "--no-color", "--settings-file", &settings_file];
    args.extend_from_slice(rest);
    Cli::try_parse_from(args).unwrap()
}

#[test]
fn test_scan_exit_codes() {
    let tree = Tree::new();
    let settings_file = tree.root.join("settings.json");
    let root = tree.root.join("data");
    tree.file("data/a.txt", b"unique a");
    tree.file("data/b.txt", b"unique b");
    let root_arg = root.to_string_lossy().into_owned();

    let code = run_app(cli(&settings_file, &["scan", &root_arg])).unwrap();
    assert_eq!(code, ExitCode::NoDuplicates);

    tree.file("data/c.txt", b"unique a");
    let code = run_app(cli(&settings_file, &["scan", &root_arg, "-o", "json"])).unwrap();
    assert_eq!(code, ExitCode::Success);
}

#[test]
fn test_scan_save_settings() {
    let tree = Tree::new();
    let settings_file = tree.root.join("cfg").join("settings.json");
    tree.file("data/a.txt", b"x");
    let root_arg = tree.root.join("data").to_string_lossy().into_owned();

    run_app(cli(
        &settings_file,
        &["scan", &root_arg, "--similarity", "9", "--save-settings"],
    ))
    .unwrap();

    let stored = JsonSettingsStore::at(&settings_file).load();
    assert_eq!(stored.similarity_threshold, 9);
    assert_eq!(stored.roots, vec![tree.root.join("data")]);
}

#[test]
fn test_settings_reset() {
    let tree = Tree::new();
    let settings_file = tree.root.join("settings.json");
    let store = JsonSettingsStore::at(&settings_file);
    let mut custom = ScanSettings::default();
    custom.similarity_threshold = 15;
    store.save(&custom).unwrap();

    assert_eq!(
        run_app(cli(&settings_file, &["settings"])).unwrap(),
        ExitCode::Success
    );
    assert_eq!(store.load().similarity_threshold, 15);

    assert_eq!(
        run_app(cli(&settings_file, &["settings", "--reset"])).unwrap(),
        ExitCode::Success
    );
    assert_eq!(store.load(), ScanSettings::default());
}

#[test]
fn test_stored_invalid_threshold_is_an_error() {
    let tree = Tree::new();
    let settings_file = tree.root.join("settings.json");
    std::fs::write(&settings_file, r#"{"similarity_threshold": 40}"#).unwrap();
    let root_arg = tree.root.to_string_lossy().into_owned();

    let err = run_app(cli(&settings_file, &["scan", &root_arg])).unwrap_err();
    assert!(format!("{err:#}").contains("out of range"));
}

#[test]
fn test_delete_missing_file_is_partial() {
    let tree = Tree::new();
    let settings_file = tree.root.join("settings.json");
    // Only a missing path, so nothing reaches the real trash.
    let missing = tree.root.join("not-here.txt").to_string_lossy().into_owned();

    let code = run_app(cli(&settings_file, &["delete", &missing, "-o", "json"])).unwrap();
    assert_eq!(code, ExitCode::PartialSuccess);
    assert_eq!(code.as_i32(), 3);
}

#[test]
fn test_open_missing_file_is_an_error() {
    let tree = Tree::new();
    let settings_file = tree.root.join("settings.json");
    let missing = tree.root.join("gone.jpg").to_string_lossy().into_owned();

    for rest in [vec!["open", missing.as_str()], vec!["open", "--reveal", missing.as_str()]] {
        let err = run_app(cli(&settings_file, &rest)).unwrap_err();
        assert!(format!("{err:#}").contains("file not found"), "{err:#}");
    }
}
