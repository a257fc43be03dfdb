use super::common::{is_grouped, scan, Tree};

#[test]
fn test_excluded_directories_never_grouped() {
    let tree = Tree::new();
    let kept = tree.file("src/lib.js", b"module.exports = 1;");
    let dep = tree.file("node_modules/pkg/lib.js", b"module.exports = 1;");
    let nested = tree.file("src/vendor/lib.js", b"module.exports = 1;");

    let (groups, summary) = scan(&tree.settings());
    // Only one copy survives the walk, so there is nothing to group.
    assert!(groups.is_empty());
    assert_eq!(summary.total_files, 1);
    assert!(!is_grouped(&groups, &kept));
    assert!(!is_grouped(&groups, &dep));
    assert!(!is_grouped(&groups, &nested));
}

#[test]
fn test_custom_exclusion() {
    let tree = Tree::new();
    let a = tree.file("photos/a.jpg.bak", b"backup bytes");
    let b = tree.file("photos/b.jpg.bak", b"backup bytes");
    tree.file("cache/c.jpg.bak", b"backup bytes");

    let mut settings = tree.settings();
    settings.excluded_dir_names.insert("cache".to_string());
    let (groups, _) = scan(&settings);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].paths(), vec![a, b]);
}

#[test]
fn test_min_size_excludes_smaller_files() {
    let tree = Tree::new();
    let small_a = tree.file("small_a", &[1; 99]);
    let small_b = tree.file("small_b", &[1; 99]);
    let edge_a = tree.file("edge_a", &[2; 100]);
    let edge_b = tree.file("edge_b", &[2; 100]);

    let mut settings = tree.settings();
    settings.min_file_size = 100;
    let (groups, summary) = scan(&settings);

    assert_eq!(summary.total_files, 2);
    assert_eq!(groups.len(), 1);
    assert!(is_grouped(&groups, &edge_a));
    assert!(is_grouped(&groups, &edge_b));
    assert!(!is_grouped(&groups, &small_a));
    assert!(!is_grouped(&groups, &small_b));
}

#[test]
fn test_empty_files_never_grouped() {
    let tree = Tree::new();
    tree.file("empty1", b"");
    tree.file("empty2", b"");

    let (groups, summary) = scan(&tree.settings());
    assert!(groups.is_empty());
    assert_eq!(summary.total_files, 0);
}

#[test]
fn test_hidden_entries() {
    let tree = Tree::new();
    let visible = tree.file("visible.txt", b"hidden twin");
    let hidden_file = tree.file(".hidden.txt", b"hidden twin");
    let in_hidden_dir = tree.file(".config/twin.txt", b"hidden twin");

    let mut settings = tree.settings();
    settings.skip_hidden = true;
    let (groups, _) = scan(&settings);
    assert!(groups.is_empty());

    settings.skip_hidden = false;
    let (groups, _) = scan(&settings);
    assert_eq!(groups.len(), 1);
    assert!(is_grouped(&groups, &visible));
    assert!(is_grouped(&groups, &hidden_file));
    assert!(is_grouped(&groups, &in_hidden_dir));
}

#[cfg(unix)]
#[test]
fn test_symlinks_are_not_followed_or_grouped() {
    let tree = Tree::new();
    let target = tree.file("real.txt", b"linked content");
    let link = tree.root.join("link.txt");
    std::os::unix::fs::symlink(&target, &link).unwrap();
    std::os::unix::fs::symlink(&tree.root, tree.root.join("loop")).unwrap();

    let (groups, summary) = scan(&tree.settings());
    assert!(groups.is_empty());
    assert_eq!(summary.total_files, 1);
}

#[cfg(unix)]
#[test]
fn test_unreadable_file_does_not_abort_scan() {
    use std::os::unix::fs::PermissionsExt;

    let tree = Tree::new();
    let a = tree.file("a.txt", b"readable twin");
    let b = tree.file("b.txt", b"readable twin");
    let locked = tree.file("locked.txt", b"readable twin");
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

    let (groups, summary) = scan(&tree.settings());
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o644)).unwrap();

    assert_eq!(groups.len(), 1);
    assert!(is_grouped(&groups, &a));
    assert!(is_grouped(&groups, &b));
    // Running as root can still read the file.
    if !is_grouped(&groups, &locked) {
        assert_eq!(summary.failed_files, 1);
    }
}
