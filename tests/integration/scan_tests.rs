use super::common::{grouped_paths, scan, Tree};
use shadowwipe::duplicates::GroupKind;
use shadowwipe::scanner::PARTIAL_CHUNK_SIZE;

#[test]
fn test_scan_empty_directory() {
    let tree = Tree::new();
    let (groups, summary) = scan(&tree.settings());
    assert!(groups.is_empty());
    assert_eq!(summary.total_files, 0);
    assert_eq!(summary.group_count(), 0);
}

#[test]
fn test_scan_unique_files() {
    let tree = Tree::new();
    tree.file("a.txt", b"content a");
    tree.file("b.txt", b"content b");
    tree.file("c.txt", b"content c");

    let (groups, summary) = scan(&tree.settings());
    assert!(groups.is_empty());
    assert_eq!(summary.total_files, 3);
    assert_eq!(summary.eliminated_by_partial, 3);
}

#[test]
fn test_abc_scenario() {
    let tree = Tree::new();
    let a = tree.file("A", &[b'x'; 100]);
    let b = tree.file("B", &[b'x'; 100]);
    tree.file("C", &[b'y'; 100]);

    let (groups, summary) = scan(&tree.settings());
    assert_eq!(groups.len(), 1);
    let group = &groups[0];
    assert_eq!(group.kind, GroupKind::Exact);
    assert_eq!(group.similarity, 0);
    assert_eq!(group.paths(), vec![a, b]);
    assert_eq!(group.total_size, 200);
    assert_eq!(group.wasted_size, 100);
    assert_eq!(summary.reclaimable_space, 100);
    assert_eq!(summary.duplicate_files, 1);
}

#[test]
fn test_identical_content_lands_in_one_group() {
    let tree = Tree::new();
    let copies: Vec<_> = (0..4)
        .map(|i| tree.file(&format!("dir{i}/copy.bin"), b"the same bytes everywhere"))
        .collect();
    tree.file("other.bin", b"the same bytes elsewhere!");

    let (groups, _) = scan(&tree.settings());
    assert_eq!(grouped_paths(&groups), vec![copies]);
    assert_eq!(groups[0].wasted_size, 3 * 25);
}

#[test]
fn test_group_invariants_hold() {
    let tree = Tree::new();
    for i in 0..30u8 {
        // Ten distinct contents, three copies each, several sharing a size.
        let value = i % 10;
        let content = vec![value; 50 + usize::from(value % 3)];
        tree.file(&format!("f{i:02}.bin"), &content);
    }

    let (groups, _) = scan(&tree.settings());
    assert!(!groups.is_empty());
    for group in &groups {
        assert!(group.files.len() >= 2);
        let total: u64 = group.files.iter().map(|f| f.size).sum();
        assert_eq!(group.total_size, total);
        assert_eq!(group.wasted_size, total - group.files[0].size);
        let first = group.files[0].full_hash;
        assert!(first.is_some());
        assert!(group.files.iter().all(|f| f.full_hash == first));
    }
}

#[test]
fn test_large_files_differing_in_middle() {
    let tree = Tree::new();
    let size = (PARTIAL_CHUNK_SIZE * 4) as usize;
    let base = vec![7u8; size];
    let mut changed = base.clone();
    changed[size / 2] = 8;

    let a = tree.file("a.bin", &base);
    let b = tree.file("b.bin", &base);
    tree.file("c.bin", &changed);

    let (groups, summary) = scan(&tree.settings());
    assert_eq!(grouped_paths(&groups), vec![vec![a, b]]);
    assert_eq!(summary.eliminated_by_partial, 0);
}

#[test]
fn test_multiple_and_nested_roots() {
    let left = Tree::new();
    let right = Tree::new();
    let a = left.file("nested/a.txt", b"shared across roots");
    let b = right.file("b.txt", b"shared across roots");

    let mut settings = left.settings();
    // The nested root is inside the first one and must not double count.
    settings.roots = vec![left.root.clone(), left.root.join("nested"), right.root.clone()];

    let (groups, summary) = scan(&settings);
    assert_eq!(summary.total_files, 2);
    assert_eq!(groups.len(), 1);
    let mut paths = groups[0].paths();
    paths.sort();
    let mut expected = vec![a, b];
    expected.sort();
    assert_eq!(paths, expected);
}

#[test]
fn test_missing_root_is_skipped() {
    let tree = Tree::new();
    tree.file("a.txt", b"dup");
    tree.file("b.txt", b"dup");

    let mut settings = tree.settings();
    settings.roots.push(tree.root.join("does-not-exist"));
    let (groups, _) = scan(&settings);
    assert_eq!(groups.len(), 1);
}

#[test]
fn test_group_ids_are_stable_across_scans() {
    let tree = Tree::new();
    tree.file("a.txt", b"dup");
    tree.file("b.txt", b"dup");

    let (first, _) = scan(&tree.settings());
    let (second, _) = scan(&tree.settings());
    assert_eq!(first[0].id, second[0].id);
    assert_eq!(first[0].id.len(), 64);
}

#[test]
fn test_groups_ordered_by_wasted_size() {
    let tree = Tree::new();
    tree.file("small1", &[1; 10]);
    tree.file("small2", &[1; 10]);
    tree.file("big1", &[2; 1000]);
    tree.file("big2", &[2; 1000]);

    let (groups, _) = scan(&tree.settings());
    let wasted: Vec<u64> = groups.iter().map(|g| g.wasted_size).collect();
    assert_eq!(wasted, vec![1000, 10]);
}
