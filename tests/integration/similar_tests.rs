use super::common::{is_grouped, photo, save_jpeg, scan, Tree};
use shadowwipe::duplicates::GroupKind;

#[test]
fn test_reencoded_jpegs_form_similar_group() {
    let tree = Tree::new();
    let img = photo(256, 192);
    let high = tree.root.join("holiday.jpg");
    let low = tree.root.join("holiday_small.jpg");
    save_jpeg(&img, &high, 95);
    let resized = image::imageops::resize(&img, 128, 96, image::imageops::FilterType::Triangle);
    save_jpeg(&resized, &low, 60);

    let mut settings = tree.settings();
    settings.similarity_threshold = 10;
    let (groups, summary) = scan(&settings);

    assert_eq!(summary.images_hashed, 2);
    assert_eq!(groups.len(), 1);
    let group = &groups[0];
    assert_eq!(group.kind, GroupKind::Similar);
    assert!(group.similarity <= 4, "distance {}", group.similarity);
    assert!(is_grouped(&groups, &high));
    assert!(is_grouped(&groups, &low));
    assert_eq!(summary.similar_groups, 1);
    // Similar groups do not count as reclaimable.
    assert_eq!(summary.reclaimable_space, 0);
}

#[test]
fn test_threshold_zero_disables_similarity() {
    let tree = Tree::new();
    let img = photo(128, 128);
    save_jpeg(&img, &tree.root.join("a.jpg"), 95);
    save_jpeg(&img, &tree.root.join("b.jpg"), 70);

    let (groups, summary) = scan(&tree.settings());
    assert!(groups.is_empty());
    assert_eq!(summary.images_hashed, 0);
}

#[test]
fn test_byte_identical_images_are_exact_not_similar() {
    let tree = Tree::new();
    let img = photo(64, 64);
    let a = tree.root.join("a.png");
    img.save(&a).unwrap();
    let b = tree.file("copy/b.png", &std::fs::read(&a).unwrap());

    let mut settings = tree.settings();
    settings.similarity_threshold = 6;
    let (groups, _) = scan(&settings);

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].kind, GroupKind::Exact);
    assert_eq!(groups[0].paths(), vec![a, b]);
}

#[test]
fn test_exact_and_similar_groups_can_share_files() {
    let tree = Tree::new();
    let img = photo(200, 150);
    let a = tree.root.join("a.jpg");
    save_jpeg(&img, &a, 90);
    let a_copy = tree.file("b_copy.jpg", &std::fs::read(&a).unwrap());
    let reencoded = tree.root.join("c.jpg");
    save_jpeg(&img, &reencoded, 50);

    let mut settings = tree.settings();
    settings.similarity_threshold = 10;
    let (groups, _) = scan(&settings);

    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].kind, GroupKind::Exact);
    assert_eq!(groups[0].paths(), vec![a.clone(), a_copy]);
    assert_eq!(groups[1].kind, GroupKind::Similar);
    assert!(groups[1].contains(&a));
    assert!(groups[1].contains(&reencoded));
}

#[test]
fn test_undecodable_images_are_skipped() {
    let tree = Tree::new();
    tree.file("broken1.jpg", b"not really a jpeg");
    tree.file("broken2.png", b"not really a png!");
    tree.file("notes.txt", b"plain text file");

    let mut settings = tree.settings();
    settings.similarity_threshold = 20;
    let (groups, summary) = scan(&settings);
    assert!(groups.is_empty());
    assert_eq!(summary.images_hashed, 0);
}

#[test]
fn test_different_images_stay_apart() {
    let tree = Tree::new();
    save_jpeg(&photo(128, 128), &tree.root.join("photo.jpg"), 90);
    let stripes = image::RgbImage::from_fn(128, 128, |x, _| {
        if (x / 8) % 2 == 0 {
            image::Rgb([255, 255, 255])
        } else {
            image::Rgb([0, 0, 0])
        }
    });
    save_jpeg(&stripes, &tree.root.join("stripes.jpg"), 90);

    let mut settings = tree.settings();
    settings.similarity_threshold = 4;
    let (groups, summary) = scan(&settings);
    assert_eq!(summary.images_hashed, 2);
    assert!(groups.is_empty());
}
