//! Shared fixtures for the integration tests.

use std::fs;
use std::path::{Path, PathBuf};

use shadowwipe::config::ScanSettings;
use shadowwipe::duplicates::{DuplicateFinder, DuplicateGroup, FinderConfig, ScanSummary};
use tempfile::TempDir;

/// A temp directory with its canonical path (the walker reports canonical
/// paths).
pub struct Tree {
    _dir: TempDir,
    pub root: PathBuf,
}

impl Tree {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        Self { _dir: dir, root }
    }

    /// Write `content` at `rel`, creating parent directories.
    pub fn file(&self, rel: &str, content: &[u8]) -> PathBuf {
        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    pub fn settings(&self) -> ScanSettings {
        let mut settings = ScanSettings::with_roots([self.root.clone()]);
        settings.io_threads = Some(2);
        settings
    }
}

/// Run the pipeline synchronously.
pub fn scan(settings: &ScanSettings) -> (Vec<DuplicateGroup>, ScanSummary) {
    DuplicateFinder::new(FinderConfig::from_settings(settings))
        .find_duplicates(&settings.roots)
        .unwrap()
}

/// Sorted member paths of every group.
pub fn grouped_paths(groups: &[DuplicateGroup]) -> Vec<Vec<PathBuf>> {
    groups
        .iter()
        .map(|g| {
            let mut paths = g.paths();
            paths.sort();
            paths
        })
        .collect()
}

/// Whether any group contains `path`.
pub fn is_grouped(groups: &[DuplicateGroup], path: &Path) -> bool {
    groups.iter().any(|g| g.contains(path))
}

/// Sign of each term in the 8x8 low-frequency cosine grid of [`photo`].
const PHOTO_SIGNS: u64 = 0xd0de_3e99_b03a_720b;

/// A synthetic photo built only from low-frequency cosines, each with a
/// fixed sign. Every signature bit lands far from the median, so the
/// perceptual hash survives resizing and lossy re-encoding.
pub fn photo(width: u32, height: u32) -> image::RgbImage {
    use std::f64::consts::PI;

    image::RgbImage::from_fn(width, height, |x, y| {
        let tx = (f64::from(x) + 0.5) / f64::from(width);
        let ty = (f64::from(y) + 0.5) / f64::from(height);
        let mut luma = 128.0;
        for v in 0..8u32 {
            for u in 0..8u32 {
                if u == 0 && v == 0 {
                    continue;
                }
                let sign = if (PHOTO_SIGNS >> (v * 8 + u)) & 1 == 1 { 8.0 } else { -8.0 };
                luma += sign * (PI * f64::from(u) * tx).cos() * (PI * f64::from(v) * ty).cos();
            }
        }
        let l = luma.round().clamp(0.0, 255.0) as u8;
        image::Rgb([l, l, l])
    })
}

/// Encode `img` as JPEG at `quality` into `path`.
pub fn save_jpeg(img: &image::RgbImage, path: &Path, quality: u8) {
    let mut buf = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality)
        .encode_image(img)
        .unwrap();
    fs::write(path, buf).unwrap();
}
