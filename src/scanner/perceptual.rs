//! Perceptual image hashing for similarity detection.
//!
//! This module provides the [`PerceptualHasher`], which computes a 64-bit
//! DCT-based signature (pHash) for an image. Signatures stay close under
//! resizing and re-compression, so the Hamming distance between two
//! signatures measures visual similarity.

use bk_tree::{BKTree, Metric};
use image::ImageReader;
use image_hasher::{HashAlg, HasherConfig};
use std::path::Path;
use thiserror::Error;

/// Extensions (lower-case, no dot) that are sent through perceptual hashing.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "tiff", "tif", "webp"];

/// Width of a perceptual signature in bits.
pub const SIGNATURE_BITS: u32 = 64;

/// Whether an extension (lower-case, no dot) marks an image file.
#[must_use]
pub fn is_image_extension(extension: &str) -> bool {
    IMAGE_EXTENSIONS.contains(&extension)
}

/// Errors that can occur during perceptual hashing.
#[derive(Debug, Error)]
pub enum PerceptualError {
    /// Failed to open the file or sniff its format.
    #[error("Failed to read image {0}: {1}")]
    Io(String, #[source] std::io::Error),

    /// Failed to decode the image.
    #[error("Failed to load image {0}: {1}")]
    LoadError(String, #[source] image::ImageError),

    /// The hasher produced a signature of an unexpected width.
    #[error("Unexpected signature width for {0}: {1} bytes")]
    SignatureWidth(String, usize),
}

/// Computes 64-bit perceptual signatures for images.
pub struct PerceptualHasher {
    hasher: image_hasher::Hasher,
}

impl PerceptualHasher {
    /// Create a pHash hasher producing 8x8 (64-bit) signatures.
    #[must_use]
    pub fn new() -> Self {
        let config = HasherConfig::new()
            .hash_size(8, 8)
            .hash_alg(HashAlg::Median)
            .preproc_dct();
        Self {
            hasher: config.to_hasher(),
        }
    }

    /// Compute the signature for an image at the given path.
    ///
    /// The format is sniffed from the content, so a misnamed file still
    /// decodes if its bytes are a supported image.
    ///
    /// # Errors
    ///
    /// Returns [`PerceptualError`] if the file cannot be read or decoded.
    pub fn compute_hash<P: AsRef<Path>>(&self, path: P) -> Result<u64, PerceptualError> {
        let path = path.as_ref();
        let display = || path.display().to_string();

        let img = ImageReader::open(path)
            .and_then(ImageReader::with_guessed_format)
            .map_err(|e| PerceptualError::Io(display(), e))?
            .decode()
            .map_err(|e| PerceptualError::LoadError(display(), e))?;

        let hash = self.hasher.hash_image(&img);
        let bytes: [u8; 8] = hash
            .as_bytes()
            .try_into()
            .map_err(|_| PerceptualError::SignatureWidth(display(), hash.as_bytes().len()))?;
        Ok(u64::from_be_bytes(bytes))
    }
}

impl Default for PerceptualHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Hamming distance between two 64-bit signatures.
#[must_use]
pub fn hamming_distance(a: u64, b: u64) -> u32 {
    (a ^ b).count_ones()
}

/// BK-tree metric over 64-bit signatures.
#[derive(Default, Clone, Copy, Debug)]
pub struct HammingMetric;

impl Metric<u64> for HammingMetric {
    fn distance(&self, a: &u64, b: &u64) -> u32 {
        hamming_distance(*a, *b)
    }

    fn threshold_distance(&self, a: &u64, b: &u64, threshold: u32) -> Option<u32> {
        let d = self.distance(a, b);
        if d <= threshold {
            Some(d)
        } else {
            None
        }
    }
}

/// A similarity index over distinct signatures using a BK-tree.
///
/// Callers insert each distinct signature once; files sharing a signature
/// are tracked outside the tree.
pub struct SimilarityIndex {
    tree: BKTree<u64, HammingMetric>,
    count: usize,
}

impl SimilarityIndex {
    /// Create a new empty similarity index.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tree: BKTree::new(HammingMetric),
            count: 0,
        }
    }

    /// Add a signature to the index.
    pub fn insert(&mut self, signature: u64) {
        self.tree.add(signature);
        self.count += 1;
    }

    /// Find all indexed signatures within `max_distance` of `signature`.
    ///
    /// Returns `(distance, signature)` pairs, including the query itself
    /// when it is indexed.
    #[must_use]
    pub fn find(&self, signature: u64, max_distance: u32) -> Vec<(u32, u64)> {
        self.tree
            .find(&signature, max_distance)
            .map(|(d, s)| (d, *s))
            .collect()
    }

    /// Returns the number of items in the index.
    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns true if the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

impl Default for SimilarityIndex {
    fn default() -> Self {
        Self::new()
    }
}
