//! Preview thumbnails for image files.
//!
//! [`ImageThumbnails`] decodes an image, scales it to fit a 160x160 box
//! (aspect ratio kept, never upscaled), re-encodes it as JPEG quality 80
//! and returns a `data:image/jpeg;base64,...` URI. [`ThumbnailCache`]
//! memoizes results for one session.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::ImageReader;
use thiserror::Error;

use crate::scanner::perceptual::is_image_extension;

/// Longest edge of a generated thumbnail.
pub const THUMBNAIL_MAX_DIM: u32 = 160;

/// JPEG quality of generated thumbnails.
pub const THUMBNAIL_QUALITY: u8 = 80;

/// Entries kept by a [`ThumbnailCache`] before it stops storing new ones.
pub const THUMBNAIL_CACHE_LIMIT: usize = 1000;

const DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";

/// Errors from thumbnail generation.
#[derive(Debug, Error)]
pub enum ThumbnailError {
    /// The path does not look like an image.
    #[error("not an image file: {}", .0.display())]
    Unsupported(PathBuf),

    /// The file could not be opened.
    #[error("failed to open {}: {source}", path.display())]
    Io {
        /// Image path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The image could not be decoded.
    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        /// Image path
        path: PathBuf,
        /// Decoder error
        #[source]
        source: image::ImageError,
    },

    /// The image has no pixels.
    #[error("image has zero width or height: {}", .0.display())]
    Empty(PathBuf),

    /// JPEG encoding failed.
    #[error("failed to encode thumbnail: {0}")]
    Encode(#[source] image::ImageError),
}

/// Produces a preview data URI for an image path.
pub trait ThumbnailProvider: Send + Sync {
    /// Render a thumbnail for `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ThumbnailError`] if the file cannot be turned into a thumbnail.
    fn thumbnail(&self, path: &Path) -> Result<String, ThumbnailError>;
}

/// Default provider backed by the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageThumbnails;

impl ImageThumbnails {
    /// Scaled size that fits inside the thumbnail box.
    #[must_use]
    pub fn fit(width: u32, height: u32) -> (u32, u32) {
        if width <= THUMBNAIL_MAX_DIM && height <= THUMBNAIL_MAX_DIM {
            return (width, height);
        }
        let (w, h) = (u64::from(width), u64::from(height));
        let max = u64::from(THUMBNAIL_MAX_DIM);
        let (new_w, new_h) = if w > h {
            (max, h * max / w)
        } else {
            (w * max / h, max)
        };
        // Both values are at most THUMBNAIL_MAX_DIM here.
        (
            u32::try_from(new_w.max(1)).unwrap_or(THUMBNAIL_MAX_DIM),
            u32::try_from(new_h.max(1)).unwrap_or(THUMBNAIL_MAX_DIM),
        )
    }
}

impl ThumbnailProvider for ImageThumbnails {
    fn thumbnail(&self, path: &Path) -> Result<String, ThumbnailError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if !is_image_extension(&extension) {
            return Err(ThumbnailError::Unsupported(path.to_path_buf()));
        }

        let reader = ImageReader::open(path)
            .and_then(ImageReader::with_guessed_format)
            .map_err(|source| ThumbnailError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let image = reader.decode().map_err(|source| ThumbnailError::Decode {
            path: path.to_path_buf(),
            source,
        })?;

        if image.width() == 0 || image.height() == 0 {
            return Err(ThumbnailError::Empty(path.to_path_buf()));
        }

        let (width, height) = Self::fit(image.width(), image.height());
        let scaled = if (width, height) == (image.width(), image.height()) {
            image
        } else {
            image.resize_exact(width, height, FilterType::CatmullRom)
        };
        let rgb = scaled.to_rgb8();

        let mut buf = Cursor::new(Vec::new());
        JpegEncoder::new_with_quality(&mut buf, THUMBNAIL_QUALITY)
            .encode_image(&rgb)
            .map_err(ThumbnailError::Encode)?;

        log::trace!("Thumbnail for {}: {}x{}", path.display(), width, height);
        Ok(format!("{DATA_URI_PREFIX}{}", STANDARD.encode(buf.into_inner())))
    }
}

/// Session-scoped memo of generated thumbnails.
///
/// Once [`THUMBNAIL_CACHE_LIMIT`] entries are stored, new results are
/// returned but not kept.
#[derive(Debug, Default)]
pub struct ThumbnailCache {
    entries: Mutex<HashMap<PathBuf, String>>,
}

impl ThumbnailCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached thumbnail for `path`, generating it with `provider` on a miss.
    ///
    /// Failures are not cached.
    ///
    /// # Errors
    ///
    /// Propagates the provider's error.
    pub fn get_or_render(
        &self,
        path: &Path,
        provider: &dyn ThumbnailProvider,
    ) -> Result<String, ThumbnailError> {
        if let Some(hit) = self.lock().get(path) {
            return Ok(hit.clone());
        }

        let uri = provider.thumbnail(path)?;
        let mut entries = self.lock();
        if entries.len() < THUMBNAIL_CACHE_LIMIT {
            entries.insert(path.to_path_buf(), uri.clone());
        }
        Ok(uri)
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
