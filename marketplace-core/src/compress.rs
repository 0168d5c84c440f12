//! Client-side shrinking of oversized images before upload.

use std::borrow::Cow;
use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use thiserror::Error;

use crate::staging::ImageFile;

/// Files at or below this size are uploaded untouched.
pub const DEFAULT_THRESHOLD_BYTES: u64 = 2 * 1024 * 1024;
/// Longest edge after downscaling.
pub const DEFAULT_MAX_DIMENSION: u32 = 1200;
/// JPEG quality (0-100) used when re-encoding.
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

#[derive(Debug, Error)]
pub enum CompressError {
    #[error("Failed to decode image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("Failed to encode image: {0}")]
    Encode(#[source] image::ImageError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionSettings {
    pub threshold_bytes: u64,
    pub max_dimension: u32,
    pub jpeg_quality: u8,
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            threshold_bytes: DEFAULT_THRESHOLD_BYTES,
            max_dimension: DEFAULT_MAX_DIMENSION,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ImageCompressor {
    settings: CompressionSettings,
}

impl ImageCompressor {
    pub fn new(settings: CompressionSettings) -> Self {
        Self { settings }
    }

    /// Returns `file` unchanged if it is small enough, otherwise a downscaled
    /// JPEG re-encoding of it.
    ///
    /// Never fails: if the file cannot be decoded or re-encoded the original
    /// is returned and the upload is attempted with it.
    pub fn compress_if_needed<'a>(&self, file: &'a ImageFile) -> Cow<'a, ImageFile> {
        if !self.needs_compression(file) {
            return Cow::Borrowed(file);
        }
        Self::settle(file, self.compress(file))
    }

    /// Same as [`compress_if_needed`](Self::compress_if_needed), but the
    /// decode and re-encode run on tokio's blocking pool so the calling task
    /// keeps yielding.
    pub async fn compress_if_needed_blocking<'a>(
        &self,
        file: &'a ImageFile,
    ) -> Cow<'a, ImageFile> {
        if !self.needs_compression(file) {
            return Cow::Borrowed(file);
        }

        let compressor = self.clone();
        let owned = file.clone();
        match tokio::task::spawn_blocking(move || compressor.compress(&owned)).await {
            Ok(result) => Self::settle(file, result),
            Err(e) => {
                tracing::warn!(
                    "Compression task for {} failed, uploading original: {}",
                    file.name,
                    e
                );
                Cow::Borrowed(file)
            }
        }
    }

    fn needs_compression(&self, file: &ImageFile) -> bool {
        file.size() > self.settings.threshold_bytes
    }

    fn settle(file: &ImageFile, result: Result<ImageFile, CompressError>) -> Cow<'_, ImageFile> {
        match result {
            Ok(compressed) => {
                tracing::debug!(
                    "Compressed {} from {} to {} bytes",
                    file.name,
                    file.size(),
                    compressed.size()
                );
                Cow::Owned(compressed)
            }
            Err(e) => {
                tracing::warn!("Compression of {} failed, uploading original: {}", file.name, e);
                Cow::Borrowed(file)
            }
        }
    }

    fn compress(&self, file: &ImageFile) -> Result<ImageFile, CompressError> {
        let decoded = image::load_from_memory(&file.data).map_err(CompressError::Decode)?;
        let scaled = self.downscale(decoded);

        let mut buffer = Cursor::new(Vec::new());
        let encoder = JpegEncoder::new_with_quality(&mut buffer, self.settings.jpeg_quality);
        DynamicImage::ImageRgb8(scaled.to_rgb8())
            .write_with_encoder(encoder)
            .map_err(CompressError::Encode)?;

        Ok(ImageFile::new(
            file.name.clone(),
            "image/jpeg",
            buffer.into_inner(),
        ))
    }

    /// Fits the image inside a `max_dimension` square, keeping the aspect
    /// ratio. Never upscales.
    fn downscale(&self, image: DynamicImage) -> DynamicImage {
        let (width, height) = image.dimensions();
        let max = self.settings.max_dimension;
        if width <= max && height <= max {
            return image;
        }
        image.resize(max, max, FilterType::Triangle)
    }
}
