//! Local staging of image additions and deletions for one item edit.
//!
//! Nothing here touches the network. The buffer records which existing images
//! should go and which new files should be uploaded, enforces the per-item
//! image limit, and owns the preview handles of the staged files.
//!
//! Preview handles are scoped resources: each staged addition holds a
//! [`PreviewHandle`] that revokes itself through its [`PreviewRegistry`] when
//! dropped. Removing a candidate, calling [`ImageStagingBuffer::reset`], or
//! dropping the whole buffer therefore releases every preview exactly once.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use uuid::Uuid;

use crate::models::Image;

/// Maximum number of images an item may carry.
pub const MAX_IMAGES_PER_ITEM: usize = 10;
/// Maximum size of a single staged file.
pub const MAX_IMAGE_BYTES: u64 = 2 * 1024 * 1024;
/// MIME types accepted for upload.
pub const ALLOWED_MIME_TYPES: [&str; 5] = [
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
];

/// An image file held in memory.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl ImageFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data,
        }
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

impl fmt::Debug for ImageFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageFile")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("size", &self.data.len())
            .finish()
    }
}

/// Reasons a staging mutation is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{name} is not a valid image format ({mime_type}). Please use JPG, PNG, GIF, or WebP")]
    UnsupportedFormat { name: String, mime_type: String },

    #[error("{name} is too large ({size} bytes). Please use images under {limit} bytes")]
    TooLarge { name: String, size: u64, limit: u64 },

    #[error("Maximum {limit} images allowed per item")]
    TooManyImages { limit: usize },

    #[error("Image {0} is not attached to this item")]
    UnknownImage(String),
}

/// Limits applied while staging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagingLimits {
    pub max_images: usize,
    pub max_image_bytes: u64,
}

impl Default for StagingLimits {
    fn default() -> Self {
        Self {
            max_images: MAX_IMAGES_PER_ITEM,
            max_image_bytes: MAX_IMAGE_BYTES,
        }
    }
}

/// Creates and revokes preview locations for staged files.
pub trait PreviewRegistry: Send + Sync {
    /// Registers a preview for `file` and returns its location.
    fn create(&self, file: &ImageFile) -> String;

    /// Releases a preview previously returned by `create`.
    fn revoke(&self, location: &str);
}

/// A live preview. Revoked when dropped.
pub struct PreviewHandle {
    location: String,
    registry: Arc<dyn PreviewRegistry>,
}

impl PreviewHandle {
    pub fn acquire(registry: Arc<dyn PreviewRegistry>, file: &ImageFile) -> Self {
        let location = registry.create(file);
        Self { location, registry }
    }

    pub fn location(&self) -> &str {
        &self.location
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.registry.revoke(&self.location);
    }
}

impl fmt::Debug for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PreviewHandle").field(&self.location).finish()
    }
}

/// Preview registry that keeps previews in memory under `preview:<uuid>` keys.
#[derive(Debug, Default)]
pub struct MemoryPreviews {
    live: Mutex<HashMap<String, ImageFile>>,
}

impl MemoryPreviews {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of previews that have not been revoked yet.
    pub fn live_count(&self) -> usize {
        self.live().len()
    }

    /// Returns the previewed file behind `location`, if still live.
    pub fn get(&self, location: &str) -> Option<ImageFile> {
        self.live().get(location).cloned()
    }

    fn live(&self) -> MutexGuard<'_, HashMap<String, ImageFile>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PreviewRegistry for MemoryPreviews {
    fn create(&self, file: &ImageFile) -> String {
        let location = format!("preview:{}", Uuid::new_v4());
        self.live().insert(location.clone(), file.clone());
        location
    }

    fn revoke(&self, location: &str) {
        if self.live().remove(location).is_none() {
            tracing::warn!("Revoked unknown preview {}", location);
        }
    }
}

/// A file waiting to be uploaded on the next commit.
#[derive(Debug)]
pub struct StagedImageAddition {
    temp_id: String,
    file: ImageFile,
    preview: PreviewHandle,
}

impl StagedImageAddition {
    pub fn temp_id(&self) -> &str {
        &self.temp_id
    }

    pub fn file(&self) -> &ImageFile {
        &self.file
    }

    pub fn preview(&self) -> &str {
        self.preview.location()
    }
}

/// Read-only view of the staged changes.
#[derive(Debug, Clone, Copy)]
pub struct StagingSnapshot<'a> {
    pub existing: &'a [Image],
    pub to_delete: &'a [String],
    pub to_add: &'a [StagedImageAddition],
}

impl StagingSnapshot<'_> {
    pub fn is_empty(&self) -> bool {
        self.to_delete.is_empty() && self.to_add.is_empty()
    }
}

/// Pending image additions and removals for a single item edit.
pub struct ImageStagingBuffer {
    existing: Vec<Image>,
    to_delete: Vec<String>,
    to_add: Vec<StagedImageAddition>,
    limits: StagingLimits,
    previews: Arc<dyn PreviewRegistry>,
}

impl ImageStagingBuffer {
    /// Creates a buffer for an item that currently has `existing` images.
    pub fn new(
        existing: Vec<Image>,
        limits: StagingLimits,
        previews: Arc<dyn PreviewRegistry>,
    ) -> Self {
        Self {
            existing,
            to_delete: Vec::new(),
            to_add: Vec::new(),
            limits,
            previews,
        }
    }

    /// Number of images the item will have once the staged changes commit.
    pub fn projected_count(&self) -> usize {
        self.existing.len() - self.to_delete.len() + self.to_add.len()
    }

    /// How many more candidates can be staged.
    pub fn remaining_slots(&self) -> usize {
        self.limits.max_images.saturating_sub(self.projected_count())
    }

    /// Stages `file` for upload.
    pub fn add_candidate(
        &mut self,
        file: ImageFile,
    ) -> Result<&StagedImageAddition, ValidationError> {
        let mime_type = file.mime_type.to_lowercase();
        if !ALLOWED_MIME_TYPES.contains(&mime_type.as_str()) {
            return Err(ValidationError::UnsupportedFormat {
                name: file.name,
                mime_type: file.mime_type,
            });
        }

        if file.size() > self.limits.max_image_bytes {
            return Err(ValidationError::TooLarge {
                size: file.size(),
                name: file.name,
                limit: self.limits.max_image_bytes,
            });
        }

        if self.projected_count() + 1 > self.limits.max_images {
            return Err(ValidationError::TooManyImages {
                limit: self.limits.max_images,
            });
        }

        let preview = PreviewHandle::acquire(Arc::clone(&self.previews), &file);
        self.to_add.push(StagedImageAddition {
            temp_id: format!("new-{}", Uuid::new_v4()),
            file,
            preview,
        });

        let index = self.to_add.len() - 1;
        Ok(&self.to_add[index])
    }

    /// Drops a staged candidate and revokes its preview.
    ///
    /// Returns false if no candidate has `temp_id`.
    pub fn remove_candidate(&mut self, temp_id: &str) -> bool {
        let before = self.to_add.len();
        self.to_add.retain(|staged| staged.temp_id != temp_id);
        self.to_add.len() != before
    }

    /// Marks an existing image for removal. Marking twice is a no-op.
    pub fn mark_existing_for_deletion(&mut self, image_id: &str) -> Result<(), ValidationError> {
        if !self.existing.iter().any(|image| image.id == image_id) {
            return Err(ValidationError::UnknownImage(image_id.to_string()));
        }

        if !self.is_marked_for_deletion(image_id) {
            self.to_delete.push(image_id.to_string());
        }
        Ok(())
    }

    /// Un-marks an image. Rejected if keeping it would exceed the image limit.
    pub fn restore_existing(&mut self, image_id: &str) -> Result<(), ValidationError> {
        if !self.is_marked_for_deletion(image_id) {
            return Ok(());
        }

        if self.projected_count() + 1 > self.limits.max_images {
            return Err(ValidationError::TooManyImages {
                limit: self.limits.max_images,
            });
        }

        self.to_delete.retain(|id| id != image_id);
        Ok(())
    }

    pub fn is_marked_for_deletion(&self, image_id: &str) -> bool {
        self.to_delete.iter().any(|id| id == image_id)
    }

    /// Discards all staged changes and revokes every outstanding preview.
    pub fn reset(&mut self) {
        self.to_delete.clear();
        self.to_add.clear();
    }

    /// Replaces the known server-side images, dropping deletion marks for
    /// images that no longer exist.
    pub fn replace_existing(&mut self, images: Vec<Image>) {
        self.to_delete
            .retain(|id| images.iter().any(|image| &image.id == id));
        self.existing = images;
    }

    pub fn snapshot(&self) -> StagingSnapshot<'_> {
        StagingSnapshot {
            existing: &self.existing,
            to_delete: &self.to_delete,
            to_add: &self.to_add,
        }
    }
}

impl fmt::Debug for ImageStagingBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageStagingBuffer")
            .field("existing", &self.existing)
            .field("to_delete", &self.to_delete)
            .field("to_add", &self.to_add)
            .field("limits", &self.limits)
            .finish()
    }
}
