//! Marketplace Core Library
//!
//! Item and image synchronization against the marketplace REST backend.

pub mod client;
pub mod compress;
pub mod edit;
pub mod models;
pub mod pacing;
pub mod staging;
pub mod view_state;
pub mod workflow;

pub use client::{
    normalize_base_url, ApiError, FavoritesClient, HttpClient, RemoteItemClient, DEFAULT_API_URL,
};
pub use compress::{CompressError, CompressionSettings, ImageCompressor};
pub use edit::{EditMode, FieldError, FormErrors, FormField, ItemEditSession, ItemForm};
pub use models::{
    Category, Condition, Image, Item, ItemDetails, ItemFields, Review, ReviewInput, User,
};
pub use pacing::PacingPolicy;
pub use staging::{
    ImageFile, ImageStagingBuffer, MemoryPreviews, PreviewHandle, PreviewRegistry,
    StagedImageAddition, StagingLimits, StagingSnapshot, ValidationError,
};
pub use view_state::{SessionViewState, ViewStateError};
pub use workflow::{
    ImageOperation, ImageOperationFailed, ItemSyncWorkflow, RefetchFailed, SyncOutcome,
    WorkflowError, WorkflowState,
};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
