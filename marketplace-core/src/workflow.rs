//! Create-or-update of an item together with its image set.
//!
//! The backend has no multi-resource transaction, so one logical save is a
//! sequence of independent calls:
//!
//! 1. validate the form (no network)
//! 2. create or update the item record
//! 3. delete the staged images, then upload the staged files, one at a time
//!    with a pause between calls
//! 4. re-read the item to learn its authoritative image list
//!
//! Only steps 1 and 2 can fail the workflow. Once the item record is written,
//! image failures are collected and returned next to the saved item, and a
//! failed re-read just means the returned item may be stale.

use std::fmt;

use thiserror::Error;

use crate::client::{ApiError, RemoteItemClient};
use crate::compress::ImageCompressor;
use crate::edit::{EditMode, FormErrors, ItemEditSession};
use crate::models::Item;
use crate::pacing::{pause, paced, PacingPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    ValidatingForm,
    UpsertingItem,
    ReconcilingImages,
    Refetching,
    Done,
    Failed,
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkflowState::Idle => "idle",
            WorkflowState::ValidatingForm => "validating form",
            WorkflowState::UpsertingItem => "upserting item",
            WorkflowState::ReconcilingImages => "reconciling images",
            WorkflowState::Refetching => "refetching",
            WorkflowState::Done => "done",
            WorkflowState::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Failures that abort the workflow. Staged images are kept for a retry.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Form is invalid: {0}")]
    FormInvalid(#[from] FormErrors),

    #[error("Failed to {action} item: {source}")]
    ItemUpsertFailed {
        action: &'static str,
        #[source]
        source: ApiError,
    },
}

/// An image call that was attempted during reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOperation {
    Delete { image_id: String },
    Upload { temp_id: String, file_name: String },
}

impl fmt::Display for ImageOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageOperation::Delete { image_id } => write!(f, "delete image {}", image_id),
            ImageOperation::Upload { file_name, .. } => write!(f, "upload {}", file_name),
        }
    }
}

/// A single image call that failed after the item was saved.
#[derive(Debug, Error)]
#[error("Failed to {operation}: {source}")]
pub struct ImageOperationFailed {
    pub operation: ImageOperation,
    #[source]
    pub source: ApiError,
}

/// Both attempts to re-read the saved item failed.
#[derive(Debug, Error)]
#[error("Could not refresh item {item_id}: {primary}; fallback: {fallback}")]
pub struct RefetchFailed {
    pub item_id: String,
    pub primary: ApiError,
    pub fallback: ApiError,
}

/// Result of a completed save.
#[derive(Debug)]
pub struct SyncOutcome {
    /// The saved item, re-read from the backend when possible.
    pub item: Item,
    /// Image calls that failed; the item itself was saved.
    pub partial_image_errors: Vec<ImageOperationFailed>,
    /// Set when `item` could not be re-read and may carry a stale image list.
    pub refetch_error: Option<RefetchFailed>,
}

impl SyncOutcome {
    /// True when the item was saved but something secondary went wrong.
    pub fn has_warnings(&self) -> bool {
        !self.partial_image_errors.is_empty() || self.refetch_error.is_some()
    }
}

/// Drives one save of an [`ItemEditSession`].
///
/// `run` borrows the session mutably, so the same session cannot be saved
/// twice at once.
pub struct ItemSyncWorkflow<'a, C: RemoteItemClient + ?Sized> {
    client: &'a C,
    compressor: ImageCompressor,
    pacing: PacingPolicy,
    state: WorkflowState,
}

impl<'a, C: RemoteItemClient + ?Sized> ItemSyncWorkflow<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self {
            client,
            compressor: ImageCompressor::default(),
            pacing: PacingPolicy::default(),
            state: WorkflowState::Idle,
        }
    }

    pub fn with_compressor(mut self, compressor: ImageCompressor) -> Self {
        self.compressor = compressor;
        self
    }

    pub fn with_pacing(mut self, pacing: PacingPolicy) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    fn transition(&mut self, next: WorkflowState) {
        tracing::debug!("Item sync: {} -> {}", self.state, next);
        self.state = next;
    }

    fn fail(&mut self, error: WorkflowError) -> Result<SyncOutcome, WorkflowError> {
        self.transition(WorkflowState::Failed);
        tracing::warn!("Item sync failed: {}", error);
        Err(error)
    }

    /// Saves the session's item and images.
    pub async fn run(
        &mut self,
        session: &mut ItemEditSession,
    ) -> Result<SyncOutcome, WorkflowError> {
        self.transition(WorkflowState::ValidatingForm);
        let fields = match session.form.validate(session.seller_id()) {
            Ok(fields) => fields,
            Err(errors) => return self.fail(errors.into()),
        };

        self.transition(WorkflowState::UpsertingItem);
        let upserted = match session.mode().clone() {
            EditMode::Create { .. } => match self.client.create_item(&fields).await {
                Ok(item) => {
                    session.committed(&item);
                    item
                }
                Err(source) => {
                    return self.fail(WorkflowError::ItemUpsertFailed {
                        action: "create",
                        source,
                    })
                }
            },
            EditMode::Edit { item_id } => match self.client.update_item(&item_id, &fields).await {
                Ok(item) => item,
                Err(source) => {
                    return self.fail(WorkflowError::ItemUpsertFailed {
                        action: "update",
                        source,
                    })
                }
            },
        };

        self.transition(WorkflowState::ReconcilingImages);
        let partial_image_errors = self.reconcile_images(&upserted.id, session).await;

        self.transition(WorkflowState::Refetching);
        pause(self.pacing.before_refetch).await;
        let (item, refetch_error) = match self.refetch(&upserted.id).await {
            Ok(item) => (item, None),
            Err(error) => {
                tracing::warn!("{}; keeping last known item", error);
                (upserted, Some(error))
            }
        };

        session.committed(&item);
        session.images.reset();
        self.transition(WorkflowState::Done);

        if partial_image_errors.is_empty() {
            tracing::info!("Saved item {}", item.id);
        } else {
            tracing::warn!(
                "Saved item {} with {} failed image operation(s)",
                item.id,
                partial_image_errors.len()
            );
        }

        Ok(SyncOutcome {
            item,
            partial_image_errors,
            refetch_error,
        })
    }

    /// Applies staged deletions, then staged uploads. Failures are collected.
    async fn reconcile_images(
        &self,
        item_id: &str,
        session: &ItemEditSession,
    ) -> Vec<ImageOperationFailed> {
        let snapshot = session.images.snapshot();
        let client = self.client;
        let compressor = &self.compressor;
        let mut failures = Vec::new();

        let deletions = paced(
            snapshot.to_delete,
            self.pacing.between_deletions,
            |image_id| async move {
                let result = client.remove_image(item_id, image_id).await;
                (image_id, result)
            },
        )
        .await;

        for (image_id, result) in deletions {
            if let Err(source) = result {
                tracing::warn!("Failed to delete image {}: {}", image_id, source);
                failures.push(ImageOperationFailed {
                    operation: ImageOperation::Delete {
                        image_id: image_id.clone(),
                    },
                    source,
                });
            }
        }

        let total = snapshot.to_add.len();
        let uploads = paced(
            snapshot.to_add.iter().enumerate(),
            self.pacing.between_uploads,
            |(index, staged)| async move {
                tracing::debug!(
                    "Uploading image {}/{} ({})",
                    index + 1,
                    total,
                    staged.file().name
                );
                let file = compressor.compress_if_needed_blocking(staged.file()).await;
                let result = client.upload_image(item_id, &file).await;
                (staged, result)
            },
        )
        .await;

        for (staged, result) in uploads {
            if let Err(source) = result {
                tracing::warn!("Failed to upload {}: {}", staged.file().name, source);
                failures.push(ImageOperationFailed {
                    operation: ImageOperation::Upload {
                        temp_id: staged.temp_id().to_string(),
                        file_name: staged.file().name.clone(),
                    },
                    source,
                });
            }
        }

        failures
    }

    /// Re-reads the item, falling back to scanning the full item list.
    async fn refetch(&self, item_id: &str) -> Result<Item, RefetchFailed> {
        let primary = match self.client.get_item(item_id).await {
            Ok(item) => return Ok(item),
            Err(e) => e,
        };
        tracing::warn!("Failed to fetch item {}: {}; trying item list", item_id, primary);

        let fallback = match self.client.get_all_items().await {
            Ok(items) => match items.into_iter().find(|item| item.id == item_id) {
                Some(item) => return Ok(item),
                None => ApiError::NotFound {
                    kind: "Item",
                    id: item_id.to_string(),
                },
            },
            Err(e) => e,
        };

        Err(RefetchFailed {
            item_id: item_id.to_string(),
            primary,
            fallback,
        })
    }
}
