//! Contracts of the marketplace backend and an HTTP implementation of them.
//!
//! The sync workflow and the view state only depend on the traits in this
//! module, so they can be driven by [`HttpClient`] in production and by an
//! in-memory fake in tests.

mod error;
mod http;

#[cfg(test)]
pub(crate) mod fake;

use async_trait::async_trait;

use crate::models::{Image, Item, ItemFields};
use crate::staging::ImageFile;

pub use error::ApiError;
pub use http::{normalize_base_url, HttpClient, DEFAULT_API_URL};

/// Item and image endpoints.
#[async_trait]
pub trait RemoteItemClient: Send + Sync {
    /// `POST /items/`
    async fn create_item(&self, fields: &ItemFields) -> Result<Item, ApiError>;

    /// `PUT /items/{id}`
    async fn update_item(&self, id: &str, fields: &ItemFields) -> Result<Item, ApiError>;

    /// `GET /items/{id}`
    async fn get_item(&self, id: &str) -> Result<Item, ApiError>;

    /// `GET /items/`
    async fn get_all_items(&self) -> Result<Vec<Item>, ApiError>;

    /// `DELETE /items/{id}`
    async fn delete_item(&self, id: &str) -> Result<(), ApiError>;

    /// `POST /items/{id}/images` as multipart with the file under `image_file`.
    async fn upload_image(&self, item_id: &str, file: &ImageFile) -> Result<Image, ApiError>;

    /// `DELETE /items/{id}/images/{image_id}`
    async fn remove_image(&self, item_id: &str, image_id: &str) -> Result<(), ApiError>;

    /// URL of an image's binary payload. No network call.
    fn image_url(&self, image_id: &str) -> String;
}

/// A user's favorite items.
#[async_trait]
pub trait FavoritesClient: Send + Sync {
    /// `GET /users/{id}/favoriteItems/`
    async fn favorites(&self, user_id: &str) -> Result<Vec<Item>, ApiError>;

    /// `POST /users/{id}/favoriteItems/?item_id=...`
    async fn add_favorite(&self, user_id: &str, item_id: &str) -> Result<(), ApiError>;

    /// `DELETE /users/{id}/favoriteItems/?item_id=...`
    async fn remove_favorite(&self, user_id: &str, item_id: &str) -> Result<(), ApiError>;
}
