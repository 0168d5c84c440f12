//! HTTP client for the marketplace REST backend.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use super::{ApiError, FavoritesClient, RemoteItemClient};
use crate::models::{Category, Image, Item, ItemFields, Review, ReviewInput, User, UserProfile};
use crate::staging::ImageFile;

/// Backend location used when nothing is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:8080";

/// Multipart field the backend reads uploads from.
const IMAGE_FIELD: &str = "image_file";

/// Adds `http://` to bare hosts and strips trailing slashes.
pub fn normalize_base_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

/// Picks a human readable message out of an error response body.
fn error_message(status: StatusCode, body: &str) -> String {
    let from_json = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("message")
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .filter(|m| !m.is_empty());

    match from_json {
        Some(message) => message,
        None if !body.trim().is_empty() => body.trim().to_string(),
        None => status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string(),
    }
}

/// Client for the marketplace backend.
#[derive(Debug, Clone)]
pub struct HttpClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    pub fn with_client(base_url: &str, http: reqwest::Client) -> Self {
        Self {
            base_url: normalize_base_url(base_url),
            http,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Status {
            status: status.as_u16(),
            message: error_message(status, &body),
        })
    }

    async fn fetch<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ApiError> {
        let response = Self::send(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn execute(request: RequestBuilder) -> Result<(), ApiError> {
        Self::send(request).await?;
        Ok(())
    }

    // Categories

    pub async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        Self::fetch(self.http.get(self.url("/categories/"))).await
    }

    // Users

    pub async fn get_user(&self, user_id: &str) -> Result<User, ApiError> {
        Self::fetch(self.http.get(self.url(&format!("/users/{}", user_id)))).await
    }

    pub async fn update_user(&self, user_id: &str, profile: &UserProfile) -> Result<User, ApiError> {
        Self::fetch(
            self.http
                .put(self.url(&format!("/users/{}", user_id)))
                .json(profile),
        )
        .await
    }

    pub async fn user_items(&self, user_id: &str) -> Result<Vec<Item>, ApiError> {
        Self::fetch(self.http.get(self.url(&format!("/users/{}/items/", user_id)))).await
    }

    // Reviews

    pub async fn written_reviews(&self, user_id: &str) -> Result<Vec<Review>, ApiError> {
        Self::fetch(
            self.http
                .get(self.url(&format!("/users/{}/writtenReviews/", user_id))),
        )
        .await
    }

    pub async fn received_reviews(&self, user_id: &str) -> Result<Vec<Review>, ApiError> {
        Self::fetch(
            self.http
                .get(self.url(&format!("/users/{}/receivedReviews/", user_id))),
        )
        .await
    }

    pub async fn create_review(&self, review: &ReviewInput) -> Result<Review, ApiError> {
        Self::fetch(self.http.post(self.url("/reviews/")).json(review)).await
    }

    pub async fn update_review(
        &self,
        review_id: &str,
        review: &ReviewInput,
    ) -> Result<Review, ApiError> {
        Self::fetch(
            self.http
                .put(self.url(&format!("/reviews/{}", review_id)))
                .json(review),
        )
        .await
    }

    pub async fn delete_review(&self, review_id: &str) -> Result<(), ApiError> {
        Self::execute(self.http.delete(self.url(&format!("/reviews/{}", review_id)))).await
    }

    fn favorites_url(&self, user_id: &str) -> String {
        self.url(&format!("/users/{}/favoriteItems/", user_id))
    }
}

#[async_trait]
impl RemoteItemClient for HttpClient {
    async fn create_item(&self, fields: &ItemFields) -> Result<Item, ApiError> {
        Self::fetch(self.http.post(self.url("/items/")).json(fields)).await
    }

    async fn update_item(&self, id: &str, fields: &ItemFields) -> Result<Item, ApiError> {
        Self::fetch(
            self.http
                .put(self.url(&format!("/items/{}", id)))
                .json(fields),
        )
        .await
    }

    async fn get_item(&self, id: &str) -> Result<Item, ApiError> {
        Self::fetch(self.http.get(self.url(&format!("/items/{}", id)))).await
    }

    async fn get_all_items(&self) -> Result<Vec<Item>, ApiError> {
        Self::fetch(self.http.get(self.url("/items/"))).await
    }

    async fn delete_item(&self, id: &str) -> Result<(), ApiError> {
        Self::execute(self.http.delete(self.url(&format!("/items/{}", id)))).await
    }

    async fn upload_image(&self, item_id: &str, file: &ImageFile) -> Result<Image, ApiError> {
        let part = Part::bytes(file.data.clone())
            .file_name(file.name.clone())
            .mime_str(&file.mime_type)?;
        let form = Form::new().part(IMAGE_FIELD, part);

        Self::fetch(
            self.http
                .post(self.url(&format!("/items/{}/images", item_id)))
                .multipart(form),
        )
        .await
    }

    async fn remove_image(&self, item_id: &str, image_id: &str) -> Result<(), ApiError> {
        Self::execute(
            self.http
                .delete(self.url(&format!("/items/{}/images/{}", item_id, image_id))),
        )
        .await
    }

    fn image_url(&self, image_id: &str) -> String {
        self.url(&format!("/images/{}", image_id))
    }
}

#[async_trait]
impl FavoritesClient for HttpClient {
    async fn favorites(&self, user_id: &str) -> Result<Vec<Item>, ApiError> {
        Self::fetch(self.http.get(self.favorites_url(user_id))).await
    }

    async fn add_favorite(&self, user_id: &str, item_id: &str) -> Result<(), ApiError> {
        Self::execute(
            self.http
                .post(self.favorites_url(user_id))
                .query(&[("item_id", item_id)]),
        )
        .await
    }

    async fn remove_favorite(&self, user_id: &str, item_id: &str) -> Result<(), ApiError> {
        Self::execute(
            self.http
                .delete(self.favorites_url(user_id))
                .query(&[("item_id", item_id)]),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(normalize_base_url("http://localhost:8080"), "http://localhost:8080");
        assert_eq!(normalize_base_url("http://localhost:8080/"), "http://localhost:8080");
        assert_eq!(normalize_base_url("https://shop.example.com//"), "https://shop.example.com");
        assert_eq!(normalize_base_url("localhost:8080"), "http://localhost:8080");
        assert_eq!(normalize_base_url("  localhost:8080 "), "http://localhost:8080");
    }

    #[test]
    fn test_image_url_is_pure() {
        let client = HttpClient::new("localhost:8080/");
        assert_eq!(client.base_url(), "http://localhost:8080");
        assert_eq!(client.image_url("abc"), "http://localhost:8080/images/abc");
    }

    #[test]
    fn test_endpoint_urls() {
        let client = HttpClient::new("http://api.test");
        assert_eq!(client.url("/items/"), "http://api.test/items/");
        assert_eq!(
            client.favorites_url("u1"),
            "http://api.test/users/u1/favoriteItems/"
        );
    }

    #[test]
    fn test_error_message_prefers_json_message() {
        let body = r#"{"message":"Item not found","status":404}"#;
        assert_eq!(error_message(StatusCode::NOT_FOUND, body), "Item not found");
    }

    #[test]
    fn test_error_message_falls_back_to_body_then_reason() {
        assert_eq!(
            error_message(StatusCode::PAYLOAD_TOO_LARGE, "too big\n"),
            "too big"
        );
        assert_eq!(
            error_message(StatusCode::INTERNAL_SERVER_ERROR, ""),
            "Internal Server Error"
        );
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, r#"{"message":""}"#),
            r#"{"message":""}"#
        );
    }
}
