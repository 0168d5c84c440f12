//! Current user, selected item and its favorite status.

use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use crate::client::{ApiError, FavoritesClient};
use crate::models::Item;

#[derive(Debug, Error)]
pub enum ViewStateError {
    #[error("No user is logged in")]
    NotLoggedIn,

    #[error("No item is selected")]
    NoItemSelected,

    #[error("A favorite update is already in progress")]
    ToggleInFlight,

    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug, Default, Clone)]
struct Inner {
    current_user: Option<String>,
    selected_item: Option<Item>,
    is_favorited: bool,
    favorite_action_in_flight: bool,
}

/// Shared view state. All methods take `&self`, so favorite toggles and
/// workflow results may be applied from different tasks.
#[derive(Debug, Default)]
pub struct SessionViewState {
    inner: Mutex<Inner>,
}

/// Clears the in-flight flag when the toggle finishes or is abandoned.
struct InFlight<'a>(&'a SessionViewState);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.lock().favorite_action_in_flight = false;
    }
}

impl SessionViewState {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_current_user(&self, user_id: Option<String>) {
        let mut inner = self.lock();
        inner.current_user = user_id;
        inner.is_favorited = false;
    }

    pub fn current_user(&self) -> Option<String> {
        self.lock().current_user.clone()
    }

    pub fn selected_item(&self) -> Option<Item> {
        self.lock().selected_item.clone()
    }

    pub fn is_favorited(&self) -> bool {
        self.lock().is_favorited
    }

    pub fn favorite_action_in_flight(&self) -> bool {
        self.lock().favorite_action_in_flight
    }

    /// Shows a different item. Its favorite status is unknown until
    /// [`refresh_favorite_status`](Self::refresh_favorite_status) runs.
    pub fn select_item(&self, item: Item) {
        let mut inner = self.lock();
        inner.selected_item = Some(item);
        inner.is_favorited = false;
    }

    /// Replaces the selected item with the result of a save. The favorite
    /// flag is left alone.
    pub fn apply_workflow_result(&self, item: Item) {
        self.lock().selected_item = Some(item);
    }

    fn user_and_item(&self) -> Result<(String, String), ViewStateError> {
        let inner = self.lock();
        let user = inner
            .current_user
            .clone()
            .ok_or(ViewStateError::NotLoggedIn)?;
        let item = inner
            .selected_item
            .as_ref()
            .map(|item| item.id.clone())
            .ok_or(ViewStateError::NoItemSelected)?;
        Ok((user, item))
    }

    fn still_selected(inner: &Inner, item_id: &str) -> bool {
        inner
            .selected_item
            .as_ref()
            .is_some_and(|item| item.id == item_id)
    }

    /// Recomputes the favorite flag from the user's favorites list.
    pub async fn refresh_favorite_status<F>(&self, client: &F) -> Result<bool, ViewStateError>
    where
        F: FavoritesClient + ?Sized,
    {
        let (user_id, item_id) = self.user_and_item()?;
        let favorites = client.favorites(&user_id).await?;
        let favorited = favorites.iter().any(|item| item.id == item_id);

        let mut inner = self.lock();
        if Self::still_selected(&inner, &item_id) {
            inner.is_favorited = favorited;
        }
        Ok(favorited)
    }

    /// Adds or removes the selected item from the user's favorites and
    /// returns the new status. A second call while one is running is
    /// rejected; on failure the flag keeps its old value.
    pub async fn toggle_favorite<F>(&self, client: &F) -> Result<bool, ViewStateError>
    where
        F: FavoritesClient + ?Sized,
    {
        let (user_id, item_id, was_favorited) = {
            let (user_id, item_id) = self.user_and_item()?;
            let mut inner = self.lock();
            if inner.favorite_action_in_flight {
                return Err(ViewStateError::ToggleInFlight);
            }
            inner.favorite_action_in_flight = true;
            (user_id, item_id, inner.is_favorited)
        };
        let _in_flight = InFlight(self);

        let result = if was_favorited {
            client.remove_favorite(&user_id, &item_id).await
        } else {
            client.add_favorite(&user_id, &item_id).await
        };

        if let Err(e) = result {
            tracing::warn!("Failed to update favorite for item {}: {}", item_id, e);
            return Err(e.into());
        }

        let mut inner = self.lock();
        if Self::still_selected(&inner, &item_id) {
            inner.is_favorited = !was_favorited;
        }
        Ok(!was_favorited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fake::{Call, FakeBackend, Failure};
    use crate::models::{Condition, Image};
    use async_trait::async_trait;
    use std::time::Duration;

    fn item(id: &str) -> Item {
        Item {
            id: id.to_string(),
            title: "Bike".to_string(),
            description: "red".to_string(),
            price: 90.0,
            category_id: "c1".to_string(),
            condition: Some(Condition::LikeNew),
            sold: false,
            seller_id: "u2".to_string(),
            images: vec![Image::new("a")],
        }
    }

    fn logged_in_viewing(id: &str) -> SessionViewState {
        let state = SessionViewState::new();
        state.set_current_user(Some("u1".to_string()));
        state.select_item(item(id));
        state
    }

    #[tokio::test]
    async fn test_toggle_adds_then_removes() {
        let backend = FakeBackend::new().with_item(item("i1"));
        let state = logged_in_viewing("i1");

        assert!(state.toggle_favorite(&backend).await.unwrap());
        assert!(state.is_favorited());
        assert_eq!(backend.favorite_ids("u1"), vec!["i1"]);

        assert!(!state.toggle_favorite(&backend).await.unwrap());
        assert!(!state.is_favorited());
        assert!(backend.favorite_ids("u1").is_empty());
        assert!(!state.favorite_action_in_flight());
    }

    #[tokio::test]
    async fn test_toggle_failure_leaves_state() {
        let backend = FakeBackend::new().failing(Failure::ToggleFavorite);
        let state = logged_in_viewing("i1");

        let err = state.toggle_favorite(&backend).await.unwrap_err();
        assert!(matches!(err, ViewStateError::Api(_)));
        assert!(!state.is_favorited());
        assert!(!state.favorite_action_in_flight());
    }

    #[tokio::test]
    async fn test_toggle_requires_user_and_item() {
        let backend = FakeBackend::new();
        let state = SessionViewState::new();
        assert!(matches!(
            state.toggle_favorite(&backend).await,
            Err(ViewStateError::NotLoggedIn)
        ));

        state.set_current_user(Some("u1".to_string()));
        assert!(matches!(
            state.toggle_favorite(&backend).await,
            Err(ViewStateError::NoItemSelected)
        ));
        assert!(backend.calls().is_empty());
    }

    struct SlowFavorites(FakeBackend);

    #[async_trait]
    impl FavoritesClient for SlowFavorites {
        async fn favorites(&self, user_id: &str) -> Result<Vec<Item>, ApiError> {
            self.0.favorites(user_id).await
        }

        async fn add_favorite(&self, user_id: &str, item_id: &str) -> Result<(), ApiError> {
            tokio::time::sleep(Duration::from_millis(100)).await;
            self.0.add_favorite(user_id, item_id).await
        }

        async fn remove_favorite(&self, user_id: &str, item_id: &str) -> Result<(), ApiError> {
            tokio::time::sleep(Duration::from_millis(100)).await;
            self.0.remove_favorite(user_id, item_id).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_toggle_is_rejected() {
        let client = SlowFavorites(FakeBackend::new());
        let state = logged_in_viewing("i1");

        let (first, second) = tokio::join!(
            state.toggle_favorite(&client),
            state.toggle_favorite(&client)
        );

        assert!(first.unwrap());
        assert!(matches!(second, Err(ViewStateError::ToggleInFlight)));
        assert_eq!(client.0.calls(), vec![Call::AddFavorite("i1".to_string())]);
        assert!(state.is_favorited());
    }

    #[tokio::test]
    async fn test_refresh_favorite_status() {
        let backend = FakeBackend::new()
            .with_item(item("i1"))
            .with_item(item("i2"))
            .with_favorites("u1", &["i2"]);
        let state = logged_in_viewing("i2");

        assert!(state.refresh_favorite_status(&backend).await.unwrap());
        assert!(state.is_favorited());

        state.select_item(item("i1"));
        assert!(!state.is_favorited());
        assert!(!state.refresh_favorite_status(&backend).await.unwrap());
    }

    #[tokio::test]
    async fn test_workflow_result_keeps_favorite_flag() {
        let backend = FakeBackend::new()
            .with_item(item("i1"))
            .with_favorites("u1", &["i1"]);
        let state = logged_in_viewing("i1");
        state.refresh_favorite_status(&backend).await.unwrap();

        let mut saved = item("i1");
        saved.title = "Blue bike".to_string();
        saved.images.clear();
        state.apply_workflow_result(saved);

        assert!(state.is_favorited());
        let selected = state.selected_item().unwrap();
        assert_eq!(selected.title, "Blue bike");
        assert!(selected.images.is_empty());
    }
}
