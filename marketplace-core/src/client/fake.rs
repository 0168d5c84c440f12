//! In-memory backend that records every call, for tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use super::{ApiError, FavoritesClient, RemoteItemClient};
use crate::models::{Image, Item, ItemFields};
use crate::staging::ImageFile;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateItem,
    UpdateItem(String),
    GetItem(String),
    GetAllItems,
    DeleteItem(String),
    UploadImage { item_id: String, file_name: String },
    RemoveImage { item_id: String, image_id: String },
    Favorites(String),
    AddFavorite(String),
    RemoveFavorite(String),
}

impl Call {
    pub fn is_image_call(&self) -> bool {
        matches!(self, Call::UploadImage { .. } | Call::RemoveImage { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Failure {
    Create,
    Update,
    GetItem,
    GetAllItems,
    /// Upload of the file with this name
    Upload(String),
    /// Removal of the image with this id
    Remove(String),
    Favorites,
    ToggleFavorite,
}

#[derive(Default)]
struct State {
    items: HashMap<String, Item>,
    favorites: HashMap<String, Vec<String>>,
    calls: Vec<(Call, Duration)>,
    failures: HashSet<Failure>,
    next_id: u32,
}

pub struct FakeBackend {
    state: Mutex<State>,
    started: Instant,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            state: Mutex::new(State::default()),
            started: Instant::now(),
        }
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_item(self, item: Item) -> Self {
        self.state().items.insert(item.id.clone(), item);
        self
    }

    pub fn failing(self, failure: Failure) -> Self {
        self.state().failures.insert(failure);
        self
    }

    pub fn with_favorites(self, user_id: &str, item_ids: &[&str]) -> Self {
        self.state().favorites.insert(
            user_id.to_string(),
            item_ids.iter().map(|id| id.to_string()).collect(),
        );
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.iter().map(|(c, _)| c.clone()).collect()
    }

    /// Calls with the time elapsed since the backend was created.
    pub fn timed_calls(&self) -> Vec<(Call, Duration)> {
        self.state().calls.clone()
    }

    pub fn image_calls(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_image_call).collect()
    }

    pub fn stored_item(&self, id: &str) -> Option<Item> {
        self.state().items.get(id).cloned()
    }

    pub fn favorite_ids(&self, user_id: &str) -> Vec<String> {
        self.state().favorites.get(user_id).cloned().unwrap_or_default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    fn record(&self, call: Call) -> MutexGuard<'_, State> {
        let elapsed = self.started.elapsed();
        let mut state = self.state();
        state.calls.push((call, elapsed));
        state
    }

    fn server_error() -> ApiError {
        ApiError::Status {
            status: 500,
            message: "Internal Server Error".to_string(),
        }
    }

    fn not_found(id: &str) -> ApiError {
        ApiError::Status {
            status: 404,
            message: format!("Item {} not found", id),
        }
    }
}

fn apply(item: &mut Item, fields: &ItemFields) {
    item.title = fields.title.clone();
    item.category_id = fields.category_id.clone();
    item.price = fields.price;
    item.description = fields.description.clone();
    item.condition = Some(fields.condition);
    item.sold = fields.sold;
}

#[async_trait]
impl RemoteItemClient for FakeBackend {
    async fn create_item(&self, fields: &ItemFields) -> Result<Item, ApiError> {
        let mut state = self.record(Call::CreateItem);
        if state.failures.contains(&Failure::Create) {
            return Err(Self::server_error());
        }

        state.next_id += 1;
        let mut item = Item {
            id: format!("item-{}", state.next_id),
            title: String::new(),
            description: String::new(),
            price: 0.0,
            category_id: String::new(),
            condition: Some(fields.condition),
            sold: false,
            seller_id: fields.seller_id.clone().unwrap_or_default(),
            images: Vec::new(),
        };
        apply(&mut item, fields);
        state.items.insert(item.id.clone(), item.clone());
        Ok(item)
    }

    async fn update_item(&self, id: &str, fields: &ItemFields) -> Result<Item, ApiError> {
        let mut state = self.record(Call::UpdateItem(id.to_string()));
        if state.failures.contains(&Failure::Update) {
            return Err(Self::server_error());
        }

        let item = state.items.get_mut(id).ok_or_else(|| Self::not_found(id))?;
        apply(item, fields);
        Ok(item.clone())
    }

    async fn get_item(&self, id: &str) -> Result<Item, ApiError> {
        let state = self.record(Call::GetItem(id.to_string()));
        if state.failures.contains(&Failure::GetItem) {
            return Err(Self::server_error());
        }
        state.items.get(id).cloned().ok_or_else(|| Self::not_found(id))
    }

    async fn get_all_items(&self) -> Result<Vec<Item>, ApiError> {
        let state = self.record(Call::GetAllItems);
        if state.failures.contains(&Failure::GetAllItems) {
            return Err(Self::server_error());
        }
        let mut items: Vec<Item> = state.items.values().cloned().collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(items)
    }

    async fn delete_item(&self, id: &str) -> Result<(), ApiError> {
        let mut state = self.record(Call::DeleteItem(id.to_string()));
        state
            .items
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Self::not_found(id))
    }

    async fn upload_image(&self, item_id: &str, file: &ImageFile) -> Result<Image, ApiError> {
        let mut state = self.record(Call::UploadImage {
            item_id: item_id.to_string(),
            file_name: file.name.clone(),
        });
        if state.failures.contains(&Failure::Upload(file.name.clone())) {
            return Err(ApiError::Status {
                status: 413,
                message: "Payload Too Large".to_string(),
            });
        }

        state.next_id += 1;
        let image = Image::for_item(format!("img-{}", state.next_id), item_id);
        let item = state
            .items
            .get_mut(item_id)
            .ok_or_else(|| Self::not_found(item_id))?;
        item.images.push(image.clone());
        Ok(image)
    }

    async fn remove_image(&self, item_id: &str, image_id: &str) -> Result<(), ApiError> {
        let mut state = self.record(Call::RemoveImage {
            item_id: item_id.to_string(),
            image_id: image_id.to_string(),
        });
        if state.failures.contains(&Failure::Remove(image_id.to_string())) {
            return Err(Self::server_error());
        }

        let item = state
            .items
            .get_mut(item_id)
            .ok_or_else(|| Self::not_found(item_id))?;
        item.images.retain(|image| image.id != image_id);
        Ok(())
    }

    fn image_url(&self, image_id: &str) -> String {
        format!("fake://images/{}", image_id)
    }
}

#[async_trait]
impl FavoritesClient for FakeBackend {
    async fn favorites(&self, user_id: &str) -> Result<Vec<Item>, ApiError> {
        let state = self.record(Call::Favorites(user_id.to_string()));
        if state.failures.contains(&Failure::Favorites) {
            return Err(Self::server_error());
        }

        let ids = state.favorites.get(user_id).cloned().unwrap_or_default();
        Ok(ids
            .iter()
            .filter_map(|id| state.items.get(id).cloned())
            .collect())
    }

    async fn add_favorite(&self, user_id: &str, item_id: &str) -> Result<(), ApiError> {
        let mut state = self.record(Call::AddFavorite(item_id.to_string()));
        if state.failures.contains(&Failure::ToggleFavorite) {
            return Err(Self::server_error());
        }
        state
            .favorites
            .entry(user_id.to_string())
            .or_default()
            .push(item_id.to_string());
        Ok(())
    }

    async fn remove_favorite(&self, user_id: &str, item_id: &str) -> Result<(), ApiError> {
        let mut state = self.record(Call::RemoveFavorite(item_id.to_string()));
        if state.failures.contains(&Failure::ToggleFavorite) {
            return Err(Self::server_error());
        }
        if let Some(ids) = state.favorites.get_mut(user_id) {
            ids.retain(|id| id != item_id);
        }
        Ok(())
    }
}
