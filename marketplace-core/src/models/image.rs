use serde::{Deserialize, Serialize};

/// A stored image attached to an item.
///
/// The binary payload lives on the server and is only ever referenced by id;
/// use `RemoteItemClient::image_url` to build a URL for it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Image {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
}

impl Image {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            item_id: None,
        }
    }

    pub fn for_item(id: impl Into<String>, item_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            item_id: Some(item_id.into()),
        }
    }
}
