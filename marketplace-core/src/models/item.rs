use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use super::image::Image;

/// Condition of a listed item, as the backend spells it (`LIKE_NEW`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Condition {
    #[default]
    New,
    LikeNew,
    Good,
    Fair,
    Poor,
}

impl Condition {
    pub const ALL: [Condition; 5] = [
        Condition::New,
        Condition::LikeNew,
        Condition::Good,
        Condition::Fair,
        Condition::Poor,
    ];

    /// Human readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Condition::New => "New",
            Condition::LikeNew => "Like New",
            Condition::Good => "Good",
            Condition::Fair => "Fair",
            Condition::Poor => "Poor",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::New => write!(f, "NEW"),
            Condition::LikeNew => write!(f, "LIKE_NEW"),
            Condition::Good => write!(f, "GOOD"),
            Condition::Fair => write!(f, "FAIR"),
            Condition::Poor => write!(f, "POOR"),
        }
    }
}

impl FromStr for Condition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace(['-', ' '], "_").as_str() {
            "NEW" => Ok(Condition::New),
            "LIKE_NEW" => Ok(Condition::LikeNew),
            "GOOD" => Ok(Condition::Good),
            "FAIR" => Ok(Condition::Fair),
            "POOR" => Ok(Condition::Poor),
            _ => Err(format!(
                "Invalid condition '{}'. Valid options: new, like_new, good, fair, poor",
                s
            )),
        }
    }
}

/// Treats an explicit `null` the same as a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The backend stores the condition as free text, so anything unrecognised
/// (or null) decodes as unknown instead of failing the whole response.
fn lenient_condition<'de, D>(deserializer: D) -> Result<Option<Condition>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| value.parse().ok()))
}

/// An item as returned by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub price: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category_id: String,
    #[serde(
        rename = "itemCondition",
        default,
        deserialize_with = "lenient_condition"
    )]
    pub condition: Option<Condition>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sold: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub seller_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<Image>,
}

impl Item {
    /// Returns true if `image_id` is one of this item's images.
    pub fn has_image(&self, image_id: &str) -> bool {
        self.images.iter().any(|image| image.id == image_id)
    }

    /// Returns true if `user_id` owns this item.
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.seller_id == user_id
    }

    pub fn condition_label(&self) -> &'static str {
        self.condition.map(|c| c.label()).unwrap_or("Unknown")
    }

    /// Detailed view showing category and seller names instead of ids where
    /// they are known.
    pub fn details<'a>(
        &'a self,
        category_name: Option<&'a str>,
        seller_name: Option<&'a str>,
    ) -> ItemDetails<'a> {
        ItemDetails {
            item: self,
            category_name,
            seller_name,
        }
    }
}

/// Text rendering of an [`Item`], see [`Item::details`].
pub struct ItemDetails<'a> {
    item: &'a Item,
    category_name: Option<&'a str>,
    seller_name: Option<&'a str>,
}

impl fmt::Display for ItemDetails<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let item = self.item;
        writeln!(f, "{}", item.title)?;
        writeln!(f, "{}", "=".repeat(item.title.len()))?;
        writeln!(f, "Price:     ${:.2}", item.price)?;
        writeln!(f, "Condition: {}", item.condition_label())?;
        writeln!(
            f,
            "Status:    {}",
            if item.sold { "Sold" } else { "Available" }
        )?;
        match self.category_name {
            Some(name) => writeln!(f, "Category:  {} ({})", name, item.category_id)?,
            None => writeln!(f, "Category:  {}", item.category_id)?,
        }
        match self.seller_name {
            Some(name) => writeln!(f, "Seller:    {} ({})", name, item.seller_id)?,
            None => writeln!(f, "Seller:    {}", item.seller_id)?,
        }

        if !item.description.is_empty() {
            writeln!(f, "\n{}", item.description)?;
        }

        if !item.images.is_empty() {
            writeln!(f, "\nImages ({}):", item.images.len())?;
            for image in &item.images {
                writeln!(f, "  - {}", image.id)?;
            }
        }

        Ok(())
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.details(None, None), f)
    }
}

/// Request body for creating or updating an item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemFields {
    pub title: String,
    pub category_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seller_id: Option<String>,
    pub price: f64,
    pub description: String,
    #[serde(rename = "itemCondition")]
    pub condition: Condition,
    pub sold: bool,
}
