//! Item edit sessions: the form being edited plus its staged images.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::models::{Condition, Item, ItemFields};
use crate::staging::{ImageStagingBuffer, PreviewRegistry, StagingLimits};

/// Form fields that can fail validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Title,
    Price,
    Description,
    Category,
    Condition,
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormField::Title => write!(f, "title"),
            FormField::Price => write!(f, "price"),
            FormField::Description => write!(f, "description"),
            FormField::Category => write!(f, "category"),
            FormField::Condition => write!(f, "condition"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: FormField,
    pub reason: &'static str,
}

/// Every field-level problem found in a form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", describe(.0))]
pub struct FormErrors(pub Vec<FieldError>);

fn describe(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{} {}", e.field, e.reason))
        .collect::<Vec<_>>()
        .join(", ")
}

impl FormErrors {
    pub fn has(&self, field: FormField) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    pub fn fields(&self) -> Vec<FormField> {
        self.0.iter().map(|e| e.field).collect()
    }
}

/// Item fields as entered by the user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemForm {
    pub title: String,
    pub description: String,
    pub price: Option<f64>,
    pub category_id: String,
    pub condition: Option<Condition>,
    pub sold: bool,
}

impl ItemForm {
    /// Pre-fills a form from an existing item.
    pub fn from_item(item: &Item) -> Self {
        Self {
            title: item.title.clone(),
            description: item.description.clone(),
            price: Some(item.price),
            category_id: item.category_id.clone(),
            condition: item.condition,
            sold: item.sold,
        }
    }

    /// Checks all required fields and builds the request body.
    pub fn validate(&self, seller_id: Option<&str>) -> Result<ItemFields, FormErrors> {
        let mut errors = Vec::new();
        let mut require = |field, ok: bool, reason| {
            if !ok {
                errors.push(FieldError { field, reason });
            }
        };

        require(FormField::Title, !self.title.trim().is_empty(), "is required");
        require(
            FormField::Price,
            self.price.is_some_and(|p| p.is_finite() && p > 0.0),
            "must be greater than zero",
        );
        require(
            FormField::Description,
            !self.description.trim().is_empty(),
            "is required",
        );
        require(
            FormField::Category,
            !self.category_id.trim().is_empty(),
            "is required",
        );
        require(FormField::Condition, self.condition.is_some(), "is required");

        match (self.price, self.condition) {
            (Some(price), Some(condition)) if errors.is_empty() => Ok(ItemFields {
                title: self.title.trim().to_string(),
                category_id: self.category_id.trim().to_string(),
                seller_id: seller_id.map(String::from),
                price,
                description: self.description.trim().to_string(),
                condition,
                sold: self.sold,
            }),
            _ => Err(FormErrors(errors)),
        }
    }
}

/// Whether a session creates a new item or edits an existing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditMode {
    Create { seller_id: String },
    Edit { item_id: String },
}

/// One open create/edit form.
///
/// Dropping the session (or calling [`ItemEditSession::cancel`]) releases every
/// staged preview.
#[derive(Debug)]
pub struct ItemEditSession {
    mode: EditMode,
    pub form: ItemForm,
    pub images: ImageStagingBuffer,
    original: Option<Item>,
}

impl ItemEditSession {
    /// Opens a form for a new item owned by `seller_id`.
    pub fn create(
        seller_id: impl Into<String>,
        limits: StagingLimits,
        previews: Arc<dyn PreviewRegistry>,
    ) -> Self {
        Self {
            mode: EditMode::Create {
                seller_id: seller_id.into(),
            },
            form: ItemForm::default(),
            images: ImageStagingBuffer::new(Vec::new(), limits, previews),
            original: None,
        }
    }

    /// Opens a form pre-filled from `item`.
    pub fn edit(item: Item, limits: StagingLimits, previews: Arc<dyn PreviewRegistry>) -> Self {
        Self {
            mode: EditMode::Edit {
                item_id: item.id.clone(),
            },
            form: ItemForm::from_item(&item),
            images: ImageStagingBuffer::new(item.images.clone(), limits, previews),
            original: Some(item),
        }
    }

    pub fn mode(&self) -> &EditMode {
        &self.mode
    }

    /// The item as it was when the session opened, in edit mode.
    pub fn original(&self) -> Option<&Item> {
        self.original.as_ref()
    }

    /// Seller to attach to a newly created item.
    pub fn seller_id(&self) -> Option<&str> {
        match &self.mode {
            EditMode::Create { seller_id } => Some(seller_id),
            EditMode::Edit { .. } => None,
        }
    }

    /// Switches a create session to edit mode once its item exists, so a
    /// retry after a partial failure updates instead of creating a duplicate.
    pub(crate) fn committed(&mut self, item: &Item) {
        self.mode = EditMode::Edit {
            item_id: item.id.clone(),
        };
        self.original = Some(item.clone());
        self.images.replace_existing(item.images.clone());
    }

    /// Abandons the session, revoking all previews.
    pub fn cancel(mut self) {
        self.images.reset();
    }
}
