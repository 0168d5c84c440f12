use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use marketplace_core::{
    Category, Condition, HttpClient, ImageCompressor, ImageFile, Item, ItemEditSession,
    ItemSyncWorkflow, MemoryPreviews, PreviewRegistry, RemoteItemClient, SessionViewState,
    SyncOutcome,
};

use super::{confirm, OutputFormat};
use crate::config::Config;

#[derive(Args)]
pub struct ItemCommand {
    #[command(subcommand)]
    pub command: ItemSubcommand,
}

#[derive(Subcommand)]
pub enum ItemSubcommand {
    /// List items
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Only items sold by this user
        #[arg(long)]
        seller: Option<String>,

        /// Only items in this category
        #[arg(long)]
        category: Option<String>,

        /// Hide sold items
        #[arg(long)]
        available: bool,

        /// Only items whose title contains this text (case-insensitive)
        #[arg(long)]
        search: Option<String>,
    },

    /// Show item details
    Show {
        /// Item ID
        id: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Create a new item
    Create {
        /// Item title
        #[arg(long)]
        title: String,

        /// Price
        #[arg(long)]
        price: f64,

        /// Category ID
        #[arg(long)]
        category: String,

        /// Condition (new, like_new, good, fair, poor)
        #[arg(long)]
        condition: String,

        /// Description
        #[arg(long, short)]
        description: String,

        /// Image file to upload (can be repeated)
        #[arg(long = "image", value_name = "PATH")]
        images: Vec<PathBuf>,
    },

    /// Edit an item and its images
    Edit {
        /// Item ID
        id: String,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New price
        #[arg(long)]
        price: Option<f64>,

        /// New category ID
        #[arg(long)]
        category: Option<String>,

        /// New condition
        #[arg(long)]
        condition: Option<String>,

        /// New description
        #[arg(long, short)]
        description: Option<String>,

        /// Mark as sold (true/false)
        #[arg(long)]
        sold: Option<bool>,

        /// Image file to upload (can be repeated)
        #[arg(long = "image", value_name = "PATH")]
        images: Vec<PathBuf>,

        /// Existing image ID to remove (can be repeated)
        #[arg(long = "remove-image", value_name = "IMAGE_ID")]
        remove_images: Vec<String>,
    },

    /// Delete an item
    Delete {
        /// Item ID
        id: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

impl ItemCommand {
    pub async fn run(
        &self,
        client: &HttpClient,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ItemSubcommand::List {
                format,
                seller,
                category,
                available,
                search,
            } => {
                let mut items = match seller {
                    Some(seller) => client.user_items(seller).await?,
                    None => client.get_all_items().await?,
                };

                if let Some(category) = category {
                    items.retain(|item| &item.category_id == category);
                }
                if *available {
                    items.retain(|item| !item.sold);
                }
                if let Some(query) = search {
                    items.retain(|item| matches_search(item, query));
                }

                if items.is_empty() {
                    println!("No items found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&items)?);
                    }
                    OutputFormat::Text => {
                        for item in &items {
                            println!("{}", list_line(item));
                        }
                        println!("\nTotal: {} item(s)", items.len());
                    }
                }
                Ok(())
            }

            ItemSubcommand::Show { id, format } => {
                let item = client.get_item(id).await?;

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&item)?);
                    }
                    OutputFormat::Text => {
                        let category = category_name(client, &item.category_id).await;
                        let seller = seller_name(client, &item.seller_id).await;
                        print!("{}", item.details(category.as_deref(), seller.as_deref()));
                        if !item.images.is_empty() {
                            println!("\nImage URLs:");
                            for image in &item.images {
                                println!("  {}", client.image_url(&image.id));
                            }
                        }

                        let view = viewing(client, config, item).await;
                        if view.is_favorited() {
                            println!("\nIn your favorites");
                        }
                    }
                }
                Ok(())
            }

            ItemSubcommand::Create {
                title,
                price,
                category,
                condition,
                description,
                images,
            } => {
                let seller = config.require_user()?;
                let condition: Condition = condition.parse().map_err(|e: String| e)?;

                let mut session = ItemEditSession::create(
                    seller,
                    config.uploads.staging_limits(),
                    previews(),
                );
                session.form.title = title.clone();
                session.form.price = Some(*price);
                session.form.category_id = category.clone();
                session.form.condition = Some(condition);
                session.form.description = description.clone();

                stage_images(&mut session, images)?;

                let view = SessionViewState::new();
                view.set_current_user(Some(seller.to_string()));

                let outcome = save(client, config, &mut session).await?;
                println!("Created item:");
                print!("{}", render_outcome(&view, &outcome));
                Ok(())
            }

            ItemSubcommand::Edit {
                id,
                title,
                price,
                category,
                condition,
                description,
                sold,
                images,
                remove_images,
            } => {
                let item = client.get_item(id).await?;
                if let Some(user_id) = &config.user_id.value {
                    if !item.is_owned_by(user_id) {
                        tracing::warn!("Item {} belongs to {}", item.id, item.seller_id);
                    }
                }

                let view = viewing(client, config, item.clone()).await;
                let mut session =
                    ItemEditSession::edit(item, config.uploads.staging_limits(), previews());

                if let Some(title) = title {
                    session.form.title = title.clone();
                }
                if let Some(price) = price {
                    session.form.price = Some(*price);
                }
                if let Some(category) = category {
                    session.form.category_id = category.clone();
                }
                if let Some(condition) = condition {
                    session.form.condition = Some(condition.parse().map_err(|e: String| e)?);
                }
                if let Some(description) = description {
                    session.form.description = description.clone();
                }
                if let Some(sold) = sold {
                    session.form.sold = *sold;
                }

                // Removals first so they free slots for the new files.
                for image_id in remove_images {
                    session.images.mark_existing_for_deletion(image_id)?;
                }
                stage_images(&mut session, images)?;

                let outcome = save(client, config, &mut session).await?;
                println!("Updated item:");
                print!("{}", render_outcome(&view, &outcome));
                Ok(())
            }

            ItemSubcommand::Delete { id, force } => {
                let item = client.get_item(id).await?;

                if !force && !confirm(&format!("Delete item '{}' ({})?", item.title, item.id))? {
                    println!("Deletion cancelled.");
                    return Ok(());
                }

                client.delete_item(&item.id).await?;
                println!("Deleted item: {}", item.title);
                Ok(())
            }
        }
    }
}

fn previews() -> Arc<dyn PreviewRegistry> {
    Arc::new(MemoryPreviews::new())
}

fn matches_search(item: &Item, query: &str) -> bool {
    item.title
        .to_lowercase()
        .contains(&query.trim().to_lowercase())
}

fn find_category_name(categories: &[Category], category_id: &str) -> Option<String> {
    categories
        .iter()
        .find(|category| category.id == category_id)
        .map(|category| category.name.clone())
}

/// Category name for the detail view. Failures fall back to the bare id.
async fn category_name(client: &HttpClient, category_id: &str) -> Option<String> {
    match client.list_categories().await {
        Ok(categories) => find_category_name(&categories, category_id),
        Err(e) => {
            tracing::warn!("Could not load categories: {}", e);
            None
        }
    }
}

async fn seller_name(client: &HttpClient, seller_id: &str) -> Option<String> {
    match client.get_user(seller_id).await {
        Ok(user) => Some(user.display_name().to_string()),
        Err(e) => {
            tracing::warn!("Could not load seller {}: {}", seller_id, e);
            None
        }
    }
}

/// View state for `item` as seen by the configured user, with its favorite
/// status loaded when someone is logged in.
async fn viewing(client: &HttpClient, config: &Config, item: Item) -> SessionViewState {
    let view = SessionViewState::new();
    view.set_current_user(config.user_id.value.clone());
    view.select_item(item);
    if view.current_user().is_some() {
        if let Err(e) = view.refresh_favorite_status(client).await {
            tracing::warn!("Could not load favorites: {}", e);
        }
    }
    view
}

fn list_line(item: &Item) -> String {
    let mut line = format!(
        "{:<24} {:<32} ${:>9.2}  {}",
        item.id,
        item.title,
        item.price,
        item.condition_label()
    );
    if item.sold {
        line.push_str("  [sold]");
    }
    line
}

/// Reads an image from disk, detecting its MIME type from the content.
fn load_image(path: &Path) -> Result<ImageFile, Box<dyn std::error::Error>> {
    let data = std::fs::read(path)
        .map_err(|e| format!("Failed to read image '{}': {}", path.display(), e))?;
    let mime_type = infer::get(&data)
        .map(|kind| kind.mime_type())
        .unwrap_or("application/octet-stream");
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(ImageFile::new(name, mime_type, data))
}

fn stage_images(
    session: &mut ItemEditSession,
    paths: &[PathBuf],
) -> Result<(), Box<dyn std::error::Error>> {
    for path in paths {
        let file = load_image(path)?;
        let staged = session.images.add_candidate(file)?;
        tracing::debug!("Staged {} as {}", path.display(), staged.temp_id());
    }
    Ok(())
}

async fn save(
    client: &HttpClient,
    config: &Config,
    session: &mut ItemEditSession,
) -> Result<SyncOutcome, Box<dyn std::error::Error>> {
    let outcome = ItemSyncWorkflow::new(client)
        .with_compressor(ImageCompressor::new(config.uploads.compression()))
        .with_pacing(config.uploads.pacing())
        .run(session)
        .await?;
    Ok(outcome)
}

/// Applies a finished save to the view and renders the saved item with any
/// warnings.
fn render_outcome(view: &SessionViewState, outcome: &SyncOutcome) -> String {
    view.apply_workflow_result(outcome.item.clone());

    let mut out = String::new();
    if let Some(item) = view.selected_item() {
        out.push_str(&item.to_string());
    }
    if view.is_favorited() {
        out.push_str("\nIn your favorites\n");
    }

    if outcome.has_warnings() {
        out.push_str("\nSaved with warnings:\n");
        for failure in &outcome.partial_image_errors {
            out.push_str(&format!("  - {}\n", failure));
        }
        if let Some(refetch) = &outcome.refetch_error {
            out.push_str(&format!("  - {}\n", refetch));
        }
    }
    out
}
