use clap::{Args, Subcommand};

use marketplace_core::{FavoritesClient, HttpClient, RemoteItemClient, SessionViewState};

use super::OutputFormat;
use crate::config::Config;

#[derive(Args)]
pub struct FavoriteCommand {
    #[command(subcommand)]
    pub command: FavoriteSubcommand,
}

#[derive(Subcommand)]
pub enum FavoriteSubcommand {
    /// Add an item to your favorites, or remove it if already there
    Toggle {
        /// Item ID
        item_id: String,
    },

    /// List your favorite items
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl FavoriteCommand {
    pub async fn run(
        &self,
        client: &HttpClient,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let user_id = config.require_user()?;

        match &self.command {
            FavoriteSubcommand::Toggle { item_id } => {
                let view = SessionViewState::new();
                view.set_current_user(Some(user_id.to_string()));
                view.select_item(client.get_item(item_id).await?);
                view.refresh_favorite_status(client).await?;

                let favorited = view.toggle_favorite(client).await?;
                let title = view
                    .selected_item()
                    .map(|item| item.title)
                    .unwrap_or_else(|| item_id.clone());
                if favorited {
                    println!("Added to favorites: {}", title);
                } else {
                    println!("Removed from favorites: {}", title);
                }
                Ok(())
            }

            FavoriteSubcommand::List { format } => {
                let items = client.favorites(user_id).await?;

                if items.is_empty() {
                    println!("No favorite items");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&items)?);
                    }
                    OutputFormat::Text => {
                        for item in &items {
                            let status = if item.sold { " [sold]" } else { "" };
                            println!("{:<24} {} (${:.2}){}", item.id, item.title, item.price, status);
                        }
                        println!("\nTotal: {} favorite(s)", items.len());
                    }
                }
                Ok(())
            }
        }
    }
}
