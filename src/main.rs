use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

use commands::{
    CategoryCommand, ConfigCommand, FavoriteCommand, ItemCommand, ReviewCommand, UserCommand,
};
use config::Config;
use marketplace_core::HttpClient;

#[derive(Parser)]
#[command(name = "market")]
#[command(version)]
#[command(about = "Command-line client for the marketplace", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse and manage items and their images
    Item(ItemCommand),

    /// Manage your favorite items
    Favorite(FavoriteCommand),

    /// List item categories
    Category(CategoryCommand),

    /// Read and write user reviews
    Review(ReviewCommand),

    /// Show and update user profiles
    User(UserCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    // Logs go to stderr so command output stays pipeable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "market=info,marketplace_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config)?;
    let client = HttpClient::new(&config.api_url.value);
    tracing::debug!("Using backend at {}", client.base_url());

    match cli.command {
        Some(Commands::Item(cmd)) => {
            cmd.run(&client, &config).await?;
        }
        Some(Commands::Favorite(cmd)) => {
            cmd.run(&client, &config).await?;
        }
        Some(Commands::Category(cmd)) => {
            cmd.run(&client).await?;
        }
        Some(Commands::Review(cmd)) => {
            cmd.run(&client, &config).await?;
        }
        Some(Commands::User(cmd)) => {
            cmd.run(&client, &config).await?;
        }
        Some(Commands::Config(cmd)) => {
            cmd.run(&config)?;
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}
