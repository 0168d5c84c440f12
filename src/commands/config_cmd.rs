use clap::{Args, Subcommand};
use std::fs;
use std::io::Write;

use super::OutputFormat;
use crate::config::Config;

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Initialize configuration file
    Init,
}

const DEFAULT_CONFIG: &str = r#"# market configuration

# Marketplace backend
api_url: http://localhost:8080

# Your user ID (seller for new items, owner of favorites and reviews)
# user_id: your-user-id

# uploads:
#   max_images: 10
#   max_image_bytes: 2097152
#   compress_threshold_bytes: 2097152
#   max_dimension: 1200
#   jpeg_quality: 80
#   delete_delay_ms: 200
#   upload_delay_ms: 500
#   refetch_delay_ms: 1000
"#;

impl ConfigCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    OutputFormat::Text => {
                        println!("Configuration");
                        println!("=============\n");

                        if let Some(path) = &config.config_file {
                            println!("Config file: {}", path.display());
                        } else {
                            println!(
                                "Config file: {} (not found)",
                                Config::default_config_path().display()
                            );
                        }
                        println!();

                        println!("api_url: {}", config.api_url.value);
                        println!("  source: {}", config.api_url.source);
                        println!();

                        println!(
                            "user_id: {}",
                            config.user_id.value.as_deref().unwrap_or("(not set)")
                        );
                        println!("  source: {}", config.user_id.source);
                        println!();

                        let uploads = &config.uploads;
                        println!("uploads:");
                        println!("  max_images: {}", uploads.max_images);
                        println!("  max_image_bytes: {}", uploads.max_image_bytes);
                        println!(
                            "  compress_threshold_bytes: {}",
                            uploads.compress_threshold_bytes
                        );
                        println!("  max_dimension: {}", uploads.max_dimension);
                        println!("  jpeg_quality: {}", uploads.jpeg_quality);
                        println!("  delete_delay_ms: {}", uploads.delete_delay_ms);
                        println!("  upload_delay_ms: {}", uploads.upload_delay_ms);
                        println!("  refetch_delay_ms: {}", uploads.refetch_delay_ms);
                    }
                }
                Ok(())
            }

            ConfigSubcommand::Init => {
                let config_path = Config::default_config_path();

                // Check if config already exists
                if config_path.exists() {
                    println!("Config file already exists: {}", config_path.display());
                    println!("Use 'market config show' to view current configuration.");
                    return Ok(());
                }

                // Create parent directory
                if let Some(parent) = config_path.parent() {
                    fs::create_dir_all(parent)?;
                }

                let mut file = fs::File::create(&config_path)?;
                file.write_all(DEFAULT_CONFIG.as_bytes())?;

                println!("Created config file: {}", config_path.display());
                println!("\nEdit this file to customize your settings.");
                Ok(())
            }
        }
    }
}
