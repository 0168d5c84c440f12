use clap::{Args, Subcommand};

use marketplace_core::HttpClient;

use super::OutputFormat;

#[derive(Args)]
pub struct CategoryCommand {
    #[command(subcommand)]
    pub command: CategorySubcommand,
}

#[derive(Subcommand)]
pub enum CategorySubcommand {
    /// List item categories
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl CategoryCommand {
    pub async fn run(&self, client: &HttpClient) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            CategorySubcommand::List { format } => {
                let mut categories = client.list_categories().await?;
                categories.sort_by(|a, b| a.name.cmp(&b.name));

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&categories)?);
                    }
                    OutputFormat::Text => {
                        if categories.is_empty() {
                            println!("No categories found");
                        }
                        for category in &categories {
                            println!("{}", category);
                        }
                    }
                }
                Ok(())
            }
        }
    }
}
