use clap::{Args, Subcommand};

use marketplace_core::models::UserProfile;
use marketplace_core::HttpClient;

use super::OutputFormat;
use crate::config::Config;

#[derive(Args)]
pub struct UserCommand {
    #[command(subcommand)]
    pub command: UserSubcommand,
}

#[derive(Subcommand)]
pub enum UserSubcommand {
    /// Show a user profile
    Show {
        /// User ID (defaults to the configured user)
        id: Option<String>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Update your profile
    Update {
        #[arg(long)]
        full_name: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        bio: Option<String>,

        #[arg(long)]
        country: Option<String>,

        #[arg(long)]
        city: Option<String>,

        #[arg(long)]
        phone: Option<String>,
    },
}

impl UserCommand {
    pub async fn run(
        &self,
        client: &HttpClient,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            UserSubcommand::Show { id, format } => {
                let user_id = match id {
                    Some(id) => id.as_str(),
                    None => config.require_user()?,
                };
                let user = client.get_user(user_id).await?;

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&user)?);
                    }
                    OutputFormat::Text => {
                        print!("{}", user);
                    }
                }
                Ok(())
            }

            UserSubcommand::Update {
                full_name,
                email,
                bio,
                country,
                city,
                phone,
            } => {
                let user_id = config.require_user()?;
                let profile = UserProfile {
                    full_name: full_name.clone(),
                    email: email.clone(),
                    bio: bio.clone(),
                    country: country.clone(),
                    city: city.clone(),
                    phone_number: phone.clone(),
                };

                if profile == UserProfile::default() {
                    return Err("Nothing to update. Pass at least one field.".into());
                }

                let user = client.update_user(user_id, &profile).await?;
                println!("Updated profile:");
                print!("{}", user);
                Ok(())
            }
        }
    }
}
