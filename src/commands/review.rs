use clap::{Args, Subcommand};

use marketplace_core::{HttpClient, Review, ReviewInput};

use super::{confirm, OutputFormat};
use crate::config::Config;

#[derive(Args)]
pub struct ReviewCommand {
    #[command(subcommand)]
    pub command: ReviewSubcommand,
}

#[derive(Subcommand)]
pub enum ReviewSubcommand {
    /// List reviews written by a user (or received, with --received)
    List {
        /// Show reviews the user received instead of wrote
        #[arg(long)]
        received: bool,

        /// User ID (defaults to the configured user)
        #[arg(long)]
        user: Option<String>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Review another user
    Create {
        /// User being reviewed
        #[arg(long)]
        reviewee: String,

        /// Rating from 1 to 5
        #[arg(long)]
        rating: u8,

        /// Comment
        #[arg(long, default_value = "")]
        comment: String,
    },

    /// Replace one of your reviews
    Update {
        /// Review ID
        id: String,

        /// User being reviewed
        #[arg(long)]
        reviewee: String,

        /// Rating from 1 to 5
        #[arg(long)]
        rating: u8,

        /// Comment
        #[arg(long, default_value = "")]
        comment: String,
    },

    /// Delete a review
    Delete {
        /// Review ID
        id: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

impl ReviewCommand {
    pub async fn run(
        &self,
        client: &HttpClient,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ReviewSubcommand::List {
                received,
                user,
                format,
            } => {
                let user_id = match user {
                    Some(user) => user.as_str(),
                    None => config.require_user()?,
                };

                let mut reviews = if *received {
                    client.received_reviews(user_id).await?
                } else {
                    client.written_reviews(user_id).await?
                };
                reviews.sort_by(|a, b| b.date.cmp(&a.date));

                if reviews.is_empty() {
                    println!("No reviews found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&reviews)?);
                    }
                    OutputFormat::Text => {
                        for review in &reviews {
                            println!("{}", review);
                        }
                        if let Some(average) = average_rating(&reviews) {
                            println!(
                                "\nTotal: {} review(s), average {:.1}",
                                reviews.len(),
                                average
                            );
                        }
                    }
                }
                Ok(())
            }

            ReviewSubcommand::Create {
                reviewee,
                rating,
                comment,
            } => {
                let reviewer = config.require_user()?;
                if reviewer == reviewee.as_str() {
                    return Err("You cannot review yourself".into());
                }

                let input = ReviewInput::new(reviewer, reviewee, *rating, comment)?;
                let review = client.create_review(&input).await?;
                println!("Created review:");
                println!("{}", review);
                Ok(())
            }

            ReviewSubcommand::Update {
                id,
                reviewee,
                rating,
                comment,
            } => {
                let reviewer = config.require_user()?;
                let input = ReviewInput::new(reviewer, reviewee, *rating, comment)?;
                let review = client.update_review(id, &input).await?;
                println!("Updated review:");
                println!("{}", review);
                Ok(())
            }

            ReviewSubcommand::Delete { id, force } => {
                if !force && !confirm(&format!("Delete review {}?", id))? {
                    println!("Deletion cancelled.");
                    return Ok(());
                }

                client.delete_review(id).await?;
                println!("Deleted review: {}", id);
                Ok(())
            }
        }
    }
}

fn average_rating(reviews: &[Review]) -> Option<f64> {
    if reviews.is_empty() {
        return None;
    }
    let total: u32 = reviews.iter().map(|r| u32::from(r.rating)).sum();
    Some(f64::from(total) / reviews.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn review(rating: u8) -> Review {
        Review {
            id: format!("r{}", rating),
            reviewer_id: "u1".to_string(),
            reviewee_id: "u2".to_string(),
            rating,
            comment: String::new(),
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        }
    }

    #[test]
    fn test_average_rating() {
        assert_eq!(average_rating(&[]), None);
        assert_eq!(average_rating(&[review(5)]), Some(5.0));
        assert_eq!(average_rating(&[review(4), review(1)]), Some(2.5));
    }
}
