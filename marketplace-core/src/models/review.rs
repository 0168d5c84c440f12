use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Review {
    pub id: String,
    pub reviewer_id: String,
    pub reviewee_id: String,
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
    pub date: NaiveDate,
}

impl fmt::Display for Review {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}{} by {} on {}",
            self.id,
            "*".repeat(self.rating as usize),
            ".".repeat(MAX_RATING.saturating_sub(self.rating) as usize),
            self.reviewer_id,
            self.date
        )?;
        if !self.comment.is_empty() {
            write!(f, ": {}", self.comment)?;
        }
        Ok(())
    }
}

/// Request body for creating or updating a review.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReviewInput {
    pub reviewer_id: String,
    pub reviewee_id: String,
    pub rating: u8,
    pub comment: String,
    pub date: NaiveDate,
}

impl ReviewInput {
    /// Builds a review dated today. The rating must be within 1..=5.
    pub fn new(
        reviewer_id: impl Into<String>,
        reviewee_id: impl Into<String>,
        rating: u8,
        comment: impl Into<String>,
    ) -> Result<Self, String> {
        if !(MIN_RATING..=MAX_RATING).contains(&rating) {
            return Err(format!(
                "Invalid rating {}. Ratings go from {} to {}",
                rating, MIN_RATING, MAX_RATING
            ));
        }

        Ok(Self {
            reviewer_id: reviewer_id.into(),
            reviewee_id: reviewee_id.into(),
            rating,
            comment: comment.into().trim().to_string(),
            date: Utc::now().date_naive(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_input_rejects_out_of_range_rating() {
        assert!(ReviewInput::new("a", "b", 0, "").is_err());
        assert!(ReviewInput::new("a", "b", 6, "").is_err());
        assert!(ReviewInput::new("a", "b", 5, "").is_ok());
    }

    #[test]
    fn test_review_input_trims_comment() {
        let input = ReviewInput::new("a", "b", 4, "  great seller \n").unwrap();
        assert_eq!(input.comment, "great seller");
        assert_eq!(input.date, Utc::now().date_naive());
    }

    #[test]
    fn test_review_date_format() {
        let json = r#"{"id":"r1","reviewer_id":"a","reviewee_id":"b","rating":3,"date":"2024-05-01"}"#;
        let review: Review = serde_json::from_str(json).unwrap();
        assert_eq!(review.date, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert_eq!(review.comment, "");
        assert!(review.to_string().contains("***.."));
    }
}
