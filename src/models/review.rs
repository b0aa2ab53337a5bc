use serde::{Deserialize, Serialize};

use super::user::id_from_string_or_int;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    #[serde(deserialize_with = "id_from_string_or_int")]
    pub id: i64,
    #[serde(deserialize_with = "id_from_string_or_int", alias = "showId")]
    pub show_id: i64,
    pub rating: i64,
    #[serde(default)]
    pub comment: String,
    #[serde(default, skip_serializing)]
    pub user: Option<ReviewAuthor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewAuthor {
    pub email: String,
}

impl Review {
    pub fn author_email(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.email.as_str())
    }
}

/// Body of a create-review request.
#[derive(Debug, Clone, Serialize)]
pub struct NewReview {
    pub rating: i64,
    pub comment: String,
    pub show_id: i64,
}

impl NewReview {
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=5).contains(&self.rating) {
            return Err("Rating must be between 1 and 5".to_string());
        }
        if self.comment.trim().is_empty() {
            return Err("Comment must not be empty".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct ReviewsResponse {
    pub reviews: Vec<Review>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewResponse {
    pub review: Review,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_review_with_author() {
        let json = r#"{"id": "11", "show_id": 3, "rating": 4, "comment": "Great", "user": {"id": "1", "email": "a@b.com"}}"#;
        let review: Review = serde_json::from_str(json).unwrap();
        assert_eq!(review.id, 11);
        assert_eq!(review.show_id, 3);
        assert_eq!(review.author_email(), Some("a@b.com"));
    }

    #[test]
    fn new_review_validation() {
        let mut review = NewReview {
            rating: 0,
            comment: "ok".to_string(),
            show_id: 1,
        };
        assert!(review.validate().is_err());
        review.rating = 5;
        assert!(review.validate().is_ok());
        review.comment = "   ".to_string();
        assert!(review.validate().is_err());
    }
}
