//! Data Transfer Objects - request/response types for the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Visitor form for a comment or a reply.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CommentForm {
    #[serde(default)]
    #[validate(length(min = 1, max = 50, message = "Enter a name of at most 50 characters."))]
    pub author: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "This field is required."))]
    pub text: String,
}

impl CommentForm {
    /// Trim surrounding whitespace so blank input fails validation.
    pub fn trimmed(self) -> Self {
        Self {
            author: self.author.trim().to_string(),
            text: self.text.trim().to_string(),
        }
    }
}

/// Login credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response containing authentication tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// Admin input for creating or editing a post.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PostInput {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub category_id: Uuid,
    #[serde(default)]
    pub tag_ids: Vec<Uuid>,
    #[serde(default)]
    pub is_published: bool,
}

/// Admin input for a category or a tag.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TaxonomyInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 50), custom(function = "validate_slug"))]
    pub slug: String,
}

/// One row of the admin post list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminPostRow {
    pub id: Uuid,
    pub title: String,
    pub category: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_published: bool,
}

/// Slugs are letters, digits, hyphens and underscores.
pub fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    if slug
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        Ok(())
    } else {
        Err(ValidationError::new("slug")
            .with_message("Use only letters, numbers, underscores or hyphens.".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_form_rejects_blank_fields() {
        let form = CommentForm {
            author: "   ".to_string(),
            text: "hi".to_string(),
        }
        .trimmed();
        let errors = form.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("author"));
        assert!(!errors.field_errors().contains_key("text"));
    }

    #[test]
    fn comment_form_rejects_long_author() {
        let form = CommentForm {
            author: "x".repeat(51),
            text: "hi".to_string(),
        };
        assert!(form.validate().is_err());
    }

    #[test]
    fn comment_form_accepts_valid_input() {
        let form = CommentForm {
            author: " alice ".to_string(),
            text: "Nice post".to_string(),
        }
        .trimmed();
        assert!(form.validate().is_ok());
        assert_eq!(form.author, "alice");
    }

    #[test]
    fn taxonomy_input_validates_slug() {
        let ok = TaxonomyInput {
            name: "Tech".to_string(),
            slug: "tech_news-1".to_string(),
        };
        assert!(ok.validate().is_ok());

        let bad = TaxonomyInput {
            name: "Tech".to_string(),
            slug: "tech news".to_string(),
        };
        assert!(bad.validate().is_err());
    }
}
