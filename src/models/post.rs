//! Post model
//!
//! A blog post as edited from the dashboard. The slug is derived from the
//! title and the database id, so it only exists once the row has been
//! written (see `services::post::post_slug`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Post entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    /// Unique identifier
    pub id: i64,
    /// Title
    pub title: String,
    /// URL slug, `<slugified-title>-<id>`
    pub slug: String,
    /// Category the post is filed under
    pub category_id: i64,
    /// Account that created the post
    pub author_id: i64,
    /// Path of the featured image, relative to the media root
    pub featured_image: String,
    /// Teaser shown in listings
    pub short_description: String,
    /// Full post body
    pub body: String,
    /// Publication status
    pub status: PostStatus,
    /// Whether the post is highlighted on the front page
    pub is_featured: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// Publication status of a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    #[default]
    Draft,
    Published,
}

impl PostStatus {
    /// All statuses, in the order they are offered in forms
    pub const ALL: [PostStatus; 2] = [PostStatus::Draft, PostStatus::Published];

    /// Human readable label
    pub fn label(&self) -> &'static str {
        match self {
            PostStatus::Draft => "Draft",
            PostStatus::Published => "Published",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostStatus::Draft => write!(f, "draft"),
            PostStatus::Published => write!(f, "published"),
        }
    }
}

impl FromStr for PostStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(PostStatus::Draft),
            "published" => Ok(PostStatus::Published),
            _ => Err(anyhow::anyhow!("Invalid post status: {}", s)),
        }
    }
}

/// Post joined with the names the list view shows
#[derive(Debug, Clone, Serialize)]
pub struct PostWithMeta {
    #[serde(flatten)]
    pub post: Post,
    pub category_name: String,
    pub author_username: String,
}

/// Validated field values for writing a post
#[derive(Debug, Clone)]
pub struct PostInput {
    pub title: String,
    pub category_id: i64,
    pub short_description: String,
    pub body: String,
    pub status: PostStatus,
    pub is_featured: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_status_display() {
        assert_eq!(PostStatus::Draft.to_string(), "draft");
        assert_eq!(PostStatus::Published.to_string(), "published");
    }

    #[test]
    fn test_post_status_from_str() {
        assert_eq!(PostStatus::from_str("draft").unwrap(), PostStatus::Draft);
        assert_eq!(PostStatus::from_str("Published").unwrap(), PostStatus::Published);
        assert!(PostStatus::from_str("archived").is_err());
    }

    #[test]
    fn test_post_status_default() {
        assert_eq!(PostStatus::default(), PostStatus::Draft);
    }
}
