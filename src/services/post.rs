//! Post service
//!
//! Posts are written in two steps when created: the row is inserted first,
//! then the slug `<slugified-title>-<id>` is attached once the id is known.
//! Edits recompute the slug in the same write.

use crate::db::repositories::{CategoryRepository, PostRepository};
use crate::forms::{FormErrors, PostForm, UploadedImage, INVALID_CHOICE};
use crate::media::MediaStore;
use crate::models::{Post, PostInput, PostWithMeta};
use anyhow::Context;
use chrono::Utc;
use deunicode::deunicode;
use std::sync::Arc;

/// Error types for post service operations
#[derive(Debug, thiserror::Error)]
pub enum PostServiceError {
    #[error("Post not found: {0}")]
    NotFound(i64),

    /// The submitted form did not validate
    #[error("Invalid post: {0}")]
    Invalid(FormErrors),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct PostService {
    repo: Arc<dyn PostRepository>,
    categories: Arc<dyn CategoryRepository>,
    media: MediaStore,
}

impl PostService {
    pub fn new(
        repo: Arc<dyn PostRepository>,
        categories: Arc<dyn CategoryRepository>,
        media: MediaStore,
    ) -> Self {
        Self {
            repo,
            categories,
            media,
        }
    }

    /// All posts with category and author names, ascending id
    pub async fn list(&self) -> Result<Vec<PostWithMeta>, PostServiceError> {
        Ok(self.repo.list_with_meta().await.context("Failed to list posts")?)
    }

    pub async fn get(&self, id: i64) -> Result<Post, PostServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get post")?
            .ok_or(PostServiceError::NotFound(id))
    }

    pub async fn count(&self) -> Result<i64, PostServiceError> {
        Ok(self.repo.count().await.context("Failed to count posts")?)
    }

    /// Create a post authored by `author_id`.
    ///
    /// Nothing is written, the image included, unless the whole form is valid.
    pub async fn create(&self, author_id: i64, form: &PostForm) -> Result<Post, PostServiceError> {
        let (input, image) = self.clean(form, true).await?;
        let image = image.ok_or_else(|| anyhow::anyhow!("Validated post form has no image"))?;

        let featured_image = self
            .media
            .save(&image)
            .await
            .context("Failed to store featured image")?;

        let now = Utc::now();
        let post = Post {
            id: 0,
            title: input.title,
            slug: String::new(),
            category_id: input.category_id,
            author_id,
            featured_image,
            short_description: input.short_description,
            body: input.body,
            status: input.status,
            is_featured: input.is_featured,
            created_at: now,
            updated_at: now,
        };

        let mut post = self.repo.create(&post).await.context("Failed to create post")?;

        post.slug = post_slug(&post.title, post.id);
        self.repo
            .update_slug(post.id, &post.slug)
            .await
            .context("Failed to set post slug")?;

        tracing::info!("Created post {} ({})", post.id, post.slug);
        Ok(post)
    }

    /// Overwrite a post from the edit form.
    ///
    /// The stored image is replaced only when a new file was uploaded.
    pub async fn update(&self, id: i64, form: &PostForm) -> Result<Post, PostServiceError> {
        let mut post = self.get(id).await?;
        let (input, image) = self.clean(form, false).await?;

        if let Some(image) = image {
            post.featured_image = self
                .media
                .save(&image)
                .await
                .context("Failed to store featured image")?;
        }

        post.slug = post_slug(&input.title, post.id);
        post.title = input.title;
        post.category_id = input.category_id;
        post.short_description = input.short_description;
        post.body = input.body;
        post.status = input.status;
        post.is_featured = input.is_featured;

        let updated = self.repo.update(&post).await.context("Failed to update post")?;

        tracing::info!("Updated post {} ({})", updated.id, updated.slug);
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> Result<(), PostServiceError> {
        let deleted = self.repo.delete(id).await.context("Failed to delete post")?;

        if !deleted {
            return Err(PostServiceError::NotFound(id));
        }

        tracing::info!("Deleted post {}", id);
        Ok(())
    }

    /// Form validation plus the category existence check
    async fn clean(
        &self,
        form: &PostForm,
        require_image: bool,
    ) -> Result<(PostInput, Option<UploadedImage>), PostServiceError> {
        let cleaned = form.validate(self.media.config(), require_image);
        let mut errors = cleaned.as_ref().err().cloned().unwrap_or_default();

        if let Ok(category_id) = form.category.trim().parse::<i64>() {
            let exists = self
                .categories
                .get_by_id(category_id)
                .await
                .context("Failed to look up category")?
                .is_some();
            if !exists && !errors.has("category") {
                errors.add("category", INVALID_CHOICE);
            }
        }

        match cleaned {
            Ok(valid) if errors.is_empty() => Ok((valid.input, valid.image)),
            _ => Err(PostServiceError::Invalid(errors)),
        }
    }
}

/// Slug stored on a post: the slugified title, a dash, then the id
pub fn post_slug(title: &str, id: i64) -> String {
    format!("{}-{}", slugify(title), id)
}

/// Lowercase ASCII slug of `value`.
///
/// Accented and other non-ASCII letters are transliterated first ("Crème"
/// becomes "creme"). Punctuation other than `-` and `_` is then dropped,
/// runs of whitespace and dashes become a single `-`, and leading or
/// trailing dashes and underscores are trimmed.
pub fn slugify(value: &str) -> String {
    let ascii = deunicode(value);
    let mut slug = String::with_capacity(ascii.len());
    let mut pending_dash = false;

    for c in ascii.chars().filter(char::is_ascii) {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_alphanumeric() || c == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else if c == '-' || c.is_ascii_whitespace() {
            pending_dash = true;
        }
    }

    slug.trim_matches(|c| c == '-' || c == '_').to_string()
}
