//! Post repository
//!
//! - `PostRepository` trait defining the interface for post data access
//! - `SqlxPostRepository` implementing the trait for SQLite and MySQL

use crate::db::{Backend, DynDatabasePool};
use crate::models::{Post, PostStatus, PostWithMeta};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Insert a post. `id`, `created_at` and `updated_at` are assigned here.
    async fn create(&self, post: &Post) -> Result<Post>;

    /// Get post by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    /// All posts with their category name and author username, ascending id
    async fn list_with_meta(&self) -> Result<Vec<PostWithMeta>>;

    /// Overwrite every editable column of an existing post
    async fn update(&self, post: &Post) -> Result<Post>;

    /// Set only the slug of a post
    async fn update_slug(&self, id: i64, slug: &str) -> Result<()>;

    /// Delete a post. Returns false when no row had that id.
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Count posts
    async fn count(&self) -> Result<i64>;
}

/// SQLx-based post repository implementation
pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    /// Create a new SQLx post repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

const POST_COLUMNS: &str = "id, title, slug, category_id, author_id, featured_image, \
     short_description, body, status, is_featured, created_at, updated_at";

const INSERT_POST: &str = r#"
    INSERT INTO posts (title, slug, category_id, author_id, featured_image,
                       short_description, body, status, is_featured, created_at, updated_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

const UPDATE_POST: &str = r#"
    UPDATE posts
    SET title = ?, slug = ?, category_id = ?, featured_image = ?, short_description = ?,
        body = ?, status = ?, is_featured = ?, updated_at = ?
    WHERE id = ?
"#;

const LIST_WITH_META: &str = r#"
    SELECT p.id, p.title, p.slug, p.category_id, p.author_id, p.featured_image,
           p.short_description, p.body, p.status, p.is_featured, p.created_at, p.updated_at,
           c.name AS category_name, u.username AS author_username
    FROM posts p
    INNER JOIN categories c ON c.id = p.category_id
    INNER JOIN users u ON u.id = p.author_id
    ORDER BY p.id ASC
"#;

const UPDATE_SLUG: &str = "UPDATE posts SET slug = ? WHERE id = ?";
const DELETE_POST: &str = "DELETE FROM posts WHERE id = ?";
const COUNT_POSTS: &str = "SELECT COUNT(*) as count FROM posts";

fn select_post_sql() -> String {
    format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS)
}

fn parse_status(status: &str) -> Result<PostStatus> {
    PostStatus::from_str(status)
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, post: &Post) -> Result<Post> {
        match self.pool.backend()? {
            Backend::Sqlite(pool) => create_post_sqlite(pool, post).await,
            Backend::Mysql(pool) => create_post_mysql(pool, post).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        match self.pool.backend()? {
            Backend::Sqlite(pool) => get_post_by_id_sqlite(pool, id).await,
            Backend::Mysql(pool) => get_post_by_id_mysql(pool, id).await,
        }
    }

    async fn list_with_meta(&self) -> Result<Vec<PostWithMeta>> {
        match self.pool.backend()? {
            Backend::Sqlite(pool) => list_posts_with_meta_sqlite(pool).await,
            Backend::Mysql(pool) => list_posts_with_meta_mysql(pool).await,
        }
    }

    async fn update(&self, post: &Post) -> Result<Post> {
        match self.pool.backend()? {
            Backend::Sqlite(pool) => update_post_sqlite(pool, post).await,
            Backend::Mysql(pool) => update_post_mysql(pool, post).await,
        }
    }

    async fn update_slug(&self, id: i64, slug: &str) -> Result<()> {
        match self.pool.backend()? {
            Backend::Sqlite(pool) => sqlx::query(UPDATE_SLUG)
                .bind(slug)
                .bind(id)
                .execute(pool)
                .await
                .map(|_| ()),
            Backend::Mysql(pool) => sqlx::query(UPDATE_SLUG)
                .bind(slug)
                .bind(id)
                .execute(pool)
                .await
                .map(|_| ()),
        }
        .context("Failed to update post slug")
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = match self.pool.backend()? {
            Backend::Sqlite(pool) => sqlx::query(DELETE_POST)
                .bind(id)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
            Backend::Mysql(pool) => sqlx::query(DELETE_POST)
                .bind(id)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
        }
        .context("Failed to delete post")?;

        Ok(affected > 0)
    }

    async fn count(&self) -> Result<i64> {
        match self.pool.backend()? {
            Backend::Sqlite(pool) => sqlx::query(COUNT_POSTS)
                .fetch_one(pool)
                .await
                .map(|row| row.get("count")),
            Backend::Mysql(pool) => sqlx::query(COUNT_POSTS)
                .fetch_one(pool)
                .await
                .map(|row| row.get("count")),
        }
        .context("Failed to count posts")
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_post_sqlite(pool: &SqlitePool, post: &Post) -> Result<Post> {
    let now = Utc::now();

    let result = sqlx::query(INSERT_POST)
        .bind(&post.title)
        .bind(&post.slug)
        .bind(post.category_id)
        .bind(post.author_id)
        .bind(&post.featured_image)
        .bind(&post.short_description)
        .bind(&post.body)
        .bind(post.status.to_string())
        .bind(post.is_featured)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create post")?;

    Ok(Post {
        id: result.last_insert_rowid(),
        created_at: now,
        updated_at: now,
        ..post.clone()
    })
}

async fn get_post_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Post>> {
    let row = sqlx::query(&select_post_sql())
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get post by ID")?;

    row.as_ref().map(row_to_post_sqlite).transpose()
}

async fn list_posts_with_meta_sqlite(pool: &SqlitePool) -> Result<Vec<PostWithMeta>> {
    let rows = sqlx::query(LIST_WITH_META)
        .fetch_all(pool)
        .await
        .context("Failed to list posts")?;

    rows.iter()
        .map(|row| {
            Ok(PostWithMeta {
                post: row_to_post_sqlite(row)?,
                category_name: row.get("category_name"),
                author_username: row.get("author_username"),
            })
        })
        .collect()
}

async fn update_post_sqlite(pool: &SqlitePool, post: &Post) -> Result<Post> {
    sqlx::query(UPDATE_POST)
        .bind(&post.title)
        .bind(&post.slug)
        .bind(post.category_id)
        .bind(&post.featured_image)
        .bind(&post.short_description)
        .bind(&post.body)
        .bind(post.status.to_string())
        .bind(post.is_featured)
        .bind(Utc::now())
        .bind(post.id)
        .execute(pool)
        .await
        .context("Failed to update post")?;

    get_post_by_id_sqlite(pool, post.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Post not found after update"))
}

fn row_to_post_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Post> {
    let status: String = row.get("status");

    Ok(Post {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get("slug"),
        category_id: row.get("category_id"),
        author_id: row.get("author_id"),
        featured_image: row.get("featured_image"),
        short_description: row.get("short_description"),
        body: row.get("body"),
        status: parse_status(&status)?,
        is_featured: row.get("is_featured"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_post_mysql(pool: &MySqlPool, post: &Post) -> Result<Post> {
    let now = Utc::now();

    let result = sqlx::query(INSERT_POST)
        .bind(&post.title)
        .bind(&post.slug)
        .bind(post.category_id)
        .bind(post.author_id)
        .bind(&post.featured_image)
        .bind(&post.short_description)
        .bind(&post.body)
        .bind(post.status.to_string())
        .bind(post.is_featured)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create post")?;

    Ok(Post {
        id: result.last_insert_id() as i64,
        created_at: now,
        updated_at: now,
        ..post.clone()
    })
}

async fn get_post_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Post>> {
    let row = sqlx::query(&select_post_sql())
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get post by ID")?;

    row.as_ref().map(row_to_post_mysql).transpose()
}

async fn list_posts_with_meta_mysql(pool: &MySqlPool) -> Result<Vec<PostWithMeta>> {
    let rows = sqlx::query(LIST_WITH_META)
        .fetch_all(pool)
        .await
        .context("Failed to list posts")?;

    rows.iter()
        .map(|row| {
            Ok(PostWithMeta {
                post: row_to_post_mysql(row)?,
                category_name: row.get("category_name"),
                author_username: row.get("author_username"),
            })
        })
        .collect()
}

async fn update_post_mysql(pool: &MySqlPool, post: &Post) -> Result<Post> {
    sqlx::query(UPDATE_POST)
        .bind(&post.title)
        .bind(&post.slug)
        .bind(post.category_id)
        .bind(&post.featured_image)
        .bind(&post.short_description)
        .bind(&post.body)
        .bind(post.status.to_string())
        .bind(post.is_featured)
        .bind(Utc::now())
        .bind(post.id)
        .execute(pool)
        .await
        .context("Failed to update post")?;

    get_post_by_id_mysql(pool, post.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Post not found after update"))
}

fn row_to_post_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Post> {
    let status: String = row.get("status");

    Ok(Post {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get("slug"),
        category_id: row.get("category_id"),
        author_id: row.get("author_id"),
        featured_image: row.get("featured_image"),
        short_description: row.get("short_description"),
        body: row.get("body"),
        status: parse_status(&status)?,
        is_featured: row.get("is_featured"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
