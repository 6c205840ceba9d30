//! Category repository
//!
//! - `CategoryRepository` trait defining the interface for category data access
//! - `SqlxCategoryRepository` implementing the trait for SQLite and MySQL

use crate::db::{Backend, DynDatabasePool};
use crate::models::Category;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Category repository trait
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Create a new category
    async fn create(&self, category: &Category) -> Result<Category>;

    /// Get category by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Category>>;

    /// List all categories in ascending id order
    async fn list(&self) -> Result<Vec<Category>>;

    /// Overwrite the name of an existing category
    async fn update(&self, category: &Category) -> Result<Category>;

    /// Delete a category and, through the foreign key, its posts.
    /// Returns false when no row had that id.
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Count categories
    async fn count(&self) -> Result<i64>;

    /// Check if another category already uses `name`
    async fn exists_by_name(&self, name: &str, exclude_id: Option<i64>) -> Result<bool>;
}

/// SQLx-based category repository implementation
pub struct SqlxCategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxCategoryRepository {
    /// Create a new SQLx category repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CategoryRepository> {
        Arc::new(Self::new(pool))
    }
}

const INSERT_CATEGORY: &str =
    "INSERT INTO categories (name, created_at, updated_at) VALUES (?, ?, ?)";
const SELECT_CATEGORY: &str =
    "SELECT id, name, created_at, updated_at FROM categories WHERE id = ?";
const LIST_CATEGORIES: &str =
    "SELECT id, name, created_at, updated_at FROM categories ORDER BY id ASC";
const UPDATE_CATEGORY: &str = "UPDATE categories SET name = ?, updated_at = ? WHERE id = ?";
const DELETE_CATEGORY: &str = "DELETE FROM categories WHERE id = ?";
const COUNT_CATEGORIES: &str = "SELECT COUNT(*) as count FROM categories";
const COUNT_BY_NAME: &str =
    "SELECT COUNT(*) as count FROM categories WHERE name = ? AND id <> ?";

#[async_trait]
impl CategoryRepository for SqlxCategoryRepository {
    async fn create(&self, category: &Category) -> Result<Category> {
        match self.pool.backend()? {
            Backend::Sqlite(pool) => create_category_sqlite(pool, category).await,
            Backend::Mysql(pool) => create_category_mysql(pool, category).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>> {
        match self.pool.backend()? {
            Backend::Sqlite(pool) => get_category_by_id_sqlite(pool, id).await,
            Backend::Mysql(pool) => get_category_by_id_mysql(pool, id).await,
        }
    }

    async fn list(&self) -> Result<Vec<Category>> {
        match self.pool.backend()? {
            Backend::Sqlite(pool) => list_categories_sqlite(pool).await,
            Backend::Mysql(pool) => list_categories_mysql(pool).await,
        }
    }

    async fn update(&self, category: &Category) -> Result<Category> {
        match self.pool.backend()? {
            Backend::Sqlite(pool) => update_category_sqlite(pool, category).await,
            Backend::Mysql(pool) => update_category_mysql(pool, category).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = match self.pool.backend()? {
            Backend::Sqlite(pool) => sqlx::query(DELETE_CATEGORY)
                .bind(id)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
            Backend::Mysql(pool) => sqlx::query(DELETE_CATEGORY)
                .bind(id)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
        }
        .context("Failed to delete category")?;

        Ok(affected > 0)
    }

    async fn count(&self) -> Result<i64> {
        match self.pool.backend()? {
            Backend::Sqlite(pool) => sqlx::query(COUNT_CATEGORIES)
                .fetch_one(pool)
                .await
                .map(|row| row.get("count")),
            Backend::Mysql(pool) => sqlx::query(COUNT_CATEGORIES)
                .fetch_one(pool)
                .await
                .map(|row| row.get("count")),
        }
        .context("Failed to count categories")
    }

    async fn exists_by_name(&self, name: &str, exclude_id: Option<i64>) -> Result<bool> {
        // Ids start at 1, so 0 never excludes a real row
        let exclude_id = exclude_id.unwrap_or(0);
        let count: i64 = match self.pool.backend()? {
            Backend::Sqlite(pool) => sqlx::query(COUNT_BY_NAME)
                .bind(name)
                .bind(exclude_id)
                .fetch_one(pool)
                .await
                .map(|row| row.get("count")),
            Backend::Mysql(pool) => sqlx::query(COUNT_BY_NAME)
                .bind(name)
                .bind(exclude_id)
                .fetch_one(pool)
                .await
                .map(|row| row.get("count")),
        }
        .context("Failed to check category name existence")?;

        Ok(count > 0)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_category_sqlite(pool: &SqlitePool, category: &Category) -> Result<Category> {
    let now = Utc::now();

    let result = sqlx::query(INSERT_CATEGORY)
        .bind(&category.name)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create category")?;

    Ok(Category {
        id: result.last_insert_rowid(),
        name: category.name.clone(),
        created_at: now,
        updated_at: now,
    })
}

async fn get_category_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Category>> {
    let row = sqlx::query(SELECT_CATEGORY)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by ID")?;

    Ok(row.as_ref().map(row_to_category_sqlite))
}

async fn list_categories_sqlite(pool: &SqlitePool) -> Result<Vec<Category>> {
    let rows = sqlx::query(LIST_CATEGORIES)
        .fetch_all(pool)
        .await
        .context("Failed to list categories")?;

    Ok(rows.iter().map(row_to_category_sqlite).collect())
}

async fn update_category_sqlite(pool: &SqlitePool, category: &Category) -> Result<Category> {
    sqlx::query(UPDATE_CATEGORY)
        .bind(&category.name)
        .bind(Utc::now())
        .bind(category.id)
        .execute(pool)
        .await
        .context("Failed to update category")?;

    get_category_by_id_sqlite(pool, category.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Category not found after update"))
}

fn row_to_category_sqlite(row: &sqlx::sqlite::SqliteRow) -> Category {
    Category {
        id: row.get("id"),
        name: row.get("name"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_category_mysql(pool: &MySqlPool, category: &Category) -> Result<Category> {
    let now = Utc::now();

    let result = sqlx::query(INSERT_CATEGORY)
        .bind(&category.name)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create category")?;

    Ok(Category {
        id: result.last_insert_id() as i64,
        name: category.name.clone(),
        created_at: now,
        updated_at: now,
    })
}

async fn get_category_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Category>> {
    let row = sqlx::query(SELECT_CATEGORY)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by ID")?;

    Ok(row.as_ref().map(row_to_category_mysql))
}

async fn list_categories_mysql(pool: &MySqlPool) -> Result<Vec<Category>> {
    let rows = sqlx::query(LIST_CATEGORIES)
        .fetch_all(pool)
        .await
        .context("Failed to list categories")?;

    Ok(rows.iter().map(row_to_category_mysql).collect())
}

async fn update_category_mysql(pool: &MySqlPool, category: &Category) -> Result<Category> {
    sqlx::query(UPDATE_CATEGORY)
        .bind(&category.name)
        .bind(Utc::now())
        .bind(category.id)
        .execute(pool)
        .await
        .context("Failed to update category")?;

    get_category_by_id_mysql(pool, category.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Category not found after update"))
}

fn row_to_category_mysql(row: &sqlx::mysql::MySqlRow) -> Category {
    Category {
        id: row.get("id"),
        name: row.get("name"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> SqlxCategoryRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxCategoryRepository::new(pool)
    }

    async fn create(repo: &SqlxCategoryRepository, name: &str) -> Category {
        repo.create(&Category::new(name.to_string()))
            .await
            .expect("Failed to create category")
    }

    #[tokio::test]
    async fn test_create_category() {
        let repo = setup_test_repo().await;
        let created = create(&repo, "Rust").await;

        assert!(created.id > 0);
        assert_eq!(created.name, "Rust");
    }

    #[tokio::test]
    async fn test_create_duplicate_name_fails() {
        let repo = setup_test_repo().await;
        create(&repo, "Rust").await;

        let result = repo.create(&Category::new("Rust".to_string())).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_get_category_by_id() {
        let repo = setup_test_repo().await;
        let created = create(&repo, "Rust").await;

        let found = repo.get_by_id(created.id).await.unwrap().expect("Category not found");
        assert_eq!(found.name, "Rust");

        assert!(repo.get_by_id(9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_categories_in_id_order() {
        let repo = setup_test_repo().await;
        for name in ["Zeta", "Alpha", "Mid"] {
            create(&repo, name).await;
        }

        let names: Vec<String> = repo.list().await.unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Zeta", "Alpha", "Mid"]);
    }

    #[tokio::test]
    async fn test_update_category() {
        let repo = setup_test_repo().await;
        let mut category = create(&repo, "Rust").await;

        category.name = "Go".to_string();
        let updated = repo.update(&category).await.expect("Failed to update");

        assert_eq!(updated.id, category.id);
        assert_eq!(updated.name, "Go");
        assert!(updated.updated_at >= category.created_at);
    }

    #[tokio::test]
    async fn test_delete_category() {
        let repo = setup_test_repo().await;
        let category = create(&repo, "Rust").await;

        assert!(repo.delete(category.id).await.unwrap());
        assert!(repo.get_by_id(category.id).await.unwrap().is_none());

        // Second delete finds nothing
        assert!(!repo.delete(category.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_count_categories() {
        let repo = setup_test_repo().await;
        assert_eq!(repo.count().await.unwrap(), 0);

        create(&repo, "One").await;
        create(&repo, "Two").await;
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_exists_by_name() {
        let repo = setup_test_repo().await;
        let rust = create(&repo, "Rust").await;

        assert!(repo.exists_by_name("Rust", None).await.unwrap());
        assert!(!repo.exists_by_name("Go", None).await.unwrap());
        // A category does not clash with itself when edited
        assert!(!repo.exists_by_name("Rust", Some(rust.id)).await.unwrap());
    }
}
