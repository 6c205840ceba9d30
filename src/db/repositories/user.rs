//! User repository
//!
//! - `UserRepository` trait defining the interface for account data access
//! - `SqlxUserRepository` implementing the trait for SQLite and MySQL

use crate::db::{Backend, DynDatabasePool};
use crate::models::User;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user
    async fn create(&self, user: &User) -> Result<User>;

    /// Get user by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get user by username
    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;

    /// List all users in ascending id order
    async fn list(&self) -> Result<Vec<User>>;

    /// Overwrite profile fields and flags. The password hash is left alone.
    async fn update(&self, user: &User) -> Result<User>;

    /// Replace the password hash
    async fn set_password(&self, id: i64, password_hash: &str) -> Result<()>;

    /// Record a successful login
    async fn touch_last_login(&self, id: i64, at: DateTime<Utc>) -> Result<()>;

    /// Delete a user together with their posts and sessions.
    /// Returns false when no row had that id.
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Count total users
    async fn count(&self) -> Result<i64>;

    /// Check if another account already uses `username`
    async fn exists_by_username(&self, username: &str, exclude_id: Option<i64>) -> Result<bool>;
}

/// SQLx-based user repository implementation
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    /// Create a new SQLx user repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, password_hash, \
     is_active, is_staff, is_superuser, date_joined, last_login";

const INSERT_USER: &str = r#"
    INSERT INTO users (username, email, first_name, last_name, password_hash,
                       is_active, is_staff, is_superuser, date_joined)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

const UPDATE_USER: &str = r#"
    UPDATE users
    SET username = ?, email = ?, first_name = ?, last_name = ?,
        is_active = ?, is_staff = ?, is_superuser = ?
    WHERE id = ?
"#;

const SET_PASSWORD: &str = "UPDATE users SET password_hash = ? WHERE id = ?";
const TOUCH_LAST_LOGIN: &str = "UPDATE users SET last_login = ? WHERE id = ?";
const DELETE_USER: &str = "DELETE FROM users WHERE id = ?";
const COUNT_USERS: &str = "SELECT COUNT(*) as count FROM users";
const COUNT_BY_USERNAME: &str =
    "SELECT COUNT(*) as count FROM users WHERE username = ? AND id <> ?";

fn select_user_sql(filter: &str) -> String {
    format!("SELECT {} FROM users WHERE {} = ?", USER_COLUMNS, filter)
}

fn list_users_sql() -> String {
    format!("SELECT {} FROM users ORDER BY id ASC", USER_COLUMNS)
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        match self.pool.backend()? {
            Backend::Sqlite(pool) => create_user_sqlite(pool, user).await,
            Backend::Mysql(pool) => create_user_mysql(pool, user).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = select_user_sql("id");
        match self.pool.backend()? {
            Backend::Sqlite(pool) => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(pool)
                .await
                .map(|row| row.as_ref().map(row_to_user_sqlite)),
            Backend::Mysql(pool) => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(pool)
                .await
                .map(|row| row.as_ref().map(row_to_user_mysql)),
        }
        .context("Failed to get user by ID")
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let sql = select_user_sql("username");
        match self.pool.backend()? {
            Backend::Sqlite(pool) => sqlx::query(&sql)
                .bind(username)
                .fetch_optional(pool)
                .await
                .map(|row| row.as_ref().map(row_to_user_sqlite)),
            Backend::Mysql(pool) => sqlx::query(&sql)
                .bind(username)
                .fetch_optional(pool)
                .await
                .map(|row| row.as_ref().map(row_to_user_mysql)),
        }
        .context("Failed to get user by username")
    }

    async fn list(&self) -> Result<Vec<User>> {
        let sql = list_users_sql();
        match self.pool.backend()? {
            Backend::Sqlite(pool) => sqlx::query(&sql)
                .fetch_all(pool)
                .await
                .map(|rows| rows.iter().map(row_to_user_sqlite).collect()),
            Backend::Mysql(pool) => sqlx::query(&sql)
                .fetch_all(pool)
                .await
                .map(|rows| rows.iter().map(row_to_user_mysql).collect()),
        }
        .context("Failed to list users")
    }

    async fn update(&self, user: &User) -> Result<User> {
        match self.pool.backend()? {
            Backend::Sqlite(pool) => update_user_sqlite(pool, user).await?,
            Backend::Mysql(pool) => update_user_mysql(pool, user).await?,
        }

        self.get_by_id(user.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User not found after update"))
    }

    async fn set_password(&self, id: i64, password_hash: &str) -> Result<()> {
        match self.pool.backend()? {
            Backend::Sqlite(pool) => sqlx::query(SET_PASSWORD)
                .bind(password_hash)
                .bind(id)
                .execute(pool)
                .await
                .map(|_| ()),
            Backend::Mysql(pool) => sqlx::query(SET_PASSWORD)
                .bind(password_hash)
                .bind(id)
                .execute(pool)
                .await
                .map(|_| ()),
        }
        .context("Failed to set password")
    }

    async fn touch_last_login(&self, id: i64, at: DateTime<Utc>) -> Result<()> {
        match self.pool.backend()? {
            Backend::Sqlite(pool) => sqlx::query(TOUCH_LAST_LOGIN)
                .bind(at)
                .bind(id)
                .execute(pool)
                .await
                .map(|_| ()),
            Backend::Mysql(pool) => sqlx::query(TOUCH_LAST_LOGIN)
                .bind(at)
                .bind(id)
                .execute(pool)
                .await
                .map(|_| ()),
        }
        .context("Failed to update last login")
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = match self.pool.backend()? {
            Backend::Sqlite(pool) => sqlx::query(DELETE_USER)
                .bind(id)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
            Backend::Mysql(pool) => sqlx::query(DELETE_USER)
                .bind(id)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
        }
        .context("Failed to delete user")?;

        Ok(affected > 0)
    }

    async fn count(&self) -> Result<i64> {
        match self.pool.backend()? {
            Backend::Sqlite(pool) => sqlx::query(COUNT_USERS)
                .fetch_one(pool)
                .await
                .map(|row| row.get("count")),
            Backend::Mysql(pool) => sqlx::query(COUNT_USERS)
                .fetch_one(pool)
                .await
                .map(|row| row.get("count")),
        }
        .context("Failed to count users")
    }

    async fn exists_by_username(&self, username: &str, exclude_id: Option<i64>) -> Result<bool> {
        let exclude_id = exclude_id.unwrap_or(0);
        let count: i64 = match self.pool.backend()? {
            Backend::Sqlite(pool) => sqlx::query(COUNT_BY_USERNAME)
                .bind(username)
                .bind(exclude_id)
                .fetch_one(pool)
                .await
                .map(|row| row.get("count")),
            Backend::Mysql(pool) => sqlx::query(COUNT_BY_USERNAME)
                .bind(username)
                .bind(exclude_id)
                .fetch_one(pool)
                .await
                .map(|row| row.get("count")),
        }
        .context("Failed to check username existence")?;

        Ok(count > 0)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_user_sqlite(pool: &SqlitePool, user: &User) -> Result<User> {
    let result = sqlx::query(INSERT_USER)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.password_hash)
        .bind(user.is_active)
        .bind(user.is_staff)
        .bind(user.is_superuser)
        .bind(user.date_joined)
        .execute(pool)
        .await
        .context("Failed to create user")?;

    Ok(User {
        id: result.last_insert_rowid(),
        ..user.clone()
    })
}

async fn update_user_sqlite(pool: &SqlitePool, user: &User) -> Result<()> {
    sqlx::query(UPDATE_USER)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.is_active)
        .bind(user.is_staff)
        .bind(user.is_superuser)
        .bind(user.id)
        .execute(pool)
        .await
        .context("Failed to update user")?;
    Ok(())
}

fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        password_hash: row.get("password_hash"),
        is_active: row.get("is_active"),
        is_staff: row.get("is_staff"),
        is_superuser: row.get("is_superuser"),
        date_joined: row.get("date_joined"),
        last_login: row.get("last_login"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_user_mysql(pool: &MySqlPool, user: &User) -> Result<User> {
    let result = sqlx::query(INSERT_USER)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.password_hash)
        .bind(user.is_active)
        .bind(user.is_staff)
        .bind(user.is_superuser)
        .bind(user.date_joined)
        .execute(pool)
        .await
        .context("Failed to create user")?;

    Ok(User {
        id: result.last_insert_id() as i64,
        ..user.clone()
    })
}

async fn update_user_mysql(pool: &MySqlPool, user: &User) -> Result<()> {
    sqlx::query(UPDATE_USER)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.is_active)
        .bind(user.is_staff)
        .bind(user.is_superuser)
        .bind(user.id)
        .execute(pool)
        .await
        .context("Failed to update user")?;
    Ok(())
}

fn row_to_user_mysql(row: &sqlx::mysql::MySqlRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        password_hash: row.get("password_hash"),
        is_active: row.get("is_active"),
        is_staff: row.get("is_staff"),
        is_superuser: row.get("is_superuser"),
        date_joined: row.get("date_joined"),
        last_login: row.get("last_login"),
    }
}
