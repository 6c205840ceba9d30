//! Database layer
//!
//! SQLite (default) and MySQL behind the `DatabasePool` trait, code-embedded
//! migrations, and one repository per entity.
//!
//! ```ignore
//! use blog_dashboard::config::DatabaseConfig;
//! use blog_dashboard::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, is_unique_violation, Backend, DatabasePool, DynDatabasePool, MysqlDatabase,
    SqliteDatabase,
};
