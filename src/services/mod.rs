//! Services layer
//!
//! Business rules between the web handlers and the repositories: form
//! validation that needs the database, slug derivation, media storage and
//! the login session lifecycle.

pub mod category;
pub mod password;
pub mod post;
pub mod user;

pub use category::{CategoryService, CategoryServiceError};
pub use password::{hash_password, verify_password};
pub use post::{post_slug, slugify, PostService, PostServiceError};
pub use user::{UserService, UserServiceError};
