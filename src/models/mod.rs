//! Data models
//!
//! Database entities (Category, Post, User, Session) and the validated
//! inputs the services write from.

mod category;
mod post;
mod session;
mod user;

pub use category::Category;
pub use post::{Post, PostInput, PostStatus, PostWithMeta};
pub use session::Session;
pub use user::{User, UserInput};
