//! Blog Dashboard - staff-only administration for a blogging platform
//!
//! Server-rendered pages to manage categories, posts (with featured images)
//! and user accounts.

pub mod config;
pub mod db;
pub mod forms;
pub mod media;
pub mod models;
pub mod services;
pub mod view;
pub mod web;
