//! Web layer - routing, pages and form handling
//!
//! Every dashboard page sits behind `require_staff`. The login form, logout,
//! the root redirect and media files are public.

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    response::{Html, Redirect},
    routing::get,
    Router,
};
use std::sync::Arc;
use tera::Context;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::config::Config;
use crate::forms::FormErrors;
use crate::models::User;
use crate::services::{CategoryService, PostService, UserService};
use crate::view::ViewEngine;

pub mod auth;
pub mod categories;
pub mod dashboard;
pub mod error;
pub mod middleware;
pub mod posts;
pub mod users;

pub use error::DashboardError;
pub use middleware::{CurrentUser, EntityId};

/// Extra room on top of the largest image for the other multipart fields
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Application state shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub category_service: Arc<CategoryService>,
    pub post_service: Arc<PostService>,
    pub views: Arc<ViewEngine>,
    pub config: Arc<Config>,
}

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // Uploads over the limit still reach form validation, which reports the size
    let body_limit = (state.config.upload.max_file_size as usize)
        .saturating_mul(2)
        .saturating_add(MULTIPART_OVERHEAD);

    let staff_routes = Router::new()
        .route("/dashboard", get(dashboard::index))
        .nest("/categories", categories::router())
        .nest("/posts", posts::router().layer(DefaultBodyLimit::max(body_limit)))
        .nest("/users", users::router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_staff,
        ));

    Router::new()
        .route("/", get(|| async { Redirect::to("/dashboard") }))
        .merge(auth::router())
        .merge(staff_routes)
        .nest_service("/media", ServeDir::new(&state.config.upload.media_root))
        .fallback(error::not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            error::render_error_pages,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Context every dashboard page starts from
pub(crate) fn page_context(user: &User) -> Context {
    let mut context = Context::new();
    context.insert("current_user", user);
    context.insert("errors", &FormErrors::new());
    context
}

pub(crate) fn render(
    state: &AppState,
    template: &str,
    context: &Context,
) -> Result<Html<String>, DashboardError> {
    Ok(Html(state.views.render(template, context)?))
}
