//! Dashboard error responses
//!
//! Handlers return `DashboardError`; `render_error_pages` turns the marked
//! responses into the 403 / 404 / 500 templates.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{Html, IntoResponse, Redirect, Response},
};
use tera::Context;

use super::AppState;
use crate::services::{CategoryServiceError, PostServiceError, UserServiceError};
use crate::view::ViewError;

#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    /// No session; send the browser to the login form
    #[error("Login required for {next}")]
    LoginRequired { next: String },

    #[error("Forbidden")]
    Forbidden,

    #[error("Not found")]
    NotFound,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Marks a response whose body should be replaced by an error page
#[derive(Debug, Clone, Copy)]
pub struct ErrorPage(pub StatusCode);

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let status = match self {
            DashboardError::LoginRequired { next } => {
                let location = format!("/login?next={}", urlencoding::encode(&next));
                return Redirect::to(&location).into_response();
            }
            DashboardError::Forbidden => StatusCode::FORBIDDEN,
            DashboardError::NotFound => StatusCode::NOT_FOUND,
            DashboardError::BadRequest(ref message) => {
                tracing::debug!("Bad request: {}", message);
                StatusCode::BAD_REQUEST
            }
            DashboardError::Internal(ref e) => {
                tracing::error!("Internal error: {:#}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let mut response = (status, status.canonical_reason().unwrap_or("Error")).into_response();
        response.extensions_mut().insert(ErrorPage(status));
        response
    }
}

impl From<CategoryServiceError> for DashboardError {
    fn from(e: CategoryServiceError) -> Self {
        match e {
            CategoryServiceError::NotFound(_) => DashboardError::NotFound,
            CategoryServiceError::Invalid(errors) => DashboardError::BadRequest(errors.to_string()),
            CategoryServiceError::InternalError(e) => DashboardError::Internal(e),
        }
    }
}

impl From<PostServiceError> for DashboardError {
    fn from(e: PostServiceError) -> Self {
        match e {
            PostServiceError::NotFound(_) => DashboardError::NotFound,
            PostServiceError::Invalid(errors) => DashboardError::BadRequest(errors.to_string()),
            PostServiceError::InternalError(e) => DashboardError::Internal(e),
        }
    }
}

impl From<UserServiceError> for DashboardError {
    fn from(e: UserServiceError) -> Self {
        match e {
            UserServiceError::NotFound(_) => DashboardError::NotFound,
            UserServiceError::Invalid(errors) => DashboardError::BadRequest(errors.to_string()),
            UserServiceError::AuthenticationError(_) => DashboardError::Forbidden,
            UserServiceError::InternalError(e) => DashboardError::Internal(e),
        }
    }
}

impl From<ViewError> for DashboardError {
    fn from(e: ViewError) -> Self {
        DashboardError::Internal(anyhow::Error::new(e))
    }
}

/// Fallback for unmatched routes
pub async fn not_found() -> DashboardError {
    DashboardError::NotFound
}

/// Swap the plain body of marked error responses for the matching template
pub async fn render_error_pages(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;

    let Some(ErrorPage(status)) = response.extensions().get::<ErrorPage>().copied() else {
        return response;
    };

    let template = match status {
        StatusCode::FORBIDDEN => "403.html",
        StatusCode::NOT_FOUND => "404.html",
        s if s.is_server_error() => "500.html",
        _ => return response,
    };

    match state.views.render(template, &Context::new()) {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!("Failed to render error page {}: {}", template, e);
            response
        }
    }
}
