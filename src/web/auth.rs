//! Login and logout
//!
//! - GET  /login  - login form
//! - POST /login  - check credentials, set the session cookie
//! - POST /logout - end the session

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;

use super::middleware::{clear_session_cookie, extract_session_token, session_cookie};
use super::{render, AppState, DashboardError};
use crate::forms::FormErrors;
use crate::services::UserServiceError;

const DEFAULT_REDIRECT: &str = "/dashboard";

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub next: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_page).post(login))
        .route("/logout", post(logout))
}

/// Where to go after logging in. Only local paths are followed.
pub fn safe_redirect_target(next: &str) -> &str {
    let is_local = next.starts_with('/')
        && !next.starts_with("//")
        && !next.contains('\\')
        && !next.chars().any(char::is_control);

    if is_local {
        next
    } else {
        DEFAULT_REDIRECT
    }
}

fn login_context(username: &str, next: &str, errors: &FormErrors) -> tera::Context {
    let mut context = tera::Context::new();
    context.insert("username", username);
    context.insert("next", next);
    context.insert("errors", errors);
    context
}

/// GET /login
async fn login_page(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
) -> Result<Response, DashboardError> {
    let next = query.next.unwrap_or_default();
    let context = login_context("", &next, &FormErrors::new());
    Ok(render(&state, "login.html", &context)?.into_response())
}

/// POST /login
async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, DashboardError> {
    match state.user_service.login(&form.username, &form.password).await {
        Ok((session, _user)) => {
            let max_age = state.user_service.session_expiration_days() * 24 * 60 * 60;
            let cookie = session_cookie(&session.id, max_age, state.config.session.secure_cookie);
            let target = safe_redirect_target(&form.next);

            Ok(([(header::SET_COOKIE, cookie)], Redirect::to(target)).into_response())
        }
        Err(UserServiceError::AuthenticationError(message)) => {
            let mut errors = FormErrors::new();
            errors.add_non_field(message);
            let context = login_context(&form.username, &form.next, &errors);
            Ok(render(&state, "login.html", &context)?.into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// POST /logout
async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, DashboardError> {
    if let Some(token) = extract_session_token(&headers) {
        state.user_service.logout(&token).await?;
    }

    Ok((
        [(header::SET_COOKIE, clear_session_cookie())],
        Redirect::to("/login"),
    )
        .into_response())
}
