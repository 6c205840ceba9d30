//! Request authentication
//!
//! The staff gate runs as a route layer over every dashboard route. A
//! request passes only with a live session for an active account that has
//! `is_staff` or `is_superuser`.

use axum::{
    extract::{FromRequestParts, Path, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};

use super::{AppState, DashboardError};
use crate::models::User;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "session";

/// Staff account that passed the gate
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = DashboardError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(DashboardError::Forbidden)
    }
}

/// Numeric id from the `{id}` path segment; anything else is a 404
#[derive(Debug, Clone, Copy)]
pub struct EntityId(pub i64);

impl<S> FromRequestParts<S> for EntityId
where
    S: Send + Sync,
{
    type Rejection = DashboardError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| DashboardError::NotFound)?;

        raw.parse::<i64>()
            .ok()
            .filter(|id| *id > 0)
            .map(EntityId)
            .ok_or(DashboardError::NotFound)
    }
}

/// Extract the session token from the cookie, or a Bearer header
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(cookie_header) = headers.get(header::COOKIE) {
        if let Ok(cookie_str) = cookie_header.to_str() {
            for cookie in cookie_str.split(';') {
                if let Some(token) = cookie
                    .trim()
                    .strip_prefix(SESSION_COOKIE)
                    .and_then(|rest| rest.strip_prefix('='))
                {
                    if !token.is_empty() {
                        return Some(token.to_string());
                    }
                }
            }
        }
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(String::from)
}

/// `Set-Cookie` value carrying a session token
pub fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that removes the session cookie
pub fn clear_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

/// Decide whether `user` may open `path`
pub fn authorize(user: Option<User>, path: &str) -> Result<User, DashboardError> {
    let Some(user) = user else {
        return Err(DashboardError::LoginRequired {
            next: path.to_string(),
        });
    };

    if !user.is_dashboard_user() {
        tracing::warn!("User '{}' denied access to {}", user.username, path);
        return Err(DashboardError::Forbidden);
    }

    Ok(user)
}

/// Staff authorization middleware
pub async fn require_staff(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, DashboardError> {
    let user = match extract_session_token(request.headers()) {
        Some(token) => state.user_service.validate_session(&token).await?,
        None => None,
    };

    let path = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let user = authorize(user, &path)?;
    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_token_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session=abc123; other=1"),
        );
        assert_eq!(extract_session_token(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn test_token_ignores_similar_cookie_names() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("sessionid=zzz; session="));
        assert_eq!(extract_session_token(&headers), None);
    }

    #[test]
    fn test_token_from_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer tok"));
        assert_eq!(extract_session_token(&headers), Some("tok".to_string()));
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("abc", 60, false);
        assert_eq!(cookie, "session=abc; Path=/; HttpOnly; SameSite=Lax; Max-Age=60");
        assert!(session_cookie("abc", 60, true).ends_with("; Secure"));
        assert!(clear_session_cookie().contains("Max-Age=0"));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn account(is_staff: bool, is_superuser: bool) -> User {
            let mut user = User::new("someone".to_string(), String::new(), "hash".to_string());
            user.is_staff = is_staff;
            user.is_superuser = is_superuser;
            user
        }

        proptest! {
            #[test]
            fn non_staff_accounts_never_pass(path in "/[a-z0-9/]{0,30}") {
                let result = authorize(Some(account(false, false)), &path);
                prop_assert!(matches!(result, Err(DashboardError::Forbidden)));
            }

            #[test]
            fn anonymous_requests_keep_their_path(path in "/[a-z0-9/?=&]{0,30}") {
                match authorize(None, &path) {
                    Err(DashboardError::LoginRequired { next }) => prop_assert_eq!(next, path),
                    _ => prop_assert!(false, "expected a login redirect"),
                }
            }

            #[test]
            fn staff_or_superuser_passes(is_staff in any::<bool>(), is_superuser in any::<bool>()) {
                let result = authorize(Some(account(is_staff, is_superuser)), "/dashboard");
                prop_assert_eq!(result.is_ok(), is_staff || is_superuser);
            }
        }
    }
}
