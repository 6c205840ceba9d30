//! Dashboard landing page

use axum::{extract::State, response::Html};

use super::{page_context, render, AppState, CurrentUser, DashboardError};

/// GET /dashboard
pub async fn index(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Html<String>, DashboardError> {
    let category_count = state.category_service.count().await?;
    let post_count = state.post_service.count().await?;

    let mut context = page_context(&user);
    context.insert("category_count", &category_count);
    context.insert("post_count", &post_count);

    render(&state, "dashboard/dashboard.html", &context)
}
