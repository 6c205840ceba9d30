//! Post pages
//!
//! - GET       /posts
//! - GET, POST /posts/add          (multipart)
//! - GET, POST /posts/{id}/edit    (multipart)
//! - POST      /posts/{id}/delete

use axum::{
    extract::{Multipart, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;

use super::{page_context, render, AppState, CurrentUser, DashboardError, EntityId};
use crate::forms::{FormErrors, PostForm};
use crate::models::{PostStatus, User};
use crate::services::PostServiceError;

const LIST_URL: &str = "/posts";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/add", get(add_page).post(add))
        .route("/{id}/edit", get(edit_page).post(edit))
        .route("/{id}/delete", post(delete))
}

#[derive(Serialize)]
struct StatusChoice {
    value: String,
    label: &'static str,
}

fn status_choices() -> Vec<StatusChoice> {
    PostStatus::ALL
        .iter()
        .map(|status| StatusChoice {
            value: status.to_string(),
            label: status.label(),
        })
        .collect()
}

async fn form_page(
    state: &AppState,
    user: &User,
    heading: &str,
    action: &str,
    form: &PostForm,
    errors: &FormErrors,
) -> Result<Html<String>, DashboardError> {
    let categories = state.category_service.list().await?;

    let mut context = page_context(user);
    context.insert("heading", heading);
    context.insert("action", action);
    context.insert("form", form);
    context.insert("errors", errors);
    context.insert("categories", &categories);
    context.insert("statuses", &status_choices());
    render(state, "dashboard/post_form.html", &context)
}

async fn read_form(multipart: &mut Multipart) -> Result<PostForm, DashboardError> {
    PostForm::from_multipart(multipart)
        .await
        .map_err(|e| DashboardError::BadRequest(format!("Malformed post form: {}", e)))
}

async fn list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Html<String>, DashboardError> {
    let posts = state.post_service.list().await?;

    let mut context = page_context(&user);
    context.insert("posts", &posts);
    render(&state, "dashboard/posts.html", &context)
}

async fn add_page(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Html<String>, DashboardError> {
    let form = PostForm {
        status: PostStatus::default().to_string(),
        ..PostForm::default()
    };
    form_page(&state, &user, "Add post", "/posts/add", &form, &FormErrors::new()).await
}

async fn add(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    mut multipart: Multipart,
) -> Result<Response, DashboardError> {
    let form = read_form(&mut multipart).await?;

    match state.post_service.create(user.id, &form).await {
        Ok(_) => Ok(Redirect::to(LIST_URL).into_response()),
        Err(PostServiceError::Invalid(errors)) => {
            let page = form_page(&state, &user, "Add post", "/posts/add", &form, &errors).await?;
            Ok(page.into_response())
        }
        Err(e) => Err(e.into()),
    }
}

async fn edit_page(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    EntityId(id): EntityId,
) -> Result<Html<String>, DashboardError> {
    let post = state.post_service.get(id).await?;

    form_page(
        &state,
        &user,
        "Edit post",
        &format!("/posts/{}/edit", id),
        &PostForm::from_post(&post),
        &FormErrors::new(),
    )
    .await
}

async fn edit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    EntityId(id): EntityId,
    mut multipart: Multipart,
) -> Result<Response, DashboardError> {
    let post = state.post_service.get(id).await?;
    let mut form = read_form(&mut multipart).await?;

    match state.post_service.update(id, &form).await {
        Ok(_) => Ok(Redirect::to(LIST_URL).into_response()),
        Err(PostServiceError::Invalid(errors)) => {
            form.current_image = Some(post.featured_image);
            let action = format!("/posts/{}/edit", id);
            let page = form_page(&state, &user, "Edit post", &action, &form, &errors).await?;
            Ok(page.into_response())
        }
        Err(e) => Err(e.into()),
    }
}

async fn delete(
    State(state): State<AppState>,
    EntityId(id): EntityId,
) -> Result<Redirect, DashboardError> {
    state.post_service.delete(id).await?;
    Ok(Redirect::to(LIST_URL))
}
