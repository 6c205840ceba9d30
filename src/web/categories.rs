//! Category pages
//!
//! - GET       /categories
//! - GET, POST /categories/add
//! - GET, POST /categories/{id}/edit
//! - POST      /categories/{id}/delete

use axum::{
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};

use super::{page_context, render, AppState, CurrentUser, DashboardError, EntityId};
use crate::forms::{CategoryForm, FormErrors};
use crate::models::User;
use crate::services::CategoryServiceError;

const LIST_URL: &str = "/categories";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/add", get(add_page).post(add))
        .route("/{id}/edit", get(edit_page).post(edit))
        .route("/{id}/delete", post(delete))
}

fn form_page(
    state: &AppState,
    user: &User,
    heading: &str,
    action: &str,
    form: &CategoryForm,
    errors: &FormErrors,
) -> Result<Html<String>, DashboardError> {
    let mut context = page_context(user);
    context.insert("heading", heading);
    context.insert("action", action);
    context.insert("form", form);
    context.insert("errors", errors);
    render(state, "dashboard/category_form.html", &context)
}

async fn list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Html<String>, DashboardError> {
    let categories = state.category_service.list().await?;

    let mut context = page_context(&user);
    context.insert("categories", &categories);
    render(&state, "dashboard/categories.html", &context)
}

async fn add_page(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Html<String>, DashboardError> {
    form_page(
        &state,
        &user,
        "Add category",
        "/categories/add",
        &CategoryForm::default(),
        &FormErrors::new(),
    )
}

async fn add(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<CategoryForm>,
) -> Result<Response, DashboardError> {
    match state.category_service.create(&form).await {
        Ok(_) => Ok(Redirect::to(LIST_URL).into_response()),
        Err(CategoryServiceError::Invalid(errors)) => {
            let page = form_page(&state, &user, "Add category", "/categories/add", &form, &errors)?;
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
    let category = state.category_service.get(id).await?;

    form_page(
        &state,
        &user,
        "Edit category",
        &format!("/categories/{}/edit", id),
        &CategoryForm::from_category(&category),
        &FormErrors::new(),
    )
}

async fn edit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    EntityId(id): EntityId,
    Form(form): Form<CategoryForm>,
) -> Result<Response, DashboardError> {
    match state.category_service.update(id, &form).await {
        Ok(_) => Ok(Redirect::to(LIST_URL).into_response()),
        Err(CategoryServiceError::Invalid(errors)) => {
            let action = format!("/categories/{}/edit", id);
            let page = form_page(&state, &user, "Edit category", &action, &form, &errors)?;
            Ok(page.into_response())
        }
        Err(e) => Err(e.into()),
    }
}

async fn delete(
    State(state): State<AppState>,
    EntityId(id): EntityId,
) -> Result<Redirect, DashboardError> {
    state.category_service.delete(id).await?;
    Ok(Redirect::to(LIST_URL))
}
