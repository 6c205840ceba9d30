//! User pages
//!
//! - GET       /users
//! - GET, POST /users/add
//! - GET, POST /users/{id}/edit
//! - POST      /users/{id}/delete

use axum::{
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};

use super::{page_context, render, AppState, CurrentUser, DashboardError, EntityId};
use crate::forms::{FormErrors, UserForm};
use crate::models::User;
use crate::services::UserServiceError;

const LIST_URL: &str = "/users";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/add", get(add_page).post(add))
        .route("/{id}/edit", get(edit_page).post(edit))
        .route("/{id}/delete", post(delete))
}

/// Which form the page shows; only the add form asks for a password
enum FormMode {
    Add,
    Edit(i64),
}

fn form_page(
    state: &AppState,
    user: &User,
    mode: FormMode,
    form: &UserForm,
    errors: &FormErrors,
) -> Result<Html<String>, DashboardError> {
    let (heading, action, is_edit) = match mode {
        FormMode::Add => ("Add user", "/users/add".to_string(), false),
        FormMode::Edit(id) => ("Edit user", format!("/users/{}/edit", id), true),
    };

    let mut context = page_context(user);
    context.insert("heading", heading);
    context.insert("action", &action);
    context.insert("is_edit", &is_edit);
    context.insert("form", form);
    context.insert("errors", errors);
    render(state, "dashboard/user_form.html", &context)
}

async fn list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Html<String>, DashboardError> {
    let users = state.user_service.list().await?;

    let mut context = page_context(&user);
    context.insert("users", &users);
    render(&state, "dashboard/users.html", &context)
}

async fn add_page(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Html<String>, DashboardError> {
    form_page(&state, &user, FormMode::Add, &UserForm::new(), &FormErrors::new())
}

async fn add(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<UserForm>,
) -> Result<Response, DashboardError> {
    match state.user_service.create(&form).await {
        Ok(_) => Ok(Redirect::to(LIST_URL).into_response()),
        Err(UserServiceError::Invalid(errors)) => {
            Ok(form_page(&state, &user, FormMode::Add, &form, &errors)?.into_response())
        }
        Err(e) => Err(e.into()),
    }
}

async fn edit_page(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    EntityId(id): EntityId,
) -> Result<Html<String>, DashboardError> {
    let target = state.user_service.get(id).await?;

    form_page(
        &state,
        &user,
        FormMode::Edit(id),
        &UserForm::from_user(&target),
        &FormErrors::new(),
    )
}

async fn edit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    EntityId(id): EntityId,
    Form(form): Form<UserForm>,
) -> Result<Response, DashboardError> {
    match state.user_service.update(id, &form).await {
        Ok(_) => Ok(Redirect::to(LIST_URL).into_response()),
        Err(UserServiceError::Invalid(errors)) => {
            Ok(form_page(&state, &user, FormMode::Edit(id), &form, &errors)?.into_response())
        }
        Err(e) => Err(e.into()),
    }
}

async fn delete(
    State(state): State<AppState>,
    EntityId(id): EntityId,
) -> Result<Redirect, DashboardError> {
    state.user_service.delete(id).await?;
    Ok(Redirect::to(LIST_URL))
}
