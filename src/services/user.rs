//! User service
//!
//! Account management for the dashboard plus the login session lifecycle:
//! - create, edit and delete accounts
//! - login / logout with argon2 password checks
//! - session validation and expiry cleanup
//! - first-run admin bootstrap

use crate::config::AdminBootstrapConfig;
use crate::db::is_unique_violation;
use crate::db::repositories::{SessionRepository, UserRepository};
use crate::forms::{FormErrors, UserForm};
use crate::models::{Session, User, UserInput};
use crate::services::password::{hash_password, verify_password};
use anyhow::Context;
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Default session expiration time in days
const DEFAULT_SESSION_EXPIRATION_DAYS: i64 = 7;

const DUPLICATE_USERNAME: &str = "A user with that username already exists.";

/// Shown for both an unknown username and a wrong password
pub const INVALID_LOGIN: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";
pub const INACTIVE_ACCOUNT: &str = "This account is inactive.";

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    #[error("User not found: {0}")]
    NotFound(i64),

    /// The submitted form did not validate
    #[error("Invalid user: {0}")]
    Invalid(FormErrors),

    /// Login refused; the message is safe to show
    #[error("Authentication failed: {0}")]
    AuthenticationError(&'static str),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_expiration_days: i64,
}

impl UserService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
    ) -> Self {
        Self::with_session_expiration(user_repo, session_repo, DEFAULT_SESSION_EXPIRATION_DAYS)
    }

    pub fn with_session_expiration(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        session_expiration_days: i64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            session_expiration_days,
        }
    }

    pub fn session_expiration_days(&self) -> i64 {
        self.session_expiration_days
    }

    // ========================================================================
    // Account management
    // ========================================================================

    /// All accounts, ascending id
    pub async fn list(&self) -> Result<Vec<User>, UserServiceError> {
        Ok(self.user_repo.list().await.context("Failed to list users")?)
    }

    pub async fn get(&self, id: i64) -> Result<User, UserServiceError> {
        self.user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user by ID")?
            .ok_or(UserServiceError::NotFound(id))
    }

    pub async fn count(&self) -> Result<i64, UserServiceError> {
        Ok(self.user_repo.count().await.context("Failed to count users")?)
    }

    /// Create an account from the add form
    pub async fn create(&self, form: &UserForm) -> Result<User, UserServiceError> {
        let cleaned = form.validate_new();
        let mut errors = cleaned.as_ref().err().cloned().unwrap_or_default();
        self.check_username(&mut errors, &form.username, None).await?;

        let (input, password) = match cleaned {
            Ok(valid) if errors.is_empty() => valid,
            _ => return Err(UserServiceError::Invalid(errors)),
        };

        let password_hash = hash_password(&password).context("Failed to hash password")?;
        let mut user = User::new(input.username.clone(), input.email.clone(), password_hash);
        apply_input(&mut user, input);

        let created = match self.user_repo.create(&user).await {
            Ok(created) => created,
            Err(e) if is_unique_violation(&e) => return Err(duplicate_username()),
            Err(e) => return Err(e.context("Failed to create user").into()),
        };

        tracing::info!("Created user {} ({})", created.id, created.username);
        Ok(created)
    }

    /// Overwrite an account from the edit form. The password is untouched.
    pub async fn update(&self, id: i64, form: &UserForm) -> Result<User, UserServiceError> {
        let mut user = self.get(id).await?;

        let cleaned = form.validate_edit();
        let mut errors = cleaned.as_ref().err().cloned().unwrap_or_default();
        self.check_username(&mut errors, &form.username, Some(id)).await?;

        let input = match cleaned {
            Ok(input) if errors.is_empty() => input,
            _ => return Err(UserServiceError::Invalid(errors)),
        };

        apply_input(&mut user, input);
        let updated = match self.user_repo.update(&user).await {
            Ok(updated) => updated,
            Err(e) if is_unique_violation(&e) => return Err(duplicate_username()),
            Err(e) => return Err(e.context("Failed to update user").into()),
        };

        tracing::info!("Updated user {}", id);
        Ok(updated)
    }

    /// Delete an account; its posts and sessions go with it
    pub async fn delete(&self, id: i64) -> Result<(), UserServiceError> {
        let deleted = self
            .user_repo
            .delete(id)
            .await
            .context("Failed to delete user")?;

        if !deleted {
            return Err(UserServiceError::NotFound(id));
        }

        tracing::info!("Deleted user {}", id);
        Ok(())
    }

    /// Create the configured superuser when the database has no accounts.
    ///
    /// Returns the new account, or `None` if accounts already exist.
    pub async fn ensure_admin(
        &self,
        admin: &AdminBootstrapConfig,
    ) -> Result<Option<User>, UserServiceError> {
        if self.count().await? > 0 {
            return Ok(None);
        }

        let password_hash = hash_password(&admin.password).context("Failed to hash password")?;
        let mut user = User::new(admin.username.clone(), admin.email.clone(), password_hash);
        user.is_staff = true;
        user.is_superuser = true;

        let created = self
            .user_repo
            .create(&user)
            .await
            .context("Failed to create admin user")?;

        tracing::info!("Created initial admin user '{}'", created.username);
        Ok(Some(created))
    }

    // ========================================================================
    // Sessions
    // ========================================================================

    /// Check credentials and open a session.
    ///
    /// Inactive accounts are refused only after the password matched, so the
    /// message does not reveal which usernames exist.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(Session, User), UserServiceError> {
        let user = self
            .user_repo
            .get_by_username(username.trim())
            .await
            .context("Failed to get user by username")?
            .ok_or(UserServiceError::AuthenticationError(INVALID_LOGIN))?;

        let password_valid = verify_password(password, &user.password_hash)
            .context("Failed to verify password")?;
        if !password_valid {
            tracing::debug!("Failed login for '{}'", user.username);
            return Err(UserServiceError::AuthenticationError(INVALID_LOGIN));
        }

        if !user.is_active {
            return Err(UserServiceError::AuthenticationError(INACTIVE_ACCOUNT));
        }

        let session = self.create_session(user.id).await?;

        let now = Utc::now();
        self.user_repo
            .touch_last_login(user.id, now)
            .await
            .context("Failed to record login")?;

        tracing::info!("User '{}' logged in", user.username);
        Ok((
            session,
            User {
                last_login: Some(now),
                ..user
            },
        ))
    }

    /// Logout (invalidate session). Unknown tokens are ignored.
    pub async fn logout(&self, session_id: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(session_id)
            .await
            .context("Failed to delete session")?;

        Ok(())
    }

    /// Resolve a session token to its account.
    ///
    /// `None` for unknown or expired sessions and for deactivated accounts.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let session = match self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        {
            Some(s) => s,
            None => return Ok(None),
        };

        if session.is_expired() {
            if let Err(e) = self.session_repo.delete(token).await {
                tracing::warn!("Failed to delete expired session: {}", e);
            }
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")?;

        Ok(user.filter(|u| u.is_active))
    }

    /// Delete all expired sessions, returning how many were removed
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, UserServiceError> {
        let count = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;

        Ok(count)
    }

    // ========================================================================
    // Private helper methods
    // ========================================================================

    async fn check_username(
        &self,
        errors: &mut FormErrors,
        username: &str,
        exclude_id: Option<i64>,
    ) -> Result<(), UserServiceError> {
        let username = username.trim();
        if !username.is_empty()
            && self
                .user_repo
                .exists_by_username(username, exclude_id)
                .await
                .context("Failed to check username")?
        {
            errors.add("username", DUPLICATE_USERNAME);
        }
        Ok(())
    }

    async fn create_session(&self, user_id: i64) -> Result<Session, UserServiceError> {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            user_id,
            expires_at: now + Duration::days(self.session_expiration_days),
            created_at: now,
        };

        let created = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;

        Ok(created)
    }
}

/// The unique index caught a username the earlier check missed
fn duplicate_username() -> UserServiceError {
    let mut errors = FormErrors::new();
    errors.add("username", DUPLICATE_USERNAME);
    UserServiceError::Invalid(errors)
}

fn apply_input(user: &mut User, input: UserInput) {
    user.username = input.username;
    user.email = input.email;
    user.first_name = input.first_name;
    user.last_name = input.last_name;
    user.is_active = input.is_active;
    user.is_staff = input.is_staff;
    user.is_superuser = input.is_superuser;
}
