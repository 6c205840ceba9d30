//! Account forms
//!
//! One struct serves both screens: the add screen sets a password, the edit
//! screen ignores the password fields.

use serde::{Deserialize, Serialize};

use super::{clean_text, deserialize_checkbox, FormErrors, REQUIRED};
use crate::models::{User, UserInput};

pub const USERNAME_MAX_LENGTH: usize = 150;
pub const NAME_MAX_LENGTH: usize = 150;
pub const EMAIL_MAX_LENGTH: usize = 254;
pub const PASSWORD_MIN_LENGTH: usize = 8;

const INVALID_USERNAME: &str = "Enter a valid username. This value may contain only letters, \
     numbers, and @/./+/-/_ characters.";
const INVALID_EMAIL: &str = "Enter a valid email address.";
const PASSWORD_MISMATCH: &str = "The two password fields didn't match.";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default, deserialize_with = "deserialize_checkbox")]
    pub is_active: bool,
    #[serde(default, deserialize_with = "deserialize_checkbox")]
    pub is_staff: bool,
    #[serde(default, deserialize_with = "deserialize_checkbox")]
    pub is_superuser: bool,
    #[serde(default, skip_serializing)]
    pub password1: String,
    #[serde(default, skip_serializing)]
    pub password2: String,
}

impl UserForm {
    /// Blank add form; new accounts start active
    pub fn new() -> Self {
        Self {
            is_active: true,
            ..Self::default()
        }
    }

    /// Edit form pre-filled from an existing account
    pub fn from_user(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            is_active: user.is_active,
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
            password1: String::new(),
            password2: String::new(),
        }
    }

    /// Validate for account creation, returning the profile and the password
    pub fn validate_new(&self) -> Result<(UserInput, String), FormErrors> {
        let mut errors = FormErrors::new();
        let input = self.clean_profile(&mut errors);

        if self.password1.is_empty() {
            errors.add("password1", REQUIRED);
        } else if self.password1.chars().count() < PASSWORD_MIN_LENGTH {
            errors.add(
                "password1",
                format!(
                    "This password is too short. It must contain at least {} characters.",
                    PASSWORD_MIN_LENGTH
                ),
            );
        }

        if self.password2.is_empty() {
            errors.add("password2", REQUIRED);
        } else if !self.password1.is_empty() && self.password1 != self.password2 {
            errors.add("password2", PASSWORD_MISMATCH);
        }

        errors.into_result((input, self.password1.clone()))
    }

    /// Validate for editing an existing account
    pub fn validate_edit(&self) -> Result<UserInput, FormErrors> {
        let mut errors = FormErrors::new();
        let input = self.clean_profile(&mut errors);
        errors.into_result(input)
    }

    fn clean_profile(&self, errors: &mut FormErrors) -> UserInput {
        let username = clean_text(
            errors,
            "username",
            &self.username,
            true,
            Some(USERNAME_MAX_LENGTH),
        );
        if !username.is_empty() && !is_valid_username(&username) {
            errors.add("username", INVALID_USERNAME);
        }

        let email = clean_text(errors, "email", &self.email, false, Some(EMAIL_MAX_LENGTH));
        if !email.is_empty() && !is_valid_email(&email) {
            errors.add("email", INVALID_EMAIL);
        }

        UserInput {
            username,
            email,
            first_name: clean_text(
                errors,
                "first_name",
                &self.first_name,
                false,
                Some(NAME_MAX_LENGTH),
            ),
            last_name: clean_text(
                errors,
                "last_name",
                &self.last_name,
                false,
                Some(NAME_MAX_LENGTH),
            ),
            is_active: self.is_active,
            is_staff: self.is_staff,
            is_superuser: self.is_superuser,
        }
    }
}

/// Letters, digits and `@ . + - _`
pub fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
}

/// `local@domain.tld` with no whitespace
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = email.rsplit_once('@') else {
        return false;
    };

    !local.is_empty()
        && !local.contains('@')
        && domain
            .split('.')
            .all(|label| !label.is_empty() && !label.starts_with('-') && !label.ends_with('-'))
        && domain.contains('.')
}
