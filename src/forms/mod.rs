//! HTML form binding and validation
//!
//! Each form struct is deserialized from the submitted payload, keeps the
//! raw values so it can be rendered back, and `validate()`s into the input
//! type a service writes from. Failures are collected per field in
//! `FormErrors` so the whole form is reported at once.

mod category;
mod post;
mod user;

pub use category::CategoryForm;
pub use post::{PostForm, UploadedImage, ValidPost};
pub use user::UserForm;

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_CHOICE: &str =
    "Select a valid choice. That choice is not one of the available choices.";

/// Key holding errors that belong to no single field
pub const NON_FIELD_ERRORS: &str = "__all__";

/// Validation messages keyed by field name.
///
/// Serializes as a plain map, so templates read `errors.<field>`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message against `field`
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    /// Record a message that is not tied to a field
    pub fn add_non_field(&mut self, message: impl Into<String>) {
        self.add(NON_FIELD_ERRORS, message);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages for `field`, empty when it validated
    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Names of the fields that failed
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// `Ok(value)` when nothing was recorded
    pub fn into_result<T>(self, value: T) -> Result<T, FormErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{}: {}", field, message)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Trim a text field and check it against the required and length rules.
///
/// Returns the cleaned value; problems are recorded in `errors`.
pub(crate) fn clean_text(
    errors: &mut FormErrors,
    field: &str,
    value: &str,
    required: bool,
    max_length: Option<usize>,
) -> String {
    let value = value.trim();

    if value.is_empty() {
        if required {
            errors.add(field, REQUIRED);
        }
        return String::new();
    }

    if let Some(max) = max_length {
        let len = value.chars().count();
        if len > max {
            errors.add(
                field,
                format!(
                    "Ensure this value has at most {} characters (it has {}).",
                    max, len
                ),
            );
        }
    }

    value.to_string()
}

/// HTML checkboxes are sent only when ticked, usually as `on`
pub(crate) fn checkbox_value(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "on" | "true" | "1" | "yes"
    )
}

/// serde helper for checkbox fields; pair with `#[serde(default)]`
pub(crate) fn deserialize_checkbox<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.as_deref().map(checkbox_value).unwrap_or(false))
}
