//! Category form

use serde::{Deserialize, Serialize};

use super::{clean_text, FormErrors};
use crate::models::Category;

pub const NAME_MAX_LENGTH: usize = 50;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryForm {
    #[serde(default)]
    pub name: String,
}

impl CategoryForm {
    /// Form pre-filled from an existing category
    pub fn from_category(category: &Category) -> Self {
        Self {
            name: category.name.clone(),
        }
    }

    /// Validate the submitted values, returning the cleaned name.
    ///
    /// Uniqueness needs the database and is checked by the category service.
    pub fn validate(&self) -> Result<String, FormErrors> {
        let mut errors = FormErrors::new();
        let name = clean_text(&mut errors, "name", &self.name, true, Some(NAME_MAX_LENGTH));
        errors.into_result(name)
    }
}
