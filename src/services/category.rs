//! Category service
//!
//! List, create, edit and delete categories. Names are unique; deleting a
//! category removes its posts through the foreign key.

use crate::db::is_unique_violation;
use crate::db::repositories::CategoryRepository;
use crate::forms::{CategoryForm, FormErrors};
use crate::models::Category;
use anyhow::Context;
use std::sync::Arc;

const DUPLICATE_NAME: &str = "Category with this Name already exists.";

/// Error types for category service operations
#[derive(Debug, thiserror::Error)]
pub enum CategoryServiceError {
    #[error("Category not found: {0}")]
    NotFound(i64),

    /// The submitted form did not validate
    #[error("Invalid category: {0}")]
    Invalid(FormErrors),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct CategoryService {
    repo: Arc<dyn CategoryRepository>,
}

impl CategoryService {
    pub fn new(repo: Arc<dyn CategoryRepository>) -> Self {
        Self { repo }
    }

    /// All categories, ascending id
    pub async fn list(&self) -> Result<Vec<Category>, CategoryServiceError> {
        Ok(self.repo.list().await.context("Failed to list categories")?)
    }

    pub async fn get(&self, id: i64) -> Result<Category, CategoryServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get category")?
            .ok_or(CategoryServiceError::NotFound(id))
    }

    pub async fn count(&self) -> Result<i64, CategoryServiceError> {
        Ok(self.repo.count().await.context("Failed to count categories")?)
    }

    pub async fn create(&self, form: &CategoryForm) -> Result<Category, CategoryServiceError> {
        let name = self.clean(form, None).await?;

        let category = match self.repo.create(&Category::new(name)).await {
            Ok(category) => category,
            Err(e) if is_unique_violation(&e) => return Err(duplicate_name()),
            Err(e) => return Err(e.context("Failed to create category").into()),
        };

        tracing::info!("Created category {} ({})", category.id, category.name);
        Ok(category)
    }

    pub async fn update(
        &self,
        id: i64,
        form: &CategoryForm,
    ) -> Result<Category, CategoryServiceError> {
        let mut category = self.get(id).await?;
        category.name = self.clean(form, Some(id)).await?;

        let updated = match self.repo.update(&category).await {
            Ok(updated) => updated,
            Err(e) if is_unique_violation(&e) => return Err(duplicate_name()),
            Err(e) => return Err(e.context("Failed to update category").into()),
        };

        tracing::info!("Updated category {}", id);
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> Result<(), CategoryServiceError> {
        let deleted = self
            .repo
            .delete(id)
            .await
            .context("Failed to delete category")?;

        if !deleted {
            return Err(CategoryServiceError::NotFound(id));
        }

        tracing::info!("Deleted category {}", id);
        Ok(())
    }

    /// Form validation plus the name uniqueness check
    async fn clean(
        &self,
        form: &CategoryForm,
        exclude_id: Option<i64>,
    ) -> Result<String, CategoryServiceError> {
        let cleaned = form.validate();
        let mut errors = cleaned.as_ref().err().cloned().unwrap_or_default();

        let name = form.name.trim();
        if !name.is_empty()
            && self
                .repo
                .exists_by_name(name, exclude_id)
                .await
                .context("Failed to check category name")?
        {
            errors.add("name", DUPLICATE_NAME);
        }

        match cleaned {
            Ok(name) if errors.is_empty() => Ok(name),
            _ => Err(CategoryServiceError::Invalid(errors)),
        }
    }
}

/// Raced past the name check; report it like the check would have
fn duplicate_name() -> CategoryServiceError {
    let mut errors = FormErrors::new();
    errors.add("name", DUPLICATE_NAME);
    CategoryServiceError::Invalid(errors)
}
