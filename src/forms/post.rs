//! Post form
//!
//! Submitted as `multipart/form-data` because it carries the featured image.

use axum::body::Bytes;
use axum::extract::multipart::{Multipart, MultipartError};
use serde::Serialize;
use std::str::FromStr;

use super::{checkbox_value, clean_text, FormErrors, INVALID_CHOICE, REQUIRED};
use crate::config::UploadConfig;
use crate::media::sniff_image_type;
use crate::models::{Post, PostInput, PostStatus};

pub const TITLE_MAX_LENGTH: usize = 100;
pub const SHORT_DESCRIPTION_MAX_LENGTH: usize = 500;

const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

/// Image file received with the form
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

/// Raw post form values. `category` and `status` stay strings until validated.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PostForm {
    pub title: String,
    pub category: String,
    pub short_description: String,
    pub body: String,
    pub status: String,
    pub is_featured: bool,
    /// Stored image of the post being edited, shown next to the file input
    pub current_image: Option<String>,
    #[serde(skip)]
    pub featured_image: Option<UploadedImage>,
}

/// A validated post form: field values plus the image to store, if any
#[derive(Debug, Clone)]
pub struct ValidPost {
    pub input: PostInput,
    pub image: Option<UploadedImage>,
}

impl PostForm {
    /// Form pre-filled from an existing post
    pub fn from_post(post: &Post) -> Self {
        Self {
            title: post.title.clone(),
            category: post.category_id.to_string(),
            short_description: post.short_description.clone(),
            body: post.body.clone(),
            status: post.status.to_string(),
            is_featured: post.is_featured,
            current_image: Some(post.featured_image.clone()),
            featured_image: None,
        }
    }

    /// Read the form out of a multipart body.
    ///
    /// A file input left empty arrives as a part with no file name and no
    /// bytes; it is treated as no upload.
    pub async fn from_multipart(multipart: &mut Multipart) -> Result<Self, MultipartError> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or("").to_string();

            if name == "featured_image" {
                let file_name = field.file_name().unwrap_or("").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field.bytes().await?;

                if !file_name.is_empty() || !data.is_empty() {
                    form.featured_image = Some(UploadedImage {
                        file_name,
                        content_type,
                        data,
                    });
                }
                continue;
            }

            let value = field.text().await?;
            match name.as_str() {
                "title" => form.title = value,
                "category" => form.category = value,
                "short_description" => form.short_description = value,
                "body" => form.body = value,
                "status" => form.status = value,
                "is_featured" => form.is_featured = checkbox_value(&value),
                _ => {}
            }
        }

        Ok(form)
    }

    /// Validate every field.
    ///
    /// `require_image` is set when creating, where a post must get an image.
    /// Whether the category exists is checked by the post service.
    pub fn validate(
        &self,
        upload: &UploadConfig,
        require_image: bool,
    ) -> Result<ValidPost, FormErrors> {
        let mut errors = FormErrors::new();

        let title = clean_text(&mut errors, "title", &self.title, true, Some(TITLE_MAX_LENGTH));
        let short_description = clean_text(
            &mut errors,
            "short_description",
            &self.short_description,
            true,
            Some(SHORT_DESCRIPTION_MAX_LENGTH),
        );
        let body = clean_text(&mut errors, "body", &self.body, true, None);

        let category_id = match self.category.trim() {
            "" => {
                errors.add("category", REQUIRED);
                0
            }
            raw => match raw.parse::<i64>() {
                Ok(id) if id > 0 => id,
                _ => {
                    errors.add("category", INVALID_CHOICE);
                    0
                }
            },
        };

        let status = match self.status.trim() {
            "" => PostStatus::default(),
            raw => PostStatus::from_str(raw).unwrap_or_else(|_| {
                errors.add("status", INVALID_CHOICE);
                PostStatus::default()
            }),
        };

        match &self.featured_image {
            Some(image) => validate_image(&mut errors, image, upload),
            None if require_image => errors.add("featured_image", REQUIRED),
            None => {}
        }

        errors.into_result(ValidPost {
            input: PostInput {
                title,
                category_id,
                short_description,
                body,
                status,
                is_featured: self.is_featured,
            },
            image: self.featured_image.clone(),
        })
    }
}

fn validate_image(errors: &mut FormErrors, image: &UploadedImage, upload: &UploadConfig) {
    if image.data.is_empty() {
        errors.add("featured_image", "The submitted file is empty.");
        return;
    }

    // The declared type must be allowed and match the file's leading bytes
    if !upload.is_type_allowed(&image.content_type)
        || sniff_image_type(&image.data) != Some(image.content_type.as_str())
    {
        errors.add("featured_image", INVALID_IMAGE);
        return;
    }

    if image.data.len() as u64 > upload.max_file_size {
        errors.add(
            "featured_image",
            format!(
                "File too large. Maximum size is {} MB.",
                upload.max_file_size / 1024 / 1024
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

    /// PNG-signed payload of `size` bytes (at least the signature)
    fn png(size: usize) -> UploadedImage {
        let mut data = PNG_SIGNATURE.to_vec();
        data.resize(size.max(PNG_SIGNATURE.len()), 0);
        UploadedImage {
            file_name: "cover.png".to_string(),
            content_type: "image/png".to_string(),
            data: Bytes::from(data),
        }
    }

    fn valid_form() -> PostForm {
        PostForm {
            title: "Hello World".to_string(),
            category: "1".to_string(),
            short_description: "Short".to_string(),
            body: "Body".to_string(),
            status: "published".to_string(),
            is_featured: true,
            current_image: None,
            featured_image: Some(png(16)),
        }
    }

    #[test]
    fn test_valid_form() {
        let valid = valid_form().validate(&UploadConfig::default(), true).unwrap();

        assert_eq!(valid.input.title, "Hello World");
        assert_eq!(valid.input.category_id, 1);
        assert_eq!(valid.input.status, PostStatus::Published);
        assert!(valid.input.is_featured);
        assert!(valid.image.is_some());
    }

    #[test]
    fn test_missing_fields_reported_together() {
        let form = PostForm::default();
        let errors = form.validate(&UploadConfig::default(), true).unwrap_err();

        for field in ["title", "category", "short_description", "body", "featured_image"] {
            assert_eq!(errors.get(field), [REQUIRED.to_string()], "field {}", field);
        }
        assert!(!errors.has("status"));
    }

    #[test]
    fn test_image_optional_when_editing() {
        let mut form = valid_form();
        form.featured_image = None;

        let valid = form.validate(&UploadConfig::default(), false).unwrap();
        assert!(valid.image.is_none());
    }

    #[test]
    fn test_invalid_choices() {
        let mut form = valid_form();
        form.category = "abc".to_string();
        form.status = "archived".to_string();

        let errors = form.validate(&UploadConfig::default(), true).unwrap_err();
        assert_eq!(errors.get("category"), [INVALID_CHOICE.to_string()]);
        assert_eq!(errors.get("status"), [INVALID_CHOICE.to_string()]);
    }

    #[test]
    fn test_blank_status_defaults_to_draft() {
        let mut form = valid_form();
        form.status = String::new();

        let valid = form.validate(&UploadConfig::default(), true).unwrap();
        assert_eq!(valid.input.status, PostStatus::Draft);
    }

    #[test]
    fn test_rejects_disallowed_type() {
        let mut form = valid_form();
        form.featured_image = Some(UploadedImage {
            file_name: "notes.txt".to_string(),
            content_type: "text/plain".to_string(),
            data: Bytes::from_static(b"hello"),
        });

        let errors = form.validate(&UploadConfig::default(), true).unwrap_err();
        assert_eq!(errors.get("featured_image"), [INVALID_IMAGE.to_string()]);
    }

    #[test]
    fn test_rejects_mislabelled_file() {
        let mut form = valid_form();
        form.featured_image = Some(UploadedImage {
            file_name: "cover.png".to_string(),
            content_type: "image/png".to_string(),
            data: Bytes::from_static(b"<script>alert(1)</script>"),
        });

        let errors = form.validate(&UploadConfig::default(), true).unwrap_err();
        assert_eq!(errors.get("featured_image"), [INVALID_IMAGE.to_string()]);
    }

    #[test]
    fn test_rejects_type_mismatch() {
        let mut form = valid_form();
        form.featured_image = Some(UploadedImage {
            content_type: "image/jpeg".to_string(),
            ..png(16)
        });

        let errors = form.validate(&UploadConfig::default(), true).unwrap_err();
        assert_eq!(errors.get("featured_image"), [INVALID_IMAGE.to_string()]);
    }

    #[test]
    fn test_rejects_oversized_image() {
        let upload = UploadConfig {
            max_file_size: 8,
            ..UploadConfig::default()
        };
        let mut form = valid_form();
        form.featured_image = Some(png(9));

        let errors = form.validate(&upload, true).unwrap_err();
        assert!(errors.has("featured_image"));
    }

    #[test]
    fn test_title_too_long() {
        let mut form = valid_form();
        form.title = "t".repeat(TITLE_MAX_LENGTH + 1);

        let errors = form.validate(&UploadConfig::default(), true).unwrap_err();
        assert!(errors.has("title"));
    }

    #[test]
    fn test_from_post_round_trips_fields() {
        let now = chrono::Utc::now();
        let post = Post {
            id: 3,
            title: "T".to_string(),
            slug: "t-3".to_string(),
            category_id: 2,
            author_id: 1,
            featured_image: "uploads/a.png".to_string(),
            short_description: "S".to_string(),
            body: "B".to_string(),
            status: PostStatus::Published,
            is_featured: true,
            created_at: now,
            updated_at: now,
        };

        let form = PostForm::from_post(&post);
        assert_eq!(form.category, "2");
        assert_eq!(form.status, "published");
        assert_eq!(form.current_image.as_deref(), Some("uploads/a.png"));
        assert!(form.featured_image.is_none());
    }
}
