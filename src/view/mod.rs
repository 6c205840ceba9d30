//! View engine
//!
//! Tera templates for every dashboard page. The templates under `templates/`
//! are compiled into the binary; an optional override directory replaces any
//! of them by relative name (`dashboard/posts.html`, ...).

use rust_embed::RustEmbed;
use serde_json::Value;
use std::collections::HashMap;
use std::error::Error as StdError;
use std::fs;
use std::path::Path;
use tera::{Context, Tera};

use crate::media::media_url;

mod error;

pub use error::ViewError;

#[derive(RustEmbed)]
#[folder = "templates/"]
#[include = "*.html"]
struct EmbeddedTemplates;

/// Renders named templates with a Tera context
pub struct ViewEngine {
    tera: Tera,
}

impl ViewEngine {
    /// Load the embedded templates, then any overrides from `override_dir`
    pub fn new(override_dir: Option<&Path>) -> Result<Self, ViewError> {
        let mut templates: Vec<(String, String)> = Vec::new();

        for name in EmbeddedTemplates::iter() {
            let Some(file) = EmbeddedTemplates::get(&name) else {
                continue;
            };
            let content = String::from_utf8(file.data.into_owned())
                .map_err(|_| ViewError::Encoding(name.to_string()))?;
            templates.push((name.to_string(), content));
        }

        if let Some(dir) = override_dir {
            let mut overrides = Vec::new();
            collect_templates_from_dir(dir, dir, &mut overrides)?;
            tracing::info!("Loaded {} template override(s) from {:?}", overrides.len(), dir);

            for (name, content) in overrides {
                templates.retain(|(existing, _)| existing != &name);
                templates.push((name, content));
            }
        }

        let mut tera = Tera::default();
        // add_raw_templates resolves inheritance once every template is present
        tera.add_raw_templates(templates)
            .map_err(|e| ViewError::TemplateError(describe(&e)))?;
        tera.register_filter("media_url", media_url_filter);

        Ok(Self { tera })
    }

    /// Only the compiled-in templates
    pub fn embedded() -> Result<Self, ViewError> {
        Self::new(None)
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|t| t == name)
    }

    pub fn render(&self, template: &str, context: &Context) -> Result<String, ViewError> {
        self.tera.render(template, context).map_err(|e| {
            ViewError::TemplateError(format!("Failed to render '{}': {}", template, describe(&e)))
        })
    }
}

/// Tera errors keep the useful part in their source chain
fn describe(error: &tera::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(s) = source {
        message.push_str(&format!("\n  Caused by: {}", s));
        source = s.source();
    }
    message
}

fn collect_templates_from_dir(
    base_path: &Path,
    current_path: &Path,
    templates: &mut Vec<(String, String)>,
) -> Result<(), ViewError> {
    if !current_path.exists() {
        return Ok(());
    }

    for entry in fs::read_dir(current_path)? {
        let path = entry?.path();

        if path.is_dir() {
            collect_templates_from_dir(base_path, &path, templates)?;
        } else if path.extension().map_or(false, |ext| ext == "html") {
            let relative_path = path
                .strip_prefix(base_path)
                .map_err(|_| ViewError::TemplateError(format!("Bad template path: {:?}", path)))?;
            let template_name = relative_path.to_string_lossy().replace('\\', "/");

            templates.push((template_name, fs::read_to_string(&path)?));
        }
    }

    Ok(())
}

/// `{{ post.featured_image | media_url }}`
fn media_url_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    match value.as_str() {
        Some(path) if !path.is_empty() => Ok(Value::String(media_url(path))),
        Some(_) => Ok(Value::String(String::new())),
        None => Err(tera::Error::msg("media_url expects a string")),
    }
}
