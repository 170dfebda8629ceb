//! Page contexts and the template rendering seam.

use serde::Serialize;
use serde_json::{Map, Value, json};
use std::borrow::Cow;
use std::fmt::Debug;
use tracing::warn;

#[expdj_derive::expdj_error]
pub enum RenderError {
    #[error("Unknown template{}: {message}", format_context(.context))]
    Template { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Render serialization error{}: {source}", format_context(.context))]
    Serde { source: serde_json::Error, context: Option<Cow<'static, str>> },
}

/// A rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub content_type: Cow<'static, str>,
    pub body: String,
}

/// Turns a template name and its context into a [`Document`].
pub trait Renderer: Debug + Send + Sync {
    fn render(&self, template: &str, context: &Map<String, Value>) -> Result<Document, RenderError>;
}

/// Emits `{"template": name, "context": {...}}` as `application/json`.
///
/// Keeps the page contract machine-checkable when no HTML engine is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn render(&self, template: &str, context: &Map<String, Value>) -> Result<Document, RenderError> {
        if template.is_empty() {
            return Err(RenderError::Template { message: "empty template name".into(), context: None });
        }
        let body = serde_json::to_string(&json!({ "template": template, "context": context }))
            .context(template.to_owned())?;
        Ok(Document { content_type: Cow::Borrowed("application/json"), body })
    }
}

/// A template name plus its context mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub template: &'static str,
    pub context: Map<String, Value>,
}

impl Page {
    #[must_use]
    pub fn new(template: &'static str) -> Self {
        Self { template, context: Map::new() }
    }

    /// Adds `key` to the context. A value that fails to serialize is stored as `null`.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or_else(|err| {
            warn!(template = self.template, key, error = %err, "Context value dropped");
            Value::Null
        });
        self.context.insert(key.to_owned(), value);
        self
    }

    /// # Errors
    /// Whatever `renderer` reports.
    pub fn render(&self, renderer: &dyn Renderer) -> Result<Document, RenderError> {
        renderer.render(self.template, &self.context)
    }
}
