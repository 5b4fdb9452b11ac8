//! Embed viewer URLs
//!
//! Lecture media lives in an external document host. Identifiers are opaque
//! and only interpolated into a fixed viewer template.

use serde::Serialize;

use super::EmbedIds;
use crate::config::EMBED_ID_PLACEHOLDER;

/// Viewer URL template such as `https://drive.google.com/file/d/{id}/preview`
#[derive(Debug, Clone)]
pub struct EmbedTemplate {
    template: String,
}

impl EmbedTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Viewer URL for an identifier; blank identifiers count as absent
    pub fn render(&self, id: &str) -> Option<String> {
        let id = id.trim();
        if id.is_empty() {
            return None;
        }
        Some(self.template.replace(EMBED_ID_PLACEHOLDER, id))
    }

    /// Viewer URLs for every embed present on a lecture
    pub fn links(&self, ids: &EmbedIds) -> EmbedLinks {
        let render = |id: &Option<String>| id.as_deref().and_then(|id| self.render(id));
        EmbedLinks {
            video: render(&ids.movie),
            text: render(&ids.text),
            audio: render(&ids.audio),
        }
    }
}

/// Rendered viewer frames for a lecture
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EmbedLinks {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
}
