//! Template model types.

use chrono::{DateTime, Utc};
use mailforge_render::Document;
use serde::{Deserialize, Serialize};

/// Unique identifier for a stored template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemplateId(pub i64);

impl TemplateId {
    /// Create a new template ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TemplateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named email document.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    /// Unique identifier (None for unsaved templates).
    pub id: Option<TemplateId>,
    /// Display name.
    pub name: String,
    /// Block tree, rooted at `"root"`.
    pub document: Document,
    /// When the template was created.
    pub created_at: DateTime<Utc>,
    /// When the template was last saved.
    pub updated_at: DateTime<Utc>,
}

impl Template {
    /// Creates an unsaved template.
    #[must_use]
    pub fn new(name: impl Into<String>, document: Document) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            name: name.into(),
            document,
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates an unsaved template from the starter document.
    #[must_use]
    pub fn starter() -> Self {
        Self::new("Starter", Document::starter())
    }
}
