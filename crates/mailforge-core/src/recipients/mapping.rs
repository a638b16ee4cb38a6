//! CSV column mapping.

use serde::{Deserialize, Serialize};

use crate::validation::{ValidationError, ValidationResult};

/// Which CSV columns supply the recipient's email and name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    /// Column holding the email address (required before sending).
    pub email: Option<String>,
    /// Column holding the display name.
    pub name: Option<String>,
}

impl ColumnMapping {
    /// Guesses a mapping from the header row.
    ///
    /// The first header containing "email" (any case) becomes the email
    /// column; the first other header containing "name" becomes the name
    /// column.
    #[must_use]
    pub fn detect<S: AsRef<str>>(headers: &[S]) -> Self {
        let mut mapping = Self::default();
        for header in headers {
            let header = header.as_ref();
            let lower = header.to_lowercase();
            if lower.contains("email") {
                if mapping.email.is_none() {
                    mapping.email = Some(header.to_string());
                }
            } else if lower.contains("name") && mapping.name.is_none() {
                mapping.name = Some(header.to_string());
            }
        }
        mapping
    }

    /// Sets the email column.
    #[must_use]
    pub fn with_email(mut self, column: impl Into<String>) -> Self {
        self.email = Some(column.into());
        self
    }

    /// Sets the name column.
    #[must_use]
    pub fn with_name(mut self, column: impl Into<String>) -> Self {
        self.name = Some(column.into());
        self
    }

    /// Checks the mapping against a header row.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingEmailMapping`] when no email column
    /// is chosen and [`ValidationError::MissingColumn`] for each mapped
    /// column absent from `headers`.
    pub fn validate<S: AsRef<str>>(&self, headers: &[S]) -> ValidationResult {
        let has = |column: &str| headers.iter().any(|h| h.as_ref() == column);
        let mut errors = Vec::new();

        match self.email.as_deref().filter(|c| !c.is_empty()) {
            None => errors.push(ValidationError::MissingEmailMapping),
            Some(column) if !has(column) => {
                errors.push(ValidationError::MissingColumn(column.to_string()));
            }
            Some(_) => {}
        }
        if let Some(column) = self.name.as_deref().filter(|c| !c.is_empty())
            && !has(column)
        {
            errors.push(ValidationError::MissingColumn(column.to_string()));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
