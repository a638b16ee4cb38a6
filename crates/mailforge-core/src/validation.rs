//! Validation errors shared by the campaign wizard steps.

use regex::Regex;
use std::sync::OnceLock;

/// Validation error for campaign details or recipient import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Campaign name is empty.
    EmptyName,
    /// Subject line is empty.
    EmptySubject,
    /// Sender name is empty.
    EmptyFromName,
    /// Sender email is empty.
    EmptyFromEmail,
    /// Sender email format is invalid.
    InvalidFromEmail,
    /// Reply-to email format is invalid.
    InvalidReplyTo,
    /// No CSV column is mapped to the email field.
    MissingEmailMapping,
    /// A mapped or required column is not in the CSV header.
    MissingColumn(String),
    /// The CSV has no data rows.
    NoRecipients,
    /// A row's email address is invalid (1-based row number).
    InvalidRecipientEmail(usize),
}

impl ValidationError {
    /// Get human-readable error message.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::EmptyName => "Campaign name is required".to_string(),
            Self::EmptySubject => "Email subject is required".to_string(),
            Self::EmptyFromName => "From name is required".to_string(),
            Self::EmptyFromEmail => "From email is required".to_string(),
            Self::InvalidFromEmail => "Invalid from email address".to_string(),
            Self::InvalidReplyTo => "Invalid reply-to email address".to_string(),
            Self::MissingEmailMapping => {
                "Please map an email field before continuing".to_string()
            }
            Self::MissingColumn(column) => format!("Required column \"{column}\" is missing"),
            Self::NoRecipients => "The contact list has no rows".to_string(),
            Self::InvalidRecipientEmail(row) => format!("Invalid email address in row {row}"),
        }
    }

    /// Get the field name this error relates to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::EmptyName => "name",
            Self::EmptySubject => "subject",
            Self::EmptyFromName => "from_name",
            Self::EmptyFromEmail | Self::InvalidFromEmail => "from_email",
            Self::InvalidReplyTo => "reply_to",
            Self::MissingEmailMapping | Self::InvalidRecipientEmail(_) => "email",
            Self::MissingColumn(_) | Self::NoRecipients => "recipients",
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message())
    }
}

impl std::error::Error for ValidationError {}

/// Result of a validation pass: all errors, not just the first.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        #[allow(clippy::expect_used)] // constant pattern
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
    })
}

/// Basic email format check: `local@domain.tld` without whitespace.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    email_pattern().is_match(email.trim())
}
