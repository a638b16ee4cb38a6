//! Error types for the core library.

use thiserror::Error;

use crate::validation::ValidationError;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored or imported document is malformed.
    #[error("Document error: {0}")]
    Document(#[from] mailforge_render::Error),

    /// Message could not be assembled.
    #[error("Message error: {0}")]
    Mime(#[from] mailforge_mime::Error),

    /// CSV input could not be read.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Template not found.
    #[error("Template not found: {0}")]
    TemplateNotFound(i64),

    /// Campaign not found.
    #[error("Campaign not found: {0}")]
    CampaignNotFound(i64),

    /// Input failed validation.
    #[error("{}", join_messages(.0))]
    Validation(Vec<ValidationError>),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A single delivery was not accepted.
    #[error("Delivery failed: {0}")]
    Delivery(#[from] crate::mailer::DeliveryError),

    /// Credential storage error.
    #[error("Credential error: {0}")]
    Credential(#[from] crate::credentials::CredentialError),
}

fn join_messages(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ValidationError::message)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
