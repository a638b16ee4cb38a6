//! # mailforge-core
//!
//! Campaign domain logic for mailforge.
//!
//! This crate walks a campaign from details to delivery: it validates the
//! sender details, imports recipients from CSV, stores templates and
//! campaigns in `SQLite`, and sends one personalized message per recipient
//! through a [`Mailer`].
//!
//! ## Features
//!
//! - **Validation**: every problem reported at once, with a field name
//! - **Recipient import**: CSV with column auto-detection and import summary
//! - **Persistence**: templates and campaigns via sqlx
//! - **Batch sending**: bounded concurrency, per-recipient outcomes
//! - **Credentials**: SMTP password in the system keyring
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use mailforge_core::{
//!     CampaignDetails, Config, RecipientList, SmtpMailer, TemplateRepository, send_campaign,
//! };
//!
//! let config = Config::load().await?;
//! let templates = TemplateRepository::new(&config.database_path().to_string_lossy()).await?;
//! let document = templates.load_document(template_id).await?;
//!
//! let list = RecipientList::from_path("contacts.csv").await?;
//! let recipients = list.recipients(&list.detect_mapping()).map_err(Error::Validation)?;
//!
//! let mailer = Arc::new(SmtpMailer::from_config(&config.smtp)?);
//! let report = send_campaign(mailer, &details, &document, recipients, config.concurrency).await?;
//! println!("{} sent, {} failed", report.sent(), report.failed());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod campaign;
pub mod config;
pub mod credentials;
mod error;
pub mod mailer;
pub mod recipients;
pub mod send;
pub mod template;
pub mod validation;

pub use campaign::{
    Campaign, CampaignDetails, CampaignId, CampaignRepository, CampaignStatus, CampaignType,
};
pub use config::{Config, Security, SenderProfile, SmtpConfig};
pub use error::{Error, Result};
pub use mailer::{DeliveryError, DryRunMailer, Mailer, OutgoingEmail, SmtpMailer};
pub use recipients::{ColumnMapping, ImportSummary, Recipient, RecipientList};
pub use send::{DeliveryOutcome, SendReport, send_campaign, send_test};
pub use template::{Template, TemplateId, TemplateRepository};
pub use validation::{ValidationError, ValidationResult};
