//! Campaign model types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::template::TemplateId;
use crate::validation::{ValidationError, ValidationResult, is_valid_email};

/// Unique identifier for a stored campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CampaignId(pub i64);

impl CampaignId {
    /// Create a new campaign ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for CampaignId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of campaign, used for filtering and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignType {
    /// Promotional email.
    #[default]
    Marketing,
    /// Product or company announcement.
    Announcement,
    /// Recurring newsletter.
    Newsletter,
    /// Event invitation.
    Event,
}

impl CampaignType {
    /// All campaign types, in menu order.
    pub const ALL: [Self; 4] = [
        Self::Marketing,
        Self::Announcement,
        Self::Newsletter,
        Self::Event,
    ];

    /// Get display name for the campaign type.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Marketing => "Marketing",
            Self::Announcement => "Announcement",
            Self::Newsletter => "Newsletter",
            Self::Event => "Event",
        }
    }

    /// Stable lowercase tag used in storage and on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Marketing => "marketing",
            Self::Announcement => "announcement",
            Self::Newsletter => "newsletter",
            Self::Event => "event",
        }
    }
}

impl std::str::FromStr for CampaignType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown campaign type: {s}"))
    }
}

/// What the sender fills in on the first wizard step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CampaignDetails {
    /// Internal campaign name.
    pub name: String,
    /// Subject line; may contain `{{placeholder}}` tokens.
    pub subject: String,
    /// Display name in the From header.
    pub from_name: String,
    /// Sender address.
    pub from_email: String,
    /// Reply-To address (empty for none).
    pub reply_to: String,
    /// Optional notes.
    pub description: String,
    /// Campaign kind.
    #[serde(rename = "type")]
    pub campaign_type: CampaignType,
}

impl CampaignDetails {
    /// Validates the details, collecting every problem.
    ///
    /// # Errors
    ///
    /// Returns all validation errors found.
    pub fn validate(&self) -> ValidationResult {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push(ValidationError::EmptyName);
        }
        if self.subject.trim().is_empty() {
            errors.push(ValidationError::EmptySubject);
        }
        if self.from_name.trim().is_empty() {
            errors.push(ValidationError::EmptyFromName);
        }
        if self.from_email.trim().is_empty() {
            errors.push(ValidationError::EmptyFromEmail);
        } else if !is_valid_email(&self.from_email) {
            errors.push(ValidationError::InvalidFromEmail);
        }
        if !self.reply_to.trim().is_empty() && !is_valid_email(&self.reply_to) {
            errors.push(ValidationError::InvalidReplyTo);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Returns the reply-to address if one is set.
    #[must_use]
    pub fn reply_to(&self) -> Option<&str> {
        Some(self.reply_to.trim()).filter(|r| !r.is_empty())
    }
}

/// Where a campaign is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    /// Being prepared.
    #[default]
    Draft,
    /// Batch send in progress.
    Sending,
    /// Batch send finished with at least one delivery.
    Sent,
    /// Batch send delivered nothing.
    Failed,
}

impl CampaignStatus {
    /// Storage tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Sending => "sending",
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }

    /// Parses a storage tag; unknown tags read as draft.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "sending" => Self::Sending,
            "sent" => Self::Sent,
            "failed" => Self::Failed,
            _ => Self::Draft,
        }
    }
}

impl std::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// A stored campaign.
#[derive(Debug, Clone, PartialEq)]
pub struct Campaign {
    /// Unique identifier (None for unsaved campaigns).
    pub id: Option<CampaignId>,
    /// Details from the first wizard step.
    pub details: CampaignDetails,
    /// Template chosen for the body.
    pub template_id: Option<TemplateId>,
    /// Lifecycle status.
    pub status: CampaignStatus,
    /// Deliveries accepted by the mail server.
    pub sent_count: u32,
    /// Deliveries that failed.
    pub failed_count: u32,
    /// When the campaign was created.
    pub created_at: DateTime<Utc>,
    /// When the campaign was last changed.
    pub updated_at: DateTime<Utc>,
    /// When the last batch send finished.
    pub sent_at: Option<DateTime<Utc>>,
}

impl Campaign {
    /// Creates an unsaved draft.
    #[must_use]
    pub fn new(details: CampaignDetails) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            details,
            template_id: None,
            status: CampaignStatus::Draft,
            sent_count: 0,
            failed_count: 0,
            created_at: now,
            updated_at: now,
            sent_at: None,
        }
    }

    /// Sets the template.
    #[must_use]
    pub const fn with_template(mut self, template_id: TemplateId) -> Self {
        self.template_id = Some(template_id);
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn details() -> CampaignDetails {
        CampaignDetails {
            name: "January Newsletter".into(),
            subject: "Your January update, {{name}}".into(),
            from_name: "Acme News".into(),
            from_email: "news@acme.test".into(),
            reply_to: "support@acme.test".into(),
            description: String::new(),
            campaign_type: CampaignType::Newsletter,
        }
    }

    #[test]
    fn test_valid_details() {
        assert!(details().validate().is_ok());
        assert_eq!(details().reply_to(), Some("support@acme.test"));
    }

    #[test]
    fn test_collects_all_errors() {
        let errors = CampaignDetails::default().validate().unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::EmptyName,
                ValidationError::EmptySubject,
                ValidationError::EmptyFromName,
                ValidationError::EmptyFromEmail,
            ]
        );
    }

    #[test]
    fn test_bad_addresses() {
        let mut d = details();
        d.from_email = "not-an-address".into();
        d.reply_to = "also bad".into();
        let errors = d.validate().unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::InvalidFromEmail, ValidationError::InvalidReplyTo]
        );
    }

    #[test]
    fn test_empty_reply_to_is_none() {
        let mut d = details();
        d.reply_to = "  ".into();
        assert!(d.validate().is_ok());
        assert_eq!(d.reply_to(), None);
    }

    #[test]
    fn test_details_json_shape() {
        let json = serde_json::to_value(details()).unwrap();
        assert_eq!(json["fromEmail"], "news@acme.test");
        assert_eq!(json["type"], "newsletter");

        let parsed: CampaignDetails =
            serde_json::from_str(r#"{"name":"Launch","type":"event"}"#).unwrap();
        assert_eq!(parsed.campaign_type, CampaignType::Event);
        assert!(parsed.subject.is_empty());
    }

    #[test]
    fn test_type_and_status_tags() {
        assert_eq!("Announcement".parse::<CampaignType>(), Ok(CampaignType::Announcement));
        assert!("webinar".parse::<CampaignType>().is_err());
        for status in [
            CampaignStatus::Draft,
            CampaignStatus::Sending,
            CampaignStatus::Sent,
            CampaignStatus::Failed,
        ] {
            assert_eq!(CampaignStatus::parse(status.as_str()), status);
        }
    }
}
