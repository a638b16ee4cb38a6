//! Application configuration.
//!
//! Stored as JSON at `<config_dir>/mailforge/config.json`. A missing file
//! means defaults; the SMTP password never lives here (see
//! [`credentials`](crate::credentials)).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::campaign::CampaignDetails;
use crate::{Error, Result};

/// Application directory name under the platform config and data dirs.
const APP_DIR: &str = "mailforge";

/// Default number of messages in flight during a batch send.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Security/encryption mode for the SMTP connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Security {
    /// No encryption (not recommended).
    None,
    /// Implicit TLS (connect directly with TLS).
    #[default]
    Tls,
    /// STARTTLS upgrade after plaintext connect.
    #[serde(rename = "starttls")]
    StartTls,
}

impl Security {
    /// Get display name for the security mode.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::None => "None (insecure)",
            Self::Tls => "SSL/TLS",
            Self::StartTls => "STARTTLS",
        }
    }

    /// Get default submission port for the security mode.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::None => 25,
            Self::StartTls => 587,
            Self::Tls => 465,
        }
    }
}

impl std::str::FromStr for Security {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "plain" => Ok(Self::None),
            "tls" | "ssl" => Ok(Self::Tls),
            "starttls" => Ok(Self::StartTls),
            other => Err(format!("unknown security mode: {other}")),
        }
    }
}

/// SMTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    /// Server hostname.
    pub host: String,
    /// Server port (default: 465 for TLS, 587 for STARTTLS).
    pub port: u16,
    /// Security mode.
    pub security: Security,
    /// Username for authentication; empty to skip AUTH.
    pub username: String,
    /// Name announced in EHLO.
    pub local_name: String,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: Security::Tls.default_port(),
            security: Security::Tls,
            username: String::new(),
            local_name: "localhost".to_string(),
        }
    }
}

impl SmtpConfig {
    /// Checks that there is enough to open a connection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the host or port is missing.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::Config("SMTP host is not set".to_string()));
        }
        if self.port == 0 {
            return Err(Error::Config("SMTP port is not set".to_string()));
        }
        Ok(())
    }

    /// Whether AUTH should be attempted.
    #[must_use]
    pub fn has_username(&self) -> bool {
        !self.username.trim().is_empty()
    }
}

/// Default sender identity for new campaigns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderProfile {
    /// Display name in the From header.
    pub from_name: String,
    /// Sender address.
    pub from_email: String,
    /// Reply-To address (empty for none).
    pub reply_to: String,
}

impl SenderProfile {
    /// Fills empty sender fields of `details` from this profile.
    pub fn fill(&self, details: &mut CampaignDetails) {
        for (field, default) in [
            (&mut details.from_name, &self.from_name),
            (&mut details.from_email, &self.from_email),
            (&mut details.reply_to, &self.reply_to),
        ] {
            if field.trim().is_empty() {
                field.clone_from(default);
            }
        }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default sender identity.
    pub sender: SenderProfile,
    /// Outgoing mail server.
    pub smtp: SmtpConfig,
    /// SQLite database location; `None` for the platform data dir.
    pub database_path: Option<PathBuf>,
    /// Messages in flight during a batch send.
    pub concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sender: SenderProfile::default(),
            smtp: SmtpConfig::default(),
            database_path: None,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl Config {
    /// Platform location of the config file.
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.json")
    }

    /// Loads the config from [`default_path`](Self::default_path).
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load() -> Result<Self> {
        Self::load_from(Self::default_path()).await
    }

    /// Loads the config from `path`, or defaults if there is no file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !tokio::fs::try_exists(path).await? {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = tokio::fs::read_to_string(path).await?;
        let config: Self = serde_json::from_str(&contents)?;
        if config.concurrency == 0 {
            return Err(Error::Config("concurrency must be at least 1".to_string()));
        }
        Ok(config)
    }

    /// Writes the config as pretty JSON, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub async fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, contents).await?;
        info!("Config saved to {:?}", path);
        Ok(())
    }

    /// Database file to open.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.database_path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR)
                .join("mailforge.db")
        })
    }
}
