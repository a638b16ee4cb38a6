//! SMTP connection management with type-state pattern.

mod client;
mod stream;

pub use client::{
    Client, Connected, Data, InTransaction, MailTransaction, Ready, RecipientAdded,
};
pub use stream::{SmtpStream, connect, connect_tls};

use crate::types::{AuthMechanism, Extension};
use std::collections::HashSet;

/// Server identity and capabilities learned from the greeting and EHLO.
#[derive(Debug, Clone, Default)]
pub struct ServerInfo {
    /// Server hostname from the greeting.
    pub hostname: String,
    /// Extensions from the latest EHLO reply.
    pub extensions: HashSet<Extension>,
}

impl ServerInfo {
    /// Checks if STARTTLS is advertised.
    #[must_use]
    pub fn supports_starttls(&self) -> bool {
        self.extensions.contains(&Extension::StartTls)
    }

    /// Checks if 8BITMIME is advertised.
    #[must_use]
    pub fn supports_8bitmime(&self) -> bool {
        self.extensions.contains(&Extension::EightBitMime)
    }

    /// Checks if SMTPUTF8 is advertised.
    #[must_use]
    pub fn supports_smtputf8(&self) -> bool {
        self.extensions.contains(&Extension::SmtpUtf8)
    }

    /// Checks if PIPELINING is advertised.
    #[must_use]
    pub fn supports_pipelining(&self) -> bool {
        self.extensions.contains(&Extension::Pipelining)
    }

    /// Checks if SIZE is advertised, with or without a limit.
    #[must_use]
    pub fn supports_size(&self) -> bool {
        self.extensions
            .iter()
            .any(|ext| matches!(ext, Extension::Size(_)))
    }

    /// Returns the maximum message size, if the server declares one.
    #[must_use]
    pub fn max_message_size(&self) -> Option<usize> {
        self.extensions.iter().find_map(|ext| match ext {
            Extension::Size(limit) => *limit,
            _ => None,
        })
    }

    /// Checks if AUTH is advertised at all.
    #[must_use]
    pub fn supports_auth(&self) -> bool {
        self.extensions
            .iter()
            .any(|ext| matches!(ext, Extension::Auth(_)))
    }

    /// Returns the advertised mechanisms this client can use.
    #[must_use]
    pub fn auth_mechanisms(&self) -> Vec<AuthMechanism> {
        self.extensions
            .iter()
            .find_map(|ext| match ext {
                Extension::Auth(mechanisms) => Some(mechanisms.clone()),
                _ => None,
            })
            .unwrap_or_default()
    }
}
