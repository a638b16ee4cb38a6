//! Envelope address type.

use crate::error::{Error, Result};
use std::fmt;

/// Longest forward-path accepted by RFC 5321.
const MAX_ADDRESS_LENGTH: usize = 254;

/// Longest local part accepted by RFC 5321.
const MAX_LOCAL_LENGTH: usize = 64;

/// Longest domain name (RFC 1035).
const MAX_DOMAIN_LENGTH: usize = 253;

/// Longest single domain label (RFC 1035).
const MAX_LABEL_LENGTH: usize = 63;

/// Email address for the SMTP envelope (`MAIL FROM` / `RCPT TO`).
///
/// Only the bare `local@domain` form is accepted. Display names belong in
/// the message headers, not the envelope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    /// Parses an envelope address, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if the address is empty, has no
    /// single `@` separating non-empty parts, exceeds RFC 5321 length
    /// limits, or contains whitespace, control characters or angle brackets.
    pub fn new(addr: impl AsRef<str>) -> Result<Self> {
        let addr = addr.as_ref().trim();
        validate(addr)?;
        Ok(Self(addr.to_string()))
    }

    /// Returns the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the domain part.
    #[must_use]
    pub fn domain(&self) -> &str {
        self.0.rsplit_once('@').map_or("", |(_, domain)| domain)
    }

    /// Returns true if the address needs the SMTPUTF8 extension.
    #[must_use]
    pub fn is_international(&self) -> bool {
        !self.0.is_ascii()
    }
}

fn validate(addr: &str) -> Result<()> {
    let invalid = |reason: &str| Err(Error::InvalidAddress(format!("{addr:?}: {reason}")));

    if addr.is_empty() {
        return invalid("address cannot be empty");
    }
    if addr.len() > MAX_ADDRESS_LENGTH {
        return invalid("address is too long");
    }
    if addr
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || c == '<' || c == '>')
    {
        return invalid("address contains forbidden characters");
    }

    let Some((local, domain)) = addr.split_once('@') else {
        return invalid("address must contain @");
    };
    if domain.contains('@') {
        return invalid("address must have exactly one @");
    }
    if local.is_empty() || domain.is_empty() {
        return invalid("local and domain parts cannot be empty");
    }
    if local.len() > MAX_LOCAL_LENGTH {
        return invalid("local part is too long");
    }
    if domain.starts_with('.') || domain.ends_with('.') || domain.contains("..") {
        return invalid("malformed domain");
    }
    if domain.len() > MAX_DOMAIN_LENGTH {
        return invalid("domain is too long");
    }
    if domain.split('.').any(|label| label.len() > MAX_LABEL_LENGTH) {
        return invalid("domain label is too long");
    }
    Ok(())
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}
