//! Secure credential storage using system keyring.
//!
//! The SMTP password is kept in the platform's native credential store:
//! - Linux: Secret Service (GNOME Keyring, `KWallet`)
//! - macOS: Keychain
//! - Windows: Credential Manager
//!
//! Headless machines without a keyring can supply the password through the
//! [`PASSWORD_ENV`] environment variable instead.

use keyring::Entry;
use tracing::{debug, warn};

/// Service name used for keyring entries.
const SERVICE_NAME: &str = "mailforge";

/// Environment variable consulted when the keyring has no password.
pub const PASSWORD_ENV: &str = "MAILFORGE_SMTP_PASSWORD";

/// Error type for credential operations.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// Failed to access keyring.
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    /// A username is required to key the stored password.
    #[error("SMTP username is required for credential storage")]
    MissingUsername,
}

/// Result type for credential operations.
pub type CredentialResult<T> = std::result::Result<T, CredentialError>;

fn smtp_entry(username: &str) -> CredentialResult<Entry> {
    let username = username.trim();
    if username.is_empty() {
        return Err(CredentialError::MissingUsername);
    }
    Ok(Entry::new(SERVICE_NAME, &format!("{SERVICE_NAME}_smtp_{username}"))?)
}

/// Stores the SMTP password for `username` in the system keyring.
///
/// # Errors
///
/// Returns an error if the username is empty or the keyring operation fails.
pub fn store_smtp_password(username: &str, password: &str) -> CredentialResult<()> {
    smtp_entry(username)?.set_password(password)?;
    debug!("Stored SMTP password for {username}");
    Ok(())
}

/// Retrieves the SMTP password for `username` from the system keyring.
///
/// # Errors
///
/// Returns an error if the username is empty or the keyring operation fails.
pub fn get_smtp_password(username: &str) -> CredentialResult<Option<String>> {
    match smtp_entry(username)?.get_password() {
        Ok(password) => Ok(Some(password)),
        Err(keyring::Error::NoEntry) => {
            debug!("No SMTP password found for {username}");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Deletes the SMTP password for `username`. A missing entry is not an error.
///
/// # Errors
///
/// Returns an error if the username is empty or the keyring operation fails.
pub fn delete_smtp_password(username: &str) -> CredentialResult<()> {
    match smtp_entry(username)?.delete_credential() {
        Ok(()) => {
            debug!("Deleted SMTP password for {username}");
            Ok(())
        }
        Err(keyring::Error::NoEntry) => {
            debug!("No SMTP password to delete for {username}");
            Ok(())
        }
        Err(e) => {
            warn!("Failed to delete SMTP password: {e}");
            Err(e.into())
        }
    }
}

/// Finds the SMTP password: keyring first, then [`PASSWORD_ENV`].
///
/// A keyring that is unavailable is logged and treated like an empty one.
#[must_use]
pub fn resolve_smtp_password(username: &str) -> Option<String> {
    match get_smtp_password(username) {
        Ok(Some(password)) => return Some(password),
        Ok(None) => {}
        Err(e) => warn!("Keyring unavailable, trying {PASSWORD_ENV}: {e}"),
    }
    password_from_env(std::env::var(PASSWORD_ENV).ok())
}

fn password_from_env(value: Option<String>) -> Option<String> {
    value.filter(|p| !p.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    // The keyring tests touch the real system keyring; run them manually
    // with `cargo test -- --ignored`.

    use super::*;

    #[test]
    fn test_empty_username_rejected() {
        assert!(matches!(
            store_smtp_password("  ", "secret"),
            Err(CredentialError::MissingUsername)
        ));
        assert!(matches!(
            get_smtp_password(""),
            Err(CredentialError::MissingUsername)
        ));
    }

    #[test]
    fn test_env_fallback_ignores_empty() {
        assert_eq!(password_from_env(Some("pw".into())), Some("pw".into()));
        assert_eq!(password_from_env(Some(String::new())), None);
        assert_eq!(password_from_env(None), None);
    }

    #[test]
    #[ignore = "Interacts with system keyring"]
    fn test_store_and_retrieve_smtp_password() {
        let username = "mailforge-test@example.com";

        store_smtp_password(username, "test_smtp_password_12345").unwrap();
        assert_eq!(
            get_smtp_password(username).unwrap(),
            Some("test_smtp_password_12345".to_string())
        );

        delete_smtp_password(username).unwrap();
        assert_eq!(get_smtp_password(username).unwrap(), None);
    }
}
