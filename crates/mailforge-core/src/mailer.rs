//! Mail delivery.
//!
//! [`Mailer`] is the seam between the send pipeline and the outside world.
//! [`SmtpMailer`] delivers over SMTP, one connection per message;
//! [`DryRunMailer`] only logs.

use std::future::Future;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};

use mailforge_mime::{Message, MessageBuilder, mailbox};
use mailforge_smtp::connection::{connect, connect_tls};
use mailforge_smtp::{Address, Client, Credentials, Ready};

use crate::config::{Security, SmtpConfig};
use crate::credentials::resolve_smtp_password;
use crate::{Error, Result};

/// One fully rendered message for one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    /// Sender display name.
    pub from_name: String,
    /// Sender address.
    pub from_email: String,
    /// Reply-To address.
    pub reply_to: Option<String>,
    /// Recipient address.
    pub to: String,
    /// Recipient display name.
    pub to_name: Option<String>,
    /// Personalized subject.
    pub subject: String,
    /// Emitted HTML document.
    pub html: String,
    /// Plain-text alternative.
    pub text: String,
}

impl OutgoingEmail {
    /// Builds the MIME message (`multipart/alternative`, text then HTML).
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be assembled.
    pub fn to_message(&self) -> std::result::Result<Message, DeliveryError> {
        let from_name = Some(self.from_name.trim()).filter(|n| !n.is_empty());
        let mut builder = MessageBuilder::new()
            .from(mailbox(from_name, &self.from_email))
            .to(mailbox(self.to_name.as_deref(), &self.to))
            .subject(&self.subject)
            .text_body(&self.text)
            .html_body(&self.html);
        if let Some(reply_to) = &self.reply_to {
            builder = builder.reply_to(mailbox(None, reply_to));
        }
        Ok(builder.build()?)
    }
}

/// Why a single delivery failed.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// Sender or recipient address is not usable in an SMTP envelope.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Message could not be assembled.
    #[error("Message error: {0}")]
    Message(#[from] mailforge_mime::Error),

    /// Could not connect or negotiate with the server.
    #[error("Connection failed: {0}")]
    Connection(#[source] mailforge_smtp::Error),

    /// Server refused the credentials.
    #[error("Authentication failed: {0}")]
    Authentication(#[source] mailforge_smtp::Error),

    /// Server refused the transaction.
    #[error("{0}")]
    Smtp(#[from] mailforge_smtp::Error),
}

impl DeliveryError {
    /// Returns true if a later retry may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Connection(e) | Self::Authentication(e) | Self::Smtp(e) => e.is_transient(),
            Self::InvalidAddress(_) | Self::Message(_) => false,
        }
    }
}

/// Delivers rendered messages.
pub trait Mailer: Send + Sync {
    /// Delivers one message.
    fn send(
        &self,
        email: &OutgoingEmail,
    ) -> impl Future<Output = std::result::Result<(), DeliveryError>> + Send;
}

/// Runs one mail transaction on a ready client: MAIL FROM, RCPT TO, DATA.
///
/// # Errors
///
/// Returns the server's rejection or a transport error.
pub async fn submit<S>(
    client: Client<S, Ready>,
    from: &Address,
    to: &Address,
    message: &[u8],
) -> mailforge_smtp::Result<Client<S, Ready>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let client = client.mail_from(from, Some(message.len())).await?;
    let client = client.rcpt_to(to).await?;
    let client = client.data().await?;
    client.send_message(message).await
}

/// Delivers over SMTP, opening a fresh session per message.
#[derive(Debug, Clone)]
pub struct SmtpMailer {
    config: SmtpConfig,
    credentials: Option<Credentials>,
}

impl SmtpMailer {
    /// Creates a mailer from explicit settings.
    #[must_use]
    pub const fn new(config: SmtpConfig, credentials: Option<Credentials>) -> Self {
        Self {
            config,
            credentials,
        }
    }

    /// Creates a mailer from config, looking up the password when a
    /// username is set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the server is not configured or a
    /// username is set but no password can be found.
    pub fn from_config(config: &SmtpConfig) -> Result<Self> {
        config.validate()?;

        let credentials = if config.has_username() {
            let password = resolve_smtp_password(&config.username).ok_or_else(|| {
                Error::Config(format!("No SMTP password stored for {}", config.username))
            })?;
            Some(Credentials::new(config.username.trim(), password))
        } else {
            None
        };

        Ok(Self::new(config.clone(), credentials))
    }

    async fn open(
        &self,
    ) -> std::result::Result<Client<mailforge_smtp::SmtpStream, Ready>, DeliveryError> {
        let SmtpConfig {
            host,
            port,
            security,
            local_name,
            ..
        } = &self.config;

        let stream = match security {
            Security::Tls => connect_tls(host, *port).await,
            Security::StartTls | Security::None => connect(host, *port).await,
        }
        .map_err(DeliveryError::Connection)?;

        let client = Client::from_stream(stream)
            .await
            .map_err(DeliveryError::Connection)?
            .ehlo(local_name)
            .await
            .map_err(DeliveryError::Connection)?;

        let client = if *security == Security::StartTls {
            client
                .starttls(host)
                .await
                .map_err(DeliveryError::Connection)?
        } else {
            client
        };

        match &self.credentials {
            Some(credentials) => client
                .authenticate(credentials)
                .await
                .map_err(DeliveryError::Authentication),
            None => Ok(client.without_auth()),
        }
    }

    /// Checks that the server accepts a connection and the credentials.
    ///
    /// # Errors
    ///
    /// Returns the connection or authentication failure.
    pub async fn verify(&self) -> std::result::Result<(), DeliveryError> {
        let client = self.open().await?;
        if let Err(e) = client.quit().await {
            debug!("QUIT failed: {e}");
        }
        Ok(())
    }
}

impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> std::result::Result<(), DeliveryError> {
        let from = envelope_address(&email.from_email)?;
        let to = envelope_address(&email.to)?;
        let message = email.to_message()?.to_bytes();

        let client = self.open().await?;
        let client = submit(client, &from, &to, &message).await?;
        if let Err(e) = client.quit().await {
            debug!("QUIT failed: {e}");
        }

        debug!(to = %to, bytes = message.len(), "message accepted");
        Ok(())
    }
}

fn envelope_address(address: &str) -> std::result::Result<Address, DeliveryError> {
    Address::new(address).map_err(|e| DeliveryError::InvalidAddress(e.to_string()))
}

/// Builds every message but delivers nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunMailer;

impl Mailer for DryRunMailer {
    async fn send(&self, email: &OutgoingEmail) -> std::result::Result<(), DeliveryError> {
        envelope_address(&email.to)?;
        let message = email.to_message()?;
        info!(
            to = %email.to,
            subject = %email.subject,
            bytes = message.to_bytes().len(),
            "dry run: message not sent"
        );
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    fn email() -> OutgoingEmail {
        OutgoingEmail {
            from_name: "Acme News".into(),
            from_email: "news@acme.test".into(),
            reply_to: Some("support@acme.test".into()),
            to: "ada@example.com".into(),
            to_name: Some("Ada".into()),
            subject: "Hello Ada".into(),
            html: "<p>Hello Ada</p>".into(),
            text: "Hello Ada".into(),
        }
    }

    #[test]
    fn test_to_message_headers() {
        let message = email().to_message().unwrap();
        let raw = String::from_utf8(message.to_bytes()).unwrap();

        assert!(raw.contains("From: Acme News <news@acme.test>\r\n"));
        assert!(raw.contains("To: Ada <ada@example.com>\r\n"));
        assert!(raw.contains("Reply-To: support@acme.test\r\n"));
        assert_eq!(message.subject(), Some("Hello Ada"));
        assert_eq!(message.parts().len(), 2);
    }

    #[test]
    fn test_to_message_without_names() {
        let mut email = email();
        email.from_name = "  ".into();
        email.to_name = None;
        email.reply_to = None;
        let raw = String::from_utf8(email.to_message().unwrap().to_bytes()).unwrap();

        assert!(raw.contains("From: news@acme.test\r\n"));
        assert!(raw.contains("To: ada@example.com\r\n"));
        assert!(!raw.contains("Reply-To"));
    }

    #[tokio::test]
    async fn test_submit_transaction() {
        let stream = Builder::new()
            .read(b"220 mx.example.com ready\r\n")
            .write(b"EHLO localhost\r\n")
            .read(b"250 mx.example.com\r\n")
            .write(b"MAIL FROM:<news@acme.test>\r\n")
            .read(b"250 OK\r\n")
            .write(b"RCPT TO:<ada@example.com>\r\n")
            .read(b"250 OK\r\n")
            .write(b"DATA\r\n")
            .read(b"354 Go ahead\r\n")
            .write(b"Subject: hi\r\n\r\nbody\r\n.\r\n")
            .read(b"250 Queued\r\n")
            .build();

        let client = Client::from_stream(stream)
            .await
            .unwrap()
            .ehlo("localhost")
            .await
            .unwrap()
            .without_auth();
        let from = Address::new("news@acme.test").unwrap();
        let to = Address::new("ada@example.com").unwrap();

        submit(client, &from, &to, b"Subject: hi\r\n\r\nbody\r\n")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_submit_recipient_rejected() {
        let stream = Builder::new()
            .read(b"220 mx.example.com ready\r\n")
            .write(b"EHLO localhost\r\n")
            .read(b"250 mx.example.com\r\n")
            .write(b"MAIL FROM:<news@acme.test>\r\n")
            .read(b"250 OK\r\n")
            .write(b"RCPT TO:<gone@example.com>\r\n")
            .read(b"550 No such user\r\n")
            .build();

        let client = Client::from_stream(stream)
            .await
            .unwrap()
            .ehlo("localhost")
            .await
            .unwrap()
            .without_auth();
        let from = Address::new("news@acme.test").unwrap();
        let to = Address::new("gone@example.com").unwrap();

        let err = submit(client, &from, &to, b"x\r\n").await.unwrap_err();
        assert_eq!(err.reply_code(), Some(550));

        let err = DeliveryError::from(err);
        assert!(!err.is_transient());
        assert_eq!(err.to_string(), "SMTP error 550: No such user");
    }

    #[tokio::test]
    async fn test_dry_run_rejects_bad_address() {
        let mut email = email();
        DryRunMailer.send(&email).await.unwrap();

        email.to = "not an address".into();
        assert!(matches!(
            DryRunMailer.send(&email).await.unwrap_err(),
            DeliveryError::InvalidAddress(_)
        ));
    }

    #[test]
    fn test_from_config_requires_host() {
        assert!(matches!(
            SmtpMailer::from_config(&SmtpConfig::default()).unwrap_err(),
            Error::Config(_)
        ));
    }
}
