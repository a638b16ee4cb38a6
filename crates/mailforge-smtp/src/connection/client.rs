//! Type-state SMTP client.

use super::{ServerInfo, SmtpStream};
use crate::command::Command;
use crate::error::{Error, Result};
use crate::types::reply::is_last_line;
use crate::types::{Address, AuthMechanism, Credentials, Extension, Reply, ReplyCode};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::marker::PhantomData;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::debug;

/// Upper bound on lines in one reply; a longer reply is treated as hostile.
const MAX_REPLY_LINES: usize = 512;

/// Greeting read; EHLO, STARTTLS and AUTH are available.
#[derive(Debug)]
pub struct Connected;

/// Session established; a mail transaction may begin.
#[derive(Debug)]
pub struct Ready;

/// `MAIL FROM` accepted; needs at least one recipient.
#[derive(Debug)]
pub struct MailTransaction;

/// At least one `RCPT TO` accepted.
#[derive(Debug)]
pub struct RecipientAdded;

/// `DATA` accepted; the message content comes next.
#[derive(Debug)]
pub struct Data;

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::MailTransaction {}
    impl Sealed for super::RecipientAdded {}
}

/// States inside a mail transaction, where RSET applies.
pub trait InTransaction: sealed::Sealed {}

impl InTransaction for MailTransaction {}
impl InTransaction for RecipientAdded {}

/// SMTP client over any byte stream `S`, tracking the session state in
/// its type.
///
/// Every command consumes the client and returns it in the next state, so
/// out-of-order commands do not compile. A rejected command ends the
/// session: the error is returned and the connection is dropped.
#[derive(Debug)]
pub struct Client<S, State> {
    stream: BufReader<S>,
    server_info: ServerInfo,
    local_name: String,
    _state: PhantomData<State>,
}

impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Returns what the server announced about itself.
    #[must_use]
    pub const fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// Sends NOOP, keeping the session alive.
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not answer with 250.
    pub async fn noop(&mut self) -> Result<()> {
        self.send(&Command::Noop).await?.require(ReplyCode::is_success)?;
        Ok(())
    }

    /// Sends QUIT and closes the connection. Available in every state.
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not acknowledge the QUIT.
    pub async fn quit(mut self) -> Result<()> {
        self.send(&Command::Quit).await?.require(ReplyCode::is_success)?;
        // The server closes its side after 221; a failed shutdown is harmless.
        let _ = self.stream.get_mut().shutdown().await;
        Ok(())
    }

    async fn send(&mut self, command: &Command) -> Result<Reply> {
        debug!(?command, "smtp send");
        let writer = self.stream.get_mut();
        writer.write_all(&command.serialize()).await?;
        writer.flush().await?;
        self.read_reply().await
    }

    async fn read_reply(&mut self) -> Result<Reply> {
        let mut lines = Vec::new();
        loop {
            let mut line = String::new();
            if self.stream.read_line(&mut line).await? == 0 {
                return Err(Error::ConnectionClosed);
            }
            let line = line.trim_end_matches(['\r', '\n']).to_string();
            let last = is_last_line(&line);
            lines.push(line);
            if last {
                break;
            }
            if lines.len() >= MAX_REPLY_LINES {
                return Err(Error::Protocol("Reply has too many lines".into()));
            }
        }

        let reply = Reply::parse(&lines)?;
        debug!(code = %reply.code, "smtp reply");
        Ok(reply)
    }

    fn into_state<Next>(self) -> Client<S, Next> {
        Client {
            stream: self.stream,
            server_info: self.server_info,
            local_name: self.local_name,
            _state: PhantomData,
        }
    }

    fn check_size(&self, size: usize) -> Result<()> {
        match self.server_info.max_message_size() {
            Some(limit) if size > limit => Err(Error::MessageTooLarge { size, limit }),
            _ => Ok(()),
        }
    }

    fn check_international(&self, address: &Address) -> Result<()> {
        if address.is_international() && !self.server_info.supports_smtputf8() {
            return Err(Error::NotSupported(format!(
                "SMTPUTF8 (needed for {address})"
            )));
        }
        Ok(())
    }
}

impl<S> Client<S, Connected>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps an open stream and reads the server greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if the greeting cannot be read or is not 220.
    pub async fn from_stream(stream: S) -> Result<Self> {
        let mut client = Self {
            stream: BufReader::new(stream),
            server_info: ServerInfo::default(),
            local_name: String::new(),
            _state: PhantomData,
        };

        let greeting = client
            .read_reply()
            .await?
            .require(|code| code == ReplyCode::SERVICE_READY)?;
        client.server_info.hostname = greeting
            .lines
            .first()
            .and_then(|line| line.split_whitespace().next())
            .unwrap_or("unknown")
            .to_string();
        debug!(server = %client.server_info.hostname, "smtp greeting");
        Ok(client)
    }

    /// Sends EHLO and records the advertised extensions.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects EHLO.
    pub async fn ehlo(mut self, local_name: &str) -> Result<Self> {
        self.local_name = local_name.to_string();
        let reply = self
            .send(&Command::Ehlo(self.local_name.clone()))
            .await?
            .require(ReplyCode::is_success)?;

        // The first line is the server's greeting, not an extension.
        self.server_info.extensions = reply
            .lines
            .iter()
            .skip(1)
            .map(String::as_str)
            .map(Extension::parse)
            .collect();
        Ok(self)
    }

    /// Authenticates with the best mechanism both sides support,
    /// preferring PLAIN over LOGIN.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotSupported`] if the server offers no usable
    /// mechanism, or the server's rejection if the credentials fail.
    pub async fn authenticate(self, credentials: &Credentials) -> Result<Client<S, Ready>> {
        let mechanisms = self.server_info.auth_mechanisms();
        if mechanisms.contains(&AuthMechanism::Plain) {
            self.auth_plain(credentials).await
        } else if mechanisms.contains(&AuthMechanism::Login) {
            self.auth_login(credentials).await
        } else if self.server_info.supports_auth() {
            Err(Error::NotSupported("AUTH PLAIN or LOGIN".into()))
        } else {
            Err(Error::NotSupported("AUTH".into()))
        }
    }

    /// Authenticates with AUTH PLAIN, sending the credentials as the
    /// initial response.
    ///
    /// # Errors
    ///
    /// Returns an error if authentication fails.
    pub async fn auth_plain(mut self, credentials: &Credentials) -> Result<Client<S, Ready>> {
        let token = format!("\0{}\0{}", credentials.username(), credentials.password());
        let command = Command::Auth {
            mechanism: AuthMechanism::Plain,
            initial_response: Some(STANDARD.encode(token)),
        };
        self.send(&command).await?.require(ReplyCode::is_success)?;
        debug!(username = credentials.username(), "authenticated (PLAIN)");
        Ok(self.into_state())
    }

    /// Authenticates with AUTH LOGIN, answering the username and password
    /// challenges in turn.
    ///
    /// # Errors
    ///
    /// Returns an error if authentication fails.
    pub async fn auth_login(mut self, credentials: &Credentials) -> Result<Client<S, Ready>> {
        let command = Command::Auth {
            mechanism: AuthMechanism::Login,
            initial_response: None,
        };
        self.send(&command)
            .await?
            .require(|code| code == ReplyCode::AUTH_CONTINUE)?;

        let username = Command::AuthResponse(STANDARD.encode(credentials.username()));
        self.send(&username)
            .await?
            .require(|code| code == ReplyCode::AUTH_CONTINUE)?;

        let password = Command::AuthResponse(STANDARD.encode(credentials.password()));
        self.send(&password).await?.require(ReplyCode::is_success)?;
        debug!(username = credentials.username(), "authenticated (LOGIN)");
        Ok(self.into_state())
    }

    /// Proceeds without authenticating, for relays that accept mail from
    /// the client's network.
    #[must_use]
    pub fn without_auth(self) -> Client<S, Ready> {
        self.into_state()
    }
}

impl Client<SmtpStream, Connected> {
    /// Upgrades the connection with STARTTLS and repeats EHLO over the
    /// encrypted channel.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotSupported`] if STARTTLS was not advertised, or an
    /// error if the command or handshake fails.
    pub async fn starttls(mut self, hostname: &str) -> Result<Self> {
        if !self.server_info.supports_starttls() {
            return Err(Error::NotSupported("STARTTLS".into()));
        }
        self.send(&Command::StartTls)
            .await?
            .require(|code| code == ReplyCode::SERVICE_READY)?;

        let stream = self.stream.into_inner().upgrade_to_tls(hostname).await?;
        let client = Self {
            stream: BufReader::new(stream),
            server_info: ServerInfo {
                hostname: self.server_info.hostname,
                extensions: std::collections::HashSet::new(),
            },
            local_name: String::new(),
            _state: PhantomData,
        };

        // Capabilities learned before TLS must be discarded.
        client.ehlo(&self.local_name).await
    }
}

impl<S> Client<S, Ready>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Starts a mail transaction.
    ///
    /// When `size` is given it is checked against the server's SIZE limit
    /// and declared in the command. `BODY=8BITMIME` and `SMTPUTF8` are added
    /// when the server supports them and the envelope needs them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MessageTooLarge`] before sending anything if the
    /// declared size exceeds the limit, or the server's rejection.
    pub async fn mail_from(
        mut self,
        from: &Address,
        size: Option<usize>,
    ) -> Result<Client<S, MailTransaction>> {
        if let Some(size) = size {
            self.check_size(size)?;
        }
        self.check_international(from)?;

        let command = Command::MailFrom {
            from: from.clone(),
            size: size.filter(|_| self.server_info.supports_size()),
            eight_bit: self.server_info.supports_8bitmime(),
            utf8: from.is_international(),
        };
        self.send(&command).await?.require(ReplyCode::is_success)?;
        Ok(self.into_state())
    }
}

impl<S> Client<S, MailTransaction>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Adds the first recipient.
    ///
    /// # Errors
    ///
    /// Returns the server's rejection of the recipient.
    pub async fn rcpt_to(mut self, to: &Address) -> Result<Client<S, RecipientAdded>> {
        self.add_recipient(to).await?;
        Ok(self.into_state())
    }
}

impl<S> Client<S, RecipientAdded>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Adds another recipient.
    ///
    /// # Errors
    ///
    /// Returns the server's rejection of the recipient.
    pub async fn rcpt_to(mut self, to: &Address) -> Result<Self> {
        self.add_recipient(to).await?;
        Ok(self)
    }

    /// Sends DATA.
    ///
    /// # Errors
    ///
    /// Returns an error unless the server answers 354.
    pub async fn data(mut self) -> Result<Client<S, Data>> {
        self.send(&Command::Data)
            .await?
            .require(|code| code == ReplyCode::START_DATA)?;
        Ok(self.into_state())
    }
}

impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
    State: InTransaction,
{
    async fn add_recipient(&mut self, to: &Address) -> Result<()> {
        self.check_international(to)?;
        self.send(&Command::RcptTo(to.clone()))
            .await?
            .require(ReplyCode::is_success)?;
        Ok(())
    }

    /// Aborts the current transaction with RSET.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects RSET.
    pub async fn reset(mut self) -> Result<Client<S, Ready>> {
        self.send(&Command::Rset).await?.require(ReplyCode::is_success)?;
        Ok(self.into_state())
    }
}

impl<S> Client<S, Data>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Transmits the message and ends it with `<CRLF>.<CRLF>`.
    ///
    /// Line endings are normalized to CRLF and lines starting with `.` are
    /// dot-stuffed. On success the session is ready for another transaction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MessageTooLarge`] if the message exceeds the SIZE
    /// limit, or the server's rejection.
    pub async fn send_message(mut self, message: &[u8]) -> Result<Client<S, Ready>> {
        self.check_size(message.len())?;

        let payload = encode_data(message);
        let writer = self.stream.get_mut();
        writer.write_all(&payload).await?;
        writer.flush().await?;
        debug!(bytes = payload.len(), "smtp message sent");

        self.read_reply().await?.require(ReplyCode::is_success)?;
        Ok(self.into_state())
    }
}

/// Encodes message content for the DATA phase.
fn encode_data(message: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(message.len() + message.len() / 64 + 5);
    if !message.is_empty() {
        let body = message.strip_suffix(b"\n").unwrap_or(message);
        for line in body.split(|&b| b == b'\n') {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if line.first() == Some(&b'.') {
                out.push(b'.');
            }
            out.extend_from_slice(line);
            out.extend_from_slice(b"\r\n");
        }
    }
    out.extend_from_slice(b".\r\n");
    out
}
