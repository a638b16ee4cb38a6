//! Outgoing MIME message structure and builder.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, FixedOffset, Local, Utc};

use crate::content_type::ContentType;
use crate::encoding::{encode_quoted_printable, encode_rfc2047};
use crate::error::{Error, Result};
use crate::header::Headers;

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    SevenBit,
    /// 8-bit text.
    EightBit,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::EightBit => write!(f, "8bit"),
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
        }
    }
}

/// One body part, already transfer-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// Part headers.
    pub headers: Headers,
    /// Encoded body.
    pub body: String,
}

impl Part {
    /// Creates a quoted-printable text part of the given content type.
    #[must_use]
    pub fn quoted_printable(content_type: &ContentType, content: &str) -> Self {
        let mut headers = Headers::new();
        headers.add("Content-Type", content_type.to_string());
        headers.add(
            "Content-Transfer-Encoding",
            TransferEncoding::QuotedPrintable.to_string(),
        );
        Self {
            headers,
            body: encode_quoted_printable(content),
        }
    }

    /// Creates a `text/plain` part.
    #[must_use]
    pub fn text(content: &str) -> Self {
        Self::quoted_printable(&ContentType::text_plain(), content)
    }

    /// Creates a `text/html` part.
    #[must_use]
    pub fn html(content: &str) -> Self {
        Self::quoted_printable(&ContentType::text_html(), content)
    }
}

/// Message body layout.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Body {
    Single(Part),
    Alternative { boundary: String, parts: Vec<Part> },
}

/// A complete outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    headers: Headers,
    body: Body,
}

impl Message {
    /// Top-level headers, including the content headers of a single-part body.
    #[must_use]
    pub fn headers(&self) -> Headers {
        let mut headers = self.headers.clone();
        match &self.body {
            Body::Single(part) => {
                for (name, value) in part.headers.iter() {
                    headers.add(name, value);
                }
            }
            Body::Alternative { boundary, .. } => {
                headers.add(
                    "Content-Type",
                    ContentType::multipart_alternative(boundary.as_str()).to_string(),
                );
            }
        }
        headers
    }

    /// Gets the Subject header as written (possibly encoded).
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.headers.get("subject")
    }

    /// Gets the Message-ID header.
    #[must_use]
    pub fn message_id(&self) -> Option<&str> {
        self.headers.get("message-id")
    }

    /// The multipart boundary, if the body has alternatives.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        match &self.body {
            Body::Single(_) => None,
            Body::Alternative { boundary, .. } => Some(boundary),
        }
    }

    /// Body parts in order.
    #[must_use]
    pub fn parts(&self) -> Vec<&Part> {
        match &self.body {
            Body::Single(part) => vec![part],
            Body::Alternative { parts, .. } => parts.iter().collect(),
        }
    }

    /// The message in wire format.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.headers())?;
        f.write_str("\r\n")?;
        match &self.body {
            Body::Single(part) => f.write_str(&part.body),
            Body::Alternative { boundary, parts } => {
                for part in parts {
                    write!(f, "--{boundary}\r\n{}\r\n{}\r\n", part.headers, part.body)?;
                }
                write!(f, "--{boundary}--\r\n")
            }
        }
    }
}

/// Builder for outgoing messages.
///
/// With both a text and an HTML body the result is `multipart/alternative`
/// with the text part first.
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct MessageBuilder {
    from: Option<String>,
    to: Vec<String>,
    reply_to: Option<String>,
    subject: Option<String>,
    date: Option<DateTime<FixedOffset>>,
    message_id: Option<String>,
    text: Option<String>,
    html: Option<String>,
    extra: Vec<(String, String)>,
}

impl MessageBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the From mailbox (already formatted, see [`crate::mailbox`]).
    pub fn from(mut self, mailbox: impl Into<String>) -> Self {
        self.from = Some(mailbox.into());
        self
    }

    /// Adds a To mailbox.
    pub fn to(mut self, mailbox: impl Into<String>) -> Self {
        self.to.push(mailbox.into());
        self
    }

    /// Sets the Reply-To mailbox.
    pub fn reply_to(mut self, mailbox: impl Into<String>) -> Self {
        self.reply_to = Some(mailbox.into());
        self
    }

    /// Sets the subject; non-ASCII text is encoded.
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Sets the Date header; defaults to now.
    pub const fn date(mut self, date: DateTime<FixedOffset>) -> Self {
        self.date = Some(date);
        self
    }

    /// Sets the Message-ID (without angle brackets); defaults to a generated id.
    pub fn message_id(mut self, id: impl Into<String>) -> Self {
        self.message_id = Some(id.into());
        self
    }

    /// Sets the plain-text body.
    pub fn text_body(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Sets the HTML body.
    pub fn html_body(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    /// Adds an extra header after the standard ones.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.push((name.into(), value.into()));
        self
    }

    /// Builds the message.
    ///
    /// # Errors
    ///
    /// Returns an error if From, To, or both bodies are missing.
    pub fn build(self) -> Result<Message> {
        let from = self.from.ok_or(Error::MissingHeader("From"))?;
        if self.to.is_empty() {
            return Err(Error::MissingHeader("To"));
        }

        let body = match (self.text, self.html) {
            (None, None) => return Err(Error::MissingBody),
            (Some(text), None) => Body::Single(Part::text(&text)),
            (None, Some(html)) => Body::Single(Part::html(&html)),
            (Some(text), Some(html)) => Body::Alternative {
                boundary: format!("=_mf_{}", unique_token()),
                parts: vec![Part::text(&text), Part::html(&html)],
            },
        };

        let date = self.date.unwrap_or_else(|| Local::now().fixed_offset());
        let message_id = self
            .message_id
            .unwrap_or_else(|| format!("{}@{}", unique_token(), domain_of(&from)));

        let mut headers = Headers::new();
        headers.add("Date", date.to_rfc2822());
        headers.add("From", from);
        if let Some(reply_to) = self.reply_to {
            headers.add("Reply-To", reply_to);
        }
        headers.add("To", self.to.join(", "));
        headers.add(
            "Subject",
            encode_rfc2047(self.subject.as_deref().unwrap_or_default()),
        );
        headers.add("Message-ID", format!("<{message_id}>"));
        headers.add("MIME-Version", "1.0");
        for (name, value) in self.extra {
            headers.add(name, value);
        }

        Ok(Message { headers, body })
    }
}

/// Domain part of a mailbox, for generated message ids.
fn domain_of(mailbox: &str) -> &str {
    let address = mailbox
        .rsplit_once('<')
        .map_or(mailbox, |(_, rest)| rest.trim_end_matches('>'));
    address
        .rsplit_once('@')
        .map(|(_, domain)| domain.trim())
        .filter(|domain| !domain.is_empty())
        .unwrap_or("localhost")
}

/// A token unique within this process and unlikely to repeat across processes.
fn unique_token() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let count = COUNTER.fetch_add(1, Ordering::Relaxed);
    let now = Utc::now();
    format!(
        "{:x}.{:x}.{:x}.{:x}",
        now.timestamp(),
        now.timestamp_subsec_nanos(),
        std::process::id(),
        count
    )
}
