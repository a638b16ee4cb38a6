//! SMTP reply types and parsing.

use crate::error::{Error, Result};
use std::fmt;

/// SMTP reply from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Reply code (e.g., 250).
    pub code: ReplyCode,
    /// Text of each reply line, without code and separator.
    pub lines: Vec<String>,
}

impl Reply {
    /// Creates a new reply.
    #[must_use]
    pub const fn new(code: ReplyCode, lines: Vec<String>) -> Self {
        Self { code, lines }
    }

    /// Parses a complete reply from its raw lines.
    ///
    /// Single-line replies look like `250 OK`; multi-line replies continue
    /// with `250-` and end with `250 `. Every line must carry the same code.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the reply is empty or a line is malformed.
    pub fn parse<L: AsRef<str>>(raw: &[L]) -> Result<Self> {
        let Some(first) = raw.first() else {
            return Err(Error::Protocol("Empty reply".into()));
        };
        let code = parse_code(first.as_ref())?;

        let mut lines = Vec::with_capacity(raw.len());
        for line in raw {
            let line = line.as_ref();
            if parse_code(line)? != code {
                return Err(Error::Protocol(format!(
                    "Reply code changed mid-reply: {line}"
                )));
            }
            lines.push(line.get(4..).unwrap_or_default().to_string());
        }
        Ok(Self { code, lines })
    }

    /// Returns true if this is a success reply (2xx).
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.code.is_success()
    }

    /// Returns the full message as a single string.
    #[must_use]
    pub fn text(&self) -> String {
        self.lines.join(" ")
    }

    /// Converts a reply into an error unless it has the expected code class.
    pub(crate) fn require(self, accept: impl Fn(ReplyCode) -> bool) -> Result<Self> {
        if accept(self.code) {
            Ok(self)
        } else {
            Err(Error::rejected(self.code.as_u16(), self.text()))
        }
    }
}

fn parse_code(line: &str) -> Result<ReplyCode> {
    let digits = line
        .get(..3)
        .filter(|code| code.bytes().all(|b| b.is_ascii_digit()))
        .ok_or_else(|| Error::Protocol(format!("Malformed reply line: {line}")))?;
    match line.as_bytes().get(3) {
        None | Some(b' ' | b'-') => {}
        Some(_) => return Err(Error::Protocol(format!("Malformed reply line: {line}"))),
    }
    digits
        .parse()
        .map(ReplyCode::new)
        .map_err(|_| Error::Protocol(format!("Invalid reply code: {digits}")))
}

/// Returns true if `line` ends a reply (`250 text` or a bare `250`).
#[must_use]
pub fn is_last_line(line: &str) -> bool {
    line.len() == 3 || line.as_bytes().get(3) == Some(&b' ')
}

/// SMTP reply code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReplyCode(u16);

impl ReplyCode {
    /// 220 Service ready
    pub const SERVICE_READY: Self = Self(220);
    /// 221 Service closing transmission channel
    pub const CLOSING: Self = Self(221);
    /// 235 Authentication succeeded
    pub const AUTH_SUCCEEDED: Self = Self(235);
    /// 250 Requested mail action okay, completed
    pub const OK: Self = Self(250);
    /// 334 Server challenge during AUTH
    pub const AUTH_CONTINUE: Self = Self(334);
    /// 354 Start mail input
    pub const START_DATA: Self = Self(354);
    /// 421 Service not available
    pub const SERVICE_UNAVAILABLE: Self = Self(421);
    /// 450 Mailbox unavailable (busy)
    pub const MAILBOX_BUSY: Self = Self(450);
    /// 535 Authentication credentials invalid
    pub const AUTH_FAILED: Self = Self(535);
    /// 550 Mailbox unavailable
    pub const MAILBOX_UNAVAILABLE: Self = Self(550);
    /// 552 Exceeded storage allocation
    pub const EXCEEDED_STORAGE: Self = Self(552);

    /// Creates a new reply code.
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Returns the numeric code.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Returns true for 2xx.
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 >= 200 && self.0 < 300
    }

    /// Returns true for 3xx.
    #[must_use]
    pub const fn is_intermediate(self) -> bool {
        self.0 >= 300 && self.0 < 400
    }

    /// Returns true for 4xx.
    #[must_use]
    pub const fn is_transient(self) -> bool {
        self.0 >= 400 && self.0 < 500
    }

    /// Returns true for 5xx.
    #[must_use]
    pub const fn is_permanent(self) -> bool {
        self.0 >= 500 && self.0 < 600
    }
}

impl fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_line() {
        let reply = Reply::parse(&["250 OK"]).unwrap();
        assert_eq!(reply.code, ReplyCode::OK);
        assert_eq!(reply.lines, vec!["OK"]);
        assert!(reply.is_success());
    }

    #[test]
    fn test_parse_multi_line() {
        let reply = Reply::parse(&["250-mx.example.com", "250-SIZE 1000", "250 STARTTLS"]).unwrap();
        assert_eq!(reply.lines, vec!["mx.example.com", "SIZE 1000", "STARTTLS"]);
        assert_eq!(reply.text(), "mx.example.com SIZE 1000 STARTTLS");
    }

    #[test]
    fn test_parse_bare_code() {
        let reply = Reply::parse(&["354"]).unwrap();
        assert_eq!(reply.code, ReplyCode::START_DATA);
        assert_eq!(reply.lines, vec![""]);
    }

    #[test]
    fn test_parse_errors() {
        assert!(Reply::parse::<&str>(&[]).is_err());
        assert!(Reply::parse(&["25"]).is_err());
        assert!(Reply::parse(&["ABC OK"]).is_err());
        assert!(Reply::parse(&["250xOK"]).is_err());
        assert!(Reply::parse(&["250-first", "251 second"]).is_err());
    }

    #[test]
    fn test_is_last_line() {
        assert!(is_last_line("250 OK"));
        assert!(is_last_line("250"));
        assert!(!is_last_line("250-Continuing"));
    }

    #[test]
    fn test_require_maps_rejection() {
        let reply = Reply::parse(&["550 No such user"]).unwrap();
        let err = reply.require(ReplyCode::is_success).unwrap_err();
        assert_eq!(err.reply_code(), Some(550));
    }

    #[test]
    fn test_code_classes() {
        assert!(ReplyCode::CLOSING.is_success());
        assert!(ReplyCode::START_DATA.is_intermediate());
        assert!(ReplyCode::MAILBOX_BUSY.is_transient());
        assert!(ReplyCode::AUTH_FAILED.is_permanent());
        assert_eq!(ReplyCode::OK.to_string(), "250");
    }
}
