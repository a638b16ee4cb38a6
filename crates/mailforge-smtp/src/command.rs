//! SMTP command serialization.

use crate::types::{Address, AuthMechanism};
use std::fmt;

/// SMTP command sent by the client.
#[derive(Clone, PartialEq, Eq)]
pub enum Command {
    /// EHLO with the client's name
    Ehlo(String),
    /// STARTTLS
    StartTls,
    /// AUTH with an optional initial response
    Auth {
        /// SASL mechanism
        mechanism: AuthMechanism,
        /// Base64 initial response
        initial_response: Option<String>,
    },
    /// Base64 answer to a 334 challenge
    AuthResponse(String),
    /// MAIL FROM with ESMTP parameters
    MailFrom {
        /// Reverse-path
        from: Address,
        /// `SIZE=` parameter
        size: Option<usize>,
        /// Adds `BODY=8BITMIME`
        eight_bit: bool,
        /// Adds `SMTPUTF8`
        utf8: bool,
    },
    /// RCPT TO
    RcptTo(Address),
    /// DATA
    Data,
    /// RSET
    Rset,
    /// NOOP
    Noop,
    /// QUIT
    Quit,
}

impl Command {
    /// Serializes the command, including the trailing CRLF.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut line = self.to_line();
        line.push_str("\r\n");
        line.into_bytes()
    }

    /// Returns the command verb, used for logging.
    #[must_use]
    pub const fn verb(&self) -> &'static str {
        match self {
            Self::Ehlo(_) => "EHLO",
            Self::StartTls => "STARTTLS",
            Self::Auth { .. } => "AUTH",
            Self::AuthResponse(_) => "AUTH (response)",
            Self::MailFrom { .. } => "MAIL FROM",
            Self::RcptTo(_) => "RCPT TO",
            Self::Data => "DATA",
            Self::Rset => "RSET",
            Self::Noop => "NOOP",
            Self::Quit => "QUIT",
        }
    }

    fn to_line(&self) -> String {
        match self {
            Self::Ehlo(name) => format!("EHLO {name}"),
            Self::StartTls => "STARTTLS".to_string(),
            Self::Auth {
                mechanism,
                initial_response: Some(response),
            } => format!("AUTH {} {response}", mechanism.as_str()),
            Self::Auth {
                mechanism,
                initial_response: None,
            } => format!("AUTH {}", mechanism.as_str()),
            Self::AuthResponse(response) => response.clone(),
            Self::MailFrom {
                from,
                size,
                eight_bit,
                utf8,
            } => {
                let mut line = format!("MAIL FROM:<{from}>");
                if let Some(size) = size {
                    line.push_str(&format!(" SIZE={size}"));
                }
                if *eight_bit {
                    line.push_str(" BODY=8BITMIME");
                }
                if *utf8 {
                    line.push_str(" SMTPUTF8");
                }
                line
            }
            Self::RcptTo(to) => format!("RCPT TO:<{to}>"),
            Self::Data => "DATA".to_string(),
            Self::Rset => "RSET".to_string(),
            Self::Noop => "NOOP".to_string(),
            Self::Quit => "QUIT".to_string(),
        }
    }
}

// Credentials never reach logs through Debug.
impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auth { .. } | Self::AuthResponse(_) => f.write_str(self.verb()),
            _ => f.write_str(&self.to_line()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        Address::new(s).unwrap()
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(
            Command::Ehlo("mailforge.local".into()).serialize(),
            b"EHLO mailforge.local\r\n"
        );
        assert_eq!(Command::StartTls.serialize(), b"STARTTLS\r\n");
        assert_eq!(Command::Data.serialize(), b"DATA\r\n");
        assert_eq!(Command::Rset.serialize(), b"RSET\r\n");
        assert_eq!(Command::Noop.serialize(), b"NOOP\r\n");
        assert_eq!(Command::Quit.serialize(), b"QUIT\r\n");
        assert_eq!(
            Command::RcptTo(addr("ada@example.com")).serialize(),
            b"RCPT TO:<ada@example.com>\r\n"
        );
    }

    #[test]
    fn test_auth_commands() {
        let plain = Command::Auth {
            mechanism: AuthMechanism::Plain,
            initial_response: Some("AGFkYQBzZWNyZXQ=".into()),
        };
        assert_eq!(plain.serialize(), b"AUTH PLAIN AGFkYQBzZWNyZXQ=\r\n");

        let login = Command::Auth {
            mechanism: AuthMechanism::Login,
            initial_response: None,
        };
        assert_eq!(login.serialize(), b"AUTH LOGIN\r\n");
        assert_eq!(
            Command::AuthResponse("YWRh".into()).serialize(),
            b"YWRh\r\n"
        );
    }

    #[test]
    fn test_mail_from_parameters() {
        let bare = Command::MailFrom {
            from: addr("news@acme.test"),
            size: None,
            eight_bit: false,
            utf8: false,
        };
        assert_eq!(bare.serialize(), b"MAIL FROM:<news@acme.test>\r\n");

        let full = Command::MailFrom {
            from: addr("news@acme.test"),
            size: Some(2048),
            eight_bit: true,
            utf8: true,
        };
        assert_eq!(
            full.serialize(),
            b"MAIL FROM:<news@acme.test> SIZE=2048 BODY=8BITMIME SMTPUTF8\r\n"
        );
    }

    #[test]
    fn test_debug_redacts_auth() {
        let cmd = Command::Auth {
            mechanism: AuthMechanism::Plain,
            initial_response: Some("c2VjcmV0".into()),
        };
        assert_eq!(format!("{cmd:?}"), "AUTH");
        assert_eq!(
            format!("{:?}", Command::AuthResponse("c2VjcmV0".into())),
            "AUTH (response)"
        );
        assert_eq!(format!("{:?}", Command::Noop), "NOOP");
    }
}
