//! SMTP service extensions advertised in the EHLO reply.

/// SMTP extension discovered from an EHLO reply line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Extension {
    /// STARTTLS (RFC 3207)
    StartTls,
    /// AUTH with the advertised mechanisms (RFC 4954)
    Auth(Vec<AuthMechanism>),
    /// SIZE with an optional limit in bytes (RFC 1870)
    Size(Option<usize>),
    /// 8BITMIME (RFC 6152)
    EightBitMime,
    /// SMTPUTF8 (RFC 6531)
    SmtpUtf8,
    /// PIPELINING (RFC 2920)
    Pipelining,
    /// Any other keyword, upper-cased
    Other(String),
}

impl Extension {
    /// Parses one EHLO reply line (without the reply code).
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let mut words = line.split_whitespace();
        let keyword = words.next().unwrap_or_default().to_ascii_uppercase();

        match keyword.as_str() {
            "STARTTLS" => Self::StartTls,
            "AUTH" => Self::Auth(words.filter_map(AuthMechanism::parse).collect()),
            // SIZE 0 means no fixed limit.
            "SIZE" => Self::Size(
                words
                    .next()
                    .and_then(|limit| limit.parse().ok())
                    .filter(|&limit| limit > 0),
            ),
            "8BITMIME" => Self::EightBitMime,
            "SMTPUTF8" => Self::SmtpUtf8,
            "PIPELINING" => Self::Pipelining,
            _ => Self::Other(keyword),
        }
    }
}

/// SASL mechanism supported by this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMechanism {
    /// PLAIN (RFC 4616), sent as an initial response
    Plain,
    /// LOGIN, username and password in two challenges
    Login,
}

impl AuthMechanism {
    /// Parses a mechanism name, ignoring ones this client cannot use.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("PLAIN") {
            Some(Self::Plain)
        } else if name.eq_ignore_ascii_case("LOGIN") {
            Some(Self::Login)
        } else {
            None
        }
    }

    /// Returns the mechanism name as sent in `AUTH`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "PLAIN",
            Self::Login => "LOGIN",
        }
    }
}
