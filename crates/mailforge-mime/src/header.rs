//! MIME header handling.

use crate::encoding::encode_rfc2047;
use std::fmt;

/// Ordered collection of email headers.
///
/// Names keep the case they were added with; lookups ignore case. Line
/// breaks inside values are replaced by spaces so a value can never start a
/// new header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

fn single_line(value: String) -> String {
    if value.contains(['\r', '\n']) {
        value.replace(['\r', '\n'], " ")
    } else {
        value
    }
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header value.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries
            .push((name.into(), single_line(value.into())));
    }

    /// Sets a header value, replacing existing values in place.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = single_line(value.into());
        match self
            .entries
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(&name))
        {
            Some(index) => {
                self.entries[index].1 = value;
                let mut i = 0;
                self.entries.retain(|(n, _)| {
                    let keep = i <= index || !n.eq_ignore_ascii_case(&name);
                    i += 1;
                    keep
                });
            }
            None => self.entries.push((name, value)),
        }
    }

    /// Gets the first value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Gets all values for a header.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Removes all values for a header.
    pub fn remove(&mut self, name: &str) {
        self.entries.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
    }

    /// Returns an iterator over all headers in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of header lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.entries {
            write!(f, "{name}: {value}\r\n")?;
        }
        Ok(())
    }
}

/// Characters that require a display name to be quoted (RFC 5322 specials).
const SPECIALS: &[char] = &['(', ')', '<', '>', '[', ']', ':', ';', '@', '\\', ',', '.', '"'];

/// Formats a mailbox as `Display Name <address>`.
///
/// Non-ASCII names are written as encoded words, names with specials are
/// quoted, and an empty name yields the bare address.
#[must_use]
pub fn mailbox(name: Option<&str>, address: &str) -> String {
    let name = name.map(str::trim).unwrap_or_default();
    if name.is_empty() {
        return address.to_string();
    }

    let display = if !name.is_ascii() || name.contains(['=', '?']) {
        encode_rfc2047(name)
    } else if name.contains(SPECIALS) {
        format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        name.to_string()
    };
    format!("{display} <{address}>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_keep_order() {
        let mut headers = Headers::new();
        headers.add("From", "a@example.com");
        headers.add("To", "b@example.com");
        headers.add("Subject", "Hi");
        assert_eq!(
            headers.to_string(),
            "From: a@example.com\r\nTo: b@example.com\r\nSubject: Hi\r\n"
        );
    }

    #[test]
    fn test_headers_case_insensitive() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "text/plain");
        assert_eq!(headers.get("content-type"), Some("text/plain"));
    }

    #[test]
    fn test_headers_set_replaces_in_place() {
        let mut headers = Headers::new();
        headers.add("To", "alice@example.com");
        headers.add("Subject", "x");
        headers.add("to", "bob@example.com");

        headers.set("TO", "charlie@example.com");
        assert_eq!(headers.get_all("To"), vec!["charlie@example.com"]);
        assert_eq!(headers.iter().next(), Some(("To", "charlie@example.com")));
        assert_eq!(headers.len(), 2);

        headers.remove("subject");
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_header_injection_flattened() {
        let mut headers = Headers::new();
        headers.add("Subject", "Hi\r\nBcc: victim@example.com");
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("Subject"), Some("Hi  Bcc: victim@example.com"));
    }

    #[test]
    fn test_mailbox_formats() {
        assert_eq!(mailbox(None, "a@example.com"), "a@example.com");
        assert_eq!(mailbox(Some("  "), "a@example.com"), "a@example.com");
        assert_eq!(mailbox(Some("Acme News"), "a@example.com"), "Acme News <a@example.com>");
        assert_eq!(
            mailbox(Some("Acme, Inc."), "a@example.com"),
            "\"Acme, Inc.\" <a@example.com>"
        );
        assert_eq!(
            mailbox(Some("Zoë"), "a@example.com"),
            "=?utf-8?B?Wm/Dqw==?= <a@example.com>"
        );
    }
}
