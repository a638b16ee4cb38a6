//! MIME encoding and decoding utilities.
//!
//! Supports Base64, Quoted-Printable, and RFC 2047 header encoding.

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt::Write as _;

/// Encodes data as Base64.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decodes Base64 data.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    STANDARD.decode(data).map_err(Into::into)
}

/// Maximum line length for Quoted-Printable encoding.
const MAX_LINE_LENGTH: usize = 76;

/// Largest UTF-8 chunk per encoded word, keeping each word within 75 characters.
const ENCODED_WORD_BYTES: usize = 45;

/// Encodes text using Quoted-Printable encoding (RFC 2045).
///
/// Line breaks in the input become CRLF hard breaks. Lines longer than 76
/// characters are split with soft breaks.
#[must_use]
pub fn encode_quoted_printable(text: &str) -> String {
    let mut result = String::with_capacity(text.len() + text.len() / 8);
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            result.push_str("\r\n");
        }
        encode_qp_line(line.strip_suffix('\r').unwrap_or(line), &mut result);
    }
    result
}

fn encode_qp_line(line: &str, result: &mut String) {
    let bytes = line.as_bytes();
    let mut line_length = 0;

    for (i, &byte) in bytes.iter().enumerate() {
        let at_end = i + 1 == bytes.len();
        // Whitespace is literal except at the end of a line.
        let literal = matches!(byte, b'!'..=b'<' | b'>'..=b'~')
            || (matches!(byte, b' ' | b'\t') && !at_end);
        let width = if literal { 1 } else { 3 };

        if line_length + width > MAX_LINE_LENGTH - 1 {
            result.push_str("=\r\n");
            line_length = 0;
        }

        if literal {
            result.push(char::from(byte));
        } else {
            let _ = write!(result, "={byte:02X}");
        }
        line_length += width;
    }
}

/// Decodes Quoted-Printable text (RFC 2045).
///
/// # Errors
///
/// Returns an error if the input contains invalid escape sequences or the
/// decoded bytes are not UTF-8.
pub fn decode_quoted_printable(text: &str) -> Result<String> {
    let bytes = text.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'=' {
            result.push(bytes[i]);
            i += 1;
            continue;
        }

        match (bytes.get(i + 1), bytes.get(i + 2)) {
            // Soft line breaks
            (Some(b'\r'), Some(b'\n')) => i += 3,
            (Some(b'\n'), _) => i += 2,
            (Some(&high), Some(&low)) if high.is_ascii_hexdigit() && low.is_ascii_hexdigit() => {
                result.push((hex_value(high) << 4) | hex_value(low));
                i += 3;
            }
            (Some(_), Some(_)) => {
                return Err(Error::InvalidEncoding(format!(
                    "Invalid escape at offset {i}"
                )));
            }
            _ => {
                return Err(Error::InvalidEncoding(
                    "Incomplete escape sequence".to_string(),
                ));
            }
        }
    }

    String::from_utf8(result).map_err(Into::into)
}

const fn hex_value(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        _ => digit - b'A' + 10,
    }
}

/// Returns true if a header value can be written without encoding.
fn is_plain_header_text(text: &str) -> bool {
    text.chars()
        .all(|c| c.is_ascii() && !c.is_ascii_control() && c != '=' && c != '?')
}

/// Encodes a header value using RFC 2047 Base64 encoded words.
///
/// Values that are plain printable ASCII are returned unchanged. Longer
/// values are split into several words, never inside a character.
#[must_use]
pub fn encode_rfc2047(text: &str) -> String {
    if is_plain_header_text(text) {
        return text.to_string();
    }

    let mut words = Vec::new();
    let mut start = 0;
    let mut end = 0;
    for (offset, ch) in text.char_indices() {
        let next = offset + ch.len_utf8();
        if next - start > ENCODED_WORD_BYTES && end > start {
            words.push(encoded_word(&text[start..end]));
            start = end;
        }
        end = next;
    }
    if end > start {
        words.push(encoded_word(&text[start..end]));
    }
    words.join(" ")
}

fn encoded_word(chunk: &str) -> String {
    format!("=?utf-8?B?{}?=", encode_base64(chunk.as_bytes()))
}

/// Decodes a header value made of RFC 2047 encoded words.
///
/// Values that are not entirely encoded words are returned unchanged.
///
/// # Errors
///
/// Returns an error if an encoded word is malformed.
pub fn decode_rfc2047(text: &str) -> Result<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty()
        || !words
            .iter()
            .all(|word| word.starts_with("=?") && word.ends_with("?="))
    {
        return Ok(text.to_string());
    }

    let mut decoded = String::new();
    for word in words {
        decoded.push_str(&decode_word(word)?);
    }
    Ok(decoded)
}

fn decode_word(word: &str) -> Result<String> {
    let inner = &word[2..word.len() - 2];
    let parts: Vec<&str> = inner.split('?').collect();

    let [_charset, encoding, encoded_text] = parts.as_slice() else {
        return Err(Error::InvalidEncoding(
            "Invalid RFC 2047 format".to_string(),
        ));
    };

    match encoding.to_ascii_uppercase().as_str() {
        "B" => {
            let decoded = decode_base64(encoded_text)?;
            String::from_utf8(decoded).map_err(Into::into)
        }
        "Q" => decode_quoted_printable(&encoded_text.replace('_', " ")),
        other => Err(Error::InvalidEncoding(format!("Unknown encoding: {other}"))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_base64_encode_decode() {
        let encoded = encode_base64(b"Hello, World!");
        assert_eq!(encoded, "SGVsbG8sIFdvcmxkIQ==");
        assert_eq!(decode_base64(&encoded).unwrap(), b"Hello, World!");
    }

    #[test]
    fn test_quoted_printable_plain_ascii() {
        assert_eq!(encode_quoted_printable("Hello, World!"), "Hello, World!");
    }

    #[test]
    fn test_quoted_printable_specials() {
        assert_eq!(encode_quoted_printable("a=b"), "a=3Db");
        assert_eq!(encode_quoted_printable("Héllo"), "H=C3=A9llo");
        assert_eq!(encode_quoted_printable("end "), "end=20");
    }

    #[test]
    fn test_quoted_printable_line_breaks() {
        assert_eq!(encode_quoted_printable("one\ntwo\r\nthree"), "one\r\ntwo\r\nthree");
    }

    #[test]
    fn test_quoted_printable_soft_breaks() {
        let long = "x".repeat(200);
        let encoded = encode_quoted_printable(&long);
        assert!(encoded.split("\r\n").all(|line| line.len() <= 76));
        assert_eq!(decode_quoted_printable(&encoded).unwrap(), long);
    }

    #[test]
    fn test_quoted_printable_decode_errors() {
        assert!(decode_quoted_printable("bad=ZZ").is_err());
        assert!(decode_quoted_printable("cut=4").is_err());
    }

    #[test]
    fn test_rfc2047_plain_passthrough() {
        assert_eq!(encode_rfc2047("Weekly update"), "Weekly update");
    }

    #[test]
    fn test_rfc2047_encode_decode() {
        let encoded = encode_rfc2047("Héllo");
        assert_eq!(encoded, "=?utf-8?B?SMOpbGxv?=");
        assert_eq!(decode_rfc2047(&encoded).unwrap(), "Héllo");
    }

    #[test]
    fn test_rfc2047_long_values_split() {
        let subject = "Ünïcödé ".repeat(12);
        let encoded = encode_rfc2047(&subject);
        assert!(encoded.split(' ').all(|word| word.len() <= 75));
        assert_eq!(decode_rfc2047(&encoded).unwrap(), subject);
    }

    proptest! {
        #[test]
        fn quoted_printable_round_trips(text in "[a-zA-Z0-9 =é\u{4e2d}\t.!-]{0,300}") {
            let encoded = encode_quoted_printable(&text);
            prop_assert!(encoded.split("\r\n").all(|line| line.len() <= 76));
            prop_assert_eq!(decode_quoted_printable(&encoded).unwrap(), text);
        }
    }
}
