//! Per-recipient message composition.

use tracing::debug;

use mailforge_render::{BlockId, Document, FieldSource, emit, personalize, substitute};

use crate::campaign::CampaignDetails;
use crate::mailer::OutgoingEmail;
use crate::recipients::Recipient;

/// Subject prefix for test sends.
pub const TEST_SUBJECT_PREFIX: &str = "[Test] ";

/// Renders the HTML a recipient would receive.
///
/// Tokens are substituted before emission so record values are escaped
/// like any other text.
#[must_use]
pub fn render_html<R: FieldSource + ?Sized>(document: &Document, record: &R) -> String {
    emit(&personalize(document, record), BlockId::ROOT)
}

/// Plain-text alternative for an emitted HTML document.
///
/// Returns an empty string if the HTML cannot be converted.
#[must_use]
pub fn plain_text(html: &str) -> String {
    htmd::convert(html).unwrap_or_else(|e| {
        debug!("Could not derive plain text: {e}");
        String::new()
    })
}

/// Builds the message for one recipient.
#[must_use]
pub fn compose(details: &CampaignDetails, document: &Document, recipient: &Recipient) -> OutgoingEmail {
    let html = render_html(document, recipient);
    let text = plain_text(&html);

    OutgoingEmail {
        from_name: details.from_name.trim().to_string(),
        from_email: details.from_email.trim().to_string(),
        reply_to: details.reply_to().map(str::to_string),
        to: recipient.email.clone(),
        to_name: recipient.name.clone(),
        subject: substitute(&details.subject, recipient),
        html,
        text,
    }
}

/// Builds a test message to `to`, with the subject marked as a test.
#[must_use]
pub fn compose_test(details: &CampaignDetails, document: &Document, to: &Recipient) -> OutgoingEmail {
    let mut email = compose(details, document, to);
    email.subject.insert_str(0, TEST_SUBJECT_PREFIX);
    email
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use mailforge_render::Block;

    fn document() -> Document {
        let mut document = Document::new();
        document
            .insert(BlockId::ROOT, Block::email_layout::<&str>([]))
            .unwrap();
        document
            .append_child(BlockId::ROOT, "hello", Block::text("Hello {{name}}"))
            .unwrap();
        document
    }

    fn details() -> CampaignDetails {
        CampaignDetails {
            name: "Welcome".into(),
            subject: "Welcome aboard, {{name}}".into(),
            from_name: " Acme ".into(),
            from_email: "news@acme.test".into(),
            ..CampaignDetails::default()
        }
    }

    #[test]
    fn test_compose_personalizes_body_and_subject() {
        let ada = Recipient::new("ada@example.com", Some("Ada".into()));
        let email = compose(&details(), &document(), &ada);

        assert_eq!(email.subject, "Welcome aboard, Ada");
        assert_eq!(email.from_name, "Acme");
        assert_eq!(email.to, "ada@example.com");
        assert_eq!(email.reply_to, None);
        assert!(email.html.starts_with("<!DOCTYPE html>"));
        assert!(email.html.contains("Hello Ada"));
        assert!(email.text.contains("Hello Ada"));
    }

    #[test]
    fn test_unmapped_tokens_pass_through() {
        let anonymous = Recipient::new("someone@example.com", None);
        let email = compose(&details(), &document(), &anonymous);
        assert_eq!(email.subject, "Welcome aboard, {{name}}");
        assert!(email.html.contains("Hello {{name}}"));
    }

    #[test]
    fn test_values_are_escaped() {
        let sneaky = Recipient::new("x@example.com", Some("<b>Eve</b>".into()));
        let html = render_html(&document(), &sneaky);
        assert!(html.contains("Hello &lt;b&gt;Eve&lt;/b&gt;"));
        assert!(!html.contains("<b>Eve"));
    }

    #[test]
    fn test_compose_test_marks_subject() {
        let me = Recipient::new("me@acme.test", Some("Me".into()));
        let email = compose_test(&details(), &document(), &me);
        assert_eq!(email.subject, "[Test] Welcome aboard, Me");
    }
}
