//! Static markup: the HTML sent to recipients.

use crate::document::Document;
use crate::reader::{RenderMode, Reader};

/// Prefix of every emitted document.
pub const DOCTYPE: &str = "<!DOCTYPE html>";

/// Renders `root` as a bare HTML fragment with no block ids.
///
/// Returns an empty string if the root does not render.
#[must_use]
pub fn render_to_string(document: &Document, root: &str) -> String {
    Reader::new(document)
        .mode(RenderMode::Static)
        .render(root)
        .map(|element| element.to_string())
        .unwrap_or_default()
}

/// Renders `root` as a standalone HTML document.
#[must_use]
pub fn emit(document: &Document, root: &str) -> String {
    let body = render_to_string(document, root);
    let mut html = String::with_capacity(DOCTYPE.len() + body.len() + 32);
    html.push_str(DOCTYPE);
    html.push_str("<html><body>");
    html.push_str(&body);
    html.push_str("</body></html>");
    html
}
