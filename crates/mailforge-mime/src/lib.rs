//! # mailforge-mime
//!
//! MIME message generation for campaign email.
//!
//! ## Features
//!
//! - **Message generation**: single-part or `multipart/alternative` (text + HTML)
//! - **Encoding**: Base64, Quoted-Printable, RFC 2047 header encoding
//! - **Headers**: ordered, case-insensitive lookup, injection-safe values
//! - **Identity**: `Date` and generated `Message-ID` headers
//!
//! ## Quick Start
//!
//! ```
//! use mailforge_mime::{MessageBuilder, mailbox};
//!
//! let message = MessageBuilder::new()
//!     .from(mailbox(Some("Acme News"), "news@acme.test"))
//!     .to("ada@example.com")
//!     .subject("Spring catalogue")
//!     .text_body("Plain text version")
//!     .html_body("<html><body><p>HTML version</p></body></html>")
//!     .build()?;
//!
//! assert!(message.boundary().is_some());
//! # Ok::<(), mailforge_mime::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod content_type;
mod error;
mod header;
mod message;

pub mod encoding;

pub use content_type::ContentType;
pub use error::{Error, Result};
pub use header::{Headers, mailbox};
pub use message::{Message, MessageBuilder, Part, TransferEncoding};
