//! # mailforge-smtp
//!
//! SMTP submission client (RFC 5321) used to deliver campaign email.
//!
//! ## Features
//!
//! - **Type-state sessions**: commands only compile in states where the
//!   protocol allows them
//! - **Any transport**: the client is generic over the byte stream, so it
//!   runs over TCP, TLS, or a scripted test double
//! - **TLS**: implicit TLS (port 465) and STARTTLS (port 587) via rustls
//! - **Authentication**: AUTH PLAIN and AUTH LOGIN
//! - **Extensions**: SIZE (enforced before sending), 8BITMIME, SMTPUTF8,
//!   PIPELINING detection
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailforge_smtp::{Address, Client, Credentials};
//! use mailforge_smtp::connection::connect;
//!
//! #[tokio::main]
//! async fn main() -> mailforge_smtp::Result<()> {
//!     let stream = connect("smtp.example.com", 587).await?;
//!     let client = Client::from_stream(stream)
//!         .await?
//!         .ehlo("mailforge.local")
//!         .await?
//!         .starttls("smtp.example.com")
//!         .await?
//!         .authenticate(&Credentials::new("news@acme.test", "password"))
//!         .await?;
//!
//!     let message = b"Subject: Test\r\n\r\nHello, World!\r\n";
//!     let client = client
//!         .mail_from(&Address::new("news@acme.test")?, Some(message.len()))
//!         .await?
//!         .rcpt_to(&Address::new("ada@example.com")?)
//!         .await?
//!         .data()
//!         .await?
//!         .send_message(message)
//!         .await?;
//!
//!     client.quit().await
//! }
//! ```
//!
//! ## Session States
//!
//! ```text
//! Connected ── ehlo / starttls ──→ Connected
//!     │
//!     └── authenticate / without_auth ──→ Ready
//!                                          │
//!     Ready ←── send_message ── Data ←── data ── RecipientAdded ←── rcpt_to ── MailTransaction ←── mail_from
//! ```
//!
//! `quit` is available in every state; `reset` aborts a transaction.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod types;

pub use connection::{
    Client, Connected, Data, InTransaction, MailTransaction, Ready, RecipientAdded, ServerInfo,
    SmtpStream,
};
pub use error::{Error, Result};
pub use types::{Address, AuthMechanism, Credentials, Extension, Reply, ReplyCode};
