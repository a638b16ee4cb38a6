//! Core SMTP types.

mod address;
mod credentials;
mod extension;
pub(crate) mod reply;

pub use address::Address;
pub use credentials::Credentials;
pub use extension::{AuthMechanism, Extension};
pub use reply::{Reply, ReplyCode};
