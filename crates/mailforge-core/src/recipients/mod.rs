//! Recipient import from CSV contact lists.

mod list;
mod mapping;

pub use list::{ImportSummary, PREVIEW_ROWS, Recipient, RecipientList};
pub use mapping::ColumnMapping;
