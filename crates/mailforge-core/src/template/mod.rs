//! Email template storage.

mod model;
pub(crate) mod repository;

pub use model::{Template, TemplateId};
pub use repository::TemplateRepository;
