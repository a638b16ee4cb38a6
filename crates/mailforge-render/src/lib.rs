//! # mailforge-render
//!
//! Email document model and renderer.
//!
//! A [`Document`] is a flat map from [`BlockId`] to [`Block`]. Blocks refer to
//! their children by id, so the tree is only implied; the [`Reader`] walks it
//! from a root id and builds an [`Element`] tree, and [`emit`] serializes that
//! tree as a standalone HTML document.
//!
//! ## Features
//!
//! - **Typed blocks**: layout, container, columns, text, image, divider, spacer
//! - **Lossless JSON**: unknown block types survive a load/save cycle
//! - **Tolerant rendering**: missing ids, cycles and unknown types render as nothing
//! - **Editing**: structure-preserving insert, append, replace and remove
//! - **Personalization**: `{{placeholder}}` substitution per recipient
//!
//! ## Quick Start
//!
//! ```
//! use std::collections::HashMap;
//! use mailforge_render::{Block, Document, emit, personalize};
//!
//! let mut document = Document::new();
//! document.insert("root", Block::email_layout::<&str>([]))?;
//! document.append_child("root", "greeting", Block::text("Hello {{name}}"))?;
//!
//! let record = HashMap::from([("name".to_string(), "Ada".to_string())]);
//! let html = emit(&personalize(&document, &record), "root");
//! assert!(html.contains("Hello Ada"));
//! # Ok::<(), mailforge_render::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod block;
mod document;
mod element;
mod error;
mod markup;
mod reader;
mod substitute;

pub mod registry;
pub mod style;

pub use block::{
    Block, BlockData, BlockId, BlockStyle, BlockType, ColumnsContainerProps, ContainerProps,
    DividerProps, EmailLayoutProps, FontWeight, ImageProps, Padding, SpacerProps, TextAlign,
    TextProps,
};
pub use document::{Diagnostic, Document};
pub use element::{Element, Node, escape_html};
pub use error::{Error, Result};
pub use markup::{DOCTYPE, emit, render_to_string};
pub use reader::{DEFAULT_MAX_DEPTH, Reader, RenderMode, render};
pub use substitute::{FieldSource, personalize, substitute, tokens};
