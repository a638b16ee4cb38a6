//! Tree renderer: resolves a root id through a document into an element tree.

use std::collections::HashSet;

use tracing::debug;

use crate::document::Document;
use crate::element::{Element, Node};
use crate::registry;

/// Nesting depth beyond which blocks are not rendered.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Whether rendered elements carry their block ids.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenderMode {
    /// Editor preview: every block's outer element carries its id.
    #[default]
    Interactive,
    /// Markup for sending: no ids attached.
    Static,
}

/// Renders blocks of one document.
///
/// Rendering never fails and never modifies the document. Missing ids,
/// unknown types, references back to an ancestor and blocks nested deeper
/// than the depth limit all render as nothing.
#[derive(Debug, Clone, Copy)]
pub struct Reader<'a> {
    document: &'a Document,
    mode: RenderMode,
    max_depth: usize,
}

impl<'a> Reader<'a> {
    /// Creates an interactive reader.
    #[must_use]
    pub const fn new(document: &'a Document) -> Self {
        Self {
            document,
            mode: RenderMode::Interactive,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Sets the render mode.
    #[must_use]
    pub const fn mode(mut self, mode: RenderMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the depth limit.
    #[must_use]
    pub const fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Renders the block `root` and everything below it.
    #[must_use]
    pub fn render(&self, root: &str) -> Option<Element> {
        let mut path = HashSet::new();
        self.render_block(root, &mut path, 0)
    }

    fn render_block(
        &self,
        id: &str,
        path: &mut HashSet<&'a str>,
        depth: usize,
    ) -> Option<Element> {
        if depth > self.max_depth {
            debug!("Block '{}' exceeds depth limit {}", id, self.max_depth);
            return None;
        }
        if path.contains(id) {
            debug!("Block '{}' references an ancestor; skipping", id);
            return None;
        }
        let Some((key, block)) = self.document.entry(id) else {
            debug!("Block '{}' not found", id);
            return None;
        };
        let Some(rule) = registry::resolve(block.type_name()) else {
            debug!("Block '{}' has unknown type '{}'", id, block.type_name());
            return None;
        };

        path.insert(key.as_str());
        let slots: Vec<Vec<Node>> = block
            .child_slots()
            .into_iter()
            .map(|slot| {
                slot.iter()
                    .filter_map(|child| self.render_block(child.as_str(), path, depth + 1))
                    .map(Node::Element)
                    .collect()
            })
            .collect();
        path.remove(key.as_str());

        let mut element = rule(block, slots)?;
        if self.mode == RenderMode::Interactive {
            element.set_block_id(key.clone());
        }
        Some(element)
    }
}

/// Renders `root` of `document` in the given mode.
#[must_use]
pub fn render(document: &Document, root: &str, mode: RenderMode) -> Option<Element> {
    Reader::new(document).mode(mode).render(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Block;

    fn sample() -> Document {
        Document::from_blocks([
            ("root", Block::email_layout(["c1", "t3"])),
            ("c1", Block::container(["t1", "t2"])),
            ("t1", Block::text("one")),
            ("t2", Block::text("two")),
            ("t3", Block::text("three")),
        ])
    }

    #[test]
    fn test_interactive_attaches_ids_in_order() {
        let element = render(&sample(), "root", RenderMode::Interactive).unwrap_or_else(|| {
            panic!("root did not render");
        });
        assert_eq!(element.block_ids(), vec!["root", "c1", "t1", "t2", "t3"]);
    }

    #[test]
    fn test_static_has_no_ids() {
        let element = render(&sample(), "root", RenderMode::Static)
            .unwrap_or_else(|| panic!("root did not render"));
        assert!(element.block_ids().is_empty());
        assert!(!element.to_string().contains("data-block-id"));
    }

    #[test]
    fn test_missing_root_renders_nothing() {
        assert!(render(&sample(), "nope", RenderMode::Static).is_none());
    }

    #[test]
    fn test_cycle_terminates() {
        let document = Document::from_blocks([
            ("root", Block::email_layout(["a"])),
            ("a", Block::container(["b"])),
            ("b", Block::container(["a", "t"])),
            ("t", Block::text("leaf")),
        ]);
        let element = render(&document, "root", RenderMode::Interactive)
            .unwrap_or_else(|| panic!("root did not render"));
        assert_eq!(element.block_ids(), vec!["root", "a", "b", "t"]);
    }

    #[test]
    fn test_shared_child_renders_twice() {
        let document = Document::from_blocks([
            ("root", Block::email_layout(["t", "t"])),
            ("t", Block::text("again")),
        ]);
        let element = render(&document, "root", RenderMode::Static)
            .unwrap_or_else(|| panic!("root did not render"));
        assert_eq!(element.find_all("p").len(), 2);
    }

    #[test]
    fn test_depth_limit() {
        let mut blocks = vec![("root".to_string(), Block::email_layout(["n0"]))];
        for i in 0..10 {
            blocks.push((format!("n{i}"), Block::container([format!("n{}", i + 1)])));
        }
        let document = Document::from_blocks(blocks);

        let element = Reader::new(&document)
            .max_depth(3)
            .render("root")
            .unwrap_or_else(|| panic!("root did not render"));
        assert_eq!(element.block_ids(), vec!["root", "n0", "n1", "n2"]);
    }

    #[test]
    fn test_unknown_child_skipped() {
        let document = Document::from_blocks([
            ("root", Block::email_layout(["x", "t"])),
            (
                "x",
                Block::Unknown {
                    type_name: "Carousel".into(),
                    data: serde_json::Value::Null,
                },
            ),
            ("t", Block::text("kept")),
        ]);
        let element = render(&document, "root", RenderMode::Interactive)
            .unwrap_or_else(|| panic!("root did not render"));
        assert_eq!(element.block_ids(), vec!["root", "t"]);
    }
}
