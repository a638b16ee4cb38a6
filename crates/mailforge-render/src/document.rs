//! The email document: a flat mapping from block id to block.
//!
//! Parent/child structure lives in the blocks' child id lists. The mapping
//! itself is ordered by id so serialization is deterministic; the order of
//! entries carries no meaning.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::block::{Block, BlockData, BlockId, BlockStyle, BlockType, Padding, TextProps};
use crate::error::{Error, Result};

/// An email document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    blocks: BTreeMap<BlockId, Block>,
}

impl Document {
    /// Creates an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a document from `(id, block)` pairs without any checks.
    ///
    /// Later entries replace earlier ones with the same id.
    #[must_use]
    pub fn from_blocks<I, K>(blocks: I) -> Self
    where
        I: IntoIterator<Item = (K, Block)>,
        K: Into<BlockId>,
    {
        Self {
            blocks: blocks.into_iter().map(|(id, b)| (id.into(), b)).collect(),
        }
    }

    /// The template a new campaign starts from: a layout with one greeting paragraph.
    #[must_use]
    pub fn starter() -> Self {
        let mut layout = Block::email_layout(["block-text"]);
        if let Block::EmailLayout(data) = &mut layout {
            data.props.backdrop_color = Some("#F8F8F8".to_string());
            data.props.canvas_color = Some("#FFFFFF".to_string());
            data.props.text_color = Some("#242424".to_string());
            data.props.font_family = Some("MODERN_SANS".to_string());
        }
        let text = Block::Text(BlockData {
            style: BlockStyle::default().with_padding(Padding::new(16.0, 24.0, 16.0, 24.0)),
            props: TextProps {
                text: "Hello {{name}},\n\nThis is your email content.".to_string(),
            },
        });
        Self::from_blocks([(BlockId::ROOT, layout), ("block-text", text)])
    }

    /// Parses a document from JSON without checking for a root.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not JSON, not an object, or if any
    /// entry is not a well-formed block.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Converts an already parsed JSON value into a document.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not an object or an entry is malformed.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(entries) = value else {
            return Err(Error::NotAMapping);
        };

        let mut blocks = BTreeMap::new();
        for (id, raw) in entries {
            let block = serde_json::from_value(raw)
                .map_err(|source| Error::InvalidBlock {
                    id: id.clone(),
                    source,
                })?;
            blocks.insert(BlockId::new(id), block);
        }
        Ok(Self { blocks })
    }

    /// Loads a document and checks that the declared root exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed or the root is missing.
    pub fn load(json: &str, root: &str) -> Result<Self> {
        let document = Self::from_json(json)?;
        document.require_root(root)?;
        Ok(document)
    }

    /// Serializes the document to compact JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serializes the document to indented JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Returns the root block.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingRoot`] if no block has the given id.
    pub fn require_root(&self, root: &str) -> Result<&Block> {
        self.blocks
            .get(root)
            .ok_or_else(|| Error::MissingRoot(root.to_string()))
    }

    /// Looks up a block.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Block> {
        self.blocks.get(id)
    }

    /// Looks up a block along with the stored id.
    #[must_use]
    pub fn entry(&self, id: &str) -> Option<(&BlockId, &Block)> {
        self.blocks.get_key_value(id)
    }

    /// Returns true if a block with this id exists.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.blocks.contains_key(id)
    }

    /// Number of blocks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Returns true if the document has no blocks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Iterates over all blocks in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&BlockId, &Block)> {
        self.blocks.iter()
    }

    pub(crate) fn blocks_mut(&mut self) -> impl Iterator<Item = &mut Block> {
        self.blocks.values_mut()
    }

    /// Child ids of a block, or an empty list if it is missing or a leaf.
    #[must_use]
    pub fn children_of(&self, id: &str) -> Vec<&BlockId> {
        self.blocks.get(id).map(Block::children).unwrap_or_default()
    }

    /// Adds a detached block.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is taken, or if the block references a
    /// missing child or one of its own ancestors.
    pub fn insert(&mut self, id: impl Into<BlockId>, block: Block) -> Result<()> {
        let id = id.into();
        if self.blocks.contains_key(&id) {
            return Err(Error::DuplicateId(id));
        }
        self.check_children(&id, &block)?;
        self.blocks.insert(id, block);
        Ok(())
    }

    /// Adds a block and appends it to the children of a layout or container.
    ///
    /// The document is unchanged if the edit fails.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent is missing or is not a layout/container,
    /// or if the new block cannot be inserted.
    pub fn append_child(
        &mut self,
        parent: &str,
        id: impl Into<BlockId>,
        block: Block,
    ) -> Result<()> {
        let id = id.into();
        match self.blocks.get(parent) {
            None => return Err(Error::UnknownBlock(parent.into())),
            Some(Block::EmailLayout(_) | Block::Container(_)) => {}
            Some(other) => {
                return Err(Error::NotAContainer {
                    id: parent.into(),
                    block_type: other.type_name().to_string(),
                });
            }
        }
        self.check_attach(parent, &id, &block)?;
        self.insert(id.clone(), block)?;

        if let Some(Block::EmailLayout(data)) = self.blocks.get_mut(parent) {
            data.props.children_ids.push(id);
        } else if let Some(Block::Container(data)) = self.blocks.get_mut(parent) {
            data.props.children_ids.push(id);
        }
        Ok(())
    }

    /// Adds a block and appends it to one column of a columns container.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent is missing, is not a columns container,
    /// the column does not exist, or the new block cannot be inserted.
    pub fn append_to_column(
        &mut self,
        parent: &str,
        column: usize,
        id: impl Into<BlockId>,
        block: Block,
    ) -> Result<()> {
        let id = id.into();
        let columns = match self.blocks.get(parent) {
            None => return Err(Error::UnknownBlock(parent.into())),
            Some(Block::ColumnsContainer(data)) => data.props.columns.len(),
            Some(other) => {
                return Err(Error::NotAContainer {
                    id: parent.into(),
                    block_type: other.type_name().to_string(),
                });
            }
        };
        if column >= columns {
            return Err(Error::ColumnOutOfRange {
                id: parent.into(),
                column,
                columns,
            });
        }
        self.check_attach(parent, &id, &block)?;
        self.insert(id.clone(), block)?;

        if let Some(Block::ColumnsContainer(data)) = self.blocks.get_mut(parent) {
            data.props.columns[column].push(id);
        }
        Ok(())
    }

    /// Replaces the text of a text block.
    ///
    /// # Errors
    ///
    /// Returns an error if the block is missing or not a text block.
    pub fn set_text(&mut self, id: &str, text: impl Into<String>) -> Result<()> {
        match self.blocks.get_mut(id) {
            None => Err(Error::UnknownBlock(id.into())),
            Some(Block::Text(data)) => {
                data.props.text = text.into();
                Ok(())
            }
            Some(other) => Err(Error::UnsupportedEdit {
                id: id.into(),
                block_type: other.type_name().to_string(),
                action: "set text",
            }),
        }
    }

    /// Replaces the style of a block.
    ///
    /// # Errors
    ///
    /// Returns an error if the block is missing or of an unknown type.
    pub fn set_style(&mut self, id: &str, style: BlockStyle) -> Result<()> {
        let Some(block) = self.blocks.get_mut(id) else {
            return Err(Error::UnknownBlock(id.into()));
        };
        let type_name = block.type_name().to_string();
        let Some(current) = block.style_mut() else {
            return Err(Error::UnsupportedEdit {
                id: id.into(),
                block_type: type_name,
                action: "set style",
            });
        };
        *current = style;
        Ok(())
    }

    /// Replaces a block wholesale and returns the previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the block is missing, or the replacement references
    /// a missing child or one of its own ancestors.
    pub fn replace(&mut self, id: &str, block: Block) -> Result<Block> {
        let Some((key, _)) = self.blocks.get_key_value(id) else {
            return Err(Error::UnknownBlock(id.into()));
        };
        let key = key.clone();
        self.check_children(&key, &block)?;
        self.blocks
            .insert(key.clone(), block)
            .ok_or(Error::UnknownBlock(key))
    }

    /// Edits a block in place through a closure.
    ///
    /// The closure works on a copy; the edit is committed only if the result
    /// still references existing children without forming a cycle.
    ///
    /// # Errors
    ///
    /// Returns an error if the block is missing or the edited block is rejected.
    pub fn update_data<F>(&mut self, id: &str, edit: F) -> Result<()>
    where
        F: FnOnce(&mut Block),
    {
        let Some((key, block)) = self.blocks.get_key_value(id) else {
            return Err(Error::UnknownBlock(id.into()));
        };
        let key = key.clone();
        let mut edited = block.clone();
        edit(&mut edited);
        self.check_children(&key, &edited)?;
        self.blocks.insert(key, edited);
        Ok(())
    }

    /// Removes a block together with every descendant that nothing else
    /// references, and strips all references to the removed ids.
    ///
    /// Removing the root leaves a document that no longer loads.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownBlock`] if the block does not exist.
    pub fn remove(&mut self, id: &str) -> Result<Vec<BlockId>> {
        if !self.blocks.contains_key(id) {
            return Err(Error::UnknownBlock(id.into()));
        }

        let mut doomed = self.reachable_from(id);

        // Descendants still referenced from outside the removed subtree survive,
        // along with everything below them.
        let mut kept: Vec<BlockId> = self
            .blocks
            .iter()
            .filter(|(key, _)| !doomed.contains(*key))
            .flat_map(|(_, block)| block.children())
            .filter(|child| child.as_str() != id && doomed.contains(*child))
            .cloned()
            .collect();
        while let Some(survivor) = kept.pop() {
            if !doomed.remove(&survivor) {
                continue;
            }
            if let Some(block) = self.blocks.get(&survivor) {
                kept.extend(
                    block
                        .children()
                        .into_iter()
                        .filter(|child| child.as_str() != id && doomed.contains(*child))
                        .cloned(),
                );
            }
        }

        for removed in &doomed {
            self.blocks.remove(removed);
        }
        for block in self.blocks.values_mut() {
            for list in block.child_lists_mut() {
                list.retain(|child| !doomed.contains(child));
            }
        }

        debug!("Removed {} block(s) starting at '{}'", doomed.len(), id);
        Ok(doomed.into_iter().collect())
    }

    /// Ids reachable from `root` through child lists, `root` included.
    ///
    /// Missing references are skipped and cycles are followed only once.
    #[must_use]
    pub fn reachable_from(&self, root: &str) -> BTreeSet<BlockId> {
        let mut seen = BTreeSet::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some((key, block)) = self.blocks.get_key_value(id) else {
                continue;
            };
            if !seen.insert(key.clone()) {
                continue;
            }
            stack.extend(block.children().into_iter().map(BlockId::as_str));
        }
        seen
    }

    /// Drops every block not reachable from `root` and returns the dropped ids.
    pub fn prune_unreachable(&mut self, root: &str) -> Vec<BlockId> {
        let reachable = self.reachable_from(root);
        let unreachable: Vec<BlockId> = self
            .blocks
            .keys()
            .filter(|id| !reachable.contains(*id))
            .cloned()
            .collect();
        for id in &unreachable {
            self.blocks.remove(id);
        }
        unreachable
    }

    /// Checks the structure below `root` and reports every problem found.
    ///
    /// None of these problems stop rendering; they are reported so an editor
    /// can show them.
    #[must_use]
    pub fn validate(&self, root: &str) -> Vec<Diagnostic> {
        #[derive(Clone, Copy)]
        enum Mark {
            Visiting,
            Done,
        }

        struct Frame<'a> {
            id: &'a BlockId,
            children: Vec<&'a BlockId>,
            next: usize,
        }

        let mut diagnostics = Vec::new();
        let Some((root_id, root_block)) = self.blocks.get_key_value(root) else {
            diagnostics.push(Diagnostic::MissingRoot(root.into()));
            return diagnostics;
        };
        match root_block.block_type() {
            Some(BlockType::EmailLayout) => {}
            Some(_) => diagnostics.push(Diagnostic::RootNotLayout {
                root: root_id.clone(),
                found: root_block.type_name().to_string(),
            }),
            None => diagnostics.push(Diagnostic::UnknownType {
                id: root_id.clone(),
                type_name: root_block.type_name().to_string(),
            }),
        }

        let mut marks: HashMap<&str, Mark> = HashMap::new();
        marks.insert(root_id.as_str(), Mark::Visiting);
        let mut stack = vec![Frame {
            id: root_id,
            children: root_block.children(),
            next: 0,
        }];

        while let Some(frame) = stack.last_mut() {
            let Some(child) = frame.children.get(frame.next).copied() else {
                marks.insert(frame.id.as_str(), Mark::Done);
                stack.pop();
                continue;
            };
            frame.next += 1;
            let parent = frame.id;

            match marks.get(child.as_str()) {
                Some(Mark::Visiting) => diagnostics.push(Diagnostic::Cycle {
                    parent: parent.clone(),
                    child: child.clone(),
                }),
                Some(Mark::Done) => {}
                None => match self.blocks.get_key_value(child.as_str()) {
                    None => diagnostics.push(Diagnostic::DanglingReference {
                        parent: parent.clone(),
                        child: child.clone(),
                    }),
                    Some((key, block)) => {
                        if block.block_type().is_none() {
                            diagnostics.push(Diagnostic::UnknownType {
                                id: key.clone(),
                                type_name: block.type_name().to_string(),
                            });
                        }
                        marks.insert(key.as_str(), Mark::Visiting);
                        stack.push(Frame {
                            id: key,
                            children: block.children(),
                            next: 0,
                        });
                    }
                },
            }
        }

        diagnostics.extend(
            self.blocks
                .keys()
                .filter(|id| !marks.contains_key(id.as_str()))
                .cloned()
                .map(Diagnostic::Unreachable),
        );
        diagnostics
    }

    /// Rejects a block whose children are missing or would lead back to `id`.
    /// Rejects attaching `block` under `parent` when its subtree already
    /// reaches `parent`.
    fn check_attach(&self, parent: &str, id: &BlockId, block: &Block) -> Result<()> {
        let closes_loop = block
            .children()
            .into_iter()
            .any(|child| child == parent || self.reachable_from(child.as_str()).contains(parent));
        if closes_loop {
            return Err(Error::WouldCreateCycle(id.clone()));
        }
        Ok(())
    }

    fn check_children(&self, id: &BlockId, block: &Block) -> Result<()> {
        for child in block.children() {
            if child == id {
                return Err(Error::WouldCreateCycle(id.clone()));
            }
            if !self.blocks.contains_key(child) {
                return Err(Error::UnknownChild {
                    parent: id.clone(),
                    child: child.clone(),
                });
            }
            if self.reachable_from(child.as_str()).contains(id) {
                return Err(Error::WouldCreateCycle(id.clone()));
            }
        }
        Ok(())
    }
}

/// A structural problem found by [`Document::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// The declared root is absent.
    MissingRoot(BlockId),
    /// The root is not an `EmailLayout`.
    RootNotLayout {
        /// Root id.
        root: BlockId,
        /// Actual type tag.
        found: String,
    },
    /// A child id that names no block.
    DanglingReference {
        /// Referencing block.
        parent: BlockId,
        /// Missing id.
        child: BlockId,
    },
    /// A child id that is also an ancestor.
    Cycle {
        /// Referencing block.
        parent: BlockId,
        /// Ancestor referenced again.
        child: BlockId,
    },
    /// A reachable block with an unrecognized type tag.
    UnknownType {
        /// Block id.
        id: BlockId,
        /// The tag.
        type_name: String,
    },
    /// A block that is never rendered from the root.
    Unreachable(BlockId),
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingRoot(root) => write!(f, "root block '{root}' is missing"),
            Self::RootNotLayout { root, found } => {
                write!(f, "root block '{root}' is a {found}, expected EmailLayout")
            }
            Self::DanglingReference { parent, child } => {
                write!(f, "'{parent}' references missing block '{child}'")
            }
            Self::Cycle { parent, child } => {
                write!(f, "'{parent}' references its ancestor '{child}'")
            }
            Self::UnknownType { id, type_name } => {
                write!(f, "'{id}' has unknown type '{type_name}'")
            }
            Self::Unreachable(id) => write!(f, "'{id}' is not reachable from the root"),
        }
    }
}
