//! Error types for document loading and editing.

use crate::block::BlockId;

/// Result type alias for document operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Document error types.
///
/// Rendering never produces these: dangling references, cycles and unknown
/// block types are recovered while rendering. These errors come from loading
/// a malformed document or from an edit that would break its structure.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Top-level value is not a mapping of block ids to blocks.
    #[error("Document must be a mapping of block ids to blocks")]
    NotAMapping,

    /// A block entry could not be decoded.
    #[error("Invalid block '{id}': {source}")]
    InvalidBlock {
        /// Id of the offending entry.
        id: String,
        /// Underlying decode error.
        source: serde_json::Error,
    },

    /// The declared root id is not present.
    #[error("Root block '{0}' not found in document")]
    MissingRoot(String),

    /// JSON syntax or encoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A block with this id already exists.
    #[error("Block id already in use: {0}")]
    DuplicateId(BlockId),

    /// No block with this id exists.
    #[error("Block not found: {0}")]
    UnknownBlock(BlockId),

    /// The target block cannot hold children in the requested way.
    #[error("Block '{id}' of type {block_type} cannot hold children here")]
    NotAContainer {
        /// Target block id.
        id: BlockId,
        /// Type tag of the target block.
        block_type: String,
    },

    /// The edit does not apply to this block type.
    #[error("Cannot {action} on block '{id}' of type {block_type}")]
    UnsupportedEdit {
        /// Target block id.
        id: BlockId,
        /// Type tag of the target block.
        block_type: String,
        /// What was attempted.
        action: &'static str,
    },

    /// Column index outside the columns container.
    #[error("Column {column} out of range for '{id}' ({columns} columns)")]
    ColumnOutOfRange {
        /// Columns container id.
        id: BlockId,
        /// Requested column.
        column: usize,
        /// Number of columns present.
        columns: usize,
    },

    /// A replacement block references an id that does not exist.
    #[error("Block '{parent}' references unknown child '{child}'")]
    UnknownChild {
        /// Block being edited.
        parent: BlockId,
        /// Missing child id.
        child: BlockId,
    },

    /// The edit would make a block its own ancestor.
    #[error("Edit to '{0}' would create a reference cycle")]
    WouldCreateCycle(BlockId),
}
