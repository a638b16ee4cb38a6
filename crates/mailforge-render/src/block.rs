//! Block types: the nodes of an email document.
//!
//! On the wire a block is `{"type": "<Tag>", "data": {"style": {..}, "props": {..}}}`.
//! In memory it is a closed [`Block`] enum with one typed payload per tag, plus
//! an [`Block::Unknown`] variant that keeps blocks written by newer editors
//! intact so they survive a load/save cycle.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifier of a block within one document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    /// Conventional id of the document root.
    pub const ROOT: &'static str = "root";

    /// Creates a block id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the conventional root id.
    #[must_use]
    pub fn root() -> Self {
        Self(Self::ROOT.to_string())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for BlockId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for BlockId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl PartialEq<str> for BlockId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for BlockId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// The closed vocabulary of block type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockType {
    /// Document root: backdrop, canvas and default typography.
    EmailLayout,
    /// Padded box holding a sequence of blocks.
    Container,
    /// Table row with one cell per column slot.
    ColumnsContainer,
    /// Paragraph of text.
    Text,
    /// Image, optionally linked.
    Image,
    /// Horizontal rule.
    Divider,
    /// Empty vertical space.
    Spacer,
}

impl BlockType {
    /// Every known block type.
    pub const ALL: [Self; 7] = [
        Self::EmailLayout,
        Self::Container,
        Self::ColumnsContainer,
        Self::Text,
        Self::Image,
        Self::Divider,
        Self::Spacer,
    ];

    /// Returns the wire tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EmailLayout => "EmailLayout",
            Self::Container => "Container",
            Self::ColumnsContainer => "ColumnsContainer",
            Self::Text => "Text",
            Self::Image => "Image",
            Self::Divider => "Divider",
            Self::Spacer => "Spacer",
        }
    }

    /// Looks up a wire tag. Tags are case-sensitive.
    #[must_use]
    pub fn parse(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ty| ty.as_str() == tag)
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Padding box in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Padding {
    /// Top padding.
    pub top: f64,
    /// Right padding.
    pub right: f64,
    /// Bottom padding.
    pub bottom: f64,
    /// Left padding.
    pub left: f64,
}

impl Padding {
    /// Creates a padding box in CSS order (top, right, bottom, left).
    #[must_use]
    pub const fn new(top: f64, right: f64, bottom: f64, left: f64) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    /// Same padding on every side.
    #[must_use]
    pub const fn uniform(value: f64) -> Self {
        Self::new(value, value, value, value)
    }
}

/// Font weight, either a keyword (`normal`, `bold`) or a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FontWeight {
    /// Numeric weight such as 400 or 700.
    Numeric(u16),
    /// Keyword weight.
    Keyword(String),
}

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    /// Left aligned.
    Left,
    /// Centered.
    Center,
    /// Right aligned.
    Right,
}

impl TextAlign {
    /// CSS keyword.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
        }
    }
}

/// Presentation attributes shared by all block types.
///
/// Every attribute is optional; the defaults for each block type live in
/// [`crate::style`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BlockStyle {
    /// Background color.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    /// Text color.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Padding box.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding: Option<Padding>,
    /// Border color; a 1px solid border is drawn when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
    /// Border radius in pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_radius: Option<f64>,
    /// Font size in pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    /// Font weight.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<FontWeight>,
    /// Text alignment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_align: Option<TextAlign>,
    /// Height in pixels (spacers).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

impl BlockStyle {
    /// Returns true if no attribute is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Sets the padding box.
    #[must_use]
    pub const fn with_padding(mut self, padding: Padding) -> Self {
        self.padding = Some(padding);
        self
    }

    /// Sets the background color.
    #[must_use]
    pub fn with_background(mut self, color: impl Into<String>) -> Self {
        self.background_color = Some(color.into());
        self
    }

    /// Sets the border color.
    #[must_use]
    pub fn with_border(mut self, color: impl Into<String>) -> Self {
        self.border_color = Some(color.into());
        self
    }

    /// Sets the height.
    #[must_use]
    pub const fn with_height(mut self, height: f64) -> Self {
        self.height = Some(height);
        self
    }
}

/// Style plus type-specific props of one block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "P: Deserialize<'de> + Default"))]
pub struct BlockData<P> {
    /// Presentation attributes.
    #[serde(default, skip_serializing_if = "BlockStyle::is_empty")]
    pub style: BlockStyle,
    /// Type-specific payload.
    #[serde(default)]
    pub props: P,
}

impl<P> BlockData<P> {
    /// Wraps props with an empty style.
    pub fn new(props: P) -> Self {
        Self {
            style: BlockStyle::default(),
            props,
        }
    }
}

/// Props of the root layout block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmailLayoutProps {
    /// Color behind the canvas.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backdrop_color: Option<String>,
    /// Color of the 600px canvas.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canvas_color: Option<String>,
    /// Default text color.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
    /// Font family key (`MODERN_SANS`, `BOOK_SANS`, `MODERN_SERIF`, `MONOSPACE`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    /// Canvas border color.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
    /// Canvas border radius in pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_radius: Option<f64>,
    /// Top-level blocks.
    pub children_ids: Vec<BlockId>,
}

/// Props of a container block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContainerProps {
    /// Nested blocks in order.
    pub children_ids: Vec<BlockId>,
}

/// Props of a columns container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnsContainerProps {
    /// One slot per column, each an ordered list of blocks.
    pub columns: Vec<Vec<BlockId>>,
}

/// Props of a text block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextProps {
    /// Text content, possibly with `{{placeholder}}` tokens.
    pub text: String,
}

/// Props of an image block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageProps {
    /// Image URL.
    pub src: String,
    /// Alternative text.
    pub alt: String,
    /// Link target; the image is wrapped in an anchor when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Width attribute in pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    /// Height attribute in pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

/// Props of a divider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DividerProps {
    /// Rule color.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_color: Option<String>,
    /// Rule thickness in pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_height: Option<f64>,
}

/// Props of a spacer (none).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpacerProps {}

/// One node of an email document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBlock", into = "RawBlock")]
pub enum Block {
    /// Root layout.
    EmailLayout(BlockData<EmailLayoutProps>),
    /// Padded container.
    Container(BlockData<ContainerProps>),
    /// Multi-column row.
    ColumnsContainer(BlockData<ColumnsContainerProps>),
    /// Text paragraph.
    Text(BlockData<TextProps>),
    /// Image.
    Image(BlockData<ImageProps>),
    /// Horizontal rule.
    Divider(BlockData<DividerProps>),
    /// Vertical space.
    Spacer(BlockData<SpacerProps>),
    /// A type tag outside the known vocabulary. Renders as nothing.
    Unknown {
        /// The unrecognized tag.
        type_name: String,
        /// Raw data, kept verbatim.
        data: Value,
    },
}

impl Block {
    /// Creates a root layout block with default colors.
    #[must_use]
    pub fn email_layout<I>(children: impl IntoIterator<Item = I>) -> Self
    where
        I: Into<BlockId>,
    {
        Self::EmailLayout(BlockData::new(EmailLayoutProps {
            children_ids: children.into_iter().map(Into::into).collect(),
            ..EmailLayoutProps::default()
        }))
    }

    /// Creates a container block.
    #[must_use]
    pub fn container<I>(children: impl IntoIterator<Item = I>) -> Self
    where
        I: Into<BlockId>,
    {
        Self::Container(BlockData::new(ContainerProps {
            children_ids: children.into_iter().map(Into::into).collect(),
        }))
    }

    /// Creates a columns container from column slots.
    #[must_use]
    pub fn columns<I>(columns: impl IntoIterator<Item = Vec<I>>) -> Self
    where
        I: Into<BlockId>,
    {
        Self::ColumnsContainer(BlockData::new(ColumnsContainerProps {
            columns: columns
                .into_iter()
                .map(|slot| slot.into_iter().map(Into::into).collect())
                .collect(),
        }))
    }

    /// Creates a text block.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(BlockData::new(TextProps { text: text.into() }))
    }

    /// Creates an image block.
    #[must_use]
    pub fn image(src: impl Into<String>, alt: impl Into<String>) -> Self {
        Self::Image(BlockData::new(ImageProps {
            src: src.into(),
            alt: alt.into(),
            ..ImageProps::default()
        }))
    }

    /// Creates a divider.
    #[must_use]
    pub fn divider() -> Self {
        Self::Divider(BlockData::default())
    }

    /// Creates a spacer of the given height.
    #[must_use]
    pub fn spacer(height: f64) -> Self {
        Self::Spacer(BlockData {
            style: BlockStyle::default().with_height(height),
            props: SpacerProps {},
        })
    }

    /// Replaces the style. No effect on unknown blocks.
    #[must_use]
    pub fn with_style(mut self, style: BlockStyle) -> Self {
        if let Some(current) = self.style_mut() {
            *current = style;
        }
        self
    }

    /// Returns the block type, or `None` for an unknown tag.
    #[must_use]
    pub const fn block_type(&self) -> Option<BlockType> {
        match self {
            Self::EmailLayout(_) => Some(BlockType::EmailLayout),
            Self::Container(_) => Some(BlockType::Container),
            Self::ColumnsContainer(_) => Some(BlockType::ColumnsContainer),
            Self::Text(_) => Some(BlockType::Text),
            Self::Image(_) => Some(BlockType::Image),
            Self::Divider(_) => Some(BlockType::Divider),
            Self::Spacer(_) => Some(BlockType::Spacer),
            Self::Unknown { .. } => None,
        }
    }

    /// Returns the wire tag, including unknown ones.
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            Self::Unknown { type_name, .. } => type_name,
            known => known.block_type().map_or("", BlockType::as_str),
        }
    }

    /// Returns the style of a known block.
    #[must_use]
    pub const fn style(&self) -> Option<&BlockStyle> {
        match self {
            Self::EmailLayout(data) => Some(&data.style),
            Self::Container(data) => Some(&data.style),
            Self::ColumnsContainer(data) => Some(&data.style),
            Self::Text(data) => Some(&data.style),
            Self::Image(data) => Some(&data.style),
            Self::Divider(data) => Some(&data.style),
            Self::Spacer(data) => Some(&data.style),
            Self::Unknown { .. } => None,
        }
    }

    /// Mutable access to the style of a known block.
    pub const fn style_mut(&mut self) -> Option<&mut BlockStyle> {
        match self {
            Self::EmailLayout(data) => Some(&mut data.style),
            Self::Container(data) => Some(&mut data.style),
            Self::ColumnsContainer(data) => Some(&mut data.style),
            Self::Text(data) => Some(&mut data.style),
            Self::Image(data) => Some(&mut data.style),
            Self::Divider(data) => Some(&mut data.style),
            Self::Spacer(data) => Some(&mut data.style),
            Self::Unknown { .. } => None,
        }
    }

    /// Returns the child id slots of this block.
    ///
    /// Layouts and containers have one slot, columns containers one slot per
    /// column, every other block none.
    #[must_use]
    pub fn child_slots(&self) -> Vec<&[BlockId]> {
        match self {
            Self::EmailLayout(data) => vec![data.props.children_ids.as_slice()],
            Self::Container(data) => vec![data.props.children_ids.as_slice()],
            Self::ColumnsContainer(data) => {
                data.props.columns.iter().map(Vec::as_slice).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Returns every child id in declaration order.
    #[must_use]
    pub fn children(&self) -> Vec<&BlockId> {
        self.child_slots().into_iter().flatten().collect()
    }

    /// Mutable access to every child id list.
    pub(crate) fn child_lists_mut(&mut self) -> Vec<&mut Vec<BlockId>> {
        match self {
            Self::EmailLayout(data) => vec![&mut data.props.children_ids],
            Self::Container(data) => vec![&mut data.props.children_ids],
            Self::ColumnsContainer(data) => data.props.columns.iter_mut().collect(),
            _ => Vec::new(),
        }
    }
}

/// Wire shape of a block, before the tag is resolved.
#[derive(Serialize, Deserialize)]
struct RawBlock {
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    data: Value,
}

impl TryFrom<RawBlock> for Block {
    type Error = serde_json::Error;

    fn try_from(raw: RawBlock) -> Result<Self, Self::Error> {
        let Some(block_type) = BlockType::parse(&raw.type_name) else {
            return Ok(Self::Unknown {
                type_name: raw.type_name,
                data: raw.data,
            });
        };

        let data = match raw.data {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };

        Ok(match block_type {
            BlockType::EmailLayout => Self::EmailLayout(layout_data(data)?),
            BlockType::Container => Self::Container(serde_json::from_value(data)?),
            BlockType::ColumnsContainer => Self::ColumnsContainer(serde_json::from_value(data)?),
            BlockType::Text => Self::Text(serde_json::from_value(data)?),
            BlockType::Image => Self::Image(serde_json::from_value(data)?),
            BlockType::Divider => Self::Divider(serde_json::from_value(data)?),
            BlockType::Spacer => Self::Spacer(serde_json::from_value(data)?),
        })
    }
}

/// Decodes layout data.
///
/// Early templates put the layout props directly on `data` instead of under
/// `data.props`; both shapes are accepted.
fn layout_data(data: Value) -> Result<BlockData<EmailLayoutProps>, serde_json::Error> {
    let flat = data
        .as_object()
        .is_some_and(|map| !map.contains_key("props") && !map.contains_key("style"));
    if flat {
        return Ok(BlockData::new(serde_json::from_value(data)?));
    }
    serde_json::from_value(data)
}

impl From<Block> for RawBlock {
    fn from(block: Block) -> Self {
        let type_name = block.type_name().to_string();
        let data = match block {
            Block::EmailLayout(data) => serde_json::to_value(data),
            Block::Container(data) => serde_json::to_value(data),
            Block::ColumnsContainer(data) => serde_json::to_value(data),
            Block::Text(data) => serde_json::to_value(data),
            Block::Image(data) => serde_json::to_value(data),
            Block::Divider(data) => serde_json::to_value(data),
            Block::Spacer(data) => serde_json::to_value(data),
            Block::Unknown { data, .. } => Ok(data),
        };
        Self {
            type_name,
            // Plain data structs always convert; Null only on a serializer bug.
            data: data.unwrap_or(Value::Null),
        }
    }
}
