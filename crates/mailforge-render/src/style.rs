//! Style resolution: declared block styles to ordered inline CSS.
//!
//! Each block type has one resolution function that applies that type's
//! defaults. The output order is fixed so that rendering is deterministic.

use std::fmt;

use tracing::debug;

use crate::block::{
    BlockStyle, DividerProps, EmailLayoutProps, FontWeight, ImageProps, Padding, TextAlign,
};

/// Default backdrop color of the layout.
pub const DEFAULT_BACKDROP: &str = "#F5F5F5";
/// Default canvas color of the layout.
pub const DEFAULT_CANVAS: &str = "#FFFFFF";
/// Default text color of the layout.
pub const DEFAULT_TEXT_COLOR: &str = "#262626";
/// Default divider color.
pub const DEFAULT_RULE_COLOR: &str = "#CCCCCC";
/// Default spacer height in pixels.
pub const DEFAULT_SPACER_HEIGHT: f64 = 16.0;
/// Default text padding.
pub const DEFAULT_TEXT_PADDING: Padding = Padding::new(16.0, 24.0, 16.0, 24.0);

/// An ordered list of CSS declarations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Declarations(Vec<(&'static str, String)>);

impl Declarations {
    /// Creates an empty declaration list.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends a declaration.
    ///
    /// Values that could close the declaration or the attribute early
    /// (`;`, `{`, `}`) are dropped.
    pub fn push(&mut self, property: &'static str, value: impl Into<String>) {
        let value = value.into();
        if value.contains([';', '{', '}']) {
            debug!("Dropping unsafe value for '{}': {:?}", property, value);
            return;
        }
        self.0.push((property, value));
    }

    /// Appends a declaration if a value is present.
    pub fn push_opt<V: Into<String>>(&mut self, property: &'static str, value: Option<V>) {
        if let Some(value) = value {
            self.push(property, value);
        }
    }

    /// Looks up the value of a property.
    #[must_use]
    pub fn get(&self, property: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(name, _)| *name == property)
            .map(|(_, value)| value.as_str())
    }

    /// Returns true if there are no declarations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over `(property, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(name, value)| (*name, value.as_str()))
    }
}

impl fmt::Display for Declarations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (property, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            write!(f, "{property}:{value}")?;
        }
        Ok(())
    }
}

/// Font stacks selectable on the layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FontFamily {
    /// Helvetica-like sans serif.
    #[default]
    ModernSans,
    /// Humanist sans serif.
    BookSans,
    /// Transitional serif.
    ModernSerif,
    /// Fixed width.
    Monospace,
}

impl FontFamily {
    /// Resolves a font key; unknown or missing keys fall back to `MODERN_SANS`.
    #[must_use]
    pub fn resolve(key: Option<&str>) -> Self {
        match key {
            Some("BOOK_SANS") => Self::BookSans,
            Some("MODERN_SERIF") => Self::ModernSerif,
            Some("MONOSPACE") => Self::Monospace,
            Some("MODERN_SANS") | None => Self::ModernSans,
            Some(other) => {
                debug!("Unknown font family '{}', using MODERN_SANS", other);
                Self::ModernSans
            }
        }
    }

    /// The CSS font stack.
    #[must_use]
    pub const fn stack(self) -> &'static str {
        match self {
            Self::ModernSans => "\"Helvetica Neue\", Arial, sans-serif",
            Self::BookSans => "Optima, Candara, sans-serif",
            Self::ModernSerif => "Charter, Cambria, serif",
            Self::Monospace => "\"Courier New\", monospace",
        }
    }
}

/// Formats a pixel length.
#[must_use]
pub fn px(value: f64) -> String {
    format!("{value}px")
}

fn padding(box_: Padding) -> String {
    format!(
        "{} {} {} {}",
        px(box_.top),
        px(box_.right),
        px(box_.bottom),
        px(box_.left)
    )
}

fn border(color: Option<&str>) -> Option<String> {
    color.map(|color| format!("1px solid {color}"))
}

fn font_weight(weight: &FontWeight) -> String {
    match weight {
        FontWeight::Numeric(n) => n.to_string(),
        FontWeight::Keyword(k) => k.clone(),
    }
}

/// Typography and color shared by text-bearing blocks.
fn typography(style: &BlockStyle, out: &mut Declarations) {
    out.push_opt("color", style.color.as_deref());
    out.push_opt("background-color", style.background_color.as_deref());
    out.push_opt("font-size", style.font_size.map(px));
    out.push_opt("font-weight", style.font_weight.as_ref().map(font_weight));
    out.push_opt("text-align", style.text_align.map(TextAlign::as_str));
}

/// Text: typography plus padding, `16px 24px 16px 24px` when unset.
#[must_use]
pub fn text(style: &BlockStyle) -> Declarations {
    let mut out = Declarations::new();
    typography(style, &mut out);
    out.push("padding", padding(style.padding.unwrap_or(DEFAULT_TEXT_PADDING)));
    out.push_opt("border", border(style.border_color.as_deref()));
    out.push_opt("border-radius", style.border_radius.map(px));
    out
}

/// Container: padding 0 on each side by default, border none unless colored.
#[must_use]
pub fn container(style: &BlockStyle) -> Declarations {
    let mut out = Declarations::new();
    out.push_opt("background-color", style.background_color.as_deref());
    out.push_opt("color", style.color.as_deref());
    out.push("padding", padding(style.padding.unwrap_or_default()));
    out.push_opt("border-radius", style.border_radius.map(px));
    out.push(
        "border",
        border(style.border_color.as_deref()).unwrap_or_else(|| "none".to_string()),
    );
    out.push_opt("text-align", style.text_align.map(TextAlign::as_str));
    out
}

/// Columns container table.
#[must_use]
pub fn columns(style: &BlockStyle) -> Declarations {
    let mut out = Declarations::new();
    out.push("border-collapse", "collapse");
    out.push_opt("background-color", style.background_color.as_deref());
    out.push_opt("padding", style.padding.map(padding));
    out.push_opt("border", border(style.border_color.as_deref()));
    out.push_opt("border-radius", style.border_radius.map(px));
    out
}

/// Image: block display with link decorations removed.
#[must_use]
pub fn image(style: &BlockStyle, props: &ImageProps) -> Declarations {
    let mut out = Declarations::new();
    out.push("display", "block");
    out.push("outline", "none");
    out.push(
        "border",
        border(style.border_color.as_deref()).unwrap_or_else(|| "none".to_string()),
    );
    out.push("text-decoration", "none");
    out.push("max-width", "100%");
    out.push_opt("width", props.width.map(px));
    out.push_opt("height", props.height.map(px));
    out.push_opt("background-color", style.background_color.as_deref());
    out.push_opt("padding", style.padding.map(padding));
    out.push_opt("border-radius", style.border_radius.map(px));
    out
}

/// Divider: a single top border, `1px solid #CCCCCC` by default.
#[must_use]
pub fn divider(style: &BlockStyle, props: &DividerProps) -> Declarations {
    let mut out = Declarations::new();
    out.push("border", "none");
    out.push(
        "border-top",
        format!(
            "{} solid {}",
            px(props.line_height.unwrap_or(1.0)),
            props.line_color.as_deref().unwrap_or(DEFAULT_RULE_COLOR)
        ),
    );
    out.push("margin", "0");
    out.push_opt("padding", style.padding.map(padding));
    out.push_opt("background-color", style.background_color.as_deref());
    out
}

/// Spacer: height only, 16px by default.
#[must_use]
pub fn spacer(style: &BlockStyle) -> Declarations {
    let mut out = Declarations::new();
    out.push("height", px(style.height.unwrap_or(DEFAULT_SPACER_HEIGHT)));
    out.push_opt("background-color", style.background_color.as_deref());
    out
}

/// Outer backdrop `<div>` of the layout.
#[must_use]
pub fn layout_backdrop(props: &EmailLayoutProps) -> Declarations {
    let mut out = Declarations::new();
    out.push(
        "background-color",
        props.backdrop_color.as_deref().unwrap_or(DEFAULT_BACKDROP),
    );
    out.push(
        "color",
        props.text_color.as_deref().unwrap_or(DEFAULT_TEXT_COLOR),
    );
    out.push(
        "font-family",
        FontFamily::resolve(props.font_family.as_deref()).stack(),
    );
    out.push("font-size", "16px");
    out.push("font-weight", "400");
    out.push("line-height", "1.5");
    out.push("margin", "0");
    out.push("padding", "32px 0");
    out.push("min-height", "100%");
    out.push("width", "100%");
    out
}

/// Centered 600px canvas table of the layout.
#[must_use]
pub fn layout_canvas(props: &EmailLayoutProps) -> Declarations {
    let mut out = Declarations::new();
    out.push("margin", "0 auto");
    out.push("max-width", "600px");
    out.push(
        "background-color",
        props.canvas_color.as_deref().unwrap_or(DEFAULT_CANVAS),
    );
    out.push_opt("border-radius", props.border_radius.map(px));
    out.push_opt("border", border(props.border_color.as_deref()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_default_padding() {
        let decls = text(&BlockStyle::default());
        assert_eq!(decls.to_string(), "padding:16px 24px 16px 24px");
    }

    #[test]
    fn test_text_declared_style() {
        let style = BlockStyle {
            color: Some("#111111".into()),
            font_size: Some(14.0),
            font_weight: Some(FontWeight::Keyword("bold".into())),
            text_align: Some(TextAlign::Center),
            padding: Some(Padding::uniform(8.0)),
            ..BlockStyle::default()
        };
        assert_eq!(
            text(&style).to_string(),
            "color:#111111;font-size:14px;font-weight:bold;text-align:center;padding:8px 8px 8px 8px"
        );
    }

    #[test]
    fn test_container_defaults() {
        let decls = container(&BlockStyle::default());
        assert_eq!(decls.get("padding"), Some("0px 0px 0px 0px"));
        assert_eq!(decls.get("border"), Some("none"));

        let bordered = container(&BlockStyle::default().with_border("#DDDDDD"));
        assert_eq!(bordered.get("border"), Some("1px solid #DDDDDD"));
    }

    #[test]
    fn test_divider_and_spacer_defaults() {
        let rule = divider(&BlockStyle::default(), &DividerProps::default());
        assert_eq!(rule.to_string(), "border:none;border-top:1px solid #CCCCCC;margin:0");
        assert_eq!(spacer(&BlockStyle::default()).get("height"), Some("16px"));
        assert_eq!(
            spacer(&BlockStyle::default().with_height(40.0)).get("height"),
            Some("40px")
        );
    }

    #[test]
    fn test_layout_defaults() {
        let props = EmailLayoutProps::default();
        let backdrop = layout_backdrop(&props);
        assert_eq!(backdrop.get("background-color"), Some(DEFAULT_BACKDROP));
        assert_eq!(backdrop.get("color"), Some(DEFAULT_TEXT_COLOR));
        assert_eq!(
            backdrop.get("font-family"),
            Some("\"Helvetica Neue\", Arial, sans-serif")
        );
        let canvas = layout_canvas(&props);
        assert_eq!(canvas.get("max-width"), Some("600px"));
        assert_eq!(canvas.get("border"), None);
    }

    #[test]
    fn test_font_family_fallback() {
        assert_eq!(FontFamily::resolve(Some("MONOSPACE")), FontFamily::Monospace);
        assert_eq!(FontFamily::resolve(Some("COMIC")), FontFamily::ModernSans);
        assert_eq!(FontFamily::resolve(None), FontFamily::ModernSans);
    }

    #[test]
    fn test_unsafe_values_dropped() {
        let style = BlockStyle::default().with_background("red;position:fixed");
        assert_eq!(container(&style).get("background-color"), None);
    }
}
