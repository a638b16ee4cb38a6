//! Block registry: maps a block type tag to its render rule.
//!
//! A rule receives the block and its already rendered children, one list per
//! child slot, and builds the block's element. Rules are the same for the
//! interactive preview and the static markup.

use crate::block::{Block, BlockType};
use crate::element::{Element, Node};
use crate::style;

/// Builds the element for one block from its rendered child slots.
///
/// Returns `None` when the block's payload does not belong to the rule.
pub type RenderRule = fn(&Block, Vec<Vec<Node>>) -> Option<Element>;

/// Looks up the rule for a wire tag; unknown tags have none.
#[must_use]
pub fn resolve(tag: &str) -> Option<RenderRule> {
    BlockType::parse(tag).map(rule)
}

/// The rule for a known block type.
#[must_use]
pub fn rule(block_type: BlockType) -> RenderRule {
    match block_type {
        BlockType::EmailLayout => render_layout,
        BlockType::Container => render_container,
        BlockType::ColumnsContainer => render_columns,
        BlockType::Text => render_text,
        BlockType::Image => render_image,
        BlockType::Divider => render_divider,
        BlockType::Spacer => render_spacer,
    }
}

fn first_slot(slots: Vec<Vec<Node>>) -> Vec<Node> {
    slots.into_iter().next().unwrap_or_default()
}

fn render_layout(block: &Block, slots: Vec<Vec<Node>>) -> Option<Element> {
    let Block::EmailLayout(data) = block else {
        return None;
    };

    let cell = Element::new("td").children(first_slot(slots));
    let canvas = Element::new("table")
        .attr("align", "center")
        .attr("width", "100%")
        .attr("cellspacing", "0")
        .attr("cellpadding", "0")
        .style(style::layout_canvas(&data.props))
        .child(Element::new("tbody").child(Element::new("tr").child(cell)));

    Some(
        Element::new("div")
            .style(style::layout_backdrop(&data.props))
            .child(canvas),
    )
}

fn render_container(block: &Block, slots: Vec<Vec<Node>>) -> Option<Element> {
    let Block::Container(data) = block else {
        return None;
    };
    Some(
        Element::new("div")
            .style(style::container(&data.style))
            .children(first_slot(slots)),
    )
}

fn render_columns(block: &Block, slots: Vec<Vec<Node>>) -> Option<Element> {
    let Block::ColumnsContainer(data) = block else {
        return None;
    };

    // No slots means no cells, so the width is never read.
    let width = if slots.is_empty() {
        String::new()
    } else {
        #[allow(clippy::cast_precision_loss)]
        let share = 100.0 / slots.len() as f64;
        format!("{share}%")
    };
    let row = Element::new("tr").children(slots.into_iter().map(|column| {
        Element::new("td")
            .attr("width", width.clone())
            .attr("valign", "top")
            .children(column)
            .into()
    }));

    Some(
        Element::new("table")
            .attr("width", "100%")
            .style(style::columns(&data.style))
            .child(Element::new("tbody").child(row)),
    )
}

fn render_text(block: &Block, _slots: Vec<Vec<Node>>) -> Option<Element> {
    let Block::Text(data) = block else {
        return None;
    };

    let mut paragraph = Element::new("p").style(style::text(&data.style));
    for (i, line) in data.props.text.split('\n').enumerate() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if i > 0 {
            paragraph = paragraph.child(Element::new("br"));
        }
        if !line.is_empty() {
            paragraph = paragraph.child(Node::text(line));
        }
    }
    Some(paragraph)
}

fn render_image(block: &Block, _slots: Vec<Vec<Node>>) -> Option<Element> {
    let Block::Image(data) = block else {
        return None;
    };

    let mut image = Element::new("img")
        .attr("src", data.props.src.as_str())
        .attr("alt", data.props.alt.as_str());
    if let Some(width) = data.props.width {
        image = image.attr("width", width.to_string());
    }
    if let Some(height) = data.props.height {
        image = image.attr("height", height.to_string());
    }
    let image = image.style(style::image(&data.style, &data.props));

    Some(match &data.props.url {
        Some(url) => Element::new("a")
            .attr("href", url.as_str())
            .attr("target", "_blank")
            .child(image),
        None => image,
    })
}

fn render_divider(block: &Block, _slots: Vec<Vec<Node>>) -> Option<Element> {
    let Block::Divider(data) = block else {
        return None;
    };
    Some(Element::new("hr").style(style::divider(&data.style, &data.props)))
}

fn render_spacer(block: &Block, _slots: Vec<Vec<Node>>) -> Option<Element> {
    let Block::Spacer(data) = block else {
        return None;
    };
    Some(Element::new("div").style(style::spacer(&data.style)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(block: &Block, slots: Vec<Vec<Node>>) -> Element {
        let rule = resolve(block.type_name()).unwrap_or_else(|| panic!("no rule"));
        rule(block, slots).unwrap_or_else(|| panic!("rule rejected block"))
    }

    #[test]
    fn test_unknown_tag_has_no_rule() {
        assert!(resolve("Button").is_none());
        assert!(resolve("text").is_none());
        for ty in BlockType::ALL {
            assert!(resolve(ty.as_str()).is_some());
        }
    }

    #[test]
    fn test_rule_rejects_mismatched_block() {
        assert!(rule(BlockType::Text)(&Block::divider(), Vec::new()).is_none());
    }

    #[test]
    fn test_text_newlines_become_breaks() {
        let element = apply(&Block::text("one\ntwo"), Vec::new());
        assert_eq!(
            element.to_string(),
            "<p style=\"padding:16px 24px 16px 24px\">one<br/>two</p>"
        );
    }

    #[test]
    fn test_text_crlf_line_endings() {
        let element = apply(&Block::text("one\r\ntwo\r\n"), Vec::new());
        assert_eq!(
            element.to_string(),
            "<p style=\"padding:16px 24px 16px 24px\">one<br/>two<br/></p>"
        );
    }

    #[test]
    fn test_text_is_escaped() {
        let element = apply(&Block::text("<b>bold</b>"), Vec::new());
        assert!(element.to_string().contains("&lt;b&gt;bold&lt;/b&gt;"));
    }

    #[test]
    fn test_image_with_link() {
        let mut block = Block::image("https://example.com/a.png", "Logo");
        if let Block::Image(data) = &mut block {
            data.props.url = Some("https://example.com".into());
        }
        let element = apply(&block, Vec::new());
        assert_eq!(element.tag(), "a");
        assert_eq!(element.attribute("href"), Some("https://example.com"));
        let img = element.find_all("img");
        assert_eq!(img.len(), 1);
        assert_eq!(img[0].attribute("alt"), Some("Logo"));
        assert_eq!(img[0].declarations().get("display"), Some("block"));
    }

    #[test]
    fn test_columns_cell_widths() {
        let block = Block::columns::<&str>([vec![], vec![], vec![]]);
        let slots = vec![Vec::new(), vec![Node::text("x")], Vec::new()];
        let element = apply(&block, slots);

        let cells = element.find_all("td");
        assert_eq!(cells.len(), 3);
        for cell in cells {
            assert_eq!(cell.attribute("width"), Some("33.333333333333336%"));
            assert_eq!(cell.attribute("valign"), Some("top"));
        }
        assert_eq!(
            element.declarations().get("border-collapse"),
            Some("collapse")
        );
    }

    #[test]
    fn test_columns_without_slots() {
        let element = apply(&Block::columns::<&str>(Vec::new()), Vec::new());
        assert!(element.find_all("td").is_empty());
        assert!(!element.to_string().contains("inf"));
    }

    #[test]
    fn test_layout_structure() {
        let element = apply(
            &Block::email_layout::<&str>([]),
            vec![vec![Node::text("body")]],
        );
        assert_eq!(element.tag(), "div");
        let table = element.find_all("table");
        assert_eq!(table.len(), 1);
        assert_eq!(table[0].attribute("align"), Some("center"));
        assert_eq!(element.find_all("td")[0].text_content(), "body");
    }

    #[test]
    fn test_spacer_height() {
        let element = apply(&Block::spacer(24.0), Vec::new());
        assert_eq!(element.to_string(), "<div style=\"height:24px\"></div>");
    }
}
