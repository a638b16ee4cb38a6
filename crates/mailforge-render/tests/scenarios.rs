//! End-to-end rendering scenarios and renderer properties.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;

use mailforge_render::{
    Block, BlockId, Diagnostic, Document, RenderMode, emit, personalize, render, render_to_string,
};
use proptest::prelude::*;
use serde_json::json;

fn greeting_document() -> Document {
    Document::from_blocks([
        (BlockId::ROOT, Block::email_layout(["block-text"])),
        ("block-text", Block::text("Hello {{name}}")),
    ])
}

#[test]
fn layout_with_text_emits_paragraph_inside_canvas() {
    let html = emit(&greeting_document(), "root");

    assert!(html.starts_with("<!DOCTYPE html><html><body>"));
    assert!(html.contains(
        "<tbody><tr><td><p style=\"padding:16px 24px 16px 24px\">Hello {{name}}</p></td></tr></tbody>"
    ));
    assert!(html.contains("background-color:#F5F5F5"));
    assert!(html.contains("max-width:600px"));
    assert!(html.ends_with("</body></html>"));
}

#[test]
fn three_columns_render_three_equal_cells() {
    let document = Document::from_blocks([
        ("root", Block::email_layout(["cols"])),
        ("cols", Block::columns([vec!["a"], vec!["b"], vec!["c"]])),
        ("a", Block::text("A")),
        ("b", Block::text("B")),
        ("c", Block::text("C")),
    ]);
    let root = render(&document, "root", RenderMode::Static).unwrap();

    let columns = root
        .find_all("table")
        .into_iter()
        .find(|table| table.attribute("align").is_none())
        .unwrap();
    let cells = columns.find_all("td");
    assert_eq!(cells.len(), 3);
    for (cell, text) in cells.iter().zip(["A", "B", "C"]) {
        assert_eq!(cell.attribute("width"), Some("33.333333333333336%"));
        assert_eq!(cell.text_content(), text);
    }
}

#[test]
fn dangling_child_renders_empty_parent() {
    let document = Document::from_blocks([
        ("root", Block::email_layout(["box"])),
        ("box", Block::container(["ghost"])),
    ]);
    let fragment = render_to_string(&document, "root");
    assert!(fragment.contains("<td><div style=\"padding:0px 0px 0px 0px;border:none\"></div></td>"));
}

#[test]
fn personalized_values_are_escaped() {
    let record = HashMap::from([("name".to_string(), "<Ada & Co>".to_string())]);
    let html = emit(&personalize(&greeting_document(), &record), "root");
    assert!(html.contains("Hello &lt;Ada &amp; Co&gt;</p>"));
    assert!(!html.contains("{{name}}"));
}

#[test]
fn saved_document_round_trips() {
    let stored = json!({
        "root": {
            "type": "EmailLayout",
            "data": {
                "props": {
                    "backdropColor": "#F8F8F8",
                    "canvasColor": "#FFFFFF",
                    "textColor": "#242424",
                    "fontFamily": "BOOK_SANS",
                    "childrenIds": ["intro", "cta", "later"]
                }
            }
        },
        "intro": {
            "type": "Text",
            "data": {
                "style": {
                    "fontWeight": "bold",
                    "padding": { "top": 16.0, "right": 24.0, "bottom": 16.0, "left": 24.0 }
                },
                "props": { "text": "Hi {{name}}" }
            }
        },
        "cta": {
            "type": "Button",
            "data": { "props": { "label": "Shop now", "href": "https://example.com" } }
        },
        "later": {
            "type": "Image",
            "data": { "props": { "src": "https://example.com/a.png", "alt": "A", "url": "https://example.com" } }
        },
        "unused": { "type": "Spacer", "data": { "style": { "height": 24.0 }, "props": {} } }
    });

    let document = Document::load(&stored.to_string(), "root").unwrap();
    let saved: serde_json::Value = serde_json::from_str(&document.to_json().unwrap()).unwrap();
    assert_eq!(saved, stored);
    assert_eq!(Document::load(&document.to_json().unwrap(), "root").unwrap(), document);
}

#[test]
fn remove_leaves_no_dangling_references() {
    let mut document = Document::from_blocks([
        ("root", Block::email_layout(["box", "cols"])),
        ("box", Block::container(["t1", "t2"])),
        ("cols", Block::columns([vec!["t2"], vec!["t3"]])),
        ("t1", Block::text("one")),
        ("t2", Block::text("two")),
        ("t3", Block::text("three")),
    ]);

    document.remove("box").unwrap();
    assert!(document.validate("root").is_empty());
    assert!(document.contains("t2"));
    assert!(!document.contains("t1"));

    document.remove("t2").unwrap();
    let diagnostics = document.validate("root");
    assert!(
        diagnostics
            .iter()
            .all(|d| !matches!(d, Diagnostic::DanglingReference { .. })),
        "{diagnostics:?}"
    );
}

/// Builds a document from a generated shape.
///
/// Entry `i` becomes block `b{i}`; block 0 is the layout root. Child indices
/// past the end produce dangling references. With `forward_only`, children
/// only point at later blocks so the result is acyclic.
fn build(shape: &[(u8, Vec<usize>)], forward_only: bool) -> Document {
    let blocks = shape.iter().enumerate().map(|(i, (kind, kids))| {
        let children: Vec<String> = kids
            .iter()
            .map(|k| {
                if forward_only {
                    format!("b{}", i + 1 + k)
                } else {
                    format!("b{k}")
                }
            })
            .collect();
        let block = if i == 0 {
            Block::email_layout(children)
        } else {
            match kind {
                0 => Block::container(children),
                1 => {
                    let half = children.len() / 2;
                    Block::columns([children[..half].to_vec(), children[half..].to_vec()])
                }
                2 => Block::text(format!("text <{i}> & {{{{name}}}}")),
                3 => Block::divider(),
                4 => Block::Unknown {
                    type_name: "Carousel".to_string(),
                    data: json!({ "props": { "childrenIds": children } }),
                },
                _ => Block::spacer(8.0),
            }
        };
        (format!("b{i}"), block)
    });
    Document::from_blocks(blocks)
}

fn expected_order(document: &Document, id: &str, out: &mut Vec<String>) {
    let Some(block) = document.get(id) else {
        return;
    };
    if block.block_type().is_none() {
        return;
    }
    out.push(id.to_string());
    for child in block.children() {
        expected_order(document, child.as_str(), out);
    }
}

fn shape_strategy() -> impl Strategy<Value = Vec<(u8, Vec<usize>)>> {
    prop::collection::vec((0u8..6, prop::collection::vec(0usize..14, 0..4)), 1..12)
}

proptest! {
    #[test]
    fn render_terminates_on_any_graph(shape in shape_strategy()) {
        let document = build(&shape, false);
        let interactive = render(&document, "b0", RenderMode::Interactive);
        let html = emit(&document, "b0");

        prop_assert!(interactive.is_some());
        prop_assert!(html.starts_with("<!DOCTYPE html>"));
        prop_assert!(!html.contains("data-block-id"));
    }

    #[test]
    fn one_element_per_reachable_block_in_order(shape in shape_strategy()) {
        let document = build(&shape, true);
        let mut expected = Vec::new();
        expected_order(&document, "b0", &mut expected);

        let root = render(&document, "b0", RenderMode::Interactive).unwrap();
        let actual: Vec<String> = root.block_ids().into_iter().map(ToString::to_string).collect();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn rendering_is_idempotent(shape in shape_strategy()) {
        let document = build(&shape, false);
        let before = document.clone();
        prop_assert_eq!(emit(&document, "b0"), emit(&document, "b0"));
        prop_assert_eq!(document, before);
    }

    #[test]
    fn save_then_load_is_identity(shape in shape_strategy()) {
        let document = build(&shape, false);
        let json = document.to_json().unwrap();
        prop_assert_eq!(Document::load(&json, "b0").unwrap(), document);
    }
}
