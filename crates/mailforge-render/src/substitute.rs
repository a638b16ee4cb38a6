//! `{{placeholder}}` substitution.
//!
//! A token is `{{`, optional spaces, a name made of letters, digits, `_`, `.`
//! or `-`, optional spaces, then `}}`. Tokens whose name is not in the
//! recipient record are left as written.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::BuildHasher;
use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::block::Block;
use crate::document::Document;

/// Named string values for one recipient.
pub trait FieldSource {
    /// Returns the value of a field, if present.
    fn field(&self, name: &str) -> Option<&str>;
}

impl<S: BuildHasher> FieldSource for HashMap<String, String, S> {
    fn field(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl FieldSource for BTreeMap<String, String> {
    fn field(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl<T: FieldSource + ?Sized> FieldSource for &T {
    fn field(&self, name: &str) -> Option<&str> {
        (**self).field(name)
    }
}

fn token_pattern() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| {
        #[allow(clippy::expect_used)]
        Regex::new(r"\{\{\s*([A-Za-z0-9_.-]+)\s*\}\}").expect("token pattern is valid")
    })
}

/// Names of the tokens in `text`, in first-appearance order without repeats.
#[must_use]
pub fn tokens(text: &str) -> Vec<&str> {
    let mut seen = BTreeSet::new();
    token_pattern()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|name| name.as_str())
        .filter(|name| seen.insert(*name))
        .collect()
}

/// Replaces every token whose name the record knows.
#[must_use]
pub fn substitute<R: FieldSource + ?Sized>(template: &str, record: &R) -> String {
    token_pattern()
        .replace_all(template, |caps: &Captures<'_>| {
            record
                .field(&caps[1])
                .map_or_else(|| caps[0].to_string(), str::to_string)
        })
        .into_owned()
}

/// Returns a copy of the document with every text block substituted.
#[must_use]
pub fn personalize<R: FieldSource + ?Sized>(document: &Document, record: &R) -> Document {
    let mut personalized = document.clone();
    for block in personalized.blocks_mut() {
        if let Block::Text(data) = block {
            data.props.text = substitute(&data.props.text, record);
        }
    }
    personalized
}

impl Document {
    /// Token names used by text blocks, sorted.
    #[must_use]
    pub fn placeholders(&self) -> BTreeSet<String> {
        self.iter()
            .filter_map(|(_, block)| match block {
                Block::Text(data) => Some(data.props.text.as_str()),
                _ => None,
            })
            .flat_map(tokens)
            .map(str::to_string)
            .collect()
    }
}
