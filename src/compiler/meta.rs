//! Metadata extraction from a parsed document.
//!
//! - **title**: `#+title:`, else the first heading, else empty
//! - **tags**: tags on the first heading
//! - **preview**: leading prose, collapsed and cut to [`PREVIEW_LEN`]
//! - **identifiers**: valid `ID` properties, with the heading they sit on

use crate::{
    data::Identifier,
    org::{BlockBody, Document, Inline, Node, plain_text},
};
use regex::Regex;
use rustc_hash::FxHashSet;
use std::sync::LazyLock;

/// Preview budget in bytes.
pub const PREVIEW_LEN: usize = 500;

/// Property holding a heading identifier.
const ID_PROPERTY: &str = "ID";

pub fn extract_title(doc: &Document) -> String {
    if let Some(title) = doc.keyword("TITLE") {
        return title.to_owned();
    }
    doc.headlines()
        .into_iter()
        .map(|h| h.title_text())
        .map(|t| t.trim().to_owned())
        .find(|t| !t.is_empty())
        .unwrap_or_default()
}

/// Tags of the first heading only; later headings never contribute.
pub fn extract_tags(doc: &Document) -> Vec<String> {
    doc.headlines()
        .first()
        .map(|h| h.tags.clone())
        .unwrap_or_default()
}

/// Identifiers declared on headings, paired with the 1-based ordinal of
/// the declaring heading. Each identifier appears once per document, at
/// its first declaration; invalid values are ignored.
pub fn extract_identifiers(doc: &Document) -> Vec<(Identifier, usize)> {
    let mut seen = FxHashSet::default();
    let mut ids = Vec::new();

    for headline in doc.headlines() {
        for value in headline.property_values(ID_PROPERTY) {
            if let Some(id) = Identifier::parse(value)
                && seen.insert(id.clone())
            {
                ids.push((id, headline.ordinal));
            }
        }
    }
    ids
}

// ============================================================================
// Preview
// ============================================================================

static SENTENCE_GAP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([.!?])([A-Za-z])").unwrap());

/// Build a plain-text preview of at most `max` bytes plus an ellipsis.
///
/// Text is gathered in document order until the budget is reached, so
/// long documents are not walked to the end.
pub fn extract_preview(doc: &Document, max: usize) -> String {
    let mut raw = String::new();
    collect_nodes(&doc.nodes, &mut raw, max);
    finish_preview(&raw, max)
}

/// Returns `true` once the budget is reached.
fn collect_nodes(nodes: &[Node], buf: &mut String, max: usize) -> bool {
    for node in nodes {
        let full = match node {
            Node::Headline(headline) => collect_nodes(&headline.children, buf, max),
            Node::Paragraph(inlines) => {
                let full = collect_inlines(inlines, buf, max);
                buf.push('\n');
                full
            }
            Node::List(list) => list
                .items
                .iter()
                .any(|item| collect_nodes(item, buf, max)),
            Node::Table(rows) => rows.iter().flatten().any(|cell| {
                let full = collect_inlines(cell, buf, max);
                buf.push(' ');
                full
            }),
            Node::Block(block) => {
                let full = match &block.body {
                    BlockBody::Raw(raw) => {
                        buf.push_str(raw);
                        buf.len() >= max
                    }
                    BlockBody::Nodes(children) => collect_nodes(children, buf, max),
                };
                buf.push(' ');
                full
            }
            Node::Rule => false,
        };
        if full || buf.len() >= max {
            return true;
        }
    }
    false
}

fn collect_inlines(inlines: &[Inline], buf: &mut String, max: usize) -> bool {
    for inline in inlines {
        match inline {
            Inline::Text(text) => buf.push_str(text),
            Inline::Link { url, description } => {
                let text = plain_text(description);
                let text = text.trim();
                buf.push_str(if text.is_empty() { url } else { text });
            }
            Inline::Emphasis { content, .. } => buf.push_str(plain_text(content).trim()),
        }
        if buf.len() >= max {
            return true;
        }
    }
    false
}

/// Space out glued sentences, collapse whitespace, and truncate.
///
/// The cut point backs off over non-ASCII bytes so a multibyte character
/// is never split.
fn finish_preview(raw: &str, max: usize) -> String {
    let spaced = SENTENCE_GAP.replace_all(raw, "$1 $2");
    let text = spaced.split_whitespace().collect::<Vec<_>>().join(" ");

    if text.len() <= max {
        return text;
    }
    let bytes = text.as_bytes();
    let mut cut = max;
    while cut > 0 && bytes[cut - 1] > 127 {
        cut -= 1;
    }
    format!("{}...", &text[..cut])
}
