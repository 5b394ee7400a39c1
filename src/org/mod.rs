//! Org-mode document model.
//!
//! A small, forgiving parser for the subset of org syntax used by notes:
//! keywords, headings with tags and property drawers, lists, blocks,
//! tables, links and emphasis. Parsing never fails; unrecognized lines
//! end up as paragraph text.
//!
//! ```text
//! source ──► parse::parse() ──► Document ──► html::write()
//!                                  │               ▲
//!                                  │               └── LinkResolver (id: links)
//!                                  └── headlines() / keyword() (metadata)
//! ```

mod html;
mod inline;
mod parse;

pub use html::{LinkResolver, NoResolver};

/// A parsed org document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    /// `#+KEY: value` lines, keys upper-cased, in source order
    pub keywords: Vec<(String, String)>,
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Headline(Headline),
    Paragraph(Vec<Inline>),
    List(List),
    Block(Block),
    Table(Vec<Vec<Vec<Inline>>>),
    Rule,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Headline {
    pub level: usize,
    /// 1-based position among all headings of the document
    pub ordinal: usize,
    pub todo: Option<String>,
    pub title: Vec<Inline>,
    pub tags: Vec<String>,
    /// Property drawer entries; repeated keys are kept
    pub properties: Vec<(String, String)>,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct List {
    pub ordered: bool,
    pub items: Vec<Vec<Node>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// Lower-cased block name: `src`, `quote`, `example`, ...
    pub kind: String,
    pub parameters: String,
    pub body: BlockBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BlockBody {
    /// Verbatim content (src, example, export, verse)
    Raw(String),
    Nodes(Vec<Node>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emphasis {
    Bold,
    Italic,
    Underline,
    Strike,
    Verbatim,
    Code,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Text(String),
    Link {
        url: String,
        description: Vec<Inline>,
    },
    Emphasis {
        kind: Emphasis,
        content: Vec<Inline>,
    },
}

impl Document {
    pub fn parse(source: &str) -> Self {
        parse::parse(source)
    }

    /// First non-empty value of `#+NAME:` (case-insensitive).
    pub fn keyword(&self, name: &str) -> Option<&str> {
        self.keywords
            .iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
            .find(|value| !value.is_empty())
    }

    /// All headings in document order (pre-order).
    pub fn headlines(&self) -> Vec<&Headline> {
        let mut out = Vec::new();
        collect_headlines(&self.nodes, &mut out);
        out
    }

    /// Serialize to an HTML fragment, passing every link target through
    /// `resolver` first.
    pub fn to_html(&self, resolver: &dyn LinkResolver) -> String {
        html::write(&self.nodes, resolver)
    }
}

fn collect_headlines<'a>(nodes: &'a [Node], out: &mut Vec<&'a Headline>) {
    for node in nodes {
        if let Node::Headline(headline) = node {
            out.push(headline);
            collect_headlines(&headline.children, out);
        }
    }
}

impl Headline {
    /// Values of every property named exactly `name`.
    pub fn property_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> {
        self.properties
            .iter()
            .filter(move |(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn title_text(&self) -> String {
        plain_text(&self.title)
    }
}

/// Flatten inlines to their visible text; links without a description
/// contribute their target.
pub fn plain_text(inlines: &[Inline]) -> String {
    let mut out = String::new();
    push_plain_text(inlines, &mut out);
    out
}

fn push_plain_text(inlines: &[Inline], out: &mut String) {
    for inline in inlines {
        match inline {
            Inline::Text(text) => out.push_str(text),
            Inline::Link { url, description } if description.is_empty() => out.push_str(url),
            Inline::Link { description, .. } => push_plain_text(description, out),
            Inline::Emphasis { content, .. } => push_plain_text(content, out),
        }
    }
}
