//! Per-document data produced by discovery.

use super::Identifier;
use crate::{org::Document, utils::path::html_path};
use serde::Serialize;
use std::{sync::Arc, time::SystemTime};

/// Where an identifier points: a document and the 1-based ordinal of the
/// heading that declares it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderLocation {
    /// Slash-separated path relative to the content root
    pub path: String,
    pub ordinal: usize,
}

/// Metadata extracted from one source document.
///
/// Shared via `Arc` between the tag index, the site index and the
/// document's own page; serialized as-is into template contexts.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentMeta {
    /// Source path relative to the content root, e.g. `notes/rust.org`
    pub path: String,
    /// Output path relative to the output root, e.g. `notes/rust.html`
    pub url: String,
    pub title: String,
    /// Tags of the first heading
    pub tags: Vec<String>,
    pub preview: String,
    pub identifiers: Vec<Identifier>,
    /// `YYYY-MM-DD` rendering of `modified`
    pub date: String,
    #[serde(skip)]
    pub modified: SystemTime,
}

impl DocumentMeta {
    pub fn new(path: String, modified: SystemTime) -> Self {
        let date = chrono::DateTime::<chrono::Local>::from(modified)
            .format("%Y-%m-%d")
            .to_string();
        Self {
            url: html_path(&path),
            path,
            title: String::new(),
            tags: Vec::new(),
            preview: String::new(),
            identifiers: Vec::new(),
            date,
            modified,
        }
    }
}

/// A discovered document: its metadata plus the parse tree, which is
/// moved into the rendering phase so the source is parsed only once.
#[derive(Debug)]
pub struct DocumentSummary {
    pub meta: Arc<DocumentMeta>,
    pub document: Document,
}

impl DocumentSummary {
    #[inline]
    pub fn path(&self) -> &str {
        &self.meta.path
    }
}
