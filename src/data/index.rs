//! Site-wide indexes populated during discovery.
//!
//! Both indexes are written concurrently by discovery workers and only
//! read once discovery has returned. They are owned by the build and
//! passed by reference; nothing here is global.

use super::{DocumentMeta, HeaderLocation, Identifier};
use crate::debug;
use dashmap::DashMap;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;

// ============================================================================
// Identifier index
// ============================================================================

/// Identifier → heading location.
#[derive(Debug, Default)]
pub struct IdentifierIndex {
    map: DashMap<Identifier, HeaderLocation>,
}

impl IdentifierIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an identifier. When two documents claim the same
    /// identifier the later write wins.
    pub fn insert(&self, id: Identifier, location: HeaderLocation) {
        if let Some(previous) = self.map.insert(id.clone(), location) {
            debug!("index"; "identifier {} re-registered (was {}#{})", id, previous.path, previous.ordinal);
        }
    }

    /// Move every identifier declared in document `from` to document `to`,
    /// or forget them when `to` is `None`.
    pub fn relocate(&self, from: &str, to: Option<&str>) {
        match to {
            Some(to) => {
                for mut entry in self.map.iter_mut() {
                    if entry.path == from {
                        entry.path = to.to_owned();
                    }
                }
            }
            None => self.map.retain(|_, location| location.path != from),
        }
    }

    pub fn lookup(&self, id: &str) -> Option<HeaderLocation> {
        self.map.get(id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

// ============================================================================
// Tag index
// ============================================================================

/// Tag → documents carrying it, in registration order.
///
/// Contention is low (one write per tag per document), so a single
/// `RwLock` over a hash map is enough.
#[derive(Debug, Default)]
pub struct TagIndex {
    map: RwLock<FxHashMap<String, Vec<Arc<DocumentMeta>>>>,
}

impl TagIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `doc` under each of its tags, skipping tags it is already
    /// listed under (matched by path).
    pub fn register(&self, doc: &Arc<DocumentMeta>) {
        if doc.tags.is_empty() {
            return;
        }
        let mut map = self.map.write();
        for tag in &doc.tags {
            let docs = map.entry(tag.clone()).or_default();
            if !docs.iter().any(|d| d.path == doc.path) {
                docs.push(Arc::clone(doc));
            }
        }
    }

    /// All tags with their documents, sorted by tag name.
    pub fn entries(&self) -> Vec<(String, Vec<Arc<DocumentMeta>>)> {
        let mut entries: Vec<_> = self
            .map
            .read()
            .iter()
            .map(|(tag, docs)| (tag.clone(), docs.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;
    use std::time::SystemTime;

    fn id(s: &str) -> Identifier {
        Identifier::parse(s).unwrap()
    }

    fn meta(path: &str, tags: &[&str]) -> Arc<DocumentMeta> {
        let mut meta = DocumentMeta::new(path.into(), SystemTime::UNIX_EPOCH);
        meta.tags = tags.iter().map(|t| t.to_string()).collect();
        Arc::new(meta)
    }

    #[test]
    fn test_identifier_lookup() {
        let index = IdentifierIndex::new();
        let uuid = "550e8400-e29b-41d4-a716-446655440000";
        index.insert(id(uuid), HeaderLocation { path: "a.org".into(), ordinal: 2 });

        assert_eq!(
            index.lookup(uuid),
            Some(HeaderLocation { path: "a.org".into(), ordinal: 2 })
        );
        assert_eq!(index.lookup("550E8400-E29B-41D4-A716-446655440000"), None);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_identifier_last_write_wins() {
        let index = IdentifierIndex::new();
        let uuid = "550e8400-e29b-41d4-a716-446655440000";
        index.insert(id(uuid), HeaderLocation { path: "a.org".into(), ordinal: 1 });
        index.insert(id(uuid), HeaderLocation { path: "b.org".into(), ordinal: 3 });

        assert_eq!(index.lookup(uuid).unwrap().path, "b.org");
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_identifier_concurrent_inserts() {
        let index = IdentifierIndex::new();
        (0..256u32).into_par_iter().for_each(|n| {
            let uuid = format!("{n:08x}-0000-0000-0000-000000000000");
            index.insert(id(&uuid), HeaderLocation { path: format!("{n}.org"), ordinal: 1 });
        });

        assert_eq!(index.len(), 256);
        assert_eq!(index.lookup("000000ff-0000-0000-0000-000000000000").unwrap().path, "255.org");
    }

    #[test]
    fn test_identifier_relocate() {
        let index = IdentifierIndex::new();
        let moved = "11111111-1111-1111-1111-111111111111";
        let kept = "22222222-2222-2222-2222-222222222222";
        index.insert(id(moved), HeaderLocation { path: "preamble.org".into(), ordinal: 2 });
        index.insert(id(kept), HeaderLocation { path: "a.org".into(), ordinal: 1 });

        index.relocate("preamble.org", Some("index.org"));
        assert_eq!(
            index.lookup(moved),
            Some(HeaderLocation { path: "index.org".into(), ordinal: 2 })
        );
        assert_eq!(index.lookup(kept).unwrap().path, "a.org");

        index.relocate("index.org", None);
        assert_eq!(index.lookup(moved), None);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_tag_register_dedups_by_path() {
        let tags = TagIndex::new();
        tags.register(&meta("a.org", &["rust", "notes"]));
        tags.register(&meta("a.org", &["rust"]));
        tags.register(&meta("b.org", &["rust"]));

        let entries = tags.entries();
        assert_eq!(entries.len(), 2);
        let (notes, rust) = (&entries[0], &entries[1]);
        assert_eq!(notes.0, "notes");
        assert_eq!(notes.1.len(), 1);
        let paths: Vec<_> = rust.1.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(paths, vec!["a.org", "b.org"]);
    }

    #[test]
    fn test_tag_entries_sorted() {
        let tags = TagIndex::new();
        tags.register(&meta("a.org", &["zeta", "alpha"]));
        tags.register(&meta("b.org", &[]));

        let names: Vec<_> = tags.entries().into_iter().map(|(tag, _)| tag).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }
}
