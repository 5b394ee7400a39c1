//! Discovery: parse every source once and build the shared indexes.
//!
//! Each file is handled by its own rayon task. Tasks write into the
//! identifier and tag indexes concurrently; [`discover`] only returns after
//! the parallel collect has finished, so nothing downstream can observe a
//! partially filled index.

use super::{
    BuildResult, SourceFile, collect_source_files,
    meta::{PREVIEW_LEN, extract_identifiers, extract_preview, extract_tags, extract_title},
};
use crate::{
    data::{DocumentMeta, DocumentSummary, HeaderLocation, IdentifierIndex, TagIndex},
    debug, log,
    org::Document,
};
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::{fs, path::Path, sync::Arc};

/// Everything discovery produces.
pub struct Discovery {
    pub documents: Vec<DocumentSummary>,
    pub ids: IdentifierIndex,
    pub tags: TagIndex,
    pub result: BuildResult,
}

/// Find, parse and index every source under `source_root`, ignoring
/// anything inside `output_root`.
pub fn discover(source_root: &Path, output_root: &Path, on_file: impl Fn() + Sync) -> Discovery {
    let files = collect_source_files(source_root, &[output_root]);
    discover_files(files, on_file)
}

/// [`discover`] over an explicit file list.
pub fn discover_files(files: Vec<SourceFile>, on_file: impl Fn() + Sync) -> Discovery {
    let ids = IdentifierIndex::new();
    let tags = TagIndex::new();

    let outcomes: Vec<(Option<DocumentSummary>, BuildResult)> = files
        .into_par_iter()
        .map(|file| {
            let rel = file.rel.clone();
            let outcome = match index_file(file, &ids, &tags) {
                Ok(Some(doc)) => {
                    let has_ids = !doc.meta.identifiers.is_empty();
                    (Some(doc), BuildResult::scanned(has_ids))
                }
                Ok(None) => {
                    debug!("discover"; "{rel}: empty, skipped");
                    (None, BuildResult::skipped())
                }
                Err(e) => {
                    log!("error"; "{rel}: {e:#}");
                    (None, BuildResult::error())
                }
            };
            on_file();
            outcome
        })
        .collect();

    let mut documents = Vec::with_capacity(outcomes.len());
    let mut result = BuildResult::default();
    for (doc, partial) in outcomes {
        documents.extend(doc);
        result += partial;
    }

    Discovery {
        documents,
        ids,
        tags,
        result,
    }
}

/// Parse one file and register its identifiers and tags.
///
/// Returns `Ok(None)` for an empty file.
fn index_file(
    file: SourceFile,
    ids: &IdentifierIndex,
    tags: &TagIndex,
) -> Result<Option<DocumentSummary>> {
    let source = fs::read_to_string(&file.path)
        .with_context(|| format!("failed to read {}", file.path.display()))?;
    if source.is_empty() {
        return Ok(None);
    }

    let document = Document::parse(&source);
    let mut meta = DocumentMeta::new(file.rel, file.modified);
    meta.title = extract_title(&document);
    meta.tags = extract_tags(&document);
    meta.preview = extract_preview(&document, PREVIEW_LEN);

    for (id, ordinal) in extract_identifiers(&document) {
        let location = HeaderLocation {
            path: meta.path.clone(),
            ordinal,
        };
        ids.insert(id.clone(), location);
        meta.identifiers.push(id);
    }

    let meta = Arc::new(meta);
    tags.register(&meta);

    Ok(Some(DocumentSummary { meta, document }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const UUID_1: &str = "11111111-1111-1111-1111-111111111111";
    const UUID_2: &str = "22222222-2222-2222-2222-222222222222";

    fn discover_in(root: &Path, on_file: impl Fn() + Sync) -> Discovery {
        discover(root, &root.join("public"), on_file)
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_discover_indexes_identifiers() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "doc1.org",
            &format!("#+title: One\n* First :rust:\n:PROPERTIES:\n:ID: {UUID_1}\n:END:\nText.\n"),
        );
        write(
            dir.path(),
            "subdir/doc2.org",
            &format!("* Intro\n* Target\n:PROPERTIES:\n:ID: {UUID_2}\n:END:\n"),
        );
        write(dir.path(), "plain.org", "* No ids here\n");

        let found = discover_in(dir.path(), || {});

        assert_eq!(found.result.files_scanned, 3);
        assert_eq!(found.result.files_with_identifiers, 2);
        assert_eq!(found.result.errors, 0);
        assert_eq!(found.documents.len(), 3);
        assert_eq!(found.ids.len(), 2);
        assert_eq!(
            found.ids.lookup(UUID_1),
            Some(HeaderLocation { path: "doc1.org".into(), ordinal: 1 })
        );
        assert_eq!(
            found.ids.lookup(UUID_2),
            Some(HeaderLocation { path: "subdir/doc2.org".into(), ordinal: 2 })
        );
        let tags = found.tags.entries();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].0, "rust");
        assert_eq!(tags[0].1.len(), 1);

        let doc1 = found.documents.iter().find(|d| d.path() == "doc1.org").unwrap();
        assert_eq!(doc1.meta.title, "One");
        assert_eq!(doc1.meta.preview, "Text.");
    }

    #[test]
    fn test_empty_file_is_skipped() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "empty.org", "");
        write(dir.path(), "full.org", "* Heading\n");

        let found = discover_in(dir.path(), || {});

        assert_eq!(found.result.files_scanned, 1);
        assert_eq!(found.result.files_skipped, 1);
        assert_eq!(found.result.errors, 0);
        assert_eq!(found.documents.len(), 1);
    }

    #[test]
    fn test_unreadable_file_counts_error() {
        let dir = TempDir::new().unwrap();
        let files = vec![SourceFile {
            path: dir.path().join("gone.org"),
            rel: "gone.org".into(),
            modified: std::time::SystemTime::now(),
        }];

        let found = discover_files(files, || {});
        assert_eq!(found.result.errors, 1);
        assert!(found.documents.is_empty());
    }

    #[test]
    fn test_empty_tree() {
        let dir = TempDir::new().unwrap();
        let found = discover_in(dir.path(), || {});

        assert_eq!(found.result, BuildResult::default());
        assert!(found.ids.is_empty());
        assert!(found.tags.is_empty());
    }

    #[test]
    fn test_progress_callback_per_file() {
        let dir = TempDir::new().unwrap();
        for i in 0..5 {
            write(dir.path(), &format!("n{i}.org"), "* x\n");
        }
        let count = std::sync::atomic::AtomicUsize::new(0);
        discover_in(dir.path(), || {
            count.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        });
        assert_eq!(count.into_inner(), 5);
    }
}
