//! Pages built from many documents, plus static files.
//!
//! Runs after rendering. Tag pages, the site index and the static copy are
//! independent of each other and run in parallel.
//!
//! Any document can change any aggregate page, so every discovered document
//! is a contributor to each of them. Modification times cannot reveal a
//! deleted document, so a signature of the document set is kept in the
//! output directory; when it differs, all aggregate pages are rebuilt.

use super::{
    BuildContext, BuildResult,
    freshness::{is_fresh, is_fresh_aggregate, mtime},
    render::{IdLinkResolver, write_output},
    templates::{INDEX, TAG, Templates},
};
use crate::{
    data::{DocumentMeta, DocumentSummary, IdentifierIndex, TagIndex},
    debug, log,
    utils::path::{html_path, tag_page_name, to_slash},
};
use anyhow::{Context, Result};
use minijinja::{Value, context};
use rayon::prelude::*;
use rustc_hash::{FxHashSet, FxHasher};
use serde::Serialize;
use std::{
    fs,
    hash::{Hash, Hasher},
    path::Path,
    sync::Arc,
    time::SystemTime,
};
use walkdir::WalkDir;

/// Number of documents listed under "recently changed".
pub const RECENT_COUNT: usize = 5;

/// Source path whose page would be the site index.
pub const INDEX_SOURCE: &str = "index.org";

/// Signature of the document set behind the current aggregate pages.
const SIGNATURE_FILE: &str = ".oxen-pages";

/// Read-only inputs for the aggregation phase.
pub struct Aggregation<'a> {
    /// Every rendered document
    pub documents: &'a [Arc<DocumentMeta>],
    pub tags: &'a TagIndex,
    pub ids: &'a IdentifierIndex,
    /// The preamble sentinel, if present
    pub preamble: Option<&'a DocumentSummary>,
}

/// Identifiers declared in the preamble point at the site index, which
/// shows the preamble. When `index.org` owns the index page the preamble
/// is not shown anywhere and its identifiers stay unresolved.
pub fn place_preamble_ids(ids: &IdentifierIndex, documents: &[Arc<DocumentMeta>], ctx: &BuildContext) {
    let index_generated = !documents.iter().any(|d| d.path == INDEX_SOURCE);
    ids.relocate(&ctx.preamble, index_generated.then_some(INDEX_SOURCE));
}

pub fn aggregate(input: &Aggregation, templates: &Templates, ctx: &BuildContext) -> BuildResult {
    let signature = document_signature(input.documents);
    let signature_path = ctx.output_root.join(SIGNATURE_FILE);
    let same_documents = read_signature(&signature_path) == Some(signature);

    let pages = PageInputs {
        contributors: contributor_times(input),
        rebuild: ctx.force || !same_documents,
    };

    let (tags, (index, statics)) = rayon::join(
        || render_tag_pages(input, templates, ctx, &pages),
        || {
            rayon::join(
                || render_index(input, templates, ctx, &pages),
                || copy_static(&ctx.static_root, &ctx.output_root, ctx.force),
            )
        },
    );
    remove_orphan_tag_pages(input, ctx);

    let result = tags + index + statics;
    if !same_documents
        && !result.has_errors()
        && let Err(e) = write_output(&signature_path, &format!("{signature:016x}\n"))
    {
        log!("error"; "{e:#}");
        return result + BuildResult::error();
    }
    result
}

/// Freshness inputs shared by every aggregate page of one build.
struct PageInputs {
    /// Modification time of every discovered document
    contributors: Vec<SystemTime>,
    /// Regenerate regardless of modification times
    rebuild: bool,
}

impl PageInputs {
    fn is_fresh(&self, ctx: &BuildContext, output: &Path) -> bool {
        !self.rebuild
            && is_fresh_aggregate(self.contributors.iter().copied(), ctx.template_mtime, mtime(output))
    }
}

fn contributor_times(input: &Aggregation) -> Vec<SystemTime> {
    input
        .documents
        .iter()
        .map(|d| d.modified)
        .chain(input.preamble.map(|p| p.meta.modified))
        .collect()
}

/// Order-independent hash of every discovered document path.
fn document_signature(documents: &[Arc<DocumentMeta>]) -> u64 {
    let mut paths: Vec<&str> = documents.iter().map(|d| d.path.as_str()).collect();
    paths.sort_unstable();

    let mut hasher = FxHasher::default();
    paths.hash(&mut hasher);
    hasher.finish()
}

fn read_signature(path: &Path) -> Option<u64> {
    let text = fs::read_to_string(path).ok()?;
    u64::from_str_radix(text.trim(), 16).ok()
}

/// Newest first; ties broken by path so output is stable.
fn sort_newest_first(docs: &mut [Arc<DocumentMeta>]) {
    docs.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.path.cmp(&b.path)));
}

// ============================================================================
// Tag pages
// ============================================================================

fn render_tag_pages(
    input: &Aggregation,
    templates: &Templates,
    ctx: &BuildContext,
    pages: &PageInputs,
) -> BuildResult {
    input
        .tags
        .entries()
        .into_par_iter()
        .map(|(tag, docs)| {
            let mut docs: Vec<_> = docs.into_iter().filter(|d| !ctx.is_preamble(&d.path)).collect();
            if docs.is_empty() {
                return BuildResult::default();
            }
            sort_newest_first(&mut docs);

            let output = ctx.output_root.join(tag_page_name(&tag));
            if pages.is_fresh(ctx, &output) {
                debug!("aggregate"; "tag {tag} is up to date");
                return BuildResult::skipped();
            }

            let pages: Vec<&DocumentMeta> = docs.iter().map(|d| &**d).collect();
            let html = templates.render(
                TAG,
                context! {
                    site => &ctx.site,
                    extra => &ctx.extra,
                    tag => &tag,
                    pages => pages,
                    root => "",
                },
            );
            match html.and_then(|html| write_output(&output, &html)) {
                Ok(()) => BuildResult::tag_page(),
                Err(e) => {
                    log!("error"; "tag {tag}: {e:#}");
                    BuildResult::error()
                }
            }
        })
        .sum()
}

/// Delete `tag-*.html` files in the output root whose tag no longer has
/// any page. Document pages and static files with such names are kept.
fn remove_orphan_tag_pages(input: &Aggregation, ctx: &BuildContext) {
    let Ok(entries) = fs::read_dir(&ctx.output_root) else {
        return;
    };

    let mut keep: FxHashSet<String> = input
        .tags
        .entries()
        .into_iter()
        .filter(|(_, docs)| docs.iter().any(|d| !ctx.is_preamble(&d.path)))
        .map(|(tag, _)| tag_page_name(&tag))
        .collect();
    keep.extend(input.documents.iter().map(|d| html_path(&d.path)));

    for entry in entries.filter_map(Result::ok) {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with("tag-")
            || !name.ends_with(".html")
            || keep.contains(&name)
            || ctx.static_root.join(&name).exists()
        {
            continue;
        }
        match fs::remove_file(entry.path()) {
            Ok(()) => debug!("aggregate"; "removed stale {name}"),
            Err(e) => log!("error"; "failed to remove {name}: {e}"),
        }
    }
}

// ============================================================================
// Site index
// ============================================================================

#[derive(Serialize)]
struct TagCount {
    name: String,
    count: usize,
}

fn render_index(
    input: &Aggregation,
    templates: &Templates,
    ctx: &BuildContext,
    pages: &PageInputs,
) -> BuildResult {
    if input.documents.iter().any(|d| d.path == INDEX_SOURCE) {
        debug!("aggregate"; "{INDEX_SOURCE} provides the site index");
        return BuildResult::default();
    }

    let output = ctx.output_root.join(INDEX);
    if pages.is_fresh(ctx, &output) {
        debug!("aggregate"; "index is up to date");
        return BuildResult::skipped();
    }

    match write_index(input, templates, ctx, &output) {
        Ok(()) => BuildResult::generated(),
        Err(e) => {
            log!("error"; "index: {e:#}");
            BuildResult::error()
        }
    }
}

fn write_index(
    input: &Aggregation,
    templates: &Templates,
    ctx: &BuildContext,
    output: &Path,
) -> Result<()> {
    let mut recent: Vec<_> = input
        .documents
        .iter()
        .filter(|d| !ctx.is_preamble(&d.path))
        .cloned()
        .collect();
    sort_newest_first(&mut recent);
    recent.truncate(RECENT_COUNT);
    let recent: Vec<&DocumentMeta> = recent.iter().map(|d| &**d).collect();

    let tags: Vec<TagCount> = input
        .tags
        .entries()
        .into_iter()
        .map(|(name, docs)| TagCount {
            count: docs.iter().filter(|d| !ctx.is_preamble(&d.path)).count(),
            name,
        })
        .filter(|tag| tag.count > 0)
        .collect();

    // The index lives at the site root, so links resolve as if from there
    let preamble = input.preamble.map(|p| {
        let resolver = IdLinkResolver::new(input.ids, INDEX_SOURCE);
        Value::from_safe_string(p.document.to_html(&resolver))
    });

    let html = templates.render(
        INDEX,
        context! {
            site => &ctx.site,
            extra => &ctx.extra,
            recent => recent,
            tags => tags,
            preamble => preamble,
            root => "",
        },
    )?;
    write_output(output, &html)
}

// ============================================================================
// Static files
// ============================================================================

/// Copy every file under `src_root` to the same relative path below
/// `dst_root`, skipping copies that are already up to date.
pub fn copy_static(src_root: &Path, dst_root: &Path, force: bool) -> BuildResult {
    let files: Vec<_> = WalkDir::new(src_root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .collect();

    files
        .par_iter()
        .map(|src| {
            let Ok(rel) = src.strip_prefix(src_root) else {
                return BuildResult::default();
            };
            let dst = dst_root.join(rel);
            match copy_file(src, &dst, force) {
                Ok(true) => {
                    debug!("static"; "{}", to_slash(rel));
                    BuildResult::static_copied()
                }
                Ok(false) => BuildResult::default(),
                Err(e) => {
                    log!("error"; "{}: {e:#}", to_slash(rel));
                    BuildResult::error()
                }
            }
        })
        .sum()
}

/// Returns whether a copy was made.
fn copy_file(src: &Path, dst: &Path, force: bool) -> Result<bool> {
    let src_time = mtime(src).with_context(|| format!("cannot stat {}", src.display()))?;
    if !force && is_fresh(src_time, src_time, mtime(dst)) {
        return Ok(false);
    }
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(src, dst).with_context(|| format!("failed to copy {}", src.display()))?;
    Ok(true)
}
