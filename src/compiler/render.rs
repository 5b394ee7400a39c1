//! Rendering: one HTML page per discovered document.
//!
//! Runs strictly after discovery, so every lookup sees the complete
//! identifier index. Documents are independent of each other and are
//! rendered in parallel, each consuming its own parse tree.

use super::{
    BuildContext, BuildResult,
    freshness::{is_fresh, mtime},
    templates::{PAGE, Templates},
};
use crate::{
    data::{DocumentSummary, IdentifierIndex},
    debug, log,
    org::LinkResolver,
    utils::path::{relative_link, root_prefix},
};
use anyhow::{Context, Result};
use minijinja::{Value, context};
use rayon::prelude::*;
use std::{fs, path::Path};

/// Link scheme addressing a heading by identifier.
pub const ID_SCHEME: &str = "id:";

/// Rewrites `id:` links to `relative/page.html#headline-N`.
///
/// Identifiers missing from the index are left alone, so the link keeps
/// its original `id:` target.
pub struct IdLinkResolver<'a> {
    ids: &'a IdentifierIndex,
    /// Source path of the page being rendered
    from: &'a str,
}

impl<'a> IdLinkResolver<'a> {
    pub const fn new(ids: &'a IdentifierIndex, from: &'a str) -> Self {
        Self { ids, from }
    }
}

impl LinkResolver for IdLinkResolver<'_> {
    fn resolve(&self, url: &str) -> Option<String> {
        let id = url.strip_prefix(ID_SCHEME)?;
        let target = self.ids.lookup(id.trim())?;
        Some(format!(
            "{}#headline-{}",
            relative_link(self.from, &target.path),
            target.ordinal
        ))
    }
}

/// Render every document except the preamble sentinel.
pub fn render(
    documents: Vec<DocumentSummary>,
    ids: &IdentifierIndex,
    templates: &Templates,
    ctx: &BuildContext,
    on_page: impl Fn() + Sync,
) -> BuildResult {
    documents
        .into_par_iter()
        .filter(|doc| !ctx.is_preamble(doc.path()))
        .map(|doc| {
            let result = render_document(doc, ids, templates, ctx);
            on_page();
            result
        })
        .sum()
}

fn render_document(
    doc: DocumentSummary,
    ids: &IdentifierIndex,
    templates: &Templates,
    ctx: &BuildContext,
) -> BuildResult {
    let output = ctx.output_root.join(&doc.meta.url);

    if !ctx.force && is_fresh(doc.meta.modified, ctx.template_mtime, mtime(&output)) {
        debug!("render"; "{} is up to date", doc.meta.url);
        return BuildResult::skipped();
    }

    match write_page(&doc, ids, templates, ctx, &output) {
        Ok(()) => {
            debug!("render"; "{}", doc.meta.url);
            BuildResult::generated()
        }
        Err(e) => {
            log!("error"; "{}: {e:#}", doc.path());
            BuildResult::error()
        }
    }
}

fn write_page(
    doc: &DocumentSummary,
    ids: &IdentifierIndex,
    templates: &Templates,
    ctx: &BuildContext,
    output: &Path,
) -> Result<()> {
    let resolver = IdLinkResolver::new(ids, doc.path());
    let content = doc.document.to_html(&resolver);

    let html = templates.render(
        PAGE,
        context! {
            site => &ctx.site,
            extra => &ctx.extra,
            page => doc.meta.as_ref(),
            content => Value::from_safe_string(content),
            root => root_prefix(doc.path()),
        },
    )?;

    write_output(output, &html)
}

/// Write a generated file, creating parent directories as needed.
pub fn write_output(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}
