//! Site building orchestration.
//!
//! # Architecture
//!
//! ```text
//! build_site()
//!     │
//!     ├── Templates::load()          syntax errors abort here
//!     │
//!     ├── discover_files()           parallel; fills IdentifierIndex + TagIndex
//!     │       ══ barrier ══
//!     ├── render()                   parallel; one page per document
//!     │       ══ barrier ══
//!     └── aggregate()                tag pages ∥ site index ∥ static copy
//! ```
//!
//! Per-document failures are logged and counted; only setup failures
//! (templates, worker pool) make the build itself fail.

use crate::{
    compiler::{
        BuildContext, BuildResult, Templates,
        aggregate::{self, Aggregation},
        collect_source_files,
        discover::{discover, discover_files},
        render::render,
    },
    config::SiteConfig,
    data::{HeaderLocation, Identifier, TagIndex},
    log,
    logger::Progress,
};
use anyhow::{Context, Result};
use colored::Colorize;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

/// Build the entire site.
pub fn build_site(config: &SiteConfig) -> Result<BuildResult> {
    let started = Instant::now();

    let templates = Templates::load(Some(&config.build.templates))?;
    let ctx = BuildContext::new(config, &templates);

    let (result, tags) = with_workers(config.build.workers, || run_build(&ctx, &templates))?;
    log_build_result(&result, &tags, started.elapsed());

    Ok(result)
}

/// Run `f` on a dedicated pool of `workers` threads, or on the global pool
/// when `workers` is 0.
fn with_workers<T: Send>(workers: usize, f: impl FnOnce() -> T + Send) -> Result<T> {
    if workers == 0 {
        return Ok(f());
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .context("failed to start worker pool")?;
    Ok(pool.install(f))
}

fn run_build(ctx: &BuildContext, templates: &Templates) -> (BuildResult, TagIndex) {
    let files = collect_source_files(&ctx.source_root, &[&ctx.output_root]);

    log!("discover"; "scanning {} files...", files.len());
    let progress = Progress::new("discover", files.len());
    let mut found = discover_files(files, || {
        if let Some(progress) = &progress {
            progress.inc();
        }
    });
    drop(progress);
    log!(
        "discover";
        "{} documents, {} identifiers, {} tags",
        found.documents.len(),
        found.ids.len(),
        found.tags.len()
    );

    let documents: Vec<_> = found.documents.iter().map(|d| Arc::clone(&d.meta)).collect();
    aggregate::place_preamble_ids(&found.ids, &documents, ctx);
    let preamble = found
        .documents
        .iter()
        .position(|d| ctx.is_preamble(d.path()))
        .map(|i| found.documents.swap_remove(i));

    let progress = Progress::new("render", found.documents.len());
    let rendered = render(found.documents, &found.ids, templates, ctx, || {
        if let Some(progress) = &progress {
            progress.inc();
        }
    });
    drop(progress);

    let input = Aggregation {
        documents: &documents,
        tags: &found.tags,
        ids: &found.ids,
        preamble: preamble.as_ref(),
    };
    let aggregated = aggregate::aggregate(&input, templates, ctx);

    (found.result + rendered + aggregated, found.tags)
}

/// Locate the heading that declares `id`, running discovery only.
pub fn find_identifier(config: &SiteConfig, id: &str) -> Result<Option<HeaderLocation>> {
    let id: Identifier = id.parse()?;

    let found = with_workers(config.build.workers, || {
        discover(&config.build.content, &config.build.output, || {})
    })?;

    Ok(found.ids.lookup(id.as_str()))
}

fn log_build_result(result: &BuildResult, tags: &TagIndex, elapsed: Duration) {
    log!(
        "build";
        "{} scanned ({} with ids), {} generated, {} skipped, {} tag pages, {} static in {:.2?}",
        result.files_scanned.to_string().bold(),
        result.files_with_identifiers,
        result.files_generated.to_string().bold(),
        result.files_skipped,
        result.tag_pages_generated,
        result.static_files_copied,
        elapsed
    );

    let tags = tags.entries();
    if !tags.is_empty() {
        let list: Vec<String> = tags
            .iter()
            .map(|(tag, docs)| format!("{tag} ({})", docs.len()))
            .collect();
        log!("build"; "tags: {}", list.join(", "));
    }

    if result.has_errors() {
        log!("warn"; "{} file(s) failed, see errors above", result.errors.to_string().red());
    } else if result.files_scanned == 0 {
        log!("warn"; "no .org files found, check [build.content]");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{fs, path::Path};
    use tempfile::TempDir;

    const ID_DOC1: &str = "aaaaaaaa-0000-4000-8000-000000000001";
    const ID_DOC2: &str = "bbbbbbbb-0000-4000-8000-000000000002";
    const ID_ROOT: &str = "cccccccc-0000-4000-8000-000000000003";
    const ID_NESTED: &str = "dddddddd-0000-4000-8000-000000000004";
    const ID_MISSING: &str = "eeeeeeee-0000-4000-8000-000000000005";

    fn config_for(root: &Path) -> SiteConfig {
        let mut config = SiteConfig::default();
        config.config_path = root.join("oxen.toml");
        config.build.content = root.to_path_buf();
        config.build.output = root.join("public");
        config.build.templates = root.join("templates");
        config.build.static_dir = root.join("static");
        config
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn read(root: &Path, rel: &str) -> String {
        fs::read_to_string(root.join("public").join(rel)).unwrap()
    }

    fn heading_with_id(title: &str, id: &str) -> String {
        format!("* {title}\n:PROPERTIES:\n:ID: {id}\n:END:\n")
    }

    /// `index.org`, `doc1.org` and `subdir/doc2.org` linking to each other.
    fn cross_link_fixture(root: &Path) {
        write(
            root,
            "index.org",
            &format!("#+title: Home\n* Home\nSee [[id:{ID_DOC1}][one]] and [[id:{ID_DOC2}][two]].\n"),
        );
        write(
            root,
            "doc1.org",
            &format!("{}Forward to [[id:{ID_DOC2}][two]].\n", heading_with_id("One", ID_DOC1)),
        );
        write(
            root,
            "subdir/doc2.org",
            &format!("{}Back to [[id:{ID_DOC1}][one]].\n", heading_with_id("Two", ID_DOC2)),
        );
    }

    #[test]
    fn test_cross_links_resolve() {
        let dir = TempDir::new().unwrap();
        cross_link_fixture(dir.path());

        let result = build_site(&config_for(dir.path())).unwrap();
        assert_eq!(result.files_scanned, 3);
        assert_eq!(result.files_with_identifiers, 2);
        assert_eq!(result.files_generated, 3);
        assert_eq!(result.errors, 0);

        let index = read(dir.path(), "index.html");
        assert!(index.contains(r#"href="doc1.html#headline-1""#));
        assert!(index.contains(r#"href="subdir/doc2.html#headline-1""#));
        assert!(index.contains("<h1>Home</h1>"));

        let doc1 = read(dir.path(), "doc1.html");
        assert!(doc1.contains(r#"href="subdir/doc2.html#headline-1""#));
        assert!(doc1.contains(r#"<h2 id="headline-1">One</h2>"#));

        let doc2 = read(dir.path(), "subdir/doc2.html");
        assert!(doc2.contains(r#"href="../doc1.html#headline-1""#));
        assert!(!doc2.contains(r#"href="id:"#));
    }

    #[test]
    fn test_deep_nesting() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(
            root,
            "level1a/level2a/root.org",
            &format!("{}To [[id:{ID_NESTED}][nested]].\n", heading_with_id("Root", ID_ROOT)),
        );
        write(
            root,
            "level1b/deep/nested.org",
            &format!("* Intro\n{}Up to [[id:{ID_ROOT}][root]].\n", heading_with_id("Nested", ID_NESTED)),
        );
        write(root, "top.org", &format!("* Top\n[[id:{ID_ROOT}][r]] [[id:{ID_NESTED}][n]]\n"));

        let result = build_site(&config_for(root)).unwrap();
        assert_eq!(result.errors, 0);

        let root_page = read(root, "level1a/level2a/root.html");
        assert!(root_page.contains(r#"href="../../level1b/deep/nested.html#headline-2""#));

        let nested = read(root, "level1b/deep/nested.html");
        assert!(nested.contains(r#"href="../../level1a/level2a/root.html#headline-1""#));

        let top = read(root, "top.html");
        assert!(top.contains(r#"href="level1a/level2a/root.html#headline-1""#));
        assert!(top.contains(r#"href="level1b/deep/nested.html#headline-2""#));
    }

    #[test]
    fn test_second_build_skips_everything() {
        let dir = TempDir::new().unwrap();
        cross_link_fixture(dir.path());
        let config = config_for(dir.path());

        let first = build_site(&config).unwrap();
        assert_eq!(first.files_generated, 3);

        let second = build_site(&config).unwrap();
        assert_eq!(second.files_generated, 0);
        assert_eq!(second.files_skipped, 3);
        assert_eq!(second.errors, 0);
    }

    #[test]
    fn test_force_regenerates() {
        let dir = TempDir::new().unwrap();
        cross_link_fixture(dir.path());
        let mut config = config_for(dir.path());
        build_site(&config).unwrap();

        config.build.force = true;
        let forced = build_site(&config).unwrap();
        assert_eq!(forced.files_generated, 3);
        assert_eq!(forced.files_skipped, 0);
    }

    #[test]
    fn test_unresolved_link_left_as_authored() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.org", &format!("* A\nDangling [[id:{ID_MISSING}][link]].\n"));

        let result = build_site(&config_for(dir.path())).unwrap();
        assert_eq!(result.errors, 0);

        let page = read(dir.path(), "a.html");
        assert!(page.contains(&format!(r#"<a href="id:{ID_MISSING}">link</a>"#)));
    }

    #[test]
    fn test_empty_file_and_heading_without_id() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "empty.org", "");
        write(dir.path(), "plain.org", "* Just a heading\n");

        let result = build_site(&config_for(dir.path())).unwrap();
        assert_eq!(result.files_scanned, 1);
        assert_eq!(result.files_with_identifiers, 0);
        assert_eq!(result.errors, 0);
        assert!(!dir.path().join("public/empty.html").exists());
        assert!(dir.path().join("public/plain.html").exists());
    }

    #[test]
    fn test_preamble_identifier_points_at_index() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "sitemap-preamble.org", &heading_with_id("Welcome", ID_ROOT));
        write(root, "a.org", &format!("* A\nBack to [[id:{ID_ROOT}][welcome]].\n"));

        let result = build_site(&config_for(root)).unwrap();
        assert_eq!(result.errors, 0);
        assert!(!root.join("public/sitemap-preamble.html").exists());

        let page = read(root, "a.html");
        assert!(page.contains(r#"href="index.html#headline-1""#));
        assert!(!page.contains("sitemap-preamble.html"));
        assert!(read(root, "index.html").contains(r#"<h2 id="headline-1">Welcome</h2>"#));
    }

    #[test]
    fn test_preamble_identifier_unresolved_beside_index_org() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "index.org", "* Home\n");
        write(root, "sitemap-preamble.org", &heading_with_id("Welcome", ID_ROOT));
        write(root, "a.org", &format!("* A\nBack to [[id:{ID_ROOT}][welcome]].\n"));

        let result = build_site(&config_for(root)).unwrap();
        assert_eq!(result.errors, 0);

        let page = read(root, "a.html");
        assert!(page.contains(&format!(r#"<a href="id:{ID_ROOT}">welcome</a>"#)));
        assert!(!page.contains("sitemap-preamble.html"));
    }

    #[test]
    fn test_empty_tree_builds() {
        let dir = TempDir::new().unwrap();

        let result = build_site(&config_for(dir.path())).unwrap();
        assert_eq!(result.files_scanned, 0);
        assert_eq!(result.errors, 0);
    }

    #[test]
    fn test_template_syntax_error_fails_build() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.org", "* A\n");
        write(dir.path(), "templates/page.html", "{% block content %}");

        assert!(build_site(&config_for(dir.path())).is_err());
    }

    #[test]
    fn test_template_runtime_error_is_per_page() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.org", "* A\n");
        write(dir.path(), "b.org", "* B\n");
        write(
            dir.path(),
            "templates/page.html",
            r#"{% if page.path == "a.org" %}{% include "missing.html" %}{% else %}{{ content }}{% endif %}"#,
        );

        let result = build_site(&config_for(dir.path())).unwrap();
        assert_eq!(result.errors, 1);
        assert_eq!(result.files_generated, 2);
        assert!(dir.path().join("public/b.html").exists());
        assert!(!dir.path().join("public/a.html").exists());
    }

    #[test]
    fn test_bounded_workers() {
        let dir = TempDir::new().unwrap();
        cross_link_fixture(dir.path());
        let mut config = config_for(dir.path());
        config.build.workers = 2;

        let result = build_site(&config).unwrap();
        assert_eq!(result.files_generated, 3);
    }

    #[test]
    fn test_find_identifier() {
        let dir = TempDir::new().unwrap();
        cross_link_fixture(dir.path());
        let config = config_for(dir.path());

        let found = find_identifier(&config, ID_DOC2).unwrap();
        assert_eq!(
            found,
            Some(HeaderLocation { path: "subdir/doc2.org".into(), ordinal: 1 })
        );
        assert_eq!(find_identifier(&config, ID_MISSING).unwrap(), None);
        assert!(find_identifier(&config, "not-an-id").is_err());
    }
}
