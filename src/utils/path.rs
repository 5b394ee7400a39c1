//! Slash-path helpers for site-relative addressing.
//!
//! Document paths inside the build are always `/`-separated and relative
//! to the content root, whatever the host separator is.

use std::{
    env,
    path::{Component, Path, PathBuf},
};

/// Source extension handled by the build.
pub const SOURCE_EXT: &str = "org";

/// Absolute form of `path` for reliable comparison.
///
/// Existing paths are canonicalized; paths that do not exist (yet, or any
/// more) are joined onto the current directory.
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}

/// Convert a relative filesystem path to a slash-separated string.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Swap the source extension for `.html`.
///
/// `notes/rust.org` → `notes/rust.html`
pub fn html_path(path: &str) -> String {
    let stem = path
        .strip_suffix(SOURCE_EXT)
        .and_then(|s| s.strip_suffix('.'))
        .unwrap_or(path);
    format!("{stem}.html")
}

/// Directory part of a slash path (`""` at the root).
fn parent(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(dir, _)| dir)
}

fn components(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|c| !c.is_empty() && *c != ".")
}

/// Link from the page of document `from` to the page of document `to`.
///
/// Shared leading directories are dropped and every remaining directory
/// of `from` becomes a `..`:
///
/// ```text
/// index.org        -> subdir/doc2.org  = subdir/doc2.html
/// subdir/doc2.org  -> doc1.org         = ../doc1.html
/// a/x.org          -> b/y.org          = ../b/y.html
/// ```
pub fn relative_link(from: &str, to: &str) -> String {
    let from_dir: Vec<&str> = components(parent(from)).collect();
    let to_parts: Vec<&str> = components(to).collect();
    let (to_dir, file) = to_parts.split_at(to_parts.len().saturating_sub(1));

    let shared = from_dir
        .iter()
        .zip(to_dir)
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts = vec![".."; from_dir.len() - shared];
    parts.extend_from_slice(&to_dir[shared..]);
    parts.extend_from_slice(file);
    html_path(&parts.join("/"))
}

/// Prefix that leads from the page of `path` back to the site root.
///
/// `a/b/c.org` → `../../`
pub fn root_prefix(path: &str) -> String {
    "../".repeat(components(parent(path)).count())
}

/// Output file name of the page listing documents tagged `tag`.
pub fn tag_page_name(tag: &str) -> String {
    format!("tag-{tag}.html")
}

/// Link target for [`tag_page_name`]. Tags may contain `#` and `%`, so the
/// tag is percent-encoded.
pub fn tag_page_href(tag: &str) -> String {
    format!("tag-{}.html", urlencoding::encode(tag))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_to_slash() {
        let path: PathBuf = ["subdir", "deep", "doc.org"].iter().collect();
        assert_eq!(to_slash(&path), "subdir/deep/doc.org");
        assert_eq!(to_slash(Path::new("./doc.org")), "doc.org");
    }

    #[test]
    fn test_html_path() {
        assert_eq!(html_path("doc.org"), "doc.html");
        assert_eq!(html_path("a/b.c.org"), "a/b.c.html");
        assert_eq!(html_path("a/borg"), "a/borg.html");
    }

    #[test]
    fn test_relative_link_same_dir() {
        assert_eq!(relative_link("index.org", "doc1.org"), "doc1.html");
        assert_eq!(relative_link("a/x.org", "a/y.org"), "y.html");
        assert_eq!(relative_link("a/x.org", "a/x.org"), "x.html");
    }

    #[test]
    fn test_relative_link_descend() {
        assert_eq!(relative_link("index.org", "subdir/doc2.org"), "subdir/doc2.html");
        assert_eq!(
            relative_link("root.org", "level1b/deep/nested.org"),
            "level1b/deep/nested.html"
        );
    }

    #[test]
    fn test_relative_link_ascend() {
        assert_eq!(relative_link("subdir/doc2.org", "doc1.org"), "../doc1.html");
        assert_eq!(relative_link("level1/level2/deep.org", "root.org"), "../../root.html");
    }

    #[test]
    fn test_relative_link_sibling_dirs() {
        assert_eq!(relative_link("a/x.org", "b/y.org"), "../b/y.html");
        assert_eq!(relative_link("a/b/x.org", "a/c/d/y.org"), "../c/d/y.html");
    }

    #[test]
    fn test_root_prefix() {
        assert_eq!(root_prefix("index.org"), "");
        assert_eq!(root_prefix("a/b/c.org"), "../../");
    }

    #[test]
    fn test_tag_page_href_encodes_reserved() {
        assert_eq!(tag_page_name("c#"), "tag-c#.html");
        assert_eq!(tag_page_href("c#"), "tag-c%23.html");
        assert_eq!(tag_page_href("100%"), "tag-100%25.html");
        assert_eq!(tag_page_href("rust_lang"), "tag-rust_lang.html");
        assert_eq!(urlencoding::decode(&tag_page_href("c#")).unwrap(), tag_page_name("c#"));
    }
}
