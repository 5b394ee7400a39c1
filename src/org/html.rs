//! HTML serialization.
//!
//! Headings get stable anchors `headline-N` (N = document-order ordinal),
//! which is what identifier links point at.

use super::{Block, BlockBody, Emphasis, Headline, Inline, List, Node};
use crate::utils::path::html_path;
use quick_xml::escape::{escape, partial_escape};
use std::fmt::Write;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "svg", "webp", "avif"];

/// Hook applied to every link target before default handling.
pub trait LinkResolver {
    /// Replacement href for `url`, or `None` to fall back to default handling.
    fn resolve(&self, url: &str) -> Option<String>;
}

/// Resolver that never rewrites anything.
pub struct NoResolver;

impl LinkResolver for NoResolver {
    fn resolve(&self, _url: &str) -> Option<String> {
        None
    }
}

pub fn write(nodes: &[Node], resolver: &dyn LinkResolver) -> String {
    let mut writer = Writer {
        out: String::new(),
        resolver,
    };
    writer.nodes(nodes);
    writer.out
}

struct Writer<'r> {
    out: String,
    resolver: &'r dyn LinkResolver,
}

impl Writer<'_> {
    fn nodes(&mut self, nodes: &[Node]) {
        for node in nodes {
            self.node(node);
        }
    }

    fn node(&mut self, node: &Node) {
        match node {
            Node::Headline(headline) => self.headline(headline),
            Node::Paragraph(inlines) => {
                self.out.push_str("<p>\n");
                self.inlines(inlines);
                self.out.push_str("\n</p>\n");
            }
            Node::List(list) => self.list(list),
            Node::Block(block) => self.block(block),
            Node::Table(rows) => {
                self.out.push_str("<table>\n<tbody>\n");
                for row in rows {
                    self.out.push_str("<tr>\n");
                    for cell in row {
                        self.out.push_str("<td>");
                        self.inlines(cell);
                        self.out.push_str("</td>\n");
                    }
                    self.out.push_str("</tr>\n");
                }
                self.out.push_str("</tbody>\n</table>\n");
            }
            Node::Rule => self.out.push_str("<hr>\n"),
        }
    }

    fn headline(&mut self, headline: &Headline) {
        let n = headline.ordinal;
        let h = (headline.level + 1).min(6);

        let _ = writeln!(
            self.out,
            r#"<section id="outline-container-headline-{n}" class="outline-{h}">"#
        );
        let _ = write!(self.out, r#"<h{h} id="headline-{n}">"#);
        if let Some(todo) = &headline.todo {
            let _ = write!(
                self.out,
                r#"<span class="todo {}">{todo}</span> "#,
                todo.to_ascii_lowercase()
            );
        }
        self.inlines(&headline.title);
        if !headline.tags.is_empty() {
            self.out.push_str(r#" <span class="tags">"#);
            for tag in &headline.tags {
                let _ = write!(self.out, r#"<span class="tag">{}</span>"#, partial_escape(tag));
            }
            self.out.push_str("</span>");
        }
        let _ = writeln!(self.out, "</h{h}>");

        self.nodes(&headline.children);
        self.out.push_str("</section>\n");
    }

    fn list(&mut self, list: &List) {
        let tag = if list.ordered { "ol" } else { "ul" };
        let _ = writeln!(self.out, "<{tag}>");
        for item in &list.items {
            self.out.push_str("<li>");
            match item.as_slice() {
                // Single-paragraph items stay inline
                [Node::Paragraph(inlines)] => self.inlines(inlines),
                nodes => {
                    self.out.push('\n');
                    self.nodes(nodes);
                }
            }
            self.out.push_str("</li>\n");
        }
        let _ = writeln!(self.out, "</{tag}>");
    }

    fn block(&mut self, block: &Block) {
        match (&block.body, block.kind.as_str()) {
            (BlockBody::Raw(raw), "src") => {
                let lang = block.parameters.split_whitespace().next().unwrap_or("text");
                let _ = writeln!(
                    self.out,
                    "<div class=\"src src-{}\">\n<pre>\n{}\n</pre>\n</div>",
                    escape(lang),
                    partial_escape(raw.as_str())
                );
            }
            (BlockBody::Raw(raw), "export") => {
                if block.parameters.eq_ignore_ascii_case("html") {
                    self.out.push_str(raw);
                    self.out.push('\n');
                }
            }
            (BlockBody::Raw(raw), "verse") => {
                self.out.push_str("<p class=\"verse\">\n");
                let lines: Vec<_> = raw.lines().map(partial_escape).collect();
                self.out.push_str(&lines.join("<br>\n"));
                self.out.push_str("\n</p>\n");
            }
            (BlockBody::Raw(raw), _) => {
                let _ = writeln!(
                    self.out,
                    "<pre class=\"example\">\n{}\n</pre>",
                    partial_escape(raw.as_str())
                );
            }
            (BlockBody::Nodes(nodes), "quote") => {
                self.out.push_str("<blockquote>\n");
                self.nodes(nodes);
                self.out.push_str("</blockquote>\n");
            }
            (BlockBody::Nodes(nodes), kind) => {
                let _ = writeln!(self.out, "<div class=\"{}-block\">", escape(kind));
                self.nodes(nodes);
                self.out.push_str("</div>\n");
            }
        }
    }

    fn inlines(&mut self, inlines: &[Inline]) {
        for inline in inlines {
            match inline {
                Inline::Text(text) => self.out.push_str(&partial_escape(text.as_str())),
                Inline::Link { url, description } => self.link(url, description),
                Inline::Emphasis { kind, content } => {
                    let (open, close) = match kind {
                        Emphasis::Bold => ("<strong>", "</strong>"),
                        Emphasis::Italic => ("<em>", "</em>"),
                        Emphasis::Underline => {
                            (r#"<span style="text-decoration: underline;">"#, "</span>")
                        }
                        Emphasis::Strike => ("<del>", "</del>"),
                        Emphasis::Verbatim => (r#"<code class="verbatim">"#, "</code>"),
                        Emphasis::Code => (r#"<code class="inline">"#, "</code>"),
                    };
                    self.out.push_str(open);
                    self.inlines(content);
                    self.out.push_str(close);
                }
            }
        }
    }

    fn link(&mut self, url: &str, description: &[Inline]) {
        let href = self
            .resolver
            .resolve(url)
            .unwrap_or_else(|| default_href(url));

        if description.is_empty() && is_image(&href) {
            let alt = href.rsplit('/').next().unwrap_or(&href);
            let _ = write!(
                self.out,
                r#"<img src="{}" alt="{}">"#,
                escape(href.as_str()),
                escape(alt)
            );
            return;
        }

        let _ = write!(self.out, r#"<a href="{}">"#, escape(href.as_str()));
        if description.is_empty() {
            self.out.push_str(&partial_escape(href.as_str()));
        } else {
            self.inlines(description);
        }
        self.out.push_str("</a>");
    }
}

/// Target for links the resolver left alone: `file:` links and bare
/// relative `.org` paths point at the generated page; anything else is
/// emitted as written.
fn default_href(url: &str) -> String {
    if let Some(path) = url.strip_prefix("file:") {
        let path = path.split("::").next().unwrap_or(path);
        return if path.ends_with(".org") { html_path(path) } else { path.to_owned() };
    }
    if url.ends_with(".org") && !url.contains(':') {
        return html_path(url);
    }
    url.to_owned()
}

fn is_image(href: &str) -> bool {
    href.rsplit_once('.').is_some_and(|(_, ext)| {
        IMAGE_EXTENSIONS
            .iter()
            .any(|image| ext.eq_ignore_ascii_case(image))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::org::Document;

    struct Fixed;

    impl LinkResolver for Fixed {
        fn resolve(&self, url: &str) -> Option<String> {
            (url == "id:known").then(|| "other.html#headline-2".to_string())
        }
    }

    fn html(src: &str) -> String {
        Document::parse(src).to_html(&NoResolver)
    }

    #[test]
    fn test_headline_anchors() {
        let out = html("* First\n** Second\n");
        assert!(out.contains(r#"<h2 id="headline-1">First</h2>"#));
        assert!(out.contains(r#"<h3 id="headline-2">Second</h3>"#));
        assert!(out.contains(r#"id="outline-container-headline-1""#));
    }

    #[test]
    fn test_resolver_rewrites_links() {
        let out = Document::parse("[[id:known][Other]] and [[id:unknown][Gone]]").to_html(&Fixed);
        assert!(out.contains(r#"<a href="other.html#headline-2">Other</a>"#));
        assert!(out.contains(r#"<a href="id:unknown">Gone</a>"#));
    }

    #[test]
    fn test_link_without_description_shows_target() {
        let out = Document::parse("[[id:known]]").to_html(&Fixed);
        assert!(out.contains(r#"<a href="other.html#headline-2">other.html#headline-2</a>"#));
    }

    #[test]
    fn test_file_links_point_at_pages() {
        let out = html("[[file:notes/a.org][A]] [[./b.org][B]] [[file:img/x.png]]");
        assert!(out.contains(r#"<a href="notes/a.html">A</a>"#));
        assert!(out.contains(r#"<a href="./b.html">B</a>"#));
        assert!(out.contains(r#"<img src="img/x.png" alt="x.png">"#));
    }

    #[test]
    fn test_text_is_escaped() {
        let out = html("a < b && c > d\n");
        assert!(out.contains("a &lt; b &amp;&amp; c &gt; d"));
    }

    #[test]
    fn test_emphasis_and_lists() {
        let out = html("- *bold* and ~code~\n- second\n");
        assert!(out.contains("<ul>\n<li><strong>bold</strong> and <code class=\"inline\">code</code></li>"));
        assert!(out.contains("<li>second</li>"));
    }

    #[test]
    fn test_blocks() {
        let out = html("#+begin_src rust\nlet x = 1 < 2;\n#+end_src\n#+begin_quote\nwise\n#+end_quote\n");
        assert!(out.contains("<div class=\"src src-rust\">\n<pre>\nlet x = 1 &lt; 2;\n</pre>"));
        assert!(out.contains("<blockquote>\n<p>\nwise\n</p>\n</blockquote>"));
    }

    #[test]
    fn test_export_html_passthrough() {
        let out = html("#+begin_export html\n<video src=\"a.mp4\"></video>\n#+end_export\n");
        assert!(out.contains("<video src=\"a.mp4\"></video>"));
    }

    #[test]
    fn test_tags_and_todo() {
        let out = html("* DONE Ship it :release:\n");
        assert!(out.contains(r#"<span class="todo done">DONE</span> Ship it"#));
        assert!(out.contains(r#"<span class="tag">release</span>"#));
    }
}
