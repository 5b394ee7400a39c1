//! Line-oriented block parser.

use super::{Block, BlockBody, Document, Headline, List, Node, inline::parse_inline};

/// Blocks whose body is kept verbatim.
const RAW_BLOCKS: &[&str] = &["src", "example", "export", "verse"];

const TODO_KEYWORDS: &[&str] = &["TODO", "DONE"];

const PLANNING: &[&str] = &["SCHEDULED:", "DEADLINE:", "CLOSED:"];

pub fn parse(source: &str) -> Document {
    let mut parser = Parser::new(source.lines().collect(), true);
    let nodes = parser.section(0);
    Document {
        keywords: parser.keywords,
        nodes,
    }
}

struct Parser<'a> {
    lines: Vec<&'a str>,
    pos: usize,
    /// Whether `* ` lines open headings (false inside list items and blocks)
    headlines: bool,
    ordinal: usize,
    keywords: Vec<(String, String)>,
}

impl<'a> Parser<'a> {
    fn new(lines: Vec<&'a str>, headlines: bool) -> Self {
        Self {
            lines,
            pos: 0,
            headlines,
            ordinal: 0,
            keywords: Vec::new(),
        }
    }

    fn peek(&self) -> Option<&'a str> {
        self.lines.get(self.pos).copied()
    }

    fn heading_level(&self, line: &str) -> Option<usize> {
        if self.headlines { headline_level(line) } else { None }
    }

    /// Parse nodes until a heading of `level` or shallower.
    fn section(&mut self, level: usize) -> Vec<Node> {
        let mut nodes = Vec::new();
        while let Some(line) = self.peek() {
            if let Some(depth) = self.heading_level(line) {
                if depth <= level {
                    break;
                }
                nodes.push(Node::Headline(self.headline(line, depth)));
            } else if let Some(node) = self.element(line) {
                nodes.push(node);
            }
        }
        nodes
    }

    fn headline(&mut self, line: &'a str, level: usize) -> Headline {
        self.pos += 1;
        self.ordinal += 1;
        let ordinal = self.ordinal;

        let (todo, title, tags) = split_headline(&line[level..]);
        while self
            .peek()
            .is_some_and(|l| PLANNING.iter().any(|p| l.trim_start().starts_with(p)))
        {
            self.pos += 1;
        }
        let properties = self.property_drawer();
        let children = self.section(level);

        Headline {
            level,
            ordinal,
            todo,
            title: parse_inline(title),
            tags,
            properties,
            children,
        }
    }

    fn property_drawer(&mut self) -> Vec<(String, String)> {
        let mut properties = Vec::new();
        if !self
            .peek()
            .is_some_and(|l| l.trim().eq_ignore_ascii_case(":PROPERTIES:"))
        {
            return properties;
        }
        self.pos += 1;

        while let Some(line) = self.peek() {
            if self.heading_level(line).is_some() {
                break;
            }
            self.pos += 1;
            let line = line.trim();
            if line.eq_ignore_ascii_case(":END:") {
                break;
            }
            if let Some((key, value)) = line.strip_prefix(':').and_then(|l| l.split_once(':'))
                && !key.is_empty()
                && !key.contains(char::is_whitespace)
            {
                properties.push((key.to_owned(), value.trim().to_owned()));
            }
        }
        properties
    }

    /// Parse one non-heading element starting at `line`. Returns `None` for
    /// lines that produce no node (blank lines, keywords, comments, drawers).
    fn element(&mut self, line: &'a str) -> Option<Node> {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            self.pos += 1;
            return None;
        }
        if starts_with_ignore_case(trimmed, "#+begin_") {
            return self.block(trimmed);
        }
        if let Some(rest) = trimmed.strip_prefix("#+") {
            self.pos += 1;
            if let Some((key, value)) = rest.split_once(':')
                && !key.contains(char::is_whitespace)
            {
                self.keywords
                    .push((key.to_ascii_uppercase(), value.trim().to_owned()));
            }
            return None;
        }
        if trimmed == "#" || trimmed.starts_with("# ") {
            self.pos += 1;
            return None;
        }
        if is_drawer_start(trimmed) {
            self.skip_drawer();
            return None;
        }
        if is_rule(trimmed) {
            self.pos += 1;
            return Some(Node::Rule);
        }
        if trimmed.starts_with('|') {
            return Some(self.table());
        }
        if let Some(item) = list_item(line) {
            return Some(self.list(&item));
        }
        Some(self.paragraph())
    }

    fn block(&mut self, header: &str) -> Option<Node> {
        let header = &header["#+begin_".len()..];
        let (name, parameters) = header
            .split_once(char::is_whitespace)
            .unwrap_or((header, ""));
        let kind = name.to_ascii_lowercase();
        let end = format!("#+end_{kind}");

        self.pos += 1;
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|l| !l.trim().eq_ignore_ascii_case(&end))
        {
            self.pos += 1;
        }
        let body: Vec<&'a str> = self.lines[start..self.pos].to_vec();
        // Step past `#+end_...` (no-op at EOF)
        self.pos = (self.pos + 1).min(self.lines.len());

        if kind == "comment" {
            return None;
        }

        let body = if RAW_BLOCKS.contains(&kind.as_str()) {
            BlockBody::Raw(dedent_block(&body))
        } else {
            BlockBody::Nodes(Parser::new(body, false).section(0))
        };

        Some(Node::Block(Block {
            kind,
            parameters: parameters.trim().to_owned(),
            body,
        }))
    }

    fn skip_drawer(&mut self) {
        self.pos += 1;
        while let Some(line) = self.peek() {
            if self.heading_level(line).is_some() {
                return;
            }
            self.pos += 1;
            if line.trim().eq_ignore_ascii_case(":END:") {
                return;
            }
        }
    }

    fn table(&mut self) -> Node {
        let mut rows = Vec::new();
        while let Some(line) = self.peek() {
            let line = line.trim();
            if !line.starts_with('|') {
                break;
            }
            self.pos += 1;
            if line.starts_with("|-") {
                continue;
            }
            let inner = line[1..].strip_suffix('|').unwrap_or(&line[1..]);
            rows.push(inner.split('|').map(|cell| parse_inline(cell.trim())).collect());
        }
        Node::Table(rows)
    }

    fn list(&mut self, first: &ListItem<'a>) -> Node {
        let mut items = Vec::new();

        while let Some(line) = self.peek() {
            if line.trim().is_empty() {
                // A single blank line between items keeps the list open
                let next = self.next_non_blank(self.pos);
                match next.and_then(|(_, l)| list_item(l)) {
                    Some(item) if item.same_list(first) => {
                        self.pos = next.map_or(self.pos, |(at, _)| at);
                        continue;
                    }
                    _ => break,
                }
            }

            let Some(item) = list_item(line).filter(|item| item.same_list(first)) else {
                break;
            };
            self.pos += 1;

            let mut body = vec![item.text];
            while let Some(next) = self.peek() {
                if next.trim().is_empty() {
                    let deeper = self
                        .next_non_blank(self.pos)
                        .is_some_and(|(_, l)| indent_of(l) > item.indent);
                    if !deeper {
                        break;
                    }
                    body.push("");
                } else if indent_of(next) <= item.indent || self.heading_level(next).is_some() {
                    break;
                } else {
                    body.push(dedent(next, item.content_col));
                }
                self.pos += 1;
            }

            items.push(Parser::new(body, false).section(0));
        }

        Node::List(List {
            ordered: first.ordered,
            items,
        })
    }

    fn paragraph(&mut self) -> Node {
        let mut lines = Vec::new();
        while let Some(line) = self.peek() {
            if !lines.is_empty() && (line.trim().is_empty() || self.starts_element(line)) {
                break;
            }
            lines.push(line.trim());
            self.pos += 1;
        }
        Node::Paragraph(parse_inline(&lines.join("\n")))
    }

    /// Whether `line` would open something other than paragraph text.
    fn starts_element(&self, line: &str) -> bool {
        let trimmed = line.trim();
        self.heading_level(line).is_some()
            || trimmed.starts_with("#+")
            || trimmed.starts_with('|')
            || trimmed.starts_with("# ")
            || is_drawer_start(trimmed)
            || is_rule(trimmed)
            || list_item(line).is_some()
    }

    fn next_non_blank(&self, from: usize) -> Option<(usize, &'a str)> {
        self.lines[from..]
            .iter()
            .enumerate()
            .find(|(_, l)| !l.trim().is_empty())
            .map(|(offset, l)| (from + offset, *l))
    }
}

// ============================================================================
// Line classification
// ============================================================================

fn headline_level(line: &str) -> Option<usize> {
    let stars = line.bytes().take_while(|&b| b == b'*').count();
    let after = line.as_bytes().get(stars).copied();
    (stars > 0 && matches!(after, Some(b' ' | b'\t'))).then_some(stars)
}

/// Split the text after the stars into TODO keyword, title and tags.
fn split_headline(rest: &str) -> (Option<String>, &str, Vec<String>) {
    let mut title = rest.trim();

    let mut todo = None;
    for keyword in TODO_KEYWORDS {
        if let Some(after) = title.strip_prefix(keyword)
            && (after.is_empty() || after.starts_with(char::is_whitespace))
        {
            todo = Some((*keyword).to_owned());
            title = after.trim_start();
            break;
        }
    }

    // Priority cookie: [#A]
    if title.len() >= 4 && title.starts_with("[#") && title.as_bytes()[3] == b']' {
        title = title[4..].trim_start();
    }

    let mut tags = Vec::new();
    let last = title.rsplit(char::is_whitespace).next().unwrap_or("");
    if is_tag_group(last) {
        tags = last
            .split(':')
            .filter(|t| !t.is_empty())
            .map(str::to_owned)
            .collect();
        title = title[..title.len() - last.len()].trim_end();
    }

    (todo, title, tags)
}

fn is_tag_group(s: &str) -> bool {
    s.len() >= 3
        && s.starts_with(':')
        && s.ends_with(':')
        && s
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, ':' | '_' | '@' | '#' | '%'))
}

fn is_drawer_start(trimmed: &str) -> bool {
    trimmed.len() > 2
        && trimmed.starts_with(':')
        && trimmed.ends_with(':')
        && !trimmed.eq_ignore_ascii_case(":END:")
        && trimmed[1..trimmed.len() - 1]
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn is_rule(trimmed: &str) -> bool {
    trimmed.len() >= 5 && trimmed.bytes().all(|b| b == b'-')
}

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

fn indent_of(line: &str) -> usize {
    line.bytes().take_while(|&b| b == b' ' || b == b'\t').count()
}

/// Strip at most `col` leading spaces/tabs.
fn dedent(line: &str, col: usize) -> &str {
    &line[indent_of(line).min(col)..]
}

/// Remove the indentation shared by all non-blank lines.
fn dedent_block(lines: &[&str]) -> String {
    let common = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| indent_of(l))
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|l| dedent(l, common))
        .collect::<Vec<_>>()
        .join("\n")
}

struct ListItem<'a> {
    indent: usize,
    ordered: bool,
    /// Column where item text starts (continuation lines are dedented to it)
    content_col: usize,
    text: &'a str,
}

impl ListItem<'_> {
    fn same_list(&self, other: &ListItem<'_>) -> bool {
        self.indent == other.indent && self.ordered == other.ordered
    }
}

fn list_item(line: &str) -> Option<ListItem<'_>> {
    let indent = indent_of(line);
    let rest = &line[indent..];
    let bytes = rest.as_bytes();

    let (ordered, marker_len) = match bytes.first()? {
        b'-' | b'+' => (false, 1),
        b'*' if indent > 0 => (false, 1),
        b'0'..=b'9' => {
            let digits = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
            match bytes.get(digits) {
                Some(b'.' | b')') => (true, digits + 1),
                _ => return None,
            }
        }
        _ => return None,
    };

    let text = match bytes.get(marker_len) {
        None => "",
        Some(b' ' | b'\t') => &rest[marker_len + 1..],
        Some(_) => return None,
    };

    Some(ListItem {
        indent,
        ordered,
        content_col: indent + marker_len + 1,
        text,
    })
}
