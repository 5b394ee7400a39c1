//! Inline markup: links and emphasis.

use super::{Emphasis, Inline};

/// Characters allowed right before an opening emphasis marker.
const PRE: &[char] = &['-', '(', '{', '\'', '"'];

/// Characters allowed right after a closing emphasis marker.
const POST: &[char] = &['-', '.', ',', ';', ':', '!', '?', '\'', '"', ')', '}', '[', '\\'];

const fn marker_kind(marker: u8) -> Option<Emphasis> {
    match marker {
        b'*' => Some(Emphasis::Bold),
        b'/' => Some(Emphasis::Italic),
        b'_' => Some(Emphasis::Underline),
        b'+' => Some(Emphasis::Strike),
        b'=' => Some(Emphasis::Verbatim),
        b'~' => Some(Emphasis::Code),
        _ => None,
    }
}

pub fn parse_inline(text: &str) -> Vec<Inline> {
    let mut out = Vec::new();
    let mut pending = String::new();
    let mut i = 0;

    while i < text.len() {
        let rest = &text[i..];

        let parsed = if rest.starts_with("[[") {
            parse_link(rest)
        } else {
            marker_kind(text.as_bytes()[i]).and_then(|kind| parse_emphasis(text, i, kind))
        };

        if let Some((inline, len)) = parsed {
            flush(&mut pending, &mut out);
            out.push(inline);
            i += len;
            continue;
        }

        let Some(ch) = rest.chars().next() else { break };
        pending.push(ch);
        i += ch.len_utf8();
    }

    flush(&mut pending, &mut out);
    out
}

fn flush(pending: &mut String, out: &mut Vec<Inline>) {
    if !pending.is_empty() {
        out.push(Inline::Text(std::mem::take(pending)));
    }
}

/// `[[url]]` or `[[url][description]]`, returning the consumed length.
fn parse_link(s: &str) -> Option<(Inline, usize)> {
    let end = s.find("]]")?;
    let inner = &s[2..end];
    if inner.trim().is_empty() {
        return None;
    }

    let link = match inner.split_once("][") {
        Some((url, description)) => Inline::Link {
            url: url.trim().to_owned(),
            description: parse_inline(description),
        },
        None => Inline::Link {
            url: inner.trim().to_owned(),
            description: Vec::new(),
        },
    };
    Some((link, end + 2))
}

/// Emphasis opening at byte `start`, returning the consumed length.
fn parse_emphasis(text: &str, start: usize, kind: Emphasis) -> Option<(Inline, usize)> {
    let marker = text.as_bytes()[start];

    let before_ok = text[..start]
        .chars()
        .next_back()
        .is_none_or(|c| c.is_whitespace() || PRE.contains(&c));
    let first = text[start + 1..].chars().next()?;
    if !before_ok || first.is_whitespace() {
        return None;
    }

    let bytes = text.as_bytes();
    let close = (start + 2..bytes.len()).find(|&j| {
        bytes[j] == marker
            && text[..j].chars().next_back().is_some_and(|c| !c.is_whitespace())
            && text[j + 1..]
                .chars()
                .next()
                .is_none_or(|c| c.is_whitespace() || POST.contains(&c))
    })?;

    let inner = &text[start + 1..close];
    let content = match kind {
        Emphasis::Verbatim | Emphasis::Code => vec![Inline::Text(inner.to_owned())],
        _ => parse_inline(inner),
    };
    Some((Inline::Emphasis { kind, content }, close + 1 - start))
}
