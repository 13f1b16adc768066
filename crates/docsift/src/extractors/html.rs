//! HTML decoder.
//!
//! Parses HTML with a small forgiving tokenizer into an element tree,
//! strips script/style-like subtrees, and walks the rest emitting text
//! with block-level newlines. Headings, links, and tables are collected
//! as first-class records alongside the flattened text.

use crate::error::Result;
use crate::types::{ExtractedContent, HtmlContent, HtmlHeading, HtmlLink, HtmlMetadata, Table};
use once_cell::sync::Lazy;
use regex::Regex;
use regex::bytes::Regex as BytesRegex;

/// Tags removed entirely, content included.
const REMOVE_TAGS: &[&str] = &["script", "style", "noscript", "iframe", "object", "embed", "applet"];

/// Block-level tags wrapped with newlines in the flattened text.
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "header", "footer", "nav", "aside", "main", "h1", "h2", "h3", "h4", "h5", "h6",
    "blockquote", "pre", "address", "figure", "figcaption", "form", "fieldset", "ul", "ol", "li", "dl", "dt", "dd",
    "table", "tr", "hr", "br",
];

/// Elements that never carry content.
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr",
];

/// Elements whose content is raw text up to the matching close tag.
const RAW_TEXT_TAGS: &[&str] = &["script", "style", "noscript", "title", "textarea"];

static META_CHARSET_RE: Lazy<BytesRegex> =
    Lazy::new(|| BytesRegex::new(r#"(?i)<meta[^>]+charset=["']?([^"'\s>;]+)"#).unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static MULTI_NEWLINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

pub fn read_html(data: &[u8], path: Option<&str>) -> Result<Vec<ExtractedContent>> {
    let (text, detected) = decode_html_bytes(data);
    let content = extract_from_str(&text, path, &detected);
    Ok(vec![ExtractedContent::Html(content)])
}

/// Decode HTML bytes: byte-order mark first, then a `meta charset`
/// declaration, defaulting to UTF-8.
pub(crate) fn decode_html_bytes(data: &[u8]) -> (String, String) {
    if let Some(stripped) = data.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return (String::from_utf8_lossy(stripped).into_owned(), "utf-8".to_string());
    }
    if data.starts_with(&[0xFF, 0xFE]) {
        let (text, _, _) = encoding_rs::UTF_16LE.decode(&data[2..]);
        return (text.into_owned(), "utf-16-le".to_string());
    }
    if data.starts_with(&[0xFE, 0xFF]) {
        let (text, _, _) = encoding_rs::UTF_16BE.decode(&data[2..]);
        return (text.into_owned(), "utf-16-be".to_string());
    }
    if let Some(captures) = META_CHARSET_RE.captures(data) {
        let label = String::from_utf8_lossy(&captures[1]).into_owned();
        if let Some(encoding) = encoding_rs::Encoding::for_label(label.as_bytes()) {
            let (text, _, _) = encoding.decode(data);
            return (text.into_owned(), label.to_ascii_lowercase());
        }
    }
    (String::from_utf8_lossy(data).into_owned(), "utf-8".to_string())
}

/// Run the structural extraction over already-decoded HTML text.
pub(crate) fn extract_from_str(html: &str, path: Option<&str>, charset: &str) -> HtmlContent {
    let root = parse_document(html);

    let mut metadata = HtmlMetadata::default();
    if let Some(path) = path {
        metadata.file.populate_from_path(path);
    }
    metadata.file.detected_encoding = Some(charset.to_string());
    metadata.charset = charset.to_string();
    extract_metadata(&root, &mut metadata);

    let mut walker = TextWalker::default();
    let start = find_first(&root, "body").unwrap_or(&root);
    let text = walker.process(start, 0);

    let text = MULTI_NEWLINE_RE.replace_all(&text, "\n\n");
    let text = text
        .split('\n')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string();
    let text = MULTI_NEWLINE_RE.replace_all(&text, "\n\n").into_owned();

    collect_headings(&root, &mut walker.headings);
    collect_links(&root, &mut walker.links);

    HtmlContent {
        metadata,
        text,
        headings: walker.headings,
        links: walker.links,
        tables: walker.tables,
    }
}

// --- minimal forgiving DOM --------------------------------------------------

#[derive(Debug)]
pub(crate) enum HtmlNode {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
        children: Vec<HtmlNode>,
    },
    Text(String),
}

impl HtmlNode {
    fn tag(&self) -> Option<&str> {
        match self {
            HtmlNode::Element { tag, .. } => Some(tag),
            HtmlNode::Text(_) => None,
        }
    }

    fn attr(&self, name: &str) -> Option<&str> {
        match self {
            HtmlNode::Element { attrs, .. } => attrs
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.as_str()),
            HtmlNode::Text(_) => None,
        }
    }

    fn children(&self) -> &[HtmlNode] {
        match self {
            HtmlNode::Element { children, .. } => children,
            HtmlNode::Text(_) => &[],
        }
    }

    /// Concatenated text of the subtree.
    fn inner_text(&self) -> String {
        match self {
            HtmlNode::Text(text) => text.clone(),
            HtmlNode::Element { children, .. } => children.iter().map(HtmlNode::inner_text).collect(),
        }
    }
}

/// Parse a whole document into a synthetic root element.
pub(crate) fn parse_document(html: &str) -> HtmlNode {
    let mut parser = Parser {
        input: html.as_bytes(),
        pos: 0,
    };
    let mut stack: Vec<HtmlNode> = vec![HtmlNode::Element {
        tag: "#root".to_string(),
        attrs: Vec::new(),
        children: Vec::new(),
    }];

    while let Some(event) = parser.next_event() {
        match event {
            Event::Text(text) => {
                if !text.is_empty() {
                    push_child(&mut stack, HtmlNode::Text(text));
                }
            }
            Event::Open { tag, attrs, self_close } => {
                let is_void = VOID_TAGS.contains(&tag.as_str());
                if RAW_TEXT_TAGS.contains(&tag.as_str()) && !self_close {
                    let raw = parser.read_raw_text(&tag);
                    let node = HtmlNode::Element {
                        tag,
                        attrs,
                        children: vec![HtmlNode::Text(raw)],
                    };
                    push_child(&mut stack, node);
                } else if is_void || self_close {
                    push_child(&mut stack, HtmlNode::Element {
                        tag,
                        attrs,
                        children: Vec::new(),
                    });
                } else {
                    stack.push(HtmlNode::Element {
                        tag,
                        attrs,
                        children: Vec::new(),
                    });
                }
            }
            Event::Close(tag) => {
                // Pop to the matching open tag; an unmatched close is
                // ignored.
                if stack.iter().skip(1).any(|n| n.tag() == Some(tag.as_str())) {
                    loop {
                        let node = stack.pop().expect("synthetic root is never popped");
                        let done = node.tag() == Some(tag.as_str());
                        push_child(&mut stack, node);
                        if done {
                            break;
                        }
                    }
                }
            }
        }
    }

    // Close anything left dangling.
    while stack.len() > 1 {
        let node = stack.pop().expect("stack is non-empty");
        push_child(&mut stack, node);
    }
    stack.pop().expect("synthetic root remains")
}

fn push_child(stack: &mut [HtmlNode], child: HtmlNode) {
    if let Some(HtmlNode::Element { children, .. }) = stack.last_mut() {
        children.push(child);
    }
}

enum Event {
    Text(String),
    Open {
        tag: String,
        attrs: Vec<(String, String)>,
        self_close: bool,
    },
    Close(String),
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn next_event(&mut self) -> Option<Event> {
        if self.pos >= self.input.len() {
            return None;
        }
        if self.input[self.pos] == b'<' {
            self.parse_markup()
        } else {
            let start = self.pos;
            while self.pos < self.input.len() && self.input[self.pos] != b'<' {
                self.pos += 1;
            }
            let raw = &self.input[start..self.pos];
            Some(Event::Text(decode_entities(&String::from_utf8_lossy(raw))))
        }
    }

    fn parse_markup(&mut self) -> Option<Event> {
        let rest = &self.input[self.pos..];

        if rest.starts_with(b"<!--") {
            let end = find_sub(rest, b"-->").map(|i| i + 3).unwrap_or(rest.len());
            self.pos += end;
            return self.next_event();
        }
        if rest.starts_with(b"<!") || rest.starts_with(b"<?") {
            let end = find_sub(rest, b">").map(|i| i + 1).unwrap_or(rest.len());
            self.pos += end;
            return self.next_event();
        }
        if rest.starts_with(b"</") {
            let end = find_sub(rest, b">").map(|i| i + 1).unwrap_or(rest.len());
            let name: String = String::from_utf8_lossy(&rest[2..end.saturating_sub(1)])
                .trim()
                .to_ascii_lowercase();
            self.pos += end;
            if name.is_empty() {
                return self.next_event();
            }
            return Some(Event::Close(name));
        }

        // A bare '<' that does not open a tag is literal text.
        if rest.len() < 2 || !rest[1].is_ascii_alphabetic() {
            self.pos += 1;
            return Some(Event::Text("<".to_string()));
        }

        let end = match find_sub(rest, b">") {
            Some(end) => end,
            None => {
                self.pos = self.input.len();
                return None;
            }
        };
        let inside = String::from_utf8_lossy(&rest[1..end]).into_owned();
        self.pos += end + 1;

        let self_close = inside.trim_end().ends_with('/');
        let inside = inside.trim_end().trim_end_matches('/');
        let mut parts = inside.splitn(2, char::is_whitespace);
        let tag = parts.next().unwrap_or("").to_ascii_lowercase();
        let attrs = parts.next().map(parse_attrs).unwrap_or_default();

        Some(Event::Open { tag, attrs, self_close })
    }

    /// Consume raw text up to `</tag`, returning it undecoded.
    fn read_raw_text(&mut self, tag: &str) -> String {
        let closer = format!("</{tag}");
        let rest = &self.input[self.pos..];
        let lower: Vec<u8> = rest.iter().map(u8::to_ascii_lowercase).collect();
        match find_sub(&lower, closer.as_bytes()) {
            Some(index) => {
                let raw = String::from_utf8_lossy(&rest[..index]).into_owned();
                let after = find_sub(&lower[index..], b">").map(|i| index + i + 1).unwrap_or(rest.len());
                self.pos += after;
                raw
            }
            None => {
                let raw = String::from_utf8_lossy(rest).into_owned();
                self.pos = self.input.len();
                raw
            }
        }
    }
}

fn find_sub(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len().max(1)).position(|w| w == needle)
}

fn parse_attrs(input: &str) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    let bytes = input.as_bytes();
    let mut pos = 0usize;
    while pos < bytes.len() {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        let name_start = pos;
        while pos < bytes.len() && !bytes[pos].is_ascii_whitespace() && bytes[pos] != b'=' {
            pos += 1;
        }
        if pos == name_start {
            break;
        }
        let name = input[name_start..pos].to_ascii_lowercase();
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        let mut value = String::new();
        if pos < bytes.len() && bytes[pos] == b'=' {
            pos += 1;
            while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            if pos < bytes.len() && (bytes[pos] == b'"' || bytes[pos] == b'\'') {
                let quote = bytes[pos];
                pos += 1;
                let value_start = pos;
                while pos < bytes.len() && bytes[pos] != quote {
                    pos += 1;
                }
                value = decode_entities(&input[value_start..pos]);
                pos += 1;
            } else {
                let value_start = pos;
                while pos < bytes.len() && !bytes[pos].is_ascii_whitespace() {
                    pos += 1;
                }
                value = decode_entities(&input[value_start..pos]);
            }
        }
        attrs.push((name, value));
    }
    attrs
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut chars = text.char_indices();
    while let Some((i, ch)) = chars.next() {
        if ch != '&' {
            out.push(ch);
            continue;
        }
        let rest = &text[i..];
        if let Some(end) = rest.find(';').filter(|&e| e <= 12) {
            let entity = &rest[1..end];
            let replacement = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            };
            if let Some(replacement) = replacement {
                out.push(replacement);
                for _ in 0..end {
                    chars.next();
                }
                continue;
            }
        }
        out.push('&');
    }
    out
}

// --- structural walk --------------------------------------------------------

#[derive(Default)]
struct TextWalker {
    tables: Vec<Table>,
    headings: Vec<HtmlHeading>,
    links: Vec<HtmlLink>,
}

impl TextWalker {
    fn process(&mut self, node: &HtmlNode, depth: usize) -> String {
        match node {
            HtmlNode::Text(text) => text.clone(),
            HtmlNode::Element { tag, children, .. } => {
                if REMOVE_TAGS.contains(&tag.as_str()) {
                    return String::new();
                }

                match tag.as_str() {
                    "table" => {
                        let table = extract_table(node);
                        let rendered = format_table_as_text(&table);
                        self.tables.push(table);
                        format!("\n{rendered}\n")
                    }
                    "li" => {
                        let text: String = children.iter().map(|c| self.process(c, depth + 1)).collect();
                        let text = WHITESPACE_RE.replace_all(text.trim(), " ");
                        format!("{}- {}\n", "  ".repeat(depth), text)
                    }
                    "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                        let text = WHITESPACE_RE.replace_all(node.inner_text().trim(), " ").into_owned();
                        format!("\n{text}\n")
                    }
                    "br" => "\n".to_string(),
                    "hr" => "\n---\n".to_string(),
                    _ => {
                        let result: String = children.iter().map(|c| self.process(c, depth)).collect();
                        if BLOCK_TAGS.contains(&tag.as_str()) {
                            format!("\n{}\n", result.trim())
                        } else {
                            result
                        }
                    }
                }
            }
        }
    }
}

fn extract_table(table: &HtmlNode) -> Table {
    let mut rows = Vec::new();
    visit(table, &mut |node| {
        if node.tag() == Some("tr") {
            let mut row = Vec::new();
            visit(node, &mut |cell| {
                if matches!(cell.tag(), Some("td") | Some("th")) {
                    let text = WHITESPACE_RE.replace_all(cell.inner_text().trim(), " ").into_owned();
                    row.push(text);
                }
            });
            if !row.is_empty() {
                rows.push(row);
            }
        }
    });
    Table { rows }
}

/// Pipe-separated rows with right-padded columns.
fn format_table_as_text(table: &Table) -> String {
    if table.rows.is_empty() {
        return String::new();
    }
    let num_cols = table.rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut widths = vec![0usize; num_cols];
    for row in &table.rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }
    table
        .rows
        .iter()
        .map(|row| {
            (0..num_cols)
                .map(|i| {
                    let cell = row.get(i).map(String::as_str).unwrap_or("");
                    format!("{cell:<width$}", width = widths[i])
                })
                .collect::<Vec<_>>()
                .join(" | ")
                .trim_end()
                .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn visit<'a>(node: &'a HtmlNode, f: &mut impl FnMut(&'a HtmlNode)) {
    for child in node.children() {
        f(child);
        visit(child, f);
    }
}

fn find_first<'a>(node: &'a HtmlNode, tag: &str) -> Option<&'a HtmlNode> {
    for child in node.children() {
        if child.tag() == Some(tag) {
            return Some(child);
        }
        if let Some(found) = find_first(child, tag) {
            return Some(found);
        }
    }
    None
}

fn collect_headings(root: &HtmlNode, out: &mut Vec<HtmlHeading>) {
    visit(root, &mut |node| {
        if let Some(tag) = node.tag()
            && tag.len() == 2
            && tag.starts_with('h')
            && let Some(level) = tag[1..].parse::<u32>().ok().filter(|l| (1..=6).contains(l))
        {
            let text = WHITESPACE_RE.replace_all(node.inner_text().trim(), " ").into_owned();
            if !text.is_empty() {
                out.push(HtmlHeading { level, text });
            }
        }
    });
}

fn collect_links(root: &HtmlNode, out: &mut Vec<HtmlLink>) {
    visit(root, &mut |node| {
        if node.tag() == Some("a")
            && let Some(href) = node.attr("href")
        {
            let text = WHITESPACE_RE.replace_all(node.inner_text().trim(), " ").into_owned();
            if !href.is_empty() && !text.is_empty() {
                out.push(HtmlLink {
                    text,
                    href: href.to_string(),
                });
            }
        }
    });
}

fn extract_metadata(root: &HtmlNode, metadata: &mut HtmlMetadata) {
    if let Some(title) = find_first(root, "title") {
        metadata.title = title.inner_text().trim().to_string();
    }
    visit(root, &mut |node| match node.tag() {
        Some("html") => {
            if let Some(lang) = node.attr("lang") {
                metadata.language = lang.to_string();
            }
        }
        Some("meta") => {
            if let Some(charset) = node.attr("charset") {
                metadata.charset = charset.to_string();
            } else if node
                .attr("http-equiv")
                .is_some_and(|v| v.eq_ignore_ascii_case("content-type"))
                && let Some(content) = node.attr("content")
                && let Some(charset) = content.split("charset=").nth(1)
            {
                metadata.charset = charset.split([';', ' ']).next().unwrap_or("").to_string();
            }
            if let (Some(name), Some(content)) = (node.attr("name"), node.attr("content")) {
                match name.to_ascii_lowercase().as_str() {
                    "description" => metadata.description = content.to_string(),
                    "keywords" => metadata.keywords = content.to_string(),
                    "author" => metadata.author = content.to_string(),
                    _ => {}
                }
            }
        }
        _ => {}
    });
}
