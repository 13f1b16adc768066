//! RTF decoder.
//!
//! RTF is plain ASCII with `\control` words and `{}` groups. Targeted
//! passes pull out the font/color/style tables, the `\info` group,
//! header/footer groups, fields, pictures, and footnotes; the body runs
//! through a char-by-char state machine where destination groups flip a
//! skip flag until their opening depth is popped and `\page` starts a
//! new page.

use crate::error::Result;
use crate::types::{
    Bookmark, ExtractedContent, HeaderFooter, Hyperlink, ImageRecord, Note, RtfColor, RtfContent, RtfField, RtfFont,
    RtfMetadata, RtfPage, RtfParagraph, RtfStyle,
};
use crate::util::encoding::decode_cp1252;
use once_cell::sync::Lazy;
use regex::Regex;

/// Destination groups skipped during body extraction.
const SKIP_DESTINATIONS: &[&str] = &[
    "fonttbl",
    "colortbl",
    "stylesheet",
    "info",
    "pict",
    "object",
    "datafield",
    "fldinst",
    "ftnsep",
    "ftnsepc",
    "aftnsep",
    "aftnsepc",
    "header",
    "footer",
    "headerl",
    "headerr",
    "headerf",
    "footerl",
    "footerr",
    "footerf",
    "pnseclvl",
    "xmlnstbl",
    "rsidtbl",
    "mmathPr",
    "generator",
    "listtable",
    "listoverridetable",
    "revtbl",
    "footnote",
    "annotation",
    "bkmkstart",
    "bkmkend",
];

fn special_char(word: &str) -> Option<&'static str> {
    Some(match word {
        "par" | "line" => "\n",
        "tab" => "\t",
        "lquote" | "rquote" => "'",
        "ldblquote" | "rdblquote" => "\"",
        "bullet" => "•",
        "endash" => "–",
        "emdash" => "—",
        "enspace" => "\u{2002}",
        "emspace" => "\u{2003}",
        "qmspace" => "\u{2005}",
        _ => return None,
    })
}

static FONT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\{\\f(\d+)(?:\\fbidi\s*)?\\f(\w+)(?:\\fcharset(\d+))?(?:\\fprq(\d+))?(?:\{[^}]*\})?\s*([^;}]*);?\}",
    )
    .unwrap()
});
static COLOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\\red(\d+)\\green(\d+)\\blue(\d+)").unwrap());
static STYLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\{(?:\\\*)?\\(s|cs|ts)(\d+)([^{}]*?)\s+([^;{}]+);?\}").unwrap());
static STYLE_BASEDON_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\sbasedon(\d+)").unwrap());
static STYLE_NEXT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\snext(\d+)").unwrap());
static HYPERLINK_URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)HYPERLINK\s+"([^"]+)""#).unwrap());
static BOOKMARK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)\{\\\*\\bkmkstart\s+([^}]+)\}").unwrap());
static PICT_W_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\picw(\d+)").unwrap());
static PICT_H_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\pich(\d+)").unwrap());
static HEX_DATA_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"([0-9a-fA-F]{20,})").unwrap());
static UNICODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\u(-?\d+)\??").unwrap());
static HEXESC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\'([0-9a-fA-F]{2})").unwrap());
static CONTROL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\\[a-z]+(-?\d+)?\s?").unwrap());
static SPACE_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").unwrap());
static NEWLINE_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());
static INFO_NUM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\\(version|vern|nofpages|nofwords|nofcharsws|nofchars)(\d+)\}").unwrap());
static DATE_PART_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\(yr|mo|dy|hr|min)(\d+)").unwrap());

pub fn read_rtf(data: &[u8], path: Option<&str>) -> Result<Vec<ExtractedContent>> {
    // Decode: UTF-8 first, then CP-1252 (which accepts any byte).
    let text = match std::str::from_utf8(data) {
        Ok(text) => text.to_string(),
        Err(_) => decode_cp1252(data),
    };

    let mut content = RtfContent::default();
    if let Some(path) = path {
        content.metadata.file.populate_from_path(path);
    }

    if !text.starts_with("{\\rtf") {
        // Not a valid header; the simple strip is all we can offer.
        content.full_text = strip_rtf_simple(&text);
        return Ok(vec![ExtractedContent::Rtf(content)]);
    }

    extract_fonts(&text, &mut content);
    extract_colors(&text, &mut content);
    extract_styles(&text, &mut content);
    extract_metadata(&text, &mut content.metadata);
    extract_headers_footers(&text, &mut content);
    extract_body(&text, &mut content);
    extract_hyperlinks(&text, &mut content);
    extract_fields(&text, &mut content);
    extract_bookmarks(&text, &mut content);
    extract_images(&text, &mut content);
    extract_footnotes(&text, &mut content);

    content.full_text = content
        .paragraphs
        .iter()
        .filter(|p| !p.text.trim().is_empty())
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    Ok(vec![ExtractedContent::Rtf(content)])
}

/// Balanced-brace contents of every `{\keyword …}` (or `{\*\keyword …}`)
/// group in the document.
fn find_groups<'a>(text: &'a str, keyword: &str) -> Vec<&'a str> {
    let mut out = Vec::new();
    let bytes = text.as_bytes();
    let plain = format!("{{\\{keyword}");
    let starred = format!("{{\\*\\{keyword}");

    let mut search_from = 0;
    while search_from < text.len() {
        let plain_pos = text[search_from..].find(&plain).map(|i| (i + search_from, plain.len()));
        let starred_pos = text[search_from..]
            .find(&starred)
            .map(|i| (i + search_from, starred.len()));
        let Some((start, prefix_len)) = [plain_pos, starred_pos].into_iter().flatten().min() else {
            break;
        };

        // The keyword must end here (reject \colortbl matching \color).
        let after = start + prefix_len;
        if bytes.get(after).is_some_and(|b| b.is_ascii_alphanumeric()) {
            search_from = after;
            continue;
        }

        // Walk to the balancing close brace.
        let mut depth = 1i32;
        let mut pos = after;
        while pos < bytes.len() && depth > 0 {
            match bytes[pos] {
                b'\\' => pos += 1, // skip escaped char
                b'{' => depth += 1,
                b'}' => depth -= 1,
                _ => {}
            }
            pos += 1;
        }
        // Balanced: stop before the closing brace. Unbalanced input runs
        // to the end of the document.
        let end = if depth == 0 { pos - 1 } else { bytes.len() };
        out.push(&text[after..end]);
        search_from = pos;
    }
    out
}

fn extract_fonts(text: &str, content: &mut RtfContent) {
    let Some(fonttbl) = find_groups(text, "fonttbl").into_iter().next() else {
        return;
    };
    for captures in FONT_RE.captures_iter(fonttbl) {
        content.fonts.push(RtfFont {
            font_id: captures[1].parse().unwrap_or(0),
            font_family: captures[2].to_string(),
            charset: captures.get(3).and_then(|m| m.as_str().parse().ok()).unwrap_or(0),
            pitch: captures.get(4).and_then(|m| m.as_str().parse().ok()).unwrap_or(0),
            font_name: captures[5].trim().to_string(),
        });
    }
}

fn extract_colors(text: &str, content: &mut RtfContent) {
    let Some(colortbl) = find_groups(text, "colortbl").into_iter().next() else {
        return;
    };
    for (index, captures) in COLOR_RE.captures_iter(colortbl).enumerate() {
        content.colors.push(RtfColor {
            index: index as i64,
            red: captures[1].parse().unwrap_or(0),
            green: captures[2].parse().unwrap_or(0),
            blue: captures[3].parse().unwrap_or(0),
        });
    }
}

fn extract_styles(text: &str, content: &mut RtfContent) {
    let Some(stylesheet) = find_groups(text, "stylesheet").into_iter().next() else {
        return;
    };
    for captures in STYLE_RE.captures_iter(stylesheet) {
        let properties = &captures[3];
        content.styles.push(RtfStyle {
            style_id: captures[2].parse().unwrap_or(0),
            style_type: match &captures[1] {
                "cs" => "character".to_string(),
                "ts" => "table".to_string(),
                _ => "paragraph".to_string(),
            },
            style_name: captures[4].trim().to_string(),
            based_on: STYLE_BASEDON_RE
                .captures(properties)
                .and_then(|c| c[1].parse().ok()),
            next_style: STYLE_NEXT_RE.captures(properties).and_then(|c| c[1].parse().ok()),
        });
    }
}

fn extract_metadata(text: &str, metadata: &mut RtfMetadata) {
    let Some(info) = find_groups(text, "info").into_iter().next() else {
        return;
    };

    let field = |keyword: &str| -> String {
        let pattern = Regex::new(&format!(r"(?is)\{{\\{keyword}\s+([^}}]*)\}}")).expect("valid info pattern");
        let Some(captures) = pattern.captures(info) else {
            return String::new();
        };
        let mut value = captures[1].trim().to_string();
        value = HEXESC_RE
            .replace_all(&value, |c: &regex::Captures| {
                let byte = u8::from_str_radix(&c[1], 16).unwrap_or(b'?');
                decode_cp1252(&[byte])
            })
            .into_owned();
        value = value.replace("\\~", " ");
        value = CONTROL_RE.replace_all(&value, "").into_owned();
        value.replace(['{', '}'], "").trim().to_string()
    };

    metadata.title = field("title");
    metadata.subject = field("subject");
    metadata.author = field("author");
    metadata.keywords = field("keywords");
    metadata.comments = field("comment");
    metadata.operator = field("operator");
    metadata.category = field("category");
    metadata.manager = field("manager");
    metadata.company = field("company");
    metadata.doc_comment = field("doccomm");

    for captures in INFO_NUM_RE.captures_iter(info) {
        let value: i64 = captures[2].parse().unwrap_or(0);
        match &captures[1] {
            "version" => metadata.version = value,
            "vern" => metadata.revision = value,
            "nofpages" => metadata.num_pages = value,
            "nofwords" => metadata.num_words = value,
            "nofcharsws" => metadata.num_chars_with_spaces = value,
            "nofchars" => metadata.num_chars = value,
            _ => {}
        }
    }

    metadata.created = parse_rtf_date(info, "creatim");
    metadata.modified = parse_rtf_date(info, "revtim");
}

/// Dates are assembled from `\yr\mo\dy\hr\min` inside the group.
fn parse_rtf_date(info: &str, keyword: &str) -> String {
    let Some(group) = find_groups(info, keyword).into_iter().next() else {
        return String::new();
    };
    let (mut year, mut month, mut day, mut hour, mut minute) = (None, None, None, 0u32, 0u32);
    for captures in DATE_PART_RE.captures_iter(group) {
        let value: u32 = captures[2].parse().unwrap_or(0);
        match &captures[1] {
            "yr" => year = Some(value),
            "mo" => month = Some(value),
            "dy" => day = Some(value),
            "hr" => hour = value,
            "min" => minute = value,
            _ => {}
        }
    }
    match (year, month, day) {
        (Some(y), Some(m), Some(d)) => format!("{y:04}-{m:02}-{d:02}T{hour:02}:{minute:02}:00"),
        _ => String::new(),
    }
}

fn extract_headers_footers(text: &str, content: &mut RtfContent) {
    for kind in ["header", "headerl", "headerr", "headerf", "footer", "footerl", "footerr", "footerf"] {
        for group in find_groups(text, kind) {
            let extracted = strip_rtf_simple(group);
            if extracted.trim().is_empty() {
                continue;
            }
            let record = HeaderFooter {
                kind: kind.to_string(),
                text: extracted.trim().to_string(),
            };
            if kind.starts_with("header") {
                content.headers.push(record);
            } else {
                content.footers.push(record);
            }
        }
    }
}

/// Fields are `{\field{\*\fldinst …}{\fldrslt …}}` groups with nested
/// brace balance; HYPERLINK fields become hyperlink records, everything
/// else becomes a generic field record.
fn extract_hyperlinks(text: &str, content: &mut RtfContent) {
    for field_group in find_groups(text, "field") {
        let Some(instruction_raw) = find_groups(field_group, "fldinst").into_iter().next() else {
            continue;
        };
        let Some(url) = HYPERLINK_URL_RE
            .captures(instruction_raw)
            .map(|c| c[1].trim().to_string())
            .filter(|url| !url.is_empty())
        else {
            continue;
        };
        let result = find_groups(field_group, "fldrslt")
            .into_iter()
            .next()
            .map(|r| strip_rtf_simple(r).trim().to_string())
            .unwrap_or_default();
        content.hyperlinks.push(Hyperlink { text: result, url });
    }
}

fn extract_fields(text: &str, content: &mut RtfContent) {
    for field_group in find_groups(text, "field") {
        let Some(instruction_raw) = find_groups(field_group, "fldinst").into_iter().next() else {
            continue;
        };
        let instruction = strip_rtf_simple(instruction_raw).trim().to_string();
        let upper = instruction.to_uppercase();
        if upper.contains("HYPERLINK") {
            continue;
        }
        let field_type = if upper.contains("PAGE") {
            "page"
        } else if upper.contains("DATE") {
            "date"
        } else if upper.contains("TIME") {
            "time"
        } else if upper.contains("STYLEREF") {
            "styleref"
        } else if upper.contains("TOC") {
            "toc"
        } else {
            "unknown"
        };
        let result = find_groups(field_group, "fldrslt")
            .into_iter()
            .next()
            .map(|r| strip_rtf_simple(r).trim().to_string())
            .unwrap_or_default();
        content.fields.push(RtfField {
            field_type: field_type.to_string(),
            field_instruction: instruction,
            field_result: result,
        });
    }
}

fn extract_bookmarks(text: &str, content: &mut RtfContent) {
    for captures in BOOKMARK_RE.captures_iter(text) {
        let name = captures[1].trim().to_string();
        if !name.is_empty() {
            content.bookmarks.push(Bookmark {
                name,
                text: String::new(),
            });
        }
    }
}

fn extract_images(text: &str, content: &mut RtfContent) {
    for pict in find_groups(text, "pict") {
        let content_type = if pict.contains("\\pngblip") {
            "image/png"
        } else if pict.contains("\\jpegblip") {
            "image/jpeg"
        } else if pict.contains("\\emfblip") {
            "image/x-emf"
        } else if pict.contains("\\wmetafile") {
            "image/x-wmf"
        } else {
            "application/octet-stream"
        };

        let width = PICT_W_RE.captures(pict).and_then(|c| c[1].parse().ok());
        let height = PICT_H_RE.captures(pict).and_then(|c| c[1].parse().ok());

        let data = HEX_DATA_RE.captures(pict).and_then(|c| {
            let hex = &c[1];
            (0..hex.len() - 1)
                .step_by(2)
                .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok())
                .collect::<Option<Vec<u8>>>()
        });

        content.images.push(ImageRecord {
            image_index: (content.images.len() + 1) as u32,
            unit_index: None,
            name: format!("pict{}", content.images.len() + 1),
            content_type: content_type.to_string(),
            size_bytes: data.as_ref().map(Vec::len).unwrap_or(0) as u64,
            width,
            height,
            data,
            ..Default::default()
        });
    }
}

fn extract_footnotes(text: &str, content: &mut RtfContent) {
    for (index, group) in find_groups(text, "footnote").into_iter().enumerate() {
        let footnote_text = strip_rtf_simple(group).trim().to_string();
        if !footnote_text.is_empty() {
            content.footnotes.push(Note {
                id: (index + 1).to_string(),
                text: footnote_text,
            });
        }
    }
}

/// Body extraction: the state machine over the whole document, with
/// destination groups skipped and pages split at `\page`.
fn extract_body(text: &str, content: &mut RtfContent) {
    let full = strip_rtf_full_with_pages(text, &mut content.pages);
    for paragraph in full.split('\n') {
        let cleaned = paragraph.trim();
        if !cleaned.is_empty() {
            content.paragraphs.push(RtfParagraph {
                text: cleaned.to_string(),
            });
        }
    }
}

fn normalize_whitespace(text: &str) -> String {
    let text = SPACE_RUN_RE.replace_all(text.trim(), " ");
    NEWLINE_RUN_RE.replace_all(&text, "\n\n").into_owned()
}

fn is_skip_destination(ahead: &str) -> bool {
    if ahead.starts_with("\\*") {
        return true;
    }
    SKIP_DESTINATIONS.iter().any(|kw| {
        ahead
            .strip_prefix('\\')
            .and_then(|rest| rest.strip_prefix(kw))
            .is_some_and(|tail| !tail.starts_with(|c: char| c.is_ascii_alphanumeric()))
    })
}

fn strip_rtf_full_with_pages(text: &str, pages: &mut Vec<RtfPage>) -> String {
    let chars: Vec<char> = text.chars().collect();
    let n = chars.len();
    let mut result = String::new();
    let mut current_page = String::new();
    let mut i = 0usize;
    let mut group_depth = 0i32;
    let mut skip_group = false;
    let mut skip_depth = 0i32;

    let mut flush_page = |current_page: &mut String, pages: &mut Vec<RtfPage>| {
        let page_text = normalize_whitespace(current_page);
        if !page_text.is_empty() {
            pages.push(RtfPage {
                number: (pages.len() + 1) as u32,
                text: page_text,
            });
        }
        current_page.clear();
    };

    while i < n {
        let ch = chars[i];
        match ch {
            '{' => {
                group_depth += 1;
                if !skip_group && i + 1 < n && chars[i + 1] == '\\' {
                    let ahead: String = chars[i + 1..(i + 30).min(n)].iter().collect();
                    if is_skip_destination(&ahead) {
                        skip_group = true;
                        skip_depth = group_depth;
                    }
                }
                i += 1;
            }
            '}' => {
                if skip_group && group_depth == skip_depth {
                    skip_group = false;
                }
                group_depth -= 1;
                i += 1;
            }
            _ if skip_group => i += 1,
            '\\' => {
                let Some(&next) = chars.get(i + 1) else {
                    i += 1;
                    continue;
                };
                match next {
                    '\\' | '{' | '}' => {
                        current_page.push(next);
                        result.push(next);
                        i += 2;
                    }
                    'u' if chars.get(i + 2).is_some_and(|c| c.is_ascii_digit() || *c == '-') => {
                        let mut j = i + 2;
                        let mut digits = String::new();
                        if chars[j] == '-' {
                            digits.push('-');
                            j += 1;
                        }
                        while j < n && chars[j].is_ascii_digit() {
                            digits.push(chars[j]);
                            j += 1;
                        }
                        if j < n && chars[j] == '?' {
                            j += 1;
                        }
                        if let Ok(code) = digits.parse::<i32>()
                            && let Some(ch) = char::from_u32((code as u32) & 0xFFFF)
                        {
                            current_page.push(ch);
                            result.push(ch);
                        }
                        i = j;
                    }
                    '\'' => {
                        if i + 3 < n {
                            let hex: String = chars[i + 2..i + 4].iter().collect();
                            if let Ok(byte) = u8::from_str_radix(&hex, 16) {
                                let decoded = decode_cp1252(&[byte]);
                                current_page.push_str(&decoded);
                                result.push_str(&decoded);
                            }
                            i += 4;
                        } else {
                            i += 2;
                        }
                    }
                    '~' => {
                        current_page.push('\u{a0}');
                        result.push('\u{a0}');
                        i += 2;
                    }
                    '-' | '_' => {
                        i += 2;
                    }
                    c if c.is_ascii_alphabetic() => {
                        let mut j = i + 1;
                        while j < n && chars[j].is_ascii_alphabetic() {
                            j += 1;
                        }
                        let word: String = chars[i + 1..j].iter().collect();
                        // Optional signed parameter.
                        if j < n && (chars[j].is_ascii_digit() || chars[j] == '-') {
                            j += 1;
                            while j < n && chars[j].is_ascii_digit() {
                                j += 1;
                            }
                        }
                        // One trailing space belongs to the control word.
                        if j < n && chars[j] == ' ' {
                            j += 1;
                        }

                        if word == "page" || word == "sbkpage" {
                            flush_page(&mut current_page, pages);
                        } else if let Some(replacement) = special_char(&word) {
                            current_page.push_str(replacement);
                            result.push_str(replacement);
                        }
                        i = j;
                    }
                    _ => {
                        i += 2;
                    }
                }
            }
            '\r' => i += 1,
            _ => {
                current_page.push(ch);
                result.push(ch);
                i += 1;
            }
        }
    }

    flush_page(&mut current_page, pages);

    if pages.is_empty() {
        let full = normalize_whitespace(&result);
        if !full.is_empty() {
            pages.push(RtfPage {
                number: 1,
                text: full,
            });
        }
    }

    normalize_whitespace(&result)
}

/// Fallback strip used for header/field/footnote fragments and invalid
/// headers: resolve escapes, drop control words and braces.
fn strip_rtf_simple(text: &str) -> String {
    let text = UNICODE_RE.replace_all(text, |c: &regex::Captures| {
        let code: i32 = c[1].parse().unwrap_or(0);
        char::from_u32((code as u32) & 0xFFFF)
            .map(String::from)
            .unwrap_or_default()
    });
    let text = HEXESC_RE.replace_all(&text, |c: &regex::Captures| {
        let byte = u8::from_str_radix(&c[1], 16).unwrap_or(b'?');
        decode_cp1252(&[byte])
    });

    let mut replaced = text.into_owned();
    for word in ["par", "line", "tab", "lquote", "rquote", "ldblquote", "rdblquote", "bullet", "endash", "emdash"] {
        let pattern = Regex::new(&format!(r"\\{word}(\s|$)")).expect("valid special-char pattern");
        replaced = pattern
            .replace_all(&replaced, special_char(word).unwrap_or(""))
            .into_owned();
    }

    let replaced = CONTROL_RE.replace_all(&replaced, "");
    let replaced = replaced.replace(['{', '}'], "");
    normalize_whitespace(&replaced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Content;

    fn rtf(content: &str) -> Vec<ExtractedContent> {
        read_rtf(content.as_bytes(), Some("doc.rtf")).unwrap()
    }

    #[test]
    fn test_pages_split_on_page_control() {
        let results = rtf(r"{\rtf1 A\par B\page C\par D}");
        let ExtractedContent::Rtf(content) = &results[0] else {
            panic!("expected rtf content");
        };

        assert_eq!(content.pages.len(), 2);
        assert!(content.pages[0].text.contains('A'));
        assert!(content.pages[0].text.contains('B'));
        assert!(content.pages[1].text.contains('C'));
        assert!(content.pages[1].text.contains('D'));
        assert_eq!(content.full_text, "A\nB\nC\nD");
        assert_eq!(results[0].full_text(), "A\nB\nC\nD");
    }

    #[test]
    fn test_units_are_pages() {
        let results = rtf(r"{\rtf1 one\page two}");
        let units = results[0].units();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].number, 1);
        assert_eq!(units[0].text, "one");
        assert_eq!(units[1].text, "two");
    }

    #[test]
    fn test_font_and_color_tables() {
        let results = rtf(
            r"{\rtf1{\fonttbl{\f0\froman\fcharset0 Times New Roman;}{\f1\fswiss Arial;}}{\colortbl;\red255\green0\blue0;\red0\green0\blue255;}Hello}",
        );
        let ExtractedContent::Rtf(content) = &results[0] else {
            panic!("expected rtf content");
        };
        assert_eq!(content.fonts.len(), 2);
        assert_eq!(content.fonts[0].font_name, "Times New Roman");
        assert_eq!(content.fonts[1].font_family, "swiss");
        assert_eq!(content.colors.len(), 2);
        assert_eq!(content.colors[0].red, 255);
        // Tables never leak into the body.
        assert_eq!(content.full_text, "Hello");
    }

    #[test]
    fn test_info_metadata_with_dates() {
        let results = rtf(
            r"{\rtf1{\info{\title The Title}{\author Jane Writer}{\company ACME}{\nofpages3}{\creatim\yr2024\mo1\dy15\hr10\min30}}Body}",
        );
        let ExtractedContent::Rtf(content) = &results[0] else {
            panic!("expected rtf content");
        };
        assert_eq!(content.metadata.title, "The Title");
        assert_eq!(content.metadata.author, "Jane Writer");
        assert_eq!(content.metadata.company, "ACME");
        assert_eq!(content.metadata.num_pages, 3);
        assert_eq!(content.metadata.created, "2024-01-15T10:30:00");
        assert_eq!(content.full_text, "Body");
    }

    #[test]
    fn test_escapes_and_specials() {
        let results = rtf(r"{\rtf1 caf\'e9 \u8211?dash \{literal\} \bullet  point}");
        let ExtractedContent::Rtf(content) = &results[0] else {
            panic!("expected rtf content");
        };
        assert!(content.full_text.contains("café"));
        assert!(content.full_text.contains("–dash"));
        assert!(content.full_text.contains("{literal}"));
        assert!(content.full_text.contains("• point"));
    }

    #[test]
    fn test_hyperlinks_and_fields() {
        let results = rtf(
            r#"{\rtf1 Before {\field{\*\fldinst{HYPERLINK "https://example.com"}}{\fldrslt{example site}}} {\field{\*\fldinst{PAGE}}{\fldrslt{7}}} after}"#,
        );
        let ExtractedContent::Rtf(content) = &results[0] else {
            panic!("expected rtf content");
        };
        assert_eq!(content.hyperlinks.len(), 1);
        assert_eq!(content.hyperlinks[0].url, "https://example.com");
        assert_eq!(content.hyperlinks[0].text, "example site");
        assert_eq!(content.fields.len(), 1);
        assert_eq!(content.fields[0].field_type, "page");
        assert_eq!(content.fields[0].field_result, "7");
    }

    #[test]
    fn test_header_footer_and_footnote() {
        let results = rtf(
            r"{\rtf1{\header Top of page}{\footer Bottom of page}Main text{\footnote A note at the bottom}}",
        );
        let ExtractedContent::Rtf(content) = &results[0] else {
            panic!("expected rtf content");
        };
        assert_eq!(content.headers.len(), 1);
        assert_eq!(content.headers[0].text, "Top of page");
        assert_eq!(content.footers[0].text, "Bottom of page");
        assert_eq!(content.footnotes.len(), 1);
        assert_eq!(content.footnotes[0].text, "A note at the bottom");
        assert!(content.full_text.contains("Main text"));
        assert!(!content.full_text.contains("Top of page"));
        assert!(!content.full_text.contains("A note at the bottom"));
    }

    #[test]
    fn test_picture_extraction() {
        let results = rtf(r"{\rtf1{\pict\pngblip\picw100\pich50 89504e470d0a1a0a0000000d49484452}body}");
        let ExtractedContent::Rtf(content) = &results[0] else {
            panic!("expected rtf content");
        };
        assert_eq!(content.images.len(), 1);
        let image = &content.images[0];
        assert_eq!(image.content_type, "image/png");
        assert_eq!(image.width, Some(100));
        assert_eq!(image.height, Some(50));
        assert!(image.data.as_ref().is_some_and(|d| d.starts_with(&[0x89, b'P'])));
        assert!(!content.full_text.contains("89504e47"));
    }

    #[test]
    fn test_invalid_header_falls_back_to_strip() {
        let results = read_rtf(br"not rtf \b at{all}", None).unwrap();
        let ExtractedContent::Rtf(content) = &results[0] else {
            panic!("expected rtf content");
        };
        assert!(content.full_text.contains("not rtf"));
        assert!(!content.full_text.contains('{'));
    }
}
