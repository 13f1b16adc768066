//! Legacy PPT (PowerPoint 97-2003) decoder.
//!
//! The `PowerPoint Document` stream is a sequence of records with an
//! 8-byte header (version/instance, type, length); records whose version
//! nibble is 0xF are containers and recurse. Extraction is multi-pass:
//! SlideListWithText containers first, then the container hierarchy,
//! then a last-resort sweep of every text atom into one synthetic slide.

use crate::error::{DocsiftError, Result};
use crate::types::{ExtractedContent, PptContent, PptMetadata, PptSlide, PptTextBlock};
use crate::util::encoding::{decode_latin1, decode_utf16le};
use crate::util::encryption::is_ppt_encrypted;
use crate::util::ole::{document_summary_information, open_compound, read_stream, summary_information};

// Record types (MS-PPT).
const RT_SLIDE_CONTAINER: u16 = 0x03EE;
const RT_NOTES_CONTAINER: u16 = 0x03F0;
const RT_SLIDE_PERSIST_ATOM: u16 = 0x03F3;
const RT_MAIN_MASTER_CONTAINER: u16 = 0x03F8;
const RT_TEXT_HEADER_ATOM: u16 = 0x0F9F;
const RT_TEXT_CHARS_ATOM: u16 = 0x0FA0;
const RT_TEXT_BYTES_ATOM: u16 = 0x0FA8;
const RT_CSTRING: u16 = 0x0FBA;
const RT_SLIDE_LIST_WITH_TEXT: u16 = 0x0FF0;

// Text types from the TextHeaderAtom.
const TT_TITLE: u16 = 0;
const TT_BODY: u16 = 1;
const TT_NOTES: u16 = 2;
const TT_CENTER_BODY: u16 = 5;
const TT_CENTER_TITLE: u16 = 6;
const TT_HALF_BODY: u16 = 7;
const TT_QUARTER_BODY: u16 = 8;

pub fn read_ppt(data: &[u8], path: Option<&str>) -> Result<Vec<ExtractedContent>> {
    if is_ppt_encrypted(data) {
        return Err(DocsiftError::EncryptedFile("PPT file is encrypted".to_string()));
    }

    let mut comp = open_compound(data)?;
    let stream = read_stream(&mut comp, "/PowerPoint Document")?;
    if stream.is_empty() {
        return Err(DocsiftError::LegacyParse("PowerPoint Document stream is empty".to_string()));
    }

    let mut metadata = read_ppt_metadata(&mut comp);
    if let Some(path) = path {
        metadata.file.populate_from_path(path);
    }

    // Pass 1: SlideListWithText containers with instance 0 (slides).
    let mut slides = extract_from_slide_lists(&stream);
    let mut master_text = Vec::new();

    // Pass 2: container hierarchy.
    if slides.is_empty() {
        let scoped = extract_from_containers(&stream);
        slides = scoped.slides;
        master_text = scoped.master_text;
    }

    // Pass 3: every text atom into one synthetic slide.
    if slides.is_empty() {
        let all = collect_all_text_atoms(&stream);
        if !all.is_empty() {
            let mut slide = PptSlide {
                slide_number: 1,
                ..Default::default()
            };
            for block in all {
                slide.other_text.push(block.text.clone());
                slide.all_text.push(block);
            }
            slides = vec![slide];
        }
    }

    let all_text: Vec<String> = slides
        .iter()
        .flat_map(|slide| {
            slide
                .all_text
                .iter()
                .map(|block| block.text.clone())
                .collect::<Vec<_>>()
        })
        .collect();

    Ok(vec![ExtractedContent::Ppt(PptContent {
        metadata,
        slides,
        master_text,
        all_text,
    })])
}

struct RecordHeader {
    version: u8,
    instance: u16,
    record_type: u16,
    content_start: usize,
    content_end: usize,
}

/// Iterate records in `data[start..end]`, yielding headers. Truncated or
/// inconsistent lengths end the walk.
fn records(data: &[u8], start: usize, end: usize) -> Vec<RecordHeader> {
    let mut out = Vec::new();
    let mut pos = start;
    while pos + 8 <= end {
        let ver_instance = u16::from_le_bytes([data[pos], data[pos + 1]]);
        let record_type = u16::from_le_bytes([data[pos + 2], data[pos + 3]]);
        let record_len = u32::from_le_bytes([data[pos + 4], data[pos + 5], data[pos + 6], data[pos + 7]]) as usize;

        let content_start = pos + 8;
        let Some(content_end) = content_start.checked_add(record_len).filter(|&e| e <= end) else {
            break;
        };

        out.push(RecordHeader {
            version: (ver_instance & 0x000F) as u8,
            instance: ver_instance >> 4,
            record_type,
            content_start,
            content_end,
        });
        pos = content_end;
    }
    out
}

fn is_container(header: &RecordHeader) -> bool {
    header.version == 0x0F
}

fn decode_text_atom(data: &[u8], header: &RecordHeader) -> Option<String> {
    let raw = &data[header.content_start..header.content_end];
    let text = match header.record_type {
        RT_TEXT_CHARS_ATOM | RT_CSTRING => decode_utf16le(raw),
        RT_TEXT_BYTES_ATOM => decode_latin1(raw),
        _ => return None,
    };
    let cleaned = clean_ppt_text(&text);
    if cleaned.is_empty() { None } else { Some(cleaned) }
}

/// Route a text block into the slide by its TextHeaderAtom type.
fn route_text(slide: &mut PptSlide, text: String, text_type: Option<u16>) {
    let block = PptTextBlock {
        text: text.clone(),
        text_type,
    };
    match text_type {
        Some(TT_TITLE) | Some(TT_CENTER_TITLE) => {
            if slide.title.is_empty() {
                slide.title = text;
            } else {
                slide.other_text.push(text);
            }
        }
        Some(TT_BODY) | Some(TT_CENTER_BODY) | Some(TT_HALF_BODY) | Some(TT_QUARTER_BODY) => {
            slide.body_text.push(text);
        }
        Some(TT_NOTES) => slide.notes.push(text),
        _ => slide.other_text.push(text),
    }
    slide.all_text.push(block);
}

/// Pass 1: every SlideListWithText container with instance 0. A
/// SlidePersistAtom opens a new slide; a TextHeaderAtom sets the type of
/// the following text atom.
fn extract_from_slide_lists(stream: &[u8]) -> Vec<PptSlide> {
    let mut slides = Vec::new();
    walk_containers(stream, 0, stream.len(), &mut |header| {
        if header.record_type == RT_SLIDE_LIST_WITH_TEXT && header.instance == 0 {
            parse_slide_list(stream, header, &mut slides);
        }
    });
    slides
}

/// Visit every container record recursively.
fn walk_containers(data: &[u8], start: usize, end: usize, visit: &mut impl FnMut(&RecordHeader)) {
    for header in records(data, start, end) {
        if is_container(&header) {
            visit(&header);
            walk_containers(data, header.content_start, header.content_end, visit);
        }
    }
}

fn parse_slide_list(stream: &[u8], list: &RecordHeader, slides: &mut Vec<PptSlide>) {
    let mut current: Option<PptSlide> = None;
    let mut pending_type: Option<u16> = None;

    for header in records(stream, list.content_start, list.content_end) {
        match header.record_type {
            RT_SLIDE_PERSIST_ATOM => {
                if let Some(done) = current.take() {
                    slides.push(done);
                }
                current = Some(PptSlide {
                    slide_number: (slides.len() + 1) as u32,
                    ..Default::default()
                });
                pending_type = None;
            }
            RT_TEXT_HEADER_ATOM => {
                let raw = &stream[header.content_start..header.content_end];
                pending_type = (raw.len() >= 4).then(|| u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as u16);
            }
            RT_TEXT_CHARS_ATOM | RT_TEXT_BYTES_ATOM | RT_CSTRING => {
                if let Some(text) = decode_text_atom(stream, &header) {
                    let slide = current.get_or_insert_with(|| PptSlide {
                        slide_number: (slides.len() + 1) as u32,
                        ..Default::default()
                    });
                    route_text(slide, text, pending_type.take());
                }
            }
            _ => {}
        }
    }
    if let Some(done) = current {
        slides.push(done);
    }
}

struct ScopedText {
    slides: Vec<PptSlide>,
    master_text: Vec<String>,
}

/// Pass 2: route text atoms by their enclosing container kind. Slide
/// containers open slide scopes, notes containers attach to the previous
/// slide, master containers feed the master text list.
fn extract_from_containers(stream: &[u8]) -> ScopedText {
    let mut result = ScopedText {
        slides: Vec::new(),
        master_text: Vec::new(),
    };
    walk_scoped(stream, 0, stream.len(), &mut result);
    result
}

fn walk_scoped(data: &[u8], start: usize, end: usize, result: &mut ScopedText) {
    for header in records(data, start, end) {
        match header.record_type {
            RT_SLIDE_CONTAINER if is_container(&header) => {
                let mut slide = PptSlide {
                    slide_number: (result.slides.len() + 1) as u32,
                    ..Default::default()
                };
                collect_slide_text(data, header.content_start, header.content_end, &mut slide);
                result.slides.push(slide);
            }
            RT_NOTES_CONTAINER if is_container(&header) => {
                let mut notes = PptSlide::default();
                collect_slide_text(data, header.content_start, header.content_end, &mut notes);
                if let Some(last) = result.slides.last_mut() {
                    last.notes.extend(notes.other_text);
                    last.notes.extend(notes.body_text);
                }
            }
            RT_MAIN_MASTER_CONTAINER if is_container(&header) => {
                let mut master = PptSlide::default();
                collect_slide_text(data, header.content_start, header.content_end, &mut master);
                result
                    .master_text
                    .extend(master.all_text.into_iter().map(|block| block.text));
            }
            _ if is_container(&header) => {
                walk_scoped(data, header.content_start, header.content_end, result);
            }
            _ => {}
        }
    }
}

/// Gather text atoms inside one container scope.
fn collect_slide_text(data: &[u8], start: usize, end: usize, slide: &mut PptSlide) {
    let mut pending_type: Option<u16> = None;
    for header in records(data, start, end) {
        if is_container(&header) {
            collect_slide_text(data, header.content_start, header.content_end, slide);
            continue;
        }
        match header.record_type {
            RT_TEXT_HEADER_ATOM => {
                let raw = &data[header.content_start..header.content_end];
                pending_type = (raw.len() >= 4).then(|| u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as u16);
            }
            RT_TEXT_CHARS_ATOM | RT_TEXT_BYTES_ATOM | RT_CSTRING => {
                if let Some(text) = decode_text_atom(data, &header) {
                    route_text(slide, text, pending_type.take());
                }
            }
            _ => {}
        }
    }
}

/// Pass 3: every text atom anywhere in the stream, in order.
fn collect_all_text_atoms(stream: &[u8]) -> Vec<PptTextBlock> {
    let mut blocks = Vec::new();
    collect_atoms_recursive(stream, 0, stream.len(), &mut blocks);
    blocks
}

fn collect_atoms_recursive(data: &[u8], start: usize, end: usize, blocks: &mut Vec<PptTextBlock>) {
    for header in records(data, start, end) {
        if is_container(&header) {
            collect_atoms_recursive(data, header.content_start, header.content_end, blocks);
        } else if let Some(text) = decode_text_atom(data, &header) {
            blocks.push(PptTextBlock {
                text,
                text_type: None,
            });
        }
    }
}

/// Drop NULs, normalize line endings, strip control bytes, and trim each
/// line.
fn clean_ppt_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\0' => {}
            '\r' | '\u{b}' => out.push('\n'),
            ch if (ch as u32) < 0x20 && ch != '\n' && ch != '\t' => {}
            ch => out.push(ch),
        }
    }
    out.lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn read_ppt_metadata<F: std::io::Read + std::io::Seek>(comp: &mut cfb::CompoundFile<F>) -> PptMetadata {
    let summary = summary_information(comp);
    let doc_summary = document_summary_information(comp);

    PptMetadata {
        title: summary.string(2),
        subject: summary.string(3),
        author: summary.string(4),
        keywords: summary.string(5),
        comments: summary.string(6),
        last_saved_by: summary.string(8),
        revision_number: summary.string(9),
        created: summary.string(12),
        modified: summary.string(13),
        creating_application: summary.string(18),
        category: doc_summary.string(2),
        manager: doc_summary.string(14),
        company: doc_summary.string(15),
        num_slides: doc_summary.u32(7),
        num_notes: doc_summary.u32(8),
        num_hidden_slides: doc_summary.u32(9),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Content;
    use std::io::{Cursor, Write};

    fn atom(record_type: u16, content: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&record_type.to_le_bytes());
        out.extend_from_slice(&(content.len() as u32).to_le_bytes());
        out.extend_from_slice(content);
        out
    }

    fn container(record_type: u16, instance: u16, content: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        let ver_instance = 0x000F | (instance << 4);
        out.extend_from_slice(&ver_instance.to_le_bytes());
        out.extend_from_slice(&record_type.to_le_bytes());
        out.extend_from_slice(&(content.len() as u32).to_le_bytes());
        out.extend_from_slice(content);
        out
    }

    fn utf16(text: &str) -> Vec<u8> {
        text.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
    }

    fn build_ppt_file(stream: &[u8]) -> Vec<u8> {
        let cursor = Cursor::new(Vec::new());
        let mut comp = cfb::CompoundFile::create(cursor).unwrap();
        comp.create_stream("/PowerPoint Document")
            .unwrap()
            .write_all(stream)
            .unwrap();
        comp.flush().unwrap();
        comp.into_inner().into_inner()
    }

    #[test]
    fn test_slide_list_with_text() {
        let mut list_content = Vec::new();
        // Slide 1: persist atom, title, body.
        list_content.extend(atom(RT_SLIDE_PERSIST_ATOM, &[0u8; 20]));
        list_content.extend(atom(RT_TEXT_HEADER_ATOM, &0u32.to_le_bytes()));
        list_content.extend(atom(RT_TEXT_CHARS_ATOM, &utf16("First Title")));
        list_content.extend(atom(RT_TEXT_HEADER_ATOM, &1u32.to_le_bytes()));
        list_content.extend(atom(RT_TEXT_CHARS_ATOM, &utf16("First body")));
        // Slide 2: persist atom, notes-typed text.
        list_content.extend(atom(RT_SLIDE_PERSIST_ATOM, &[0u8; 20]));
        list_content.extend(atom(RT_TEXT_HEADER_ATOM, &2u32.to_le_bytes()));
        list_content.extend(atom(RT_TEXT_BYTES_ATOM, b"some notes"));

        let stream = container(RT_SLIDE_LIST_WITH_TEXT, 0, &list_content);
        let data = build_ppt_file(&stream);

        let results = read_ppt(&data, Some("deck.ppt")).unwrap();
        let ExtractedContent::Ppt(ppt) = &results[0] else {
            panic!("expected ppt content");
        };

        assert_eq!(ppt.slides.len(), 2);
        assert_eq!(ppt.slides[0].title, "First Title");
        assert_eq!(ppt.slides[0].body_text, vec!["First body".to_string()]);
        assert_eq!(ppt.slides[0].text_combined(), "First Title\nFirst body");
        assert_eq!(ppt.slides[1].notes, vec!["some notes".to_string()]);
        assert_eq!(results[0].full_text(), "First Title\nFirst body\n");
    }

    #[test]
    fn test_container_hierarchy_fallback() {
        // No SlideListWithText; one SlideContainer with a text atom.
        let slide_content = atom(RT_TEXT_CHARS_ATOM, &utf16("Container slide text"));
        let stream = container(RT_SLIDE_CONTAINER, 0, &slide_content);
        let data = build_ppt_file(&stream);

        let results = read_ppt(&data, None).unwrap();
        let ExtractedContent::Ppt(ppt) = &results[0] else {
            panic!("expected ppt content");
        };
        assert_eq!(ppt.slides.len(), 1);
        assert_eq!(ppt.slides[0].text_combined(), "Container slide text");
    }

    #[test]
    fn test_synthetic_slide_fallback() {
        // A bare TextCharsAtom with no structure at all.
        let stream = atom(RT_TEXT_CHARS_ATOM, &utf16("Standalone"));
        let data = build_ppt_file(&stream);

        let results = read_ppt(&data, None).unwrap();
        let ExtractedContent::Ppt(ppt) = &results[0] else {
            panic!("expected ppt content");
        };
        assert_eq!(ppt.slides.len(), 1);
        assert_eq!(ppt.slides[0].text_combined(), "Standalone");
    }

    #[test]
    fn test_text_cleaning() {
        assert_eq!(clean_ppt_text("Hello\rWorld"), "Hello\nWorld");
        assert_eq!(clean_ppt_text("a\u{b}b"), "a\nb");
        assert_eq!(clean_ppt_text("x\0y"), "xy");
        assert_eq!(clean_ppt_text("  padded  \n line "), "padded\nline");
    }

    #[test]
    fn test_empty_stream_rejected() {
        let data = build_ppt_file(b"");
        assert!(matches!(read_ppt(&data, None), Err(DocsiftError::LegacyParse(_))));
    }

    #[test]
    fn test_encrypted_ppt_rejected() {
        let cursor = Cursor::new(Vec::new());
        let mut comp = cfb::CompoundFile::create(cursor).unwrap();
        comp.create_stream("/PowerPoint Document").unwrap().write_all(b"x").unwrap();
        comp.create_stream("/EncryptedSummary").unwrap().write_all(b"x").unwrap();
        comp.flush().unwrap();
        let data = comp.into_inner().into_inner();
        assert!(matches!(read_ppt(&data, None), Err(DocsiftError::EncryptedFile(_))));
    }
}
