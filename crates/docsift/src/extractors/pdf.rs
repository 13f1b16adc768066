//! PDF decoder built on `lopdf`.
//!
//! Per page: layout-aware text via the library extractor, plus image
//! XObjects enumerated from the page resources. A failure on a single
//! image is logged and skipped; the page still yields its text.

use crate::error::{DocsiftError, Result};
use crate::types::{ExtractedContent, ImageRecord, PdfContent, PdfMetadata, PdfPage};
use lopdf::{Dictionary, Document, Object};
use tracing::debug;

pub fn read_pdf(data: &[u8], path: Option<&str>) -> Result<Vec<ExtractedContent>> {
    let doc = Document::load_mem(data)
        .map_err(|e| DocsiftError::parsing(format!("Failed to parse PDF document: {e}")))?;

    if doc.is_encrypted() {
        return Err(DocsiftError::EncryptedFile("PDF is password-protected".to_string()));
    }

    let page_map = doc.get_pages();
    let mut pages = Vec::with_capacity(page_map.len());
    let mut images = Vec::new();
    let mut image_index = 0u32;

    for (&page_num, &page_id) in &page_map {
        let text = match doc.extract_text(&[page_num]) {
            Ok(text) => text.trim_end().to_string(),
            Err(e) => {
                debug!("Text extraction failed for page {page_num}: {e}");
                String::new()
            }
        };
        pages.push(PdfPage {
            number: page_num,
            text,
        });

        for (name, stream_dict, payload) in page_image_xobjects(&doc, page_id) {
            image_index += 1;
            images.push(build_image_record(image_index, page_num, &name, &stream_dict, payload));
        }
    }

    let mut metadata = PdfMetadata {
        total_pages: page_map.len() as u32,
        ..Default::default()
    };
    if let Some(path) = path {
        metadata.file.populate_from_path(path);
    }

    Ok(vec![ExtractedContent::Pdf(PdfContent {
        metadata,
        pages,
        images,
    })])
}

/// Collect (name, dict, raw bytes) for every image XObject reachable from
/// the page's Resources. Failures on individual objects are logged and
/// skipped.
fn page_image_xobjects(doc: &Document, page_id: (u32, u16)) -> Vec<(String, Dictionary, Vec<u8>)> {
    let mut found = Vec::new();

    let Ok(page_dict) = doc.get_dictionary(page_id) else {
        return found;
    };
    let Some(resources) = resolve_dict(doc, page_dict.get(b"Resources").ok()) else {
        return found;
    };
    let Some(xobjects) = resolve_dict(doc, resources.get(b"XObject").ok()) else {
        return found;
    };

    for (name, value) in xobjects.iter() {
        let object = match value {
            Object::Reference(id) => match doc.get_object(*id) {
                Ok(object) => object,
                Err(e) => {
                    debug!("Unresolvable XObject reference: {e}");
                    continue;
                }
            },
            other => other,
        };
        if let Object::Stream(stream) = object {
            let is_image = matches!(stream.dict.get(b"Subtype"), Ok(Object::Name(subtype)) if subtype == b"Image");
            if is_image {
                found.push((
                    String::from_utf8_lossy(name).into_owned(),
                    stream.dict.clone(),
                    stream.content.clone(),
                ));
            }
        }
    }
    found
}

fn resolve_dict<'a>(doc: &'a Document, object: Option<&'a Object>) -> Option<&'a Dictionary> {
    match object? {
        Object::Dictionary(dict) => Some(dict),
        Object::Reference(id) => match doc.get_object(*id).ok()? {
            Object::Dictionary(dict) => Some(dict),
            _ => None,
        },
        _ => None,
    }
}

fn build_image_record(
    image_index: u32,
    page_num: u32,
    name: &str,
    dict: &Dictionary,
    payload: Vec<u8>,
) -> ImageRecord {
    let width = dict_u32(dict, b"Width");
    let height = dict_u32(dict, b"Height");
    let bits = dict_u32(dict, b"BitsPerComponent");
    let color_space = dict_name(dict, b"ColorSpace");
    let filter = primary_filter(dict);
    let format = filter.as_deref().map(nominal_format).unwrap_or("raw");
    let content_type = match format {
        "raw" => "application/octet-stream".to_string(),
        other => format!("image/{other}"),
    };

    ImageRecord {
        image_index,
        unit_index: Some(page_num),
        name: name.to_string(),
        content_type,
        size_bytes: payload.len() as u64,
        width,
        height,
        data: Some(payload),
        color_space,
        bits_per_component: bits.and_then(|b| u8::try_from(b).ok()),
        filter,
        ..Default::default()
    }
}

fn dict_u32(dict: &Dictionary, key: &[u8]) -> Option<u32> {
    match dict.get(key) {
        Ok(Object::Integer(value)) => u32::try_from(*value).ok(),
        _ => None,
    }
}

fn dict_name(dict: &Dictionary, key: &[u8]) -> Option<String> {
    match dict.get(key) {
        Ok(Object::Name(name)) => Some(String::from_utf8_lossy(name).into_owned()),
        Ok(Object::Array(items)) => items.first().and_then(|item| match item {
            Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
            _ => None,
        }),
        _ => None,
    }
}

/// `/Filter` may be a single name or a chain; the first entry decides
/// the nominal format.
fn primary_filter(dict: &Dictionary) -> Option<String> {
    dict_name(dict, b"Filter")
}

fn nominal_format(filter: &str) -> &'static str {
    match filter {
        "DCTDecode" => "jpeg",
        "JPXDecode" => "jp2",
        "FlateDecode" => "png",
        "CCITTFaxDecode" => "tiff",
        "JBIG2Decode" => "jbig2",
        "LZWDecode" => "png",
        _ => "raw",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Content;
    use lopdf::content::{Content as PdfOps, Operation};
    use lopdf::{Stream, dictionary};

    /// Build a single-page PDF with "Hello PDF" and one image XObject.
    fn build_pdf() -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let image_stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 2,
                "Height" => 2,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            vec![0xFF, 0xD8, 0xFF, 0xD9],
        );
        let image_id = doc.add_object(image_stream);

        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
            "XObject" => dictionary! { "Im1" => image_id },
        });

        let content = PdfOps {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![100.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal("Hello PDF")]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    #[test]
    fn test_text_and_images() {
        let data = build_pdf();
        let results = read_pdf(&data, Some("doc.pdf")).unwrap();
        let ExtractedContent::Pdf(content) = &results[0] else {
            panic!("expected pdf content");
        };

        assert_eq!(content.metadata.total_pages, 1);
        assert_eq!(content.pages.len(), 1);
        assert!(content.pages[0].text.contains("Hello PDF"));

        assert_eq!(content.images.len(), 1);
        let image = &content.images[0];
        assert_eq!(image.image_index, 1);
        assert_eq!(image.unit_index, Some(1));
        assert_eq!(image.width, Some(2));
        assert_eq!(image.height, Some(2));
        assert_eq!(image.content_type, "image/jpeg");
        assert_eq!(image.filter.as_deref(), Some("DCTDecode"));
        assert_eq!(image.color_space.as_deref(), Some("DeviceRGB"));
    }

    #[test]
    fn test_units_are_pages() {
        let data = build_pdf();
        let results = read_pdf(&data, None).unwrap();
        let units = results[0].units();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].number, 1);
    }

    #[test]
    fn test_invalid_pdf() {
        assert!(read_pdf(b"not a pdf", None).is_err());
    }
}
