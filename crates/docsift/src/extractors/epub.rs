//! EPUB decoder.
//!
//! Follows the package chain: `META-INF/container.xml` names the OPF
//! root file, the OPF carries Dublin-Core metadata plus the manifest and
//! spine, and each spine entry is an XHTML chapter. DRM'd books are
//! rejected before any content parsing.

use crate::config::ExtractionLimits;
use crate::error::{DocsiftError, Result};
use crate::extractors::html;
use crate::mime::image_mime_for_name;
use crate::types::{EpubChapter, EpubContent, EpubMetadata, ExtractedContent, ImageRecord};
use crate::util::image_size::probe_dimensions;
use crate::util::zip_context::ZipContext;
use tracing::debug;

pub fn read_epub(data: &[u8], path: Option<&str>) -> Result<Vec<ExtractedContent>> {
    let limits = ExtractionLimits::default();
    let mut ctx = ZipContext::open(data, &limits.zip_bomb)?;

    check_drm(&mut ctx)?;

    let container = ctx.read_xml("META-INF/container.xml")?;
    let opf_path = parse_container(&container)?;
    let opf_dir = match opf_path.rfind('/') {
        Some(last_slash) => opf_path[..last_slash].to_string(),
        None => String::new(),
    };

    let opf_xml = ctx.read_xml(&opf_path)?;
    let opf = roxmltree::Document::parse(&opf_xml)
        .map_err(|e| DocsiftError::parsing(format!("Failed to parse OPF package: {e}")))?;

    let mut metadata = parse_metadata(&opf);
    if let Some(path) = path {
        metadata.file.populate_from_path(path);
    }

    // Manifest: id → (href, media-type).
    let mut manifest: Vec<(String, String, String)> = Vec::new();
    for item in opf.descendants().filter(|n| n.tag_name().name() == "item") {
        let id = item.attribute("id").unwrap_or("").to_string();
        let href = item.attribute("href").unwrap_or("").to_string();
        let media_type = item.attribute("media-type").unwrap_or("").to_string();
        manifest.push((id, href, media_type));
    }

    // Spine: ordered idrefs.
    let spine: Vec<&str> = opf
        .descendants()
        .filter(|n| n.tag_name().name() == "itemref")
        .filter_map(|n| n.attribute("idref"))
        .collect();

    let mut chapters = Vec::new();
    for idref in &spine {
        let Some((_, href, media_type)) = manifest.iter().find(|(id, _, _)| id == idref) else {
            continue;
        };
        if !media_type.contains("xhtml") && !media_type.contains("html") {
            continue;
        }
        let entry_path = join_package_path(&opf_dir, href);
        let xhtml = match ctx.read_text(&entry_path) {
            Ok(xhtml) => xhtml,
            Err(e) => {
                debug!("Skipping missing spine entry '{entry_path}': {e}");
                continue;
            }
        };
        let extracted = html::extract_from_str(&xhtml, None, "utf-8");
        chapters.push(EpubChapter {
            number: (chapters.len() + 1) as u32,
            title: extracted.metadata.title,
            text: extracted.text,
        });
    }

    // Images come from the manifest, in manifest order.
    let mut images = Vec::new();
    for (_, href, media_type) in manifest.iter().filter(|(_, _, mt)| mt.starts_with("image/")) {
        let entry_path = join_package_path(&opf_dir, href);
        match ctx.read_bytes(&entry_path) {
            Ok(payload) => {
                let (width, height) = probe_dimensions(&payload);
                images.push(ImageRecord {
                    image_index: (images.len() + 1) as u32,
                    unit_index: None,
                    name: href.clone(),
                    content_type: if media_type.is_empty() {
                        image_mime_for_name(href).to_string()
                    } else {
                        media_type.clone()
                    },
                    size_bytes: payload.len() as u64,
                    width,
                    height,
                    data: Some(payload),
                    ..Default::default()
                });
            }
            Err(e) => {
                debug!("Skipping missing manifest image '{entry_path}': {e}");
                images.push(ImageRecord {
                    image_index: (images.len() + 1) as u32,
                    unit_index: None,
                    name: href.clone(),
                    content_type: media_type.clone(),
                    error: Some(e.to_string()),
                    ..Default::default()
                });
            }
        }
    }

    Ok(vec![ExtractedContent::Epub(EpubContent {
        metadata,
        chapters,
        images,
    })])
}

/// DRM detection: `rights.xml`, or an `encryption.xml` that declares any
/// `EncryptedData` element.
fn check_drm(ctx: &mut ZipContext<'_>) -> Result<()> {
    if ctx.has_entry("META-INF/rights.xml") {
        return Err(DocsiftError::EncryptedFile(
            "EPUB contains DRM rights information".to_string(),
        ));
    }
    if ctx.has_entry("META-INF/encryption.xml") {
        let encryption = ctx.read_text("META-INF/encryption.xml")?;
        if encryption.contains("EncryptedData") {
            return Err(DocsiftError::EncryptedFile("EPUB content is encrypted".to_string()));
        }
    }
    Ok(())
}

fn parse_container(container: &str) -> Result<String> {
    let doc = roxmltree::Document::parse(container)
        .map_err(|e| DocsiftError::parsing(format!("Failed to parse container.xml: {e}")))?;
    doc.descendants()
        .find(|n| n.tag_name().name() == "rootfile")
        .and_then(|n| n.attribute("full-path"))
        .map(str::to_string)
        .ok_or_else(|| DocsiftError::parsing("container.xml names no rootfile"))
}

fn parse_metadata(opf: &roxmltree::Document) -> EpubMetadata {
    let mut metadata = EpubMetadata::default();
    for node in opf.descendants().filter(|n| n.is_element()) {
        let text = || node.text().unwrap_or("").trim().to_string();
        match node.tag_name().name() {
            "title" if metadata.title.is_empty() => metadata.title = text(),
            "creator" if metadata.creator.is_empty() => metadata.creator = text(),
            "subject" if metadata.subject.is_empty() => metadata.subject = text(),
            "description" if metadata.description.is_empty() => metadata.description = text(),
            "publisher" if metadata.publisher.is_empty() => metadata.publisher = text(),
            "date" if metadata.date.is_empty() => metadata.date = text(),
            "language" if metadata.language.is_empty() => metadata.language = text(),
            "identifier" if metadata.identifier.is_empty() => metadata.identifier = text(),
            "rights" if metadata.rights.is_empty() => metadata.rights = text(),
            _ => {}
        }
    }
    metadata
}

/// Resolve a manifest href against the OPF directory.
fn join_package_path(base_dir: &str, href: &str) -> String {
    if base_dir.is_empty() || href.starts_with('/') {
        href.trim_start_matches('/').to_string()
    } else {
        format!("{base_dir}/{href}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Content;
    use std::io::Write;
    use zip::write::{FileOptions, ZipWriter};

    fn build_epub(extra: &[(&str, &str)]) -> Vec<u8> {
        let mut entries = vec![
            (
                "META-INF/container.xml",
                r#"<?xml version="1.0"?>
<container xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles><rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/></rootfiles>
</container>"#,
            ),
            (
                "OEBPS/content.opf",
                r#"<?xml version="1.0"?>
<package xmlns="http://www.idpf.org/2007/opf" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <metadata>
    <dc:title>A Book</dc:title>
    <dc:creator>An Author</dc:creator>
    <dc:language>en</dc:language>
    <dc:identifier>urn:isbn:123</dc:identifier>
  </metadata>
  <manifest>
    <item id="ch1" href="ch1.xhtml" media-type="application/xhtml+xml"/>
    <item id="ch2" href="ch2.xhtml" media-type="application/xhtml+xml"/>
  </manifest>
  <spine><itemref idref="ch1"/><itemref idref="ch2"/></spine>
</package>"#,
            ),
            (
                "OEBPS/ch1.xhtml",
                "<html><head><title>Chapter One</title></head><body><p>First chapter text.</p></body></html>",
            ),
            (
                "OEBPS/ch2.xhtml",
                "<html><head><title>Chapter Two</title></head><body><p>Second chapter text.</p></body></html>",
            ),
        ];
        entries.extend_from_slice(extra);

        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = ZipWriter::new(&mut cursor);
            let options: FileOptions<()> = FileOptions::default();
            for (name, data) in entries {
                writer.start_file(name, options).unwrap();
                writer.write_all(data.as_bytes()).unwrap();
            }
            writer.finish().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_chapters_in_spine_order() {
        let data = build_epub(&[]);
        let results = read_epub(&data, Some("book.epub")).unwrap();
        let ExtractedContent::Epub(content) = &results[0] else {
            panic!("expected epub content");
        };

        assert_eq!(content.metadata.title, "A Book");
        assert_eq!(content.metadata.creator, "An Author");
        assert_eq!(content.chapters.len(), 2);
        assert_eq!(content.chapters[0].number, 1);
        assert_eq!(content.chapters[0].title, "Chapter One");
        assert_eq!(content.chapters[1].number, 2);
        assert!(content.chapters[1].text.contains("Second chapter text."));
        assert!(results[0].full_text().contains("First chapter text."));
    }

    #[test]
    fn test_drm_rights_rejected() {
        let data = build_epub(&[("META-INF/rights.xml", "<rights/>")]);
        assert!(matches!(
            read_epub(&data, None),
            Err(DocsiftError::EncryptedFile(_))
        ));
    }

    #[test]
    fn test_drm_encryption_rejected() {
        let data = build_epub(&[(
            "META-INF/encryption.xml",
            r#"<encryption><EncryptedData xmlns="http://www.w3.org/2001/04/xmlenc#"/></encryption>"#,
        )]);
        assert!(matches!(
            read_epub(&data, None),
            Err(DocsiftError::EncryptedFile(_))
        ));
    }

    #[test]
    fn test_benign_encryption_manifest_passes() {
        let data = build_epub(&[("META-INF/encryption.xml", "<encryption/>")]);
        assert!(read_epub(&data, None).is_ok());
    }
}
