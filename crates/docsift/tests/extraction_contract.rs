//! End-to-end contract tests over in-memory fixtures: routing,
//! decoding, serialization round-trips, and archive behavior.

use docsift::{Content, DocsiftError, ExtractedContent, deserialize, serialize};
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = ZipWriter::new(&mut cursor);
        let options: FileOptions<()> = FileOptions::default();
        for (name, data) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap();
    }
    cursor.into_inner()
}

// --- extract(path) == decode(read_bytes(path)) ------------------------------

#[test]
fn test_extract_matches_byte_level_decoder() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("page.html");
    let html = b"<html><head><title>T</title></head><body><p>body text</p></body></html>";
    std::fs::write(&path, html).unwrap();
    let path_str = path.to_str().unwrap();

    let from_path = docsift::extract(&path).unwrap();
    let from_bytes = docsift::read_html(html, Some(path_str)).unwrap();
    assert_eq!(from_path, from_bytes);
}

// --- XLSX: headers, trimming, typed cells (spec scenario S3) ----------------

fn build_xlsx(sheet_xml: &str) -> Vec<u8> {
    let workbook = r#"<?xml version="1.0"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets>
</workbook>"#;
    let workbook_rels = r#"<?xml version="1.0"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
</Relationships>"#;
    let content_types = r#"<?xml version="1.0"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
</Types>"#;

    build_zip(&[
        ("[Content_Types].xml", content_types.as_bytes()),
        ("xl/workbook.xml", workbook.as_bytes()),
        ("xl/_rels/workbook.xml.rels", workbook_rels.as_bytes()),
        ("xl/worksheets/sheet1.xml", sheet_xml.as_bytes()),
    ])
}

#[test]
fn test_xlsx_headers_and_trailing_trim() {
    let mut rows = String::new();
    rows.push_str(
        r#"<row r="1"><c r="A1" t="inlineStr"><is><t>Name</t></is></c><c r="B1" t="inlineStr"><is><t>Age</t></is></c></row>"#,
    );
    rows.push_str(r#"<row r="2"><c r="A2" t="inlineStr"><is><t>Alice</t></is></c><c r="B2"><v>30</v></c></row>"#);
    // Trailing rows that hold only empty cells.
    for r in 3..10 {
        rows.push_str(&format!(r#"<row r="{r}"><c r="A{r}"/><c r="B{r}"/><c r="C{r}"/></row>"#));
    }
    let sheet = format!(
        r#"<?xml version="1.0"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<sheetData>{rows}</sheetData>
</worksheet>"#
    );

    let results = docsift::read_xlsx(&build_xlsx(&sheet), Some("people.xlsx")).unwrap();
    let ExtractedContent::Xlsx(content) = &results[0] else {
        panic!("expected xlsx content");
    };

    let sheet = &content.sheets[0];
    assert_eq!(sheet.headers, vec!["Name", "Age"]);
    assert!(!sheet.headers.iter().any(|h| h.starts_with("Unnamed: ")));
    assert_eq!(sheet.rows.len(), 1);

    let records: Vec<_> = sheet.records().collect();
    assert_eq!(records[0][0].0, "Name");
    assert_eq!(records[0][0].1.display(), "Alice");
    assert_eq!(records[0][1].1.display(), "30");

    // The text table has exactly two rows.
    assert_eq!(sheet.text.lines().count(), 2);
}

// --- serializer round-trips over real decoder output ------------------------

#[test]
fn test_roundtrip_html() {
    let html = b"<html><head><title>Round</title></head><body><h1>H</h1><p>text</p>\
<table><tr><td>a</td><td>b</td></tr></table><a href=\"http://x\">link</a></body></html>";
    let results = docsift::read_html(html, Some("r.html")).unwrap();
    let value = serialize(&results[0], true);
    assert_eq!(deserialize(&value).unwrap(), results[0]);
}

#[test]
fn test_roundtrip_rtf() {
    let rtf = br"{\rtf1{\info{\title RT}}A\par B\page C}";
    let results = docsift::read_rtf(rtf, Some("r.rtf")).unwrap();
    let value = serialize(&results[0], true);
    assert_eq!(deserialize(&value).unwrap(), results[0]);
}

#[test]
fn test_roundtrip_eml() {
    let eml = b"From: a@example.com\r\nTo: b@example.com\r\nSubject: rt\r\n\r\nbody";
    let results = docsift::read_eml(eml, Some("r.eml")).unwrap();
    let value = serialize(&results[0], true);
    assert_eq!(deserialize(&value).unwrap(), results[0]);
}

#[test]
fn test_roundtrip_epub_with_binary_images() {
    let container = r#"<?xml version="1.0"?>
<container xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
<rootfiles><rootfile full-path="content.opf" media-type="application/oebps-package+xml"/></rootfiles>
</container>"#;
    let opf = r#"<?xml version="1.0"?>
<package xmlns="http://www.idpf.org/2007/opf" xmlns:dc="http://purl.org/dc/elements/1.1/">
<metadata><dc:title>B</dc:title></metadata>
<manifest>
  <item id="c1" href="c1.xhtml" media-type="application/xhtml+xml"/>
  <item id="i1" href="img1.png" media-type="image/png"/>
  <item id="i2" href="img2.png" media-type="image/png"/>
</manifest>
<spine><itemref idref="c1"/></spine>
</package>"#;
    let mut png = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    png.extend_from_slice(&13u32.to_be_bytes());
    png.extend_from_slice(b"IHDR");
    png.extend_from_slice(&3u32.to_be_bytes());
    png.extend_from_slice(&5u32.to_be_bytes());
    png.extend_from_slice(&[0u8; 5]);

    let data = build_zip(&[
        ("META-INF/container.xml", container.as_bytes()),
        ("content.opf", opf.as_bytes()),
        ("c1.xhtml", b"<html><head><title>C1</title></head><body><p>chapter</p></body></html>"),
        ("img1.png", &png),
        ("img2.png", &png),
    ]);

    let results = docsift::read_epub(&data, Some("b.epub")).unwrap();
    let ExtractedContent::Epub(content) = &results[0] else {
        panic!("expected epub content");
    };

    // Images enumerate in strictly increasing index order.
    let indexes: Vec<u32> = content.images.iter().map(|i| i.image_index).collect();
    assert_eq!(indexes, vec![1, 2]);
    assert_eq!(content.images[0].width, Some(3));

    let value = serialize(&results[0], true);
    assert_eq!(deserialize(&value).unwrap(), results[0]);

    // Without binary, payloads are nulled but keys remain, and the
    // decoded record simply loses the payload.
    let without = serialize(&results[0], false);
    assert!(without["images"][0]["data"].is_null());
    let ExtractedContent::Epub(decoded) = deserialize(&without).unwrap() else {
        panic!("expected epub content");
    };
    assert!(decoded.images[0].data.is_none());
}

// --- archive behavior (spec scenario S6) ------------------------------------

/// Minimal stored ZIP with the encryption bit set on its single entry.
fn build_encrypted_zip() -> Vec<u8> {
    let name = b"secret.txt";
    let payload = b"0123456789";
    let mut out = Vec::new();

    // Local file header, general-purpose flag bit 0 set.
    out.extend_from_slice(b"PK\x03\x04");
    out.extend_from_slice(&20u16.to_le_bytes()); // version needed
    out.extend_from_slice(&1u16.to_le_bytes()); // flags: encrypted
    out.extend_from_slice(&0u16.to_le_bytes()); // method: stored
    out.extend_from_slice(&[0u8; 4]); // time/date
    out.extend_from_slice(&0u32.to_le_bytes()); // crc
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(&(name.len() as u16).to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // extra len
    out.extend_from_slice(name);
    out.extend_from_slice(payload);
    let central_offset = out.len();

    // Central directory header.
    out.extend_from_slice(b"PK\x01\x02");
    out.extend_from_slice(&20u16.to_le_bytes()); // version made by
    out.extend_from_slice(&20u16.to_le_bytes()); // version needed
    out.extend_from_slice(&1u16.to_le_bytes()); // flags: encrypted
    out.extend_from_slice(&0u16.to_le_bytes()); // method
    out.extend_from_slice(&[0u8; 4]); // time/date
    out.extend_from_slice(&0u32.to_le_bytes()); // crc
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(&(name.len() as u16).to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // extra
    out.extend_from_slice(&0u16.to_le_bytes()); // comment
    out.extend_from_slice(&0u16.to_le_bytes()); // disk
    out.extend_from_slice(&0u16.to_le_bytes()); // internal attrs
    out.extend_from_slice(&0u32.to_le_bytes()); // external attrs
    out.extend_from_slice(&0u32.to_le_bytes()); // local header offset
    out.extend_from_slice(name);
    let central_size = out.len() - central_offset;

    // End of central directory.
    out.extend_from_slice(b"PK\x05\x06");
    out.extend_from_slice(&0u16.to_le_bytes()); // disk
    out.extend_from_slice(&0u16.to_le_bytes()); // cd disk
    out.extend_from_slice(&1u16.to_le_bytes()); // entries this disk
    out.extend_from_slice(&1u16.to_le_bytes()); // entries total
    out.extend_from_slice(&(central_size as u32).to_le_bytes());
    out.extend_from_slice(&(central_offset as u32).to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // comment len
    out
}

#[test]
fn test_encrypted_zip_entry_fails_whole_archive() {
    let data = build_encrypted_zip();
    let err = docsift::read_archive(&data, Some("vault.zip")).unwrap_err();
    assert!(matches!(err, DocsiftError::EncryptedFile(_)));
}

#[test]
fn test_archive_walks_members_through_router() {
    let inner_html = b"<html><body><p>inner page</p></body></html>";
    let data = build_zip(&[("a.txt", b"text member"), ("b.html", inner_html)]);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pack.zip");
    std::fs::write(&path, &data).unwrap();

    let results = docsift::extract(&path).unwrap();
    assert_eq!(results.len(), 2);
    assert!(results.iter().any(|c| c.full_text().contains("text member")));
    assert!(results.iter().any(|c| c.full_text().contains("inner page")));
}

// --- supported-predicate consistency (spec invariant 5) ---------------------

#[test]
fn test_is_supported_matches_extract() {
    let dir = tempfile::tempdir().unwrap();

    let good = dir.path().join("a.txt");
    std::fs::write(&good, "x").unwrap();
    assert!(docsift::is_supported(good.to_str().unwrap()));
    assert!(docsift::extract(&good).is_ok());

    let bad = dir.path().join("a.unknownext");
    std::fs::write(&bad, "x").unwrap();
    assert!(!docsift::is_supported(bad.to_str().unwrap()));
    assert!(matches!(
        docsift::extract(&bad),
        Err(DocsiftError::FormatNotSupported { .. })
    ));
}
