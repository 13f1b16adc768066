//! Encryption probes.
//!
//! Pure predicates over in-memory bytes: no decryption is ever attempted,
//! and the caller's data is only read. Each probe answers "would decoding
//! this file run into password-protected content?".

use crate::util::zip_bomb::{ZipBombLimits, open_validated_zip};
use std::io::Cursor;

const OLE_MAGIC: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

fn is_ole_file(data: &[u8]) -> bool {
    data.len() >= 8 && data[..8] == OLE_MAGIC
}

fn has_ole_encryption_stream<F: std::io::Read + std::io::Seek>(comp: &cfb::CompoundFile<F>) -> bool {
    ["/EncryptionInfo", "/EncryptedPackage", "/DataSpaces"]
        .iter()
        .any(|name| comp.exists(name))
}

/// OOXML files saved with a password are OLE containers wrapping the
/// encrypted package; a plain (unencrypted) OOXML file is a ZIP and never
/// an OLE file.
pub fn is_ooxml_encrypted(data: &[u8]) -> bool {
    if !is_ole_file(data) {
        return false;
    }
    match cfb::CompoundFile::open(Cursor::new(data)) {
        Ok(comp) => has_ole_encryption_stream(&comp),
        Err(_) => false,
    }
}

/// ODF encryption is declared per-entry in `META-INF/manifest.xml`.
pub fn is_odf_encrypted(data: &[u8]) -> bool {
    let mut archive = match open_validated_zip(data, &ZipBombLimits::default()) {
        Ok(archive) => archive,
        Err(_) => return false,
    };
    let manifest = {
        use std::io::Read;
        let mut entry = match archive.by_name("META-INF/manifest.xml") {
            Ok(entry) => entry,
            Err(_) => return false,
        };
        let mut buf = Vec::new();
        if entry.read_to_end(&mut buf).is_err() {
            return false;
        }
        String::from_utf8_lossy(&buf).into_owned()
    };
    manifest.contains("encryption-data")
        || manifest.contains("manifest:encrypted")
        || manifest.contains("manifest:algorithm")
}

/// BIFF workbooks signal encryption with a FILEPASS (0x002F) record in
/// the `Workbook` (or `Book`) stream.
pub fn is_xls_encrypted(data: &[u8]) -> bool {
    if !is_ole_file(data) {
        return false;
    }
    let mut comp = match cfb::CompoundFile::open(Cursor::new(data)) {
        Ok(comp) => comp,
        Err(_) => return false,
    };
    let stream_name = if comp.exists("/Workbook") {
        "/Workbook"
    } else if comp.exists("/Book") {
        "/Book"
    } else {
        return false;
    };
    let stream = {
        use std::io::Read;
        let mut stream = match comp.open_stream(stream_name) {
            Ok(stream) => stream,
            Err(_) => return false,
        };
        let mut buf = Vec::new();
        if stream.read_to_end(&mut buf).is_err() {
            return false;
        }
        buf
    };

    let mut offset = 0usize;
    while offset + 4 <= stream.len() {
        let record_id = u16::from_le_bytes([stream[offset], stream[offset + 1]]);
        let record_len = u16::from_le_bytes([stream[offset + 2], stream[offset + 3]]) as usize;
        if record_id == 0x002F {
            return true;
        }
        offset += 4 + record_len;
    }
    false
}

/// Legacy PPT encryption shows up either as the standard OLE encryption
/// streams or as an encrypted summary stream.
pub fn is_ppt_encrypted(data: &[u8]) -> bool {
    if !is_ole_file(data) {
        return false;
    }
    let comp = match cfb::CompoundFile::open(Cursor::new(data)) {
        Ok(comp) => comp,
        Err(_) => return false,
    };
    has_ole_encryption_stream(&comp)
        || comp.exists("/EncryptedSummary")
        || comp.exists("/EncryptedSummaryInformation")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn build_cfb(streams: &[(&str, &[u8])]) -> Vec<u8> {
        let cursor = Cursor::new(Vec::new());
        let mut comp = cfb::CompoundFile::create(cursor).unwrap();
        for (name, data) in streams {
            let mut stream = comp.create_stream(name).unwrap();
            stream.write_all(data).unwrap();
        }
        comp.flush().unwrap();
        comp.into_inner().into_inner()
    }

    #[test]
    fn test_non_ole_is_not_encrypted() {
        assert!(!is_ooxml_encrypted(b"PK\x03\x04 not an ole file"));
        assert!(!is_xls_encrypted(b"plain text"));
        assert!(!is_ppt_encrypted(b""));
    }

    #[test]
    fn test_ooxml_encryption_streams() {
        let encrypted = build_cfb(&[("/EncryptionInfo", b"\x04\x00"), ("/EncryptedPackage", b"\x00")]);
        assert!(is_ooxml_encrypted(&encrypted));

        let plain = build_cfb(&[("/WordDocument", b"\xec\xa5\x00\x00")]);
        assert!(!is_ooxml_encrypted(&plain));
    }

    #[test]
    fn test_xls_filepass_record() {
        // BOF record (0x0809, 4 bytes) followed by FILEPASS (0x002F).
        let mut workbook = Vec::new();
        workbook.extend_from_slice(&[0x09, 0x08, 0x04, 0x00, 0, 0, 0, 0]);
        workbook.extend_from_slice(&[0x2F, 0x00, 0x02, 0x00, 0, 0]);
        let encrypted = build_cfb(&[("/Workbook", &workbook)]);
        assert!(is_xls_encrypted(&encrypted));

        let plain = build_cfb(&[("/Workbook", &[0x09, 0x08, 0x04, 0x00, 0, 0, 0, 0])]);
        assert!(!is_xls_encrypted(&plain));
    }

    #[test]
    fn test_ppt_encrypted_summary() {
        let encrypted = build_cfb(&[("/EncryptedSummary", b"x")]);
        assert!(is_ppt_encrypted(&encrypted));

        let plain = build_cfb(&[("/PowerPoint Document", b"x")]);
        assert!(!is_ppt_encrypted(&plain));
    }

    #[test]
    fn test_odf_manifest_probe() {
        use zip::write::{FileOptions, ZipWriter};
        let build = |manifest: &str| {
            let mut cursor = Cursor::new(Vec::new());
            {
                let mut writer = ZipWriter::new(&mut cursor);
                let options: FileOptions<()> = FileOptions::default();
                writer.start_file("META-INF/manifest.xml", options).unwrap();
                writer.write_all(manifest.as_bytes()).unwrap();
                writer.finish().unwrap();
            }
            cursor.into_inner()
        };

        let encrypted = build("<manifest:manifest><manifest:encryption-data/></manifest:manifest>");
        assert!(is_odf_encrypted(&encrypted));

        let plain = build("<manifest:manifest><manifest:file-entry/></manifest:manifest>");
        assert!(!is_odf_encrypted(&plain));
    }
}
