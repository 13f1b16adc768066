//! Text-encoding auto-detection.
//!
//! Wraps `chardetng` + `encoding_rs`: feed the whole buffer, take the
//! detector's best guess, and fall back to UTF-8 with replacement when
//! the input is empty. The returned label is the canonical encoding name
//! and goes verbatim into `FileMetadata::detected_encoding`.

use chardetng::EncodingDetector;

/// Decode bytes with auto-detection. Returns the decoded text and the
/// label of the encoding actually used.
pub fn decode_with_detection(data: &[u8]) -> (String, String) {
    if data.is_empty() {
        return (String::new(), "utf-8".to_string());
    }

    let mut detector = EncodingDetector::new();
    detector.feed(data, true);
    let encoding = detector.guess(None, true);

    let (text, used_encoding, _had_errors) = encoding.decode(data);
    (text.into_owned(), used_encoding.name().to_ascii_lowercase())
}

/// Decode CP-1252 bytes with replacement.
pub fn decode_cp1252(data: &[u8]) -> String {
    let (text, _, _) = encoding_rs::WINDOWS_1252.decode(data);
    text.into_owned()
}

/// Decode UTF-16LE bytes with replacement.
pub fn decode_utf16le(data: &[u8]) -> String {
    let (text, _, _) = encoding_rs::UTF_16LE.decode(data);
    text.into_owned()
}

/// Decode Latin-1 (ISO-8859-1) bytes. Every byte maps to the code point
/// of the same value.
pub fn decode_latin1(data: &[u8]) -> String {
    data.iter().map(|&b| b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_is_utf8() {
        let (text, label) = decode_with_detection(b"");
        assert_eq!(text, "");
        assert_eq!(label, "utf-8");
    }

    #[test]
    fn test_utf8_detection() {
        let (text, label) = decode_with_detection("grüße, мир".as_bytes());
        assert_eq!(text, "grüße, мир");
        assert_eq!(label, "utf-8");
    }

    #[test]
    fn test_cp1252_detection() {
        // "café" in CP-1252: e9 is é.
        let (text, _label) = decode_with_detection(b"caf\xe9 au lait, tr\xe8s bien");
        assert!(text.contains("café"));
    }

    #[test]
    fn test_utf16le_helper() {
        let bytes: Vec<u8> = "Hi".encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
        assert_eq!(decode_utf16le(&bytes), "Hi");
    }

    #[test]
    fn test_latin1_helper() {
        assert_eq!(decode_latin1(b"\xe9t\xe9"), "été");
    }
}
