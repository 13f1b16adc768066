//! Best-effort pixel-dimension probe.
//!
//! Reads only the header bytes of PNG, GIF, BMP, and JPEG payloads.
//! Anything else, or a truncated header, yields `(None, None)`. The
//! input slice is never modified and never fully decoded.

/// Probe (width, height) of an image payload.
pub fn probe_dimensions(data: &[u8]) -> (Option<u32>, Option<u32>) {
    if let Some(dims) = probe_png(data)
        .or_else(|| probe_gif(data))
        .or_else(|| probe_bmp(data))
        .or_else(|| probe_jpeg(data))
    {
        (Some(dims.0), Some(dims.1))
    } else {
        (None, None)
    }
}

fn probe_png(data: &[u8]) -> Option<(u32, u32)> {
    const SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    if data.len() < 24 || data[..8] != SIGNATURE {
        return None;
    }
    // First chunk must be IHDR: width and height are its first fields.
    if &data[12..16] != b"IHDR" {
        return None;
    }
    let width = u32::from_be_bytes([data[16], data[17], data[18], data[19]]);
    let height = u32::from_be_bytes([data[20], data[21], data[22], data[23]]);
    Some((width, height))
}

fn probe_gif(data: &[u8]) -> Option<(u32, u32)> {
    if data.len() < 10 || (&data[..6] != b"GIF87a" && &data[..6] != b"GIF89a") {
        return None;
    }
    let width = u16::from_le_bytes([data[6], data[7]]) as u32;
    let height = u16::from_le_bytes([data[8], data[9]]) as u32;
    Some((width, height))
}

fn probe_bmp(data: &[u8]) -> Option<(u32, u32)> {
    if data.len() < 26 || &data[..2] != b"BM" {
        return None;
    }
    let width = i32::from_le_bytes([data[18], data[19], data[20], data[21]]);
    // Height may be negative for top-down bitmaps.
    let height = i32::from_le_bytes([data[22], data[23], data[24], data[25]]);
    Some((width.unsigned_abs(), height.unsigned_abs()))
}

fn probe_jpeg(data: &[u8]) -> Option<(u32, u32)> {
    if data.len() < 4 || data[0] != 0xFF || data[1] != 0xD8 {
        return None;
    }
    // Walk segment markers until a start-of-frame carries the dimensions.
    let mut pos = 2usize;
    while pos + 9 <= data.len() {
        if data[pos] != 0xFF {
            return None;
        }
        let marker = data[pos + 1];
        // Standalone markers without a length field.
        if (0xD0..=0xD8).contains(&marker) || marker == 0x01 {
            pos += 2;
            continue;
        }
        let seg_len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        if seg_len < 2 {
            return None;
        }
        let is_sof = matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_sof {
            let height = u16::from_be_bytes([data[pos + 5], data[pos + 6]]) as u32;
            let width = u16::from_be_bytes([data[pos + 7], data[pos + 8]]) as u32;
            return Some((width, height));
        }
        pos += 2 + seg_len;
    }
    None
}
