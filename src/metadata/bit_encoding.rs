//! Decoding of the `d1` string array carried by the JVM metadata annotation.
//!
//! The compiler packs the serialized protobuf into annotation strings.
//! Current compilers use "UTF-8 mode": the first string starts with a
//! `\u0000` marker and every following UTF-16 unit holds one byte.
//! Older compilers used a 7-bit packing, optionally prefixed with a
//! `\u{FFFF}` marker.

use super::MetadataError;

const UTF8_MODE_MARKER: u16 = 0x0000;
const LEGACY_MARKER: u16 = 0xFFFF;

/// Decode `d1` (as UTF-16 code units per string) into protobuf bytes.
pub fn decode_bytes(strings: &[Vec<u16>]) -> Result<Vec<u8>, MetadataError> {
    let first = strings.first().and_then(|s| s.first()).copied();
    match first {
        Some(UTF8_MODE_MARKER) => Ok(units(strings).skip(1).map(|u| u as u8).collect()),
        Some(LEGACY_MARKER) => decode_seven_bit(units(strings).skip(1).collect()),
        _ => decode_seven_bit(units(strings).collect()),
    }
}

fn units(strings: &[Vec<u16>]) -> impl Iterator<Item = u16> + '_ {
    strings.iter().flat_map(|s| s.iter().copied())
}

fn decode_seven_bit(units: Vec<u16>) -> Result<Vec<u8>, MetadataError> {
    let mut data: Vec<u8> = units.into_iter().map(|u| u as u8).collect();
    // Undo the +1 (mod 128) shift that keeps zero bytes out of the strings.
    for byte in &mut data {
        *byte = byte.wrapping_add(0x7F) & 0x7F;
    }

    let result_len = 7 * data.len() / 8;
    let mut result = Vec::with_capacity(result_len);
    let mut byte_index = 0;
    let mut bit = 0;
    for _ in 0..result_len {
        let first = u32::from(data[byte_index]) >> bit;
        byte_index += 1;
        let next = *data
            .get(byte_index)
            .ok_or_else(|| MetadataError::encoding("7-bit metadata ends mid-byte"))?;
        let second = (u32::from(next) & ((1 << (bit + 1)) - 1)) << (7 - bit);
        result.push((first + second) as u8);
        if bit == 6 {
            byte_index += 1;
            bit = 0;
        } else {
            bit += 1;
        }
    }
    Ok(result)
}

/// Decode a JVM "modified UTF-8" constant into UTF-16 code units.
///
/// Differs from standard UTF-8 in that `\u0000` is encoded as two bytes
/// and supplementary characters as surrogate pairs of three bytes each.
pub fn modified_utf8_to_utf16(bytes: &[u8]) -> Result<Vec<u16>, MetadataError> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b0 = bytes[i];
        if b0 & 0x80 == 0 {
            out.push(u16::from(b0));
            i += 1;
        } else if b0 & 0xE0 == 0xC0 {
            let b1 = continuation(bytes, i + 1)?;
            out.push((u16::from(b0 & 0x1F) << 6) | u16::from(b1 & 0x3F));
            i += 2;
        } else if b0 & 0xF0 == 0xE0 {
            let b1 = continuation(bytes, i + 1)?;
            let b2 = continuation(bytes, i + 2)?;
            out.push(
                (u16::from(b0 & 0x0F) << 12) | (u16::from(b1 & 0x3F) << 6) | u16::from(b2 & 0x3F),
            );
            i += 3;
        } else {
            return Err(MetadataError::encoding(format!(
                "invalid modified UTF-8 lead byte 0x{b0:02X}"
            )));
        }
    }
    Ok(out)
}

fn continuation(bytes: &[u8], index: usize) -> Result<u8, MetadataError> {
    match bytes.get(index) {
        Some(b) if b & 0xC0 == 0x80 => Ok(*b),
        _ => Err(MetadataError::encoding("truncated modified UTF-8 sequence")),
    }
}
