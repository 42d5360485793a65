//! The fixed 40-byte trailer: a valid empty BGZF block carrying the index's
//! file offset in its "IP" extra field.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::BcisError;

/// Size, in bytes, of the trailer block.
pub const TRAILER_SIZE: usize = 40;

/// Byte range, within the trailer, occupied by the little-endian index offset.
const OFFSET_RANGE: std::ops::Range<usize> = 22..30;

/// The canonical trailer template. Bytes `OFFSET_RANGE` are a placeholder
/// patched in by [`patch`]; every other byte is part of the fixed magic
/// prefix/suffix and must never change.
#[rustfmt::skip]
pub const TEMPLATE: [u8; TRAILER_SIZE] = [
    0x1f, 0x8b, 0x08, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0xff, 0x1c, 0x00,
    0x42, 0x43, 0x02, 0x00, 0x27, 0x00,
    0x49, 0x50, 0x08, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x03, 0x00,
    0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00,
];

/// Produces the 40-byte trailer with `index_vpos` patched into bytes `[22, 30)`.
pub fn patch(index_vpos: u64) -> [u8; TRAILER_SIZE] {
    let mut bytes = TEMPLATE;
    LittleEndian::write_u64(&mut bytes[OFFSET_RANGE], index_vpos);
    bytes
}

/// Verifies that `bytes` (the file's final 40 bytes) match the template
/// outside of the offset field, and returns the decoded `index_vpos`.
pub fn verify_and_extract(bytes: &[u8; TRAILER_SIZE]) -> Result<u64, BcisError> {
    if bytes[..OFFSET_RANGE.start] != TEMPLATE[..OFFSET_RANGE.start] {
        return Err(BcisError::CorruptTrailer { reason: "magic prefix mismatch" });
    }
    if bytes[OFFSET_RANGE.end..] != TEMPLATE[OFFSET_RANGE.end..] {
        return Err(BcisError::CorruptTrailer { reason: "magic suffix mismatch" });
    }
    Ok(LittleEndian::read_u64(&bytes[OFFSET_RANGE]))
}
