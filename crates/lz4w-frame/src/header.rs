//! LZ4 frame header layout and the retroactive content-size patch
//!
//! Header with the content size present:
//! ```text
//! offset  0..4   magic 0x184D2204 (little-endian)
//! offset  4      FLG   bit 3 = content size present
//! offset  5      BD    block maximum size
//! offset  6..14  content size (u64, little-endian)
//! offset 14      HC    (XXH32(bytes 4..14) >> 8) & 0xFF
//! ```
//! Without the content size, HC sits at offset 6 and the header is 7 bytes.

use lz4w_core::PatchError;

use crate::hash::hash10;

/// The four magic bytes at the start of every LZ4 frame (little endian).
pub const MAGIC: u32 = 0x184D_2204;

/// Largest header the format allows (with dictionary ID); the engine
/// requires this much room even when the fields are absent.
pub const HEADER_CAPACITY: usize = 19;

/// Header length without the content size: magic + FLG + BD + HC
pub const MIN_HEADER_LEN: usize = 7;

/// Header length with the content size field
pub const SIZED_HEADER_LEN: usize = MIN_HEADER_LEN + CONTENT_SIZE_LEN;

pub const FLG_OFFSET: usize = 4;
pub const FLG_CONTENT_SIZE: u8 = 0x08;
pub const CONTENT_SIZE_OFFSET: usize = 6;
pub const CONTENT_SIZE_LEN: usize = 8;
pub const SIZED_CHECKSUM_OFFSET: usize = CONTENT_SIZE_OFFSET + CONTENT_SIZE_LEN;

/// Rewrite a provisional header in place with the final content size.
///
/// The magic must match and the content-size flag must still be clear;
/// otherwise the buffer is left untouched.
pub fn patch_header(
    header: &mut [u8; HEADER_CAPACITY],
    content_size: u64,
) -> Result<(), PatchError> {
    let found = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    if found != MAGIC {
        return Err(PatchError::BadMagic { found });
    }
    if header[FLG_OFFSET] & FLG_CONTENT_SIZE != 0 {
        return Err(PatchError::ContentSizeAlreadySet);
    }

    header[FLG_OFFSET] |= FLG_CONTENT_SIZE;
    header[CONTENT_SIZE_OFFSET..SIZED_CHECKSUM_OFFSET].copy_from_slice(&content_size.to_le_bytes());
    header[SIZED_CHECKSUM_OFFSET] = sized_header_checksum(header);
    Ok(())
}

/// Checksum byte for a header that carries the content size.
pub fn sized_header_checksum(header: &[u8; HEADER_CAPACITY]) -> u8 {
    let mut span = [0u8; 10];
    span.copy_from_slice(&header[FLG_OFFSET..SIZED_CHECKSUM_OFFSET]);
    (hash10(&span) >> 8) as u8
}

/// The content size declared by a serialized frame, if any.
///
/// Returns `None` for non-LZ4 data, truncated headers, and frames without the
/// content size field.
pub fn declared_content_size(frame: &[u8]) -> Option<u64> {
    if frame.len() < SIZED_HEADER_LEN {
        return None;
    }
    if u32::from_le_bytes([frame[0], frame[1], frame[2], frame[3]]) != MAGIC {
        return None;
    }
    if frame[FLG_OFFSET] & FLG_CONTENT_SIZE == 0 {
        return None;
    }
    let mut size = [0u8; CONTENT_SIZE_LEN];
    size.copy_from_slice(&frame[CONTENT_SIZE_OFFSET..SIZED_CHECKSUM_OFFSET]);
    Some(u64::from_le_bytes(size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use xxhash_rust::xxh32::xxh32;

    /// What the engine emits for a 256KB-block frame before the patch
    fn provisional() -> [u8; HEADER_CAPACITY] {
        let mut header = [0u8; HEADER_CAPACITY];
        header[..4].copy_from_slice(&MAGIC.to_le_bytes());
        header[4] = 0x40; // version 01, linked blocks
        header[5] = 0x50; // 256KB
        header[6] = 0xAA; // HC of the short header, overwritten by the patch
        header
    }

    #[test]
    fn patch_sets_flag_size_and_checksum() {
        let mut header = provisional();
        patch_header(&mut header, 11).unwrap();

        assert_eq!(header[FLG_OFFSET], 0x48);
        assert_eq!(header[5], 0x50);
        assert_eq!(&header[6..14], &11u64.to_le_bytes());
        let expected = (xxh32(&header[4..14], 0) >> 8) as u8;
        assert_eq!(header[14], expected);
        assert_eq!(declared_content_size(&header), Some(11));
    }

    #[test]
    fn double_patch_fails_without_mutation() {
        let mut header = provisional();
        patch_header(&mut header, 1234).unwrap();
        let patched = header;

        let err = patch_header(&mut header, 5678).unwrap_err();
        assert_eq!(err, PatchError::ContentSizeAlreadySet);
        assert_eq!(header, patched);
    }

    #[test]
    fn bad_magic_fails_without_mutation() {
        let mut header = provisional();
        header[0] ^= 0xFF;
        let before = header;

        let err = patch_header(&mut header, 1).unwrap_err();
        assert!(matches!(err, PatchError::BadMagic { .. }));
        assert_eq!(header, before);
    }

    #[test]
    fn magic_is_checked_before_flag() {
        let mut header = [0u8; HEADER_CAPACITY];
        header[FLG_OFFSET] = FLG_CONTENT_SIZE;
        let err = patch_header(&mut header, 1).unwrap_err();
        assert_eq!(err, PatchError::BadMagic { found: 0 });
    }

    #[test]
    fn declared_size_absent_without_flag() {
        let header = provisional();
        assert_eq!(declared_content_size(&header), None);
        assert_eq!(declared_content_size(&header[..10]), None);
        assert_eq!(declared_content_size(b"not an lz4 frame"), None);
    }

    #[test]
    fn extreme_sizes_checksum_correctly() {
        for size in [0u64, 1, u32::MAX as u64, u64::MAX] {
            let mut header = provisional();
            patch_header(&mut header, size).unwrap();
            assert_eq!(declared_content_size(&header), Some(size));
            assert_eq!(header[14], (xxh32(&header[4..14], 0) >> 8) as u8);
        }
    }

    proptest! {
        /// The stored checksum always matches an independent recomputation.
        #[test]
        fn stored_checksum_matches_recomputed(size in any::<u64>(), flg in any::<u8>(), bd in any::<u8>()) {
            let mut header = provisional();
            header[FLG_OFFSET] = flg & !FLG_CONTENT_SIZE;
            header[5] = bd;
            patch_header(&mut header, size).unwrap();
            prop_assert_eq!(header[14], (xxh32(&header[4..14], 0) >> 8) as u8);
            prop_assert_eq!(declared_content_size(&header), Some(size));
        }
    }
}
