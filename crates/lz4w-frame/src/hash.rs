//! XXH32 specialised to the 10-byte span covered by the header checksum
//!
//! The LZ4 header checksum covers FLG, BD and the 8-byte content size, so
//! the input length is always 10 and the seed always 0. With fewer than 16
//! bytes XXH32 never enters its striped loop; only the finalization path is
//! left, which is what this function unrolls.

const PRIME32_1: u32 = 2_654_435_761;
const PRIME32_2: u32 = 2_246_822_519;
const PRIME32_3: u32 = 3_266_489_917;
const PRIME32_4: u32 = 668_265_263;
const PRIME32_5: u32 = 374_761_393;

/// XXH32 (seed 0) of exactly 10 bytes.
pub fn hash10(p: &[u8; 10]) -> u32 {
    let mut h = PRIME32_5.wrapping_add(10);

    for word in [&p[0..4], &p[4..8]] {
        let w = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
        h = h.wrapping_add(w.wrapping_mul(PRIME32_3));
        h = h.rotate_left(17).wrapping_mul(PRIME32_4);
    }

    for &byte in &p[8..10] {
        h = h.wrapping_add(u32::from(byte).wrapping_mul(PRIME32_5));
        h = h.rotate_left(11).wrapping_mul(PRIME32_1);
    }

    h ^= h >> 15;
    h = h.wrapping_mul(PRIME32_2);
    h ^= h >> 13;
    h = h.wrapping_mul(PRIME32_3);
    h ^= h >> 16;
    h
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use xxhash_rust::xxh32::xxh32;

    #[test]
    fn matches_xxh32_for_zeros() {
        let zeros = [0u8; 10];
        assert_eq!(hash10(&zeros), xxh32(&zeros, 0));
    }

    #[test]
    fn matches_xxh32_for_all_ones() {
        let ones = [0xFFu8; 10];
        assert_eq!(hash10(&ones), xxh32(&ones, 0));
    }

    #[test]
    fn matches_xxh32_for_patched_header_span() {
        // FLG (version 01, linked, content size) + BD (256KB) + size 11
        let span = [0x48, 0x50, 11, 0, 0, 0, 0, 0, 0, 0];
        assert_eq!(hash10(&span), xxh32(&span, 0));
    }

    #[test]
    fn single_bit_changes_hash() {
        let a = [0u8; 10];
        let mut b = a;
        b[9] = 1;
        assert_ne!(hash10(&a), hash10(&b));
    }

    proptest! {
        /// The unrolled path is bit-for-bit the general algorithm.
        #[test]
        fn agrees_with_general_xxh32(bytes in any::<[u8; 10]>()) {
            prop_assert_eq!(hash10(&bytes), xxh32(&bytes, 0));
        }
    }
}
