//! NEON classification kernel for aarch64.
//!
//! NEON has no native byte-level `movemask`, so each 16-byte compare result
//! is bit-packed by hand, mirroring the teacher's `neon_movemask`/
//! `neon_movemask_bulk` routines: four 16-byte sub-blocks are compared, their
//! MSBs are collapsed pairwise via `vshrn_n_u16`, and the 64 resulting bits
//! are reassembled into one `u64` per structural byte.

use std::arch::aarch64::*;

use super::RawMasks;

#[inline(always)]
unsafe fn neon_movemask(input: uint8x16_t) -> u64 {
    // Fold each byte's MSB down to a nibble-addressable bit using the
    // standard "multiply by a bit-position mask, narrow, reassemble" trick.
    let bit_mask: [u8; 16] = [
        0x01, 0x02, 0x04, 0x08, 0x10, 0x20, 0x40, 0x80, 0x01, 0x02, 0x04, 0x08, 0x10, 0x20, 0x40,
        0x80,
    ];
    let minput = vandq_u8(input, vld1q_u8(bit_mask.as_ptr()));
    let tmp = vpaddq_u8(minput, minput);
    let tmp = vpaddq_u8(tmp, tmp);
    let tmp = vpaddq_u8(tmp, tmp);
    vgetq_lane_u8(tmp, 0) as u64 | ((vgetq_lane_u8(tmp, 1) as u64) << 8)
}

#[inline(always)]
unsafe fn neon_movemask_bulk(
    p0: uint8x16_t,
    p1: uint8x16_t,
    p2: uint8x16_t,
    p3: uint8x16_t,
) -> u64 {
    neon_movemask(p0) | (neon_movemask(p1) << 16) | (neon_movemask(p2) << 32) | (neon_movemask(p3) << 48)
}

/// Classify one 64-byte block using NEON.
///
/// # Safety
/// `block` must be at least 64 bytes long. NEON is part of the aarch64 base
/// ISA, so no feature probe is required before calling this.
pub unsafe fn classify_block_neon(block: &[u8], separator: u8) -> RawMasks {
    debug_assert!(block.len() >= crate::BLOCK_SIZE);
    let ptr = block.as_ptr();
    let i0 = vld1q_u8(ptr);
    let i1 = vld1q_u8(ptr.add(16));
    let i2 = vld1q_u8(ptr.add(32));
    let i3 = vld1q_u8(ptr.add(48));

    let classify = |needle: u8| -> u64 {
        let n = vdupq_n_u8(needle);
        neon_movemask_bulk(
            vceqq_u8(i0, n),
            vceqq_u8(i1, n),
            vceqq_u8(i2, n),
            vceqq_u8(i3, n),
        )
    };

    RawMasks {
        quote: classify(b'"'),
        sep: classify(separator),
        cr: classify(b'\r'),
        lf: classify(b'\n'),
    }
}

#[cfg(test)]
mod tests {
    use super::super::scalar::classify_block_scalar;
    use super::*;

    #[test]
    fn neon_matches_scalar() {
        let mut block = [0u8; 64];
        for (i, b) in block.iter_mut().enumerate() {
            *b = match i % 5 {
                0 => b'"',
                1 => b',',
                2 => b'\r',
                3 => b'\n',
                _ => b'z',
            };
        }
        let scalar = classify_block_scalar(&block, b',');
        let simd = unsafe { classify_block_neon(&block, b',') };
        assert_eq!(scalar, simd);
    }
}
