//! SIMD dispatch: a process-global availability flag plus the contract
//! between the SIMD and scalar block classification kernels.
//!
//! A kernel's *only* job is to compare one 64-byte block against the four
//! structural bytes (`"`, separator, `\r`, `\n`) and return the four raw
//! bitmasks. It carries no quote-state, no CRLF folding, and no cross-block
//! knowledge -- all of that lives in [`crate::scanner`] and runs identically
//! regardless of which kernel produced the raw masks. This is what makes the
//! "SIMD and scalar kernels are contract-identical" invariant trivial to
//! reason about: it reduces to four independent byte-equality comparisons.

#[cfg(target_arch = "aarch64")]
mod aarch64;
mod scalar;
#[cfg(target_arch = "x86_64")]
mod x86;

use std::sync::OnceLock;

/// Below this many input bytes, the scalar kernel is faster than dispatching
/// into a SIMD kernel (two full blocks' worth of prologue/epilogue overhead
/// dominates otherwise).
pub const SIMD_MIN_LEN: usize = 128;

/// The four raw per-block classification masks, before CRLF folding or
/// quote-state tracking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawMasks {
    /// Bit `i` set iff byte `i` of the block is `"`.
    pub quote: u64,
    /// Bit `i` set iff byte `i` of the block equals the configured separator.
    pub sep: u64,
    /// Bit `i` set iff byte `i` of the block is `\r`.
    pub cr: u64,
    /// Bit `i` set iff byte `i` of the block is `\n`.
    pub lf: u64,
}

static SIMD_AVAILABLE: OnceLock<bool> = OnceLock::new();

/// Whether a SIMD classification kernel is available on this process. Chosen
/// once at first use and read-only thereafter, per the SIMD dispatch design
/// (a single global flag, not a per-call feature probe).
#[inline]
pub fn simd_available() -> bool {
    *SIMD_AVAILABLE.get_or_init(detect)
}

fn detect() -> bool {
    #[cfg(target_arch = "x86_64")]
    {
        std::is_x86_feature_detected!("avx2")
    }
    #[cfg(target_arch = "aarch64")]
    {
        // NEON is part of the aarch64 base ISA; no runtime probe needed.
        true
    }
    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    {
        false
    }
}

/// Classify exactly one 64-byte block, dispatching to the SIMD kernel when
/// available and worthwhile, falling back to the scalar kernel otherwise.
///
/// `block` must be exactly [`crate::BLOCK_SIZE`] (64) bytes; callers handle
/// partial tail blocks by copying into a zero-padded stack buffer before
/// calling this function.
#[inline]
pub fn classify_block(block: &[u8], separator: u8, use_simd: bool) -> RawMasks {
    debug_assert_eq!(block.len(), crate::BLOCK_SIZE);
    if use_simd {
        #[cfg(target_arch = "x86_64")]
        {
            return unsafe { x86::classify_block_avx2(block, separator) };
        }
        #[cfg(target_arch = "aarch64")]
        {
            return unsafe { aarch64::classify_block_neon(block, separator) };
        }
    }
    scalar::classify_block_scalar(block, separator)
}

/// Whether the SIMD kernel should be used for a buffer of the given length.
/// The choice is made once per buffer, not per block (see the dispatch
/// design notes): callers compute this once before their classification
/// loop and pass the resulting bool into every [`classify_block`] call.
#[inline]
pub fn should_use_simd(buffer_len: usize) -> bool {
    buffer_len >= SIMD_MIN_LEN && simd_available()
}
