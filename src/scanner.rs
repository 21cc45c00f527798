//! Stage A: the structural scanner.
//!
//! Converts a raw byte buffer into per-block bitmasks of quotes, field
//! separators, and (already CRLF-folded) record terminators, plus the
//! quote-state bookkeeping the parser needs to walk those masks correctly.
//!
//! This runs in two passes over the buffer's blocks:
//!
//! 1. Classify every block independently (SIMD or scalar, chosen once for
//!    the whole buffer) into raw, state-free masks.
//! 2. Walk the raw masks in block order, folding `\r\n` into a single
//!    terminator bit, tracking the in-quote state across block boundaries,
//!    and flagging which quote bytes are half of an escaped `""` pair
//!    rather than a true open/close quote, with one block of lookahead for
//!    pairs split across a boundary.
//!
//! Splitting the kernel from the stateful fold is what makes the SIMD and
//! scalar kernels trivially contract-identical: a kernel only ever answers
//! "which bytes in this block equal X", never "are we inside a quote".

use crate::pool;
use crate::simd::{self, RawMasks};
use crate::BLOCK_SIZE;

/// The output of the structural scan: one bitmask word per block for each of
/// quotes, separators, and terminators, plus escape-pair and quote-state
/// metadata the parser consumes directly.
#[derive(Debug, Clone)]
pub struct ScanResult {
    /// `quote_mask[k]` bit `i` set iff byte `i` of block `k` is a
    /// structurally significant `"` after escape removal: both bytes of an
    /// escaped `""` pair are cleared from this mask (see
    /// [`Self::chunk_has_escape`] for where that pair was).
    pub quote_mask: Vec<u64>,
    /// `sep_mask[k]` bit `i` set iff block `k` byte `i` is the separator and
    /// lies outside any quoted field.
    pub sep_mask: Vec<u64>,
    /// `newline_mask[k]` bit `i` set iff block `k` byte `i` is a record
    /// terminator: a bare `\n`, a bare `\r` not part of a `\r\n` pair, or the
    /// `\n` half of a `\r\n` pair (the paired `\r` is cleared so each
    /// terminator contributes exactly one event).
    pub newline_mask: Vec<u64>,
    /// `chunk_has_escape[k]` bit `i` set iff the `"` at block `k` byte `i`
    /// is the first byte of an escaped `""` pair, so the builder must
    /// collapse it and its successor to a single `"` rather than treating
    /// either as a field boundary.
    pub chunk_has_escape: Vec<u64>,
    /// Whether any `"` byte appears anywhere in the buffer. When false the
    /// parser can skip all quote-state bookkeeping.
    pub has_quotes_any: bool,
    /// Whether the buffer ends inside an open quoted field.
    pub final_quoted: bool,
    /// Number of valid bytes in the final (possibly partial) block.
    pub last_valid_bits: usize,
    /// Total number of 64-byte blocks, including a partial final block.
    pub num_blocks: usize,
    /// Length of the scanned buffer, in bytes.
    pub len: usize,
}

impl Drop for ScanResult {
    fn drop(&mut self) {
        pool::give_mask_vec(std::mem::take(&mut self.quote_mask));
        pool::give_mask_vec(std::mem::take(&mut self.sep_mask));
        pool::give_mask_vec(std::mem::take(&mut self.newline_mask));
        pool::give_mask_vec(std::mem::take(&mut self.chunk_has_escape));
    }
}

fn load_block(buffer: &[u8], block_index: usize) -> ([u8; BLOCK_SIZE], usize) {
    let start = block_index * BLOCK_SIZE;
    let remaining = buffer.len() - start;
    let mut block = [0u8; BLOCK_SIZE];
    if remaining >= BLOCK_SIZE {
        block.copy_from_slice(&buffer[start..start + BLOCK_SIZE]);
        (block, BLOCK_SIZE)
    } else {
        block[..remaining].copy_from_slice(&buffer[start..]);
        (block, remaining)
    }
}

/// Whether the quote byte at `pos` in block `k` is immediately followed by
/// another quote byte (in this block or the first byte of the next),
/// making it the first half of an escaped `""` pair.
fn quote_followed_by_quote(raw: &[RawMasks], k: usize, pos: usize) -> bool {
    if pos + 1 < BLOCK_SIZE {
        raw[k].quote & (1u64 << (pos + 1)) != 0
    } else {
        raw.get(k + 1).is_some_and(|next| next.quote & 1 != 0)
    }
}

/// Scan `buffer` for structural bytes, honoring `separator` as the field
/// delimiter. `separator` must not be `"`, `\r`, or `\n`; callers are
/// expected to have validated the dialect configuration before calling this.
pub fn scan(buffer: &[u8], separator: u8) -> ScanResult {
    let len = buffer.len();
    let num_blocks = if len == 0 { 0 } else { (len + BLOCK_SIZE - 1) / BLOCK_SIZE };
    let use_simd = simd::should_use_simd(len);

    // Pass 1: classify every block independently.
    let mut raw: Vec<RawMasks> = Vec::with_capacity(num_blocks);
    let mut last_valid_bits = 0;
    for k in 0..num_blocks {
        let (block, valid) = load_block(buffer, k);
        if k == num_blocks - 1 {
            last_valid_bits = valid;
        }
        raw.push(simd::classify_block(&block, separator, use_simd));
    }
    let has_quotes_any = raw.iter().any(|m| m.quote != 0);

    // Pass 2: fold CRLF, track quote state and escape pairs across blocks.
    // Mask buffers are drawn from the process-wide pool and returned to it
    // when the resulting `ScanResult` drops (see `pool` and the `Drop` impl
    // below), so repeated parses of similarly sized input stop paying
    // allocator cost for these four arrays.
    let mut quote_mask = pool::take_mask_vec(num_blocks);
    let mut sep_mask = pool::take_mask_vec(num_blocks);
    let mut newline_mask = pool::take_mask_vec(num_blocks);
    let mut chunk_has_escape = pool::take_mask_vec(num_blocks);

    let mut in_quoted = false;
    let mut skip_next_quote_byte = false;

    for k in 0..num_blocks {
        let m = raw[k];

        let shifted_lf = m.lf >> 1;
        let mut suppressed_cr = m.cr & shifted_lf;
        if k + 1 < num_blocks {
            let top_bit = 1u64 << (BLOCK_SIZE - 1);
            if m.cr & top_bit != 0 && raw[k + 1].lf & 1 != 0 {
                suppressed_cr |= top_bit;
            }
        }
        newline_mask[k] = m.lf | (m.cr & !suppressed_cr);

        // Fast no-quote block: with no `"` in this block and no open quoted
        // field carried in from a previous one, no separator or newline here
        // can possibly be suppressed, so skip the event walk entirely.
        if m.quote == 0 && !in_quoted {
            quote_mask[k] = 0;
            sep_mask[k] = m.sep;
            continue;
        }

        quote_mask[k] = m.quote;

        // Walk quote and separator events in ascending position order,
        // toggling quote state and masking separators that fall inside a
        // quoted field. Escaped `""` pairs consume two quote bits but only
        // one toggle, and both bits are cleared from the output quote_mask.
        let mut events: Vec<(usize, bool)> = Vec::with_capacity(
            (m.quote | m.sep).count_ones() as usize,
        );
        let mut qbits = m.quote;
        while qbits != 0 {
            events.push((qbits.trailing_zeros() as usize, true));
            qbits &= qbits - 1;
        }
        let mut sbits = m.sep;
        while sbits != 0 {
            events.push((sbits.trailing_zeros() as usize, false));
            sbits &= sbits - 1;
        }
        events.sort_unstable_by_key(|e| e.0);

        let mut masked_sep = 0u64;
        for (pos, is_quote) in events {
            if is_quote {
                if skip_next_quote_byte {
                    skip_next_quote_byte = false;
                    quote_mask[k] &= !(1u64 << pos);
                    continue;
                }
                if in_quoted && quote_followed_by_quote(&raw, k, pos) {
                    chunk_has_escape[k] |= 1u64 << pos;
                    quote_mask[k] &= !(1u64 << pos);
                    // the partner byte, whether in this block or the next,
                    // must not itself toggle quote state, and is cleared from
                    // quote_mask when it's reached above (or on the next
                    // block's first event, if it straddles the boundary).
                    skip_next_quote_byte = true;
                } else {
                    in_quoted = !in_quoted;
                }
            } else if !in_quoted {
                masked_sep |= 1u64 << pos;
            }
        }
        sep_mask[k] = masked_sep;
    }

    ScanResult {
        quote_mask,
        sep_mask,
        newline_mask,
        chunk_has_escape,
        has_quotes_any,
        final_quoted: in_quoted,
        last_valid_bits,
        num_blocks,
        len,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_unquoted_row() {
        let buf = b"a,b,c\n";
        let result = scan(buf, b',');
        assert_eq!(result.sep_mask[0], (1 << 1) | (1 << 3));
        assert_eq!(result.newline_mask[0].trailing_zeros(), 5);
        assert!(!result.has_quotes_any);
        assert!(!result.final_quoted);
    }

    #[test]
    fn crlf_is_folded_to_one_terminator_bit() {
        let buf = b"a,b\r\nc,d\r\n";
        let result = scan(buf, b',');
        assert_eq!(result.newline_mask[0] & (1 << 4), 0);
        assert_eq!(result.newline_mask[0] & (1 << 5), 1 << 5);
    }

    #[test]
    fn quoted_separator_is_not_a_field_boundary() {
        let buf = br#""a,b",c"#;
        let result = scan(buf, b',');
        assert_eq!(result.sep_mask[0] & (1 << 2), 0);
        assert_eq!(result.sep_mask[0] & (1 << 5), 1 << 5);
    }

    #[test]
    fn escaped_quote_pair_is_flagged() {
        let buf = br#""a""b""#;
        let result = scan(buf, b',');
        assert_ne!(result.chunk_has_escape[0], 0);
        assert!(!result.final_quoted);
    }

    #[test]
    fn unterminated_quote_is_reported() {
        let buf = br#""abc"#;
        let result = scan(buf, b',');
        assert!(result.final_quoted);
    }

    #[test]
    fn buffer_spanning_multiple_blocks_tracks_quote_state_across_boundary() {
        let mut buf = vec![b'"'];
        buf.extend(std::iter::repeat(b'x').take(BLOCK_SIZE * 2));
        buf.push(b'"');
        buf.push(b'\n');
        let result = scan(&buf, b',');
        assert_eq!(result.num_blocks, 3);
        assert!(!result.final_quoted);
    }

    #[test]
    fn escape_pair_split_across_block_boundary() {
        let mut buf = vec![b'"'];
        buf.extend(std::iter::repeat(b'x').take(BLOCK_SIZE - 2));
        buf.push(b'"'); // last byte of block 0: first half of escape pair
        buf.push(b'"'); // first byte of block 1: second half
        buf.push(b'\n');
        let result = scan(&buf, b',');
        assert_ne!(result.chunk_has_escape[0] & (1u64 << (BLOCK_SIZE - 1)), 0);
        assert!(!result.final_quoted);
    }
}
