//! Property-based coverage of the invariants in the core's testable-properties
//! section: SIMD/scalar mask equivalence, escape-pair elision,
//! CRLF normalization, round-tripping through the writer, and
//! blank-line/field-count bookkeeping. Complements the literal unit tests
//! inside each module with randomized input.

use proptest::prelude::*;

use blockcsv::scanner::scan;
use blockcsv::simd::{classify_block, should_use_simd};
use blockcsv::{parse_bytes, write_record};

/// A field value free of the separator, quote, and newline bytes, so it
/// round-trips through the writer without needing to be quoted.
fn plain_field() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{0,12}"
}

/// A field value that may contain any of the structural bytes except `\r`
/// (which the writer/reader pair does not promise to round-trip bit-for-bit,
/// per the scanner's documented "bare `\r` is retained verbatim" choice).
fn arbitrary_field() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ,\"\n]{0,16}"
}

proptest! {
    /// Every 64-byte block, classified by the dispatched kernel, agrees with
    /// the scalar kernel bit-for-bit -- the scanner's primary correctness
    /// invariant from the testable-properties section.
    #[test]
    fn simd_and_scalar_kernels_agree_on_any_block(bytes in prop::collection::vec(any::<u8>(), 64)) {
        let mut block = [0u8; 64];
        block.copy_from_slice(&bytes);
        let scalar = classify_block(&block, b',', false);
        let dispatched = classify_block(&block, b',', should_use_simd(128));
        prop_assert_eq!(scalar, dispatched);
    }

    /// For every byte of `chunk_has_escape` that is set, neither half of the
    /// escape pair it names appears in `quote_mask` -- invariant #4: "for
    /// every pair `""` inside a quoted region, neither quote bit appears in
    /// `quote_mask`". Exercised over arbitrary byte soup biased toward `"`
    /// so escape pairs, lone quotes, and block-boundary straddles all show
    /// up, not just well-formed CSV.
    #[test]
    fn escape_pairs_are_fully_elided_from_quote_mask(
        bytes in prop::collection::vec(prop::sample::select(vec![b'"', b'a', b',', b'\n']), 0..300)
    ) {
        let scan_result = scan(&bytes, b',');
        for k in 0..scan_result.num_blocks {
            let mut escape_bits = scan_result.chunk_has_escape[k];
            while escape_bits != 0 {
                let pos = escape_bits.trailing_zeros() as usize;
                escape_bits &= escape_bits - 1;
                prop_assert_eq!(scan_result.quote_mask[k] & (1u64 << pos), 0);
                if pos + 1 < 64 {
                    prop_assert_eq!(scan_result.quote_mask[k] & (1u64 << (pos + 1)), 0);
                } else if k + 1 < scan_result.num_blocks {
                    prop_assert_eq!(scan_result.quote_mask[k + 1] & 1, 0);
                }
            }
        }
    }

    /// A record sequence with no embedded `\r` and no empty trailing row
    /// survives a write-then-parse round trip unchanged, the property named
    /// directly in the invariants list.
    ///
    /// A single-field row whose only field is empty serializes to a blank
    /// line, which §8's "blank lines" property says must *not* produce a
    /// row -- that ambiguity is inherent to the dialect, not a bug, so such
    /// rows are excluded from the generated input here.
    #[test]
    fn round_trip_through_writer_and_core(
        rows in prop::collection::vec(prop::collection::vec(plain_field(), 1..5), 0..20)
            .prop_filter("no degenerate single-empty-field rows", |rows| {
                !rows.iter().any(|row| row.len() == 1 && row[0].is_empty())
            })
    ) {
        let mut buf = Vec::new();
        for row in &rows {
            write_record(&mut buf, row, b',').unwrap();
        }
        let parsed = parse_bytes(&buf, b',');
        let parsed_strings: Vec<Vec<String>> = parsed
            .iter()
            .map(|r| r.iter().map(|f| String::from_utf8_lossy(f).into_owned()).collect())
            .collect();
        prop_assert_eq!(parsed_strings, rows);
    }

    /// Quoted fields containing the separator, quotes, and embedded newlines
    /// round-trip through the writer/core pair as well, once the writer's
    /// quote-necessity test and the scanner's quote-state tracking are both
    /// exercised on the same data.
    #[test]
    fn round_trip_with_structural_bytes_inside_quotes(
        rows in prop::collection::vec(prop::collection::vec(arbitrary_field(), 1..4), 0..10)
            .prop_filter("no degenerate single-empty-field rows", |rows| {
                !rows.iter().any(|row| row.len() == 1 && row[0].is_empty())
            })
    ) {
        let mut buf = Vec::new();
        for row in &rows {
            write_record(&mut buf, row, b',').unwrap();
        }
        let parsed = parse_bytes(&buf, b',');
        let parsed_strings: Vec<Vec<String>> = parsed
            .iter()
            .map(|r| r.iter().map(|f| String::from_utf8_lossy(f).into_owned()).collect())
            .collect();
        prop_assert_eq!(parsed_strings, rows);
    }

    /// Blank lines inserted anywhere in an otherwise well-formed document
    /// never contribute a row: the row count only reflects non-blank lines.
    #[test]
    fn blank_lines_never_produce_rows(
        rows in prop::collection::vec(prop::collection::vec(plain_field(), 1..4), 1..10)
            .prop_filter("no degenerate single-empty-field rows", |rows| {
                !rows.iter().any(|row| row.len() == 1 && row[0].is_empty())
            }),
        blanks_after in prop::collection::vec(0usize..3, 1..10),
    ) {
        let mut buf = Vec::new();
        for (row, blank_count) in rows.iter().zip(blanks_after.iter().cycle()) {
            write_record(&mut buf, row, b',').unwrap();
            for _ in 0..*blank_count {
                buf.push(b'\n');
            }
        }
        let parsed = parse_bytes(&buf, b',');
        prop_assert_eq!(parsed.len(), rows.len());
    }

    /// The number of fields the parser emits equals the number of separator
    /// and newline bits in the combined mask, plus one more if the buffer
    /// ends mid-field with no trailing terminator.
    #[test]
    fn field_count_matches_popcount_of_structural_masks(
        rows in prop::collection::vec(prop::collection::vec(plain_field(), 1..4), 1..15)
            .prop_filter("no degenerate single-empty-field rows", |rows| {
                !rows.iter().any(|row| row.len() == 1 && row[0].is_empty())
            }),
        trailing_terminator in any::<bool>(),
    ) {
        let mut buf = Vec::new();
        for row in &rows {
            write_record(&mut buf, row, b',').unwrap();
        }
        if !trailing_terminator && buf.last() == Some(&b'\n') {
            buf.pop();
        }

        let scan_result = scan(&buf, b',');
        let sep_count: u32 = scan_result.sep_mask.iter().map(|m| m.count_ones()).sum();
        let newline_count: u32 = scan_result.newline_mask.iter().map(|m| m.count_ones()).sum();
        let has_trailing_field = !buf.is_empty() && buf.last() != Some(&b'\n');
        let expected = sep_count + newline_count + if has_trailing_field { 1 } else { 0 };

        let parsed = blockcsv::parser::parse(&buf, &scan_result);
        prop_assert_eq!(parsed.fields.len() as u32, expected);
    }
}
