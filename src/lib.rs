//! # blockcsv
//!
//! A SIMD-accelerated CSV parser built around a block-parallel structural
//! scanner: raw input bytes are converted into per-64-byte-block bitmasks of
//! quotes, field separators, and record terminators, and a mask-driven
//! extractor walks those bitmasks to produce field and row boundary tables.
//!
//! This turns RFC 4180 parsing -- normally a byte-at-a-time state machine --
//! into a data-parallel computation over aligned blocks. The pipeline is:
//!
//! ```text
//! bytes -> scanner (masks) -> parser (field/row tables) -> builder (records)
//! ```
//!
//! [`reader`] and [`writer`] are the concrete external-facing layers built on
//! top of that core; [`simd`] picks between the AVX2/NEON and scalar block
//! classification kernels.

pub mod builder;
pub mod error;
pub mod io;
pub mod memory;
pub mod parser;
pub mod pool;
pub mod reader;
pub mod scanner;
pub mod simd;
pub mod validate;
pub mod writer;

use validate::{validate_field, validate_unterminated_quote};

pub use builder::{build_record, FieldValue, Record};
pub use error::{CsvError, Error, ErrorKind, Result};
pub use parser::{parse, FieldEntry, FieldFlags, ParseResult, RowEntry};
pub use reader::{Reader, ReaderBuilder};
pub use scanner::{scan, ScanResult};
pub use writer::{write_record, Writer, WriterBuilder};

/// Block size, in bytes, over which the scanner produces one bitmask word.
pub const BLOCK_SIZE: usize = 64;

/// Default ceiling on the size of a buffer the [`Reader`] will materialize
/// from a stream before failing with [`error::Error::InputTooLarge`].
pub const DEFAULT_MAX_INPUT_SIZE: usize = 2 * 1024 * 1024 * 1024;

/// Parse a fully materialized buffer into an in-memory sequence of records,
/// with no per-field validation (the fast, non-validating path over Stages
/// A-C: scan, parse, build).
pub fn parse_bytes(buffer: &[u8], separator: u8) -> Vec<Record> {
    let scan_result = scanner::scan(buffer, separator);
    let parsed = parser::parse(buffer, &scan_result);
    let has_any_cr = buffer.contains(&b'\r');
    parsed
        .rows
        .iter()
        .map(|row| build_record(buffer, &parsed.fields, row, has_any_cr))
        .collect()
}

/// Parse a fully materialized buffer, invoking `callback` with each record in
/// document order. Returning `Err` from `callback` aborts the parse and
/// propagates the error.
pub fn parse_bytes_streaming<E>(
    buffer: &[u8],
    separator: u8,
    mut callback: impl FnMut(Record) -> std::result::Result<(), E>,
) -> std::result::Result<(), E> {
    let scan_result = scanner::scan(buffer, separator);
    let parsed = parser::parse(buffer, &scan_result);
    let has_any_cr = buffer.contains(&b'\r');
    for row in &parsed.rows {
        let record = build_record(buffer, &parsed.fields, row, has_any_cr);
        callback(record)?;
    }
    Ok(())
}

/// Parse a fully materialized buffer into records, running Stage D's
/// bare-quote/quote-structure check (§4.4) on every field and the
/// unterminated-quote check on the final row, without going through
/// [`Reader`]'s dialect surface (no BOM stripping, comment skipping, or
/// field-count policy). The first error aborts the parse; records built for
/// rows before it are discarded, matching [`Error::InputTooLarge`]'s
/// "no partial result" handling rather than the Reader's per-row
/// resynchronization.
pub fn parse_bytes_validated(buffer: &[u8], separator: u8) -> std::result::Result<Vec<Record>, CsvError> {
    let scan_result = scanner::scan(buffer, separator);
    let parsed = parser::parse(buffer, &scan_result);
    let has_any_cr = buffer.contains(&b'\r');

    let mut records = Vec::with_capacity(parsed.rows.len());
    let last_row = parsed.rows.len().saturating_sub(1);
    for (i, row) in parsed.rows.iter().enumerate() {
        if let Some(err) = validate_unterminated_quote(i == last_row && scan_result.final_quoted, row) {
            return Err(err);
        }
        let fields = &parsed.fields
            [row.first_field_index as usize..(row.first_field_index + row.field_count) as usize];
        for field in fields {
            if let Some(err) = validate_field(buffer, field, row, false) {
                return Err(err);
            }
        }
        records.push(build_record(buffer, &parsed.fields, row, has_any_cr));
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validated_parse_accepts_well_formed_csv() {
        let records = parse_bytes_validated(b"a,b,c\n1,2,3\n", b',').unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0][0].as_ref(), b"a");
    }

    #[test]
    fn validated_parse_rejects_bare_quote() {
        let err = parse_bytes_validated(b"a\"b,c\n", b',').unwrap_err();
        assert!(matches!(err.kind, ErrorKind::BareQuote));
    }

    #[test]
    fn validated_parse_rejects_unterminated_quote() {
        let err = parse_bytes_validated(b"\"abc", b',').unwrap_err();
        assert!(matches!(err.kind, ErrorKind::QuoteError));
    }
}
