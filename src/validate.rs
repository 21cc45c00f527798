//! Stage D: validation.
//!
//! The scanner and parser never fail: a malformed quote or an inconsistent
//! field count is encoded in the field/row tables and only turned into an
//! [`CsvError`] here, lazily, when a caller asks for it. This keeps the hot
//! path (well-formed CSV, the overwhelming majority of real input) free of
//! error-path branching.

use crate::error::{CsvError, ErrorKind};
use crate::parser::{FieldEntry, FieldFlags, RowEntry};

/// Check a single field for bare-quote and unterminated/junk-quote errors.
///
/// `field_index_in_row` and `row` are used only to compute the error's line
/// and column; the check itself only needs `field` and the raw bytes behind
/// it.
pub fn validate_field(
    buffer: &[u8],
    field: &FieldEntry,
    row: &RowEntry,
    lazy_quote: bool,
) -> Option<CsvError> {
    if lazy_quote || !field.flags.contains(FieldFlags::CONTAINS_QUOTE) {
        return None;
    }

    if !field.flags.contains(FieldFlags::IS_QUOTED) {
        // Any `"` in an unquoted field is a bare quote; report the column of
        // the offending byte itself, not the field's start.
        let start = field.content_start as usize;
        let end = start + field.content_length as usize;
        let quote_pos = buffer[start..end]
            .iter()
            .position(|&b| b == b'"')
            .map(|i| (start + i) as u64)
            .unwrap_or(field.content_start);
        let column = quote_pos - row.start_offset + 1;
        return Some(CsvError {
            start_line: row.line_number,
            line: row.line_number,
            column,
            kind: ErrorKind::BareQuote,
        });
    }

    // Verify the closing quote is actually there, and that whatever sits
    // between it and the delimiter is empty or a lone `\r` (the CR of a
    // CRLF terminator). Anything else -- a missing closing quote, or junk
    // text after it -- is a quote error.
    let closing_pos = field.content_start + field.content_length;
    let delimiter_pos = closing_pos + field.raw_end_delta;
    let closing_ok = buffer.get(closing_pos as usize) == Some(&b'"');
    let gap = buffer.get(closing_pos as usize + 1..delimiter_pos as usize);
    let gap_ok = gap.is_some_and(|bytes| bytes.iter().all(|&b| b == b'\r'));
    if !closing_ok || !gap_ok {
        let column = closing_pos - row.start_offset + 1;
        return Some(CsvError {
            start_line: row.line_number,
            line: row.line_number,
            column,
            kind: ErrorKind::QuoteError,
        });
    }

    None
}

/// Check a row's field count against an expected count. `expected < 0` means
/// "no check" (the flexible policy).
pub fn validate_field_count(row: &RowEntry, expected: i64) -> Option<CsvError> {
    if expected < 0 || row.field_count as i64 == expected {
        return None;
    }
    Some(CsvError {
        start_line: row.line_number,
        line: row.line_number,
        column: 1,
        kind: ErrorKind::FieldCount,
    })
}

/// Whether the scan ended inside an unterminated quoted field, which is
/// always an error regardless of the lazy-quote policy (the buffer is
/// genuinely truncated, not just lenient about stray quotes).
pub fn validate_unterminated_quote(final_quoted: bool, row: &RowEntry) -> Option<CsvError> {
    if !final_quoted {
        return None;
    }
    Some(CsvError {
        start_line: row.line_number,
        line: row.line_number,
        column: 1,
        kind: ErrorKind::QuoteError,
    })
}
