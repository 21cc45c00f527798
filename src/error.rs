//! Typed error taxonomy surfaced by validation and the [`crate::reader`] layer.
//!
//! The scanner and parser never fail: malformed input is encoded in the
//! field/row tables and flagged lazily (see [`crate::validate`]). Everything
//! in this module exists so that callers can distinguish error categories
//! without string matching, per the error taxonomy in the dialect contract.

use std::fmt;

/// The category of a CSV-level error.
///
/// This mirrors the four error kinds a caller can observe: a stray quote in
/// an unquoted field, a structurally broken quoted field, a record with the
/// wrong number of fields, and an oversized input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A `"` byte appeared inside a field that was not itself quoted.
    BareQuote,
    /// A quoted field was never closed, or non-`\r` bytes followed its
    /// closing quote before the next delimiter.
    QuoteError,
    /// A record had a different number of fields than the configured or
    /// auto-detected expectation.
    FieldCount,
    /// The input exceeded the configured maximum buffer size.
    InputTooLarge,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::BareQuote => "bare quote in non-quoted field",
            ErrorKind::QuoteError => "extraneous or unterminated quote",
            ErrorKind::FieldCount => "wrong number of fields",
            ErrorKind::InputTooLarge => "input exceeds maximum size",
        };
        f.write_str(s)
    }
}

/// A CSV parse-time error, carrying enough position information for a caller
/// to report a precise diagnostic or resynchronize at the next record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}, column {column}: {kind}")]
pub struct CsvError {
    /// 1-based line number at which the record containing the error began.
    pub start_line: u64,
    /// 1-based line number at which the error itself occurred (differs from
    /// `start_line` for a multi-line quoted field).
    pub line: u64,
    /// 1-based byte offset of the error within its line.
    pub column: u64,
    /// The category of failure.
    pub kind: ErrorKind,
}

/// The top-level error type for `blockcsv`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A failure reading or seeking the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A structural CSV error surfaced by validation.
    #[error(transparent)]
    Csv(#[from] CsvError),
    /// The input exceeded `max_input_size` while being materialized.
    #[error("input of {actual} bytes exceeds the configured maximum of {max} bytes")]
    InputTooLarge {
        /// The configured ceiling.
        max: usize,
        /// The size that would have resulted from materializing the stream.
        actual: usize,
    },
}

/// Convenience alias for `blockcsv`'s fallible operations.
pub type Result<T> = std::result::Result<T, Error>;
