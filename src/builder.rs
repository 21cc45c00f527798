//! Stage C: the record builder.
//!
//! Turns a [`FieldEntry`] plus the source buffer into the caller-visible
//! field value: a zero-copy borrow when the field needs no rewriting, or an
//! owned, unescaped `Vec<u8>` when it does. Most fields in real-world CSV
//! take the fast path.

use std::borrow::Cow;

use crate::parser::{FieldEntry, FieldFlags, RowEntry};

/// A single field's value: borrowed from the source buffer when possible,
/// owned only when `""` or `\r\n` inside a quoted field had to be rewritten.
pub type FieldValue<'a> = Cow<'a, [u8]>;

/// One record: an ordered list of field values.
pub type Record<'a> = Vec<FieldValue<'a>>;

fn contains_crlf(bytes: &[u8]) -> bool {
    bytes.windows(2).any(|w| w == b"\r\n")
}

fn unescape(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'"' && bytes.get(i + 1) == Some(&b'"') {
            out.push(b'"');
            i += 2;
        } else if bytes[i] == b'\r' && bytes.get(i + 1) == Some(&b'\n') {
            out.push(b'\n');
            i += 2;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    out
}

fn build_field<'a>(buffer: &'a [u8], field: &FieldEntry, has_any_cr_in_input: bool) -> FieldValue<'a> {
    let start = field.content_start as usize;
    let end = start + field.content_length as usize;
    let slice = &buffer[start..end];

    if !field.flags.contains(FieldFlags::NEEDS_UNESCAPE) {
        if has_any_cr_in_input && field.flags.contains(FieldFlags::IS_QUOTED) && contains_crlf(slice) {
            return Cow::Owned(unescape(slice));
        }
        return Cow::Borrowed(slice);
    }
    Cow::Owned(unescape(slice))
}

/// Build one [`Record`] for `row` out of `fields` and the source `buffer`.
///
/// `has_any_cr_in_input` lets callers skip the CRLF-containment check
/// entirely for buffers known to contain no `\r` at all.
pub fn build_record<'a>(
    buffer: &'a [u8],
    fields: &[FieldEntry],
    row: &RowEntry,
    has_any_cr_in_input: bool,
) -> Record<'a> {
    let start = row.first_field_index as usize;
    let end = start + row.field_count as usize;
    fields[start..end]
        .iter()
        .map(|f| build_field(buffer, f, has_any_cr_in_input))
        .collect()
}
