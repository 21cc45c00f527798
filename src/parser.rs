//! Stage B: the mask-driven field/row extractor.
//!
//! Walks the bitmasks produced by [`crate::scanner`] in ascending byte-offset
//! order, turning separator and terminator events into a flat table of field
//! and row entries. No byte of the input is re-examined here beyond the
//! small fixed-size lookbehind/lookahead each event needs; everything else
//! is a lookup into the masks or the current field/row accumulators.

use bitflags::bitflags;

use crate::pool;
use crate::scanner::ScanResult;
use crate::BLOCK_SIZE;

bitflags! {
    /// Per-field metadata the builder needs to decide whether it can return
    /// a borrowed slice or must allocate and transform.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FieldFlags: u8 {
        /// The field was wrapped in `"..."` in the source.
        const IS_QUOTED = 0b0000_0001;
        /// The field contains an escaped `""` pair and/or a `\r\n` inside
        /// its quotes, so the builder must allocate and rewrite it.
        const NEEDS_UNESCAPE = 0b0000_0010;
        /// The field contains at least one `"` byte (quoted or not); used by
        /// validation to decide whether a bare-quote check applies.
        const CONTAINS_QUOTE = 0b0000_0100;
    }
}

/// One field's location and shape within the source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldEntry {
    /// Byte offset of the field's content, excluding surrounding quotes.
    pub content_start: u64,
    /// Length, in bytes, of the field's content as it appears in the
    /// source (before any unescaping).
    pub content_length: u64,
    /// Offset from the end of the field's content to the delimiter or
    /// terminator that closes it; nonzero only for quoted fields, where it
    /// accounts for the closing `"` itself.
    pub raw_end_delta: u64,
    /// Quoting/escaping metadata.
    pub flags: FieldFlags,
}

/// One record's location within the flat field table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowEntry {
    /// Index into [`ParseResult::fields`] of this row's first field.
    pub first_field_index: u32,
    /// Number of fields in this row.
    pub field_count: u32,
    /// 1-based line number on which this row began.
    pub line_number: u64,
    /// Byte offset of the first byte of this row: its first field's
    /// content_start if unquoted, or the opening quote if quoted. Not part
    /// of the original three-field row model; carried so comment-byte
    /// detection and error column computation can look up the row's first
    /// raw byte without re-scanning the buffer.
    pub start_offset: u64,
}

/// The flat field and row tables produced by one parse pass.
///
/// `fields` and `rows` are drawn from [`crate::pool`] at the start of
/// [`parse`] and returned to it when this value drops, so repeated parsing
/// of similarly shaped input reuses the same table capacity instead of
/// reallocating every call.
#[derive(Debug, Clone, Default)]
pub struct ParseResult {
    pub fields: Vec<FieldEntry>,
    pub rows: Vec<RowEntry>,
}

impl Drop for ParseResult {
    fn drop(&mut self) {
        pool::give_field_vec(std::mem::take(&mut self.fields));
        pool::give_row_vec(std::mem::take(&mut self.rows));
    }
}

struct Event {
    pos: u64,
    kind: EventKind,
}

#[derive(PartialEq, Eq)]
enum EventKind {
    Quote,
    Sep,
    Newline,
}

/// Every quote, separator, and terminator event in block `k`, in ascending
/// byte-position order. Quote events are included here (unlike the scanner's
/// internal fold) because the parser needs the *position* of the closing
/// quote, not just whether one exists.
fn block_events(scan: &ScanResult, k: usize) -> Vec<Event> {
    let base = (k * BLOCK_SIZE) as u64;
    let mut events = Vec::new();
    let mut q = scan.quote_mask[k];
    while q != 0 {
        let tz = q.trailing_zeros() as u64;
        events.push(Event { pos: base + tz, kind: EventKind::Quote });
        q &= q - 1;
    }
    let mut sep = scan.sep_mask[k];
    while sep != 0 {
        let tz = sep.trailing_zeros() as u64;
        events.push(Event { pos: base + tz, kind: EventKind::Sep });
        sep &= sep - 1;
    }
    let mut nl = scan.newline_mask[k];
    while nl != 0 {
        let tz = nl.trailing_zeros() as u64;
        events.push(Event { pos: base + tz, kind: EventKind::Newline });
        nl &= nl - 1;
    }
    events.sort_unstable_by_key(|e| e.pos);
    events
}

fn byte_at(buffer: &[u8], pos: u64) -> Option<u8> {
    buffer.get(pos as usize).copied()
}

fn field_has_escape_in_range(scan: &ScanResult, start: u64, end: u64) -> bool {
    if start >= end {
        return false;
    }
    let first_block = (start / BLOCK_SIZE as u64) as usize;
    let last_block = (((end - 1) / BLOCK_SIZE as u64) as usize).min(scan.chunk_has_escape.len().saturating_sub(1));
    for k in first_block..=last_block {
        let block_base = (k * BLOCK_SIZE) as u64;
        let lo = start.saturating_sub(block_base).min(BLOCK_SIZE as u64);
        let hi = end.saturating_sub(block_base).min(BLOCK_SIZE as u64);
        if lo >= hi {
            continue;
        }
        let width = (hi - lo) as u32;
        let range_mask = if width >= 64 { u64::MAX << lo } else { ((1u64 << width) - 1) << lo };
        if scan.chunk_has_escape[k] & range_mask != 0 {
            return true;
        }
    }
    false
}

fn field_has_cr_in_range(buffer: &[u8], start: u64, end: u64) -> bool {
    buffer[start as usize..end as usize].contains(&b'\r')
}

/// Per-field accumulator, reset every time a separator or (non-blank)
/// newline closes a field.
#[derive(Default)]
struct FieldState {
    start: u64,
    /// 1 iff this field's very first byte was its opening quote.
    quote_adjust: u64,
    last_closing_quote: Option<u64>,
    saw_quote: bool,
}

impl FieldState {
    fn new(start: u64) -> Self {
        FieldState { start, ..Default::default() }
    }

    fn reset(&mut self, start: u64) {
        *self = FieldState::new(start);
    }
}

/// Emit one field ending at terminating event `event_pos`, which closed via
/// `event_kind`. `effective_end` is `event_pos` for a separator, or
/// `event_pos` minus one when the terminator is a newline immediately
/// preceded by a `\r` that belongs to the CRLF pair being folded away (see
/// spec §4.2's `end_pos` rule).
fn emit_field(
    buffer: &[u8],
    scan: &ScanResult,
    field: &FieldState,
    event_pos: u64,
    effective_end: u64,
    fields: &mut Vec<FieldEntry>,
) {
    let content_start = field.start + field.quote_adjust;
    let content_length = if field.quote_adjust == 1 {
        match field.last_closing_quote {
            Some(close) => close.saturating_sub(content_start),
            None => effective_end.saturating_sub(content_start),
        }
    } else {
        effective_end.saturating_sub(content_start)
    };
    let raw_end_delta = event_pos.saturating_sub(content_start + content_length);

    let is_quoted = field.quote_adjust == 1;
    let content_end = content_start + content_length;
    let has_escape = is_quoted && field_has_escape_in_range(scan, content_start, content_end);
    let has_cr = is_quoted && field_has_cr_in_range(buffer, content_start, content_end);

    let mut flags = FieldFlags::empty();
    if is_quoted {
        flags |= FieldFlags::IS_QUOTED;
    }
    if has_escape || has_cr {
        flags |= FieldFlags::NEEDS_UNESCAPE;
    }
    if field.saw_quote {
        flags |= FieldFlags::CONTAINS_QUOTE;
    }

    fields.push(FieldEntry {
        content_start,
        content_length,
        raw_end_delta,
        flags,
    });
}

/// Extract the field and row tables for `buffer` from its previously
/// computed [`ScanResult`].
pub fn parse(buffer: &[u8], scan: &ScanResult) -> ParseResult {
    if scan.len == 0 {
        return ParseResult::default();
    }

    let approx_fields = scan.sep_mask.iter().map(|m| m.count_ones() as usize).sum::<usize>()
        + scan.newline_mask.iter().map(|m| m.count_ones() as usize).sum::<usize>()
        + 1;
    let approx_rows = scan.newline_mask.iter().map(|m| m.count_ones() as usize).sum::<usize>() + 1;

    let mut fields = pool::take_field_vec(approx_fields);
    let mut rows = pool::take_row_vec(approx_rows);

    let mut field = FieldState::new(0);
    let mut in_quote = false;
    let mut row_start: u64 = 0;
    let mut row_first_field: u32 = 0;
    let mut line_number: u64 = 1;

    for k in 0..scan.num_blocks {
        for event in block_events(scan, k) {
            match event.kind {
                EventKind::Quote => {
                    field.saw_quote = true;
                    if !in_quote {
                        in_quote = true;
                        if event.pos == field.start {
                            field.quote_adjust = 1;
                        }
                    } else {
                        in_quote = false;
                        field.last_closing_quote = Some(event.pos);
                    }
                }
                EventKind::Sep => {
                    emit_field(buffer, scan, &field, event.pos, event.pos, &mut fields);
                    field.reset(event.pos + 1);
                }
                EventKind::Newline => {
                    let effective_end = if event.pos > 0 && byte_at(buffer, event.pos - 1) == Some(b'\r') {
                        event.pos - 1
                    } else {
                        event.pos
                    };

                    // A blank line has produced no content and no quote for
                    // this (would-be) first field: either a bare `\n`
                    // directly at the row's first byte, or a `\r\n` pair
                    // whose `\r` is the row's first byte.
                    let is_blank_line = fields.len() as u32 == row_first_field
                        && field.quote_adjust == 0
                        && !field.saw_quote
                        && field.start == effective_end;
                    if is_blank_line {
                        row_start = event.pos + 1;
                        field.reset(row_start);
                        line_number += 1;
                        continue;
                    }

                    emit_field(buffer, scan, &field, event.pos, effective_end, &mut fields);
                    rows.push(RowEntry {
                        first_field_index: row_first_field,
                        field_count: fields.len() as u32 - row_first_field,
                        line_number,
                        start_offset: row_start,
                    });
                    row_first_field = fields.len() as u32;
                    line_number += 1;
                    row_start = event.pos + 1;
                    field.reset(row_start);
                }
            }
        }
    }

    // A trailing record with no final terminator still needs its last
    // field and row emitted.
    let end = scan.len as u64;
    if field.start < end || fields.len() as u32 > row_first_field {
        emit_field(buffer, scan, &field, end, end, &mut fields);
        rows.push(RowEntry {
            first_field_index: row_first_field,
            field_count: fields.len() as u32 - row_first_field,
            line_number,
            start_offset: row_start,
        });
    }

    ParseResult { fields, rows }
}
