//! Buffer pooling for the scanner's and parser's per-call allocations.
//!
//! Mirrors the allocate/explicit-release discipline of [`crate::memory`] and
//! [`crate::io`]: a fixed-depth pool of previously used `Vec`s is kept behind
//! a `Mutex` per element type. A [`crate::scanner::scan`] or
//! [`crate::parser::parse`] call takes its buffers out of the pool at the
//! start, and the buffers are handed back automatically when the owning
//! [`crate::scanner::ScanResult`] / [`crate::parser::ParseResult`] drops, so
//! repeated parses against similarly sized input stop paying allocator cost.
//! Each pool also enforces a per-buffer capacity high-water mark: a buffer
//! returned larger than that cap is shrunk before going back on the shelf,
//! so one outlier-sized parse can't pin gigabytes of capacity that every
//! later small parse would otherwise inherit.
//!
//! The builder's per-field transform scratch (the third pool named in the
//! core's lifecycle) is deliberately not pooled here: its output is the
//! `Cow::Owned` value returned straight to the caller, so there is no point
//! in the call at which it could be handed back without an extra copy.

use std::sync::Mutex;

use crate::parser::{FieldEntry, RowEntry};

/// Soft cap on how many buffers of a given kind the pool keeps around. A
/// workload with wildly varying concurrency just falls back to allocating
/// fresh past this depth rather than growing unbounded.
const POOL_DEPTH: usize = 8;

/// High-water mark on a single pooled mask buffer's capacity, in `u64`
/// words: 16 KiB (per the pooling granularity design notes). A buffer over
/// this cap is shrunk to it before being returned to the pool, so one
/// outlier-sized parse can't pin multiple gigabytes of retained capacity.
const MASK_CAP_WORDS: usize = 16 * 1024 / std::mem::size_of::<u64>();

/// High-water mark on a single pooled field/row-table buffer's capacity, in
/// entries (256 field-table entries, per the same design notes).
const TABLE_CAP_ENTRIES: usize = 256;

struct Pool<T> {
    slots: Mutex<Vec<Vec<T>>>,
    cap: usize,
}

impl<T> Pool<T> {
    const fn new(cap: usize) -> Self {
        Pool { slots: Mutex::new(Vec::new()), cap }
    }

    fn acquire(&self) -> Vec<T> {
        self.slots.lock().unwrap().pop().unwrap_or_default()
    }

    fn release(&self, mut buf: Vec<T>) {
        buf.clear();
        if buf.capacity() > self.cap {
            buf.shrink_to(self.cap);
        }
        let mut slots = self.slots.lock().unwrap();
        if slots.len() < POOL_DEPTH {
            slots.push(buf);
        }
    }
}

static MASK_POOL: Pool<u64> = Pool::new(MASK_CAP_WORDS);
static FIELD_POOL: Pool<FieldEntry> = Pool::new(TABLE_CAP_ENTRIES);
static ROW_POOL: Pool<RowEntry> = Pool::new(TABLE_CAP_ENTRIES);

/// Check out a `u64` mask buffer (one of `quote_mask`, `sep_mask`,
/// `newline_mask`, or `chunk_has_escape`), zero-filled to `num_blocks` words.
pub fn take_mask_vec(num_blocks: usize) -> Vec<u64> {
    let mut buf = MASK_POOL.acquire();
    buf.resize(num_blocks, 0);
    buf
}

/// Return a mask buffer acquired via [`take_mask_vec`] to its pool.
pub fn give_mask_vec(buf: Vec<u64>) {
    MASK_POOL.release(buf);
}

/// Check out a field-table buffer pre-reserved for `capacity` entries.
pub fn take_field_vec(capacity: usize) -> Vec<FieldEntry> {
    let mut buf = FIELD_POOL.acquire();
    buf.reserve(capacity);
    buf
}

/// Return a field-table buffer acquired via [`take_field_vec`] to its pool.
pub fn give_field_vec(buf: Vec<FieldEntry>) {
    FIELD_POOL.release(buf);
}

/// Check out a row-table buffer pre-reserved for `capacity` entries.
pub fn take_row_vec(capacity: usize) -> Vec<RowEntry> {
    let mut buf = ROW_POOL.acquire();
    buf.reserve(capacity);
    buf
}

/// Return a row-table buffer acquired via [`take_row_vec`] to its pool.
pub fn give_row_vec(buf: Vec<RowEntry>) {
    ROW_POOL.release(buf);
}
