//! The streaming-friendly external interface: materializes a [`Read`] source
//! into a single buffer, runs it through the scan/parse/build pipeline, and
//! walks the resulting rows applying the dialect policies (comments, field
//! count, lazy quotes, leading-space trimming) the core pipeline itself
//! knows nothing about.

use std::io::Read;

use crate::builder::{build_record, Record};
use crate::error::{Error, ErrorKind, Result};
use crate::parser::{self, ParseResult};
use crate::scanner::{self, ScanResult};
use crate::validate;
use crate::DEFAULT_MAX_INPUT_SIZE;

/// How a [`Reader`] checks each record's field count against the first
/// record it saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldCountPolicy {
    /// Every record must have exactly this many fields.
    Strict(usize),
    /// Every record must have the same number of fields as the first
    /// non-comment record; that number is not known until it is read.
    Auto,
    /// No check at all; records may have any number of fields.
    Flexible,
}

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Configuration for a [`Reader`].
#[derive(Debug, Clone)]
pub struct ReaderBuilder {
    separator: u8,
    comment: Option<u8>,
    field_count_policy: FieldCountPolicy,
    lazy_quote: bool,
    trim_leading_space: bool,
    strip_bom: bool,
    max_input_size: usize,
}

impl Default for ReaderBuilder {
    fn default() -> Self {
        ReaderBuilder {
            separator: b',',
            comment: None,
            field_count_policy: FieldCountPolicy::Auto,
            lazy_quote: false,
            trim_leading_space: false,
            strip_bom: true,
            max_input_size: DEFAULT_MAX_INPUT_SIZE,
        }
    }
}

impl ReaderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn separator(mut self, separator: u8) -> Self {
        self.separator = separator;
        self
    }

    pub fn comment(mut self, comment: Option<u8>) -> Self {
        self.comment = comment;
        self
    }

    pub fn field_count_policy(mut self, policy: FieldCountPolicy) -> Self {
        self.field_count_policy = policy;
        self
    }

    pub fn lazy_quote(mut self, lazy_quote: bool) -> Self {
        self.lazy_quote = lazy_quote;
        self
    }

    pub fn trim_leading_space(mut self, trim: bool) -> Self {
        self.trim_leading_space = trim;
        self
    }

    pub fn strip_bom(mut self, strip: bool) -> Self {
        self.strip_bom = strip;
        self
    }

    pub fn max_input_size(mut self, max: usize) -> Self {
        self.max_input_size = max;
        self
    }

    /// Materialize `source` fully and build a [`Reader`] over it.
    pub fn build<R: Read>(self, mut source: R) -> Result<Reader> {
        let mut buffer = Vec::new();
        source.read_to_end(&mut buffer)?;
        if buffer.len() > self.max_input_size {
            return Err(Error::InputTooLarge { max: self.max_input_size, actual: buffer.len() });
        }
        if self.strip_bom && buffer.starts_with(&UTF8_BOM) {
            buffer.drain(0..UTF8_BOM.len());
        }

        let scan_result = scanner::scan(&buffer, self.separator);
        let parsed = parser::parse(&buffer, &scan_result);
        let has_any_cr = buffer.contains(&b'\r');

        Ok(Reader {
            buffer,
            scan_result,
            parsed,
            cursor: 0,
            expected_fields: None,
            config: self,
            has_any_cr,
        })
    }
}

/// A fully materialized, parsed CSV document, walked one record at a time
/// with dialect policies applied.
pub struct Reader {
    buffer: Vec<u8>,
    scan_result: ScanResult,
    parsed: ParseResult,
    cursor: usize,
    expected_fields: Option<usize>,
    config: ReaderBuilder,
    has_any_cr: bool,
}

impl Reader {
    /// Open a reader over `source` with default settings.
    pub fn new<R: Read>(source: R) -> Result<Self> {
        ReaderBuilder::new().build(source)
    }

    fn is_comment_row(&self, row: &parser::RowEntry) -> bool {
        match self.config.comment {
            Some(byte) => self.buffer.get(row.start_offset as usize) == Some(&byte),
            None => false,
        }
    }

    fn trim_record<'a>(&self, mut record: Record<'a>) -> Record<'a> {
        if !self.config.trim_leading_space {
            return record;
        }
        for field in record.iter_mut() {
            let trimmed_len = field.iter().take_while(|&&b| b == b' ' || b == b'\t').count();
            if trimmed_len > 0 {
                match field {
                    std::borrow::Cow::Borrowed(slice) => *slice = &slice[trimmed_len..],
                    std::borrow::Cow::Owned(vec) => {
                        vec.drain(0..trimmed_len);
                    }
                }
            }
        }
        record
    }

    /// Read the next record, applying comment-skip, field-count policy, and
    /// leading-space trimming. Returns `Ok(None)` at end of input.
    pub fn read_record(&mut self) -> Result<Option<Record<'_>>> {
        loop {
            if self.cursor >= self.parsed.rows.len() {
                return Ok(None);
            }
            let row = self.parsed.rows[self.cursor];
            self.cursor += 1;

            if self.is_comment_row(&row) {
                continue;
            }

            if let Some(err) = validate::validate_unterminated_quote(
                self.cursor == self.parsed.rows.len() && self.scan_result.final_quoted,
                &row,
            ) {
                return Err(err.into());
            }

            if !self.config.lazy_quote {
                for field in
                    &self.parsed.fields[row.first_field_index as usize
                        ..(row.first_field_index + row.field_count) as usize]
                {
                    if let Some(err) = validate::validate_field(&self.buffer, field, &row, false) {
                        return Err(err.into());
                    }
                }
            }

            let expected = match self.config.field_count_policy {
                FieldCountPolicy::Strict(n) => n as i64,
                FieldCountPolicy::Flexible => -1,
                FieldCountPolicy::Auto => match self.expected_fields {
                    Some(n) => n as i64,
                    None => {
                        self.expected_fields = Some(row.field_count as usize);
                        row.field_count as i64
                    }
                },
            };
            if let Some(err) = validate::validate_field_count(&row, expected) {
                return Err(err.into());
            }

            let record = build_record(&self.buffer, &self.parsed.fields, &row, self.has_any_cr);
            return Ok(Some(self.trim_record(record)));
        }
    }
}
