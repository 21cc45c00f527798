//! The inverse of [`crate::reader`]: serializes records back to CSV text.
//!
//! Quoting is a linear byte scan, not a SIMD kernel: a field only needs
//! quoting when it contains the separator, a quote, or a line terminator,
//! and that check is already cheaper than the cost of writing the field.

use std::io::{self, Write};

/// Configuration for a [`Writer`].
#[derive(Debug, Clone, Copy)]
pub struct WriterBuilder {
    separator: u8,
    terminator: &'static [u8],
}

impl Default for WriterBuilder {
    fn default() -> Self {
        WriterBuilder { separator: b',', terminator: b"\n" }
    }
}

impl WriterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn separator(mut self, separator: u8) -> Self {
        self.separator = separator;
        self
    }

    pub fn crlf_terminator(mut self, use_crlf: bool) -> Self {
        self.terminator = if use_crlf { b"\r\n" } else { b"\n" };
        self
    }

    pub fn build<W: Write>(self, inner: W) -> Writer<W> {
        Writer { inner, config: self }
    }
}

/// Writes records to an inner [`Write`] as CSV text.
pub struct Writer<W: Write> {
    inner: W,
    config: WriterBuilder,
}

impl<W: Write> Writer<W> {
    pub fn new(inner: W) -> Self {
        WriterBuilder::new().build(inner)
    }

    /// Write one record, quoting fields that need it.
    pub fn write_record<I, F>(&mut self, fields: I) -> io::Result<()>
    where
        I: IntoIterator<Item = F>,
        F: AsRef<[u8]>,
    {
        let mut first = true;
        for field in fields {
            if !first {
                self.inner.write_all(&[self.config.separator])?;
            }
            first = false;
            write_field(&mut self.inner, field.as_ref(), self.config.separator)?;
        }
        self.inner.write_all(self.config.terminator)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

fn needs_quoting(field: &[u8], separator: u8) -> bool {
    field.iter().any(|&b| b == separator || b == b'"' || b == b'\n' || b == b'\r')
        || field.first() == Some(&b' ')
        || field.last() == Some(&b' ')
}

fn write_field<W: Write>(out: &mut W, field: &[u8], separator: u8) -> io::Result<()> {
    if !needs_quoting(field, separator) {
        return out.write_all(field);
    }
    out.write_all(b"\"")?;
    let mut start = 0;
    for (i, &b) in field.iter().enumerate() {
        if b == b'"' {
            out.write_all(&field[start..=i])?;
            out.write_all(b"\"")?;
            start = i + 1;
        }
    }
    out.write_all(&field[start..])?;
    out.write_all(b"\"")
}

/// Convenience for writing a single record without constructing a [`Writer`].
pub fn write_record<W: Write, I, F>(inner: &mut W, fields: I, separator: u8) -> io::Result<()>
where
    I: IntoIterator<Item = F>,
    F: AsRef<[u8]>,
{
    WriterBuilder::new().separator(separator).build(inner).write_record(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn written(fields: &[&str], separator: u8) -> String {
        let mut buf = Vec::new();
        write_record(&mut buf, fields, separator).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn plain_fields_are_not_quoted() {
        assert_eq!(written(&["a", "b", "c"], b','), "a,b,c\n");
    }

    #[test]
    fn field_with_separator_is_quoted() {
        assert_eq!(written(&["a,b", "c"], b','), "\"a,b\",c\n");
    }

    #[test]
    fn field_with_quote_is_escaped() {
        assert_eq!(written(&["a\"b"], b','), "\"a\"\"b\"\n");
    }

    #[test]
    fn field_with_newline_is_quoted() {
        assert_eq!(written(&["a\nb"], b','), "\"a\nb\"\n");
    }

    #[test]
    fn leading_or_trailing_space_is_quoted() {
        assert_eq!(written(&[" a"], b','), "\" a\"\n");
        assert_eq!(written(&["a "], b','), "\"a \"\n");
    }

    #[test]
    fn round_trips_through_parse_bytes() {
        let mut buf = Vec::new();
        write_record(&mut buf, ["hello, world", "b"], b',').unwrap();
        let records = crate::parse_bytes(&buf, b',');
        assert_eq!(records[0][0].as_ref(), b"hello, world");
        assert_eq!(records[0][1].as_ref(), b"b");
    }
}
