use std::io;

use crate::error::{Error, Result};
use crate::row::Row;

/// The line terminator a [`Writer`] emits after each row.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Terminator {
    /// `\n`
    LF,
    /// `\r\n`
    CRLF,
    /// `\r`
    CR,
}

impl Terminator {
    fn as_bytes(self) -> &'static [u8] {
        match self {
            Terminator::LF => b"\n",
            Terminator::CRLF => b"\r\n",
            Terminator::CR => b"\r",
        }
    }
}

/// The quoting policy a [`Writer`] uses when emitting fields.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum QuoteStyle {
    /// Quote every field, unconditionally.
    All,
    /// Quote a field only when required to round-trip: it contains a quote,
    /// the delimiter, or a CR or LF byte.
    Minimal,
}

/// Builds a [`Writer`] with various configuration knobs.
#[derive(Clone, Debug)]
pub struct WriterBuilder {
    delimiter: u8,
    style: QuoteStyle,
    terminator: Terminator,
}

impl Default for WriterBuilder {
    fn default() -> WriterBuilder {
        WriterBuilder {
            delimiter: b',',
            style: QuoteStyle::Minimal,
            terminator: Terminator::LF,
        }
    }
}

impl WriterBuilder {
    /// Creates a new builder with the default configuration (comma
    /// delimiter, minimal quoting, LF terminator).
    pub fn new() -> WriterBuilder {
        WriterBuilder::default()
    }

    /// The field delimiter to use when writing. Must not be `"`, `\r`, or
    /// `\n`.
    pub fn delimiter(&mut self, delimiter: u8) -> &mut WriterBuilder {
        self.delimiter = delimiter;
        self
    }

    /// The quoting policy to use when writing.
    pub fn quote_style(&mut self, style: QuoteStyle) -> &mut WriterBuilder {
        self.style = style;
        self
    }

    /// The line terminator to use when writing.
    pub fn terminator(&mut self, terminator: Terminator) -> &mut WriterBuilder {
        self.terminator = terminator;
        self
    }

    /// Builds a writer that writes CSV data to `wtr`.
    ///
    /// Returns `Error::InvalidFieldDelimiter` if the configured delimiter
    /// collides with the quote byte or a line terminator byte.
    ///
    /// `QuoteStyle` and `Terminator` are closed enums, so every value of
    /// those types is already valid CSV configuration; `build` still checks
    /// them so the `InvalidQuoteStyle`/`InvalidLineBreak` error kinds in the
    /// data model stay reachable if either enum ever grows a variant (e.g. a
    /// caller-chosen custom terminator byte) that isn't unconditionally
    /// valid.
    pub fn build<W: io::Write>(&self, wtr: W) -> Result<Writer<W>> {
        if self.delimiter == b'"' || self.delimiter == b'\r' || self.delimiter == b'\n' {
            return Err(Error::invalid_field_delimiter(self.delimiter));
        }
        validate_quote_style(self.style)?;
        validate_terminator(self.terminator)?;
        Ok(Writer {
            wtr,
            delimiter: self.delimiter,
            style: self.style,
            terminator: self.terminator,
        })
    }
}

fn validate_quote_style(style: QuoteStyle) -> Result<()> {
    match style {
        QuoteStyle::All | QuoteStyle::Minimal => Ok(()),
    }
}

fn validate_terminator(terminator: Terminator) -> Result<()> {
    match terminator {
        Terminator::LF | Terminator::CRLF | Terminator::CR => Ok(()),
    }
}

/// A writer for CSV data.
///
/// `Writer` owns its configuration but not `W`: the caller provides the
/// byte sink and is responsible for its lifetime and for flushing/closing
/// it.
#[derive(Debug)]
pub struct Writer<W> {
    wtr: W,
    delimiter: u8,
    style: QuoteStyle,
    terminator: Terminator,
}

impl<W: io::Write> Writer<W> {
    /// Creates a new writer with the default configuration (comma
    /// delimiter, minimal quoting, LF terminator).
    pub fn new(wtr: W) -> Result<Writer<W>> {
        WriterBuilder::new().build(wtr)
    }

    /// Writes one row, taking fields from any iterator of byte-sliceable
    /// values.
    ///
    /// The row is written according to the writer's configured quote
    /// policy, delimiter, and terminator, guaranteed to round-trip through
    /// a [`Parser`](crate::Parser) configured with the same delimiter.
    pub fn write_row<I, T>(&mut self, fields: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let mut fields = fields.into_iter();
        let first = fields.next();

        let (first, second) = match first {
            None => {
                return self.write_terminator();
            }
            Some(first) => {
                let second = fields.next();
                (first, second)
            }
        };

        if second.is_none() && first.as_ref().is_empty() {
            self.wtr.write_all(b"\"\"")?;
            return self.write_terminator();
        }

        self.write_field(first.as_ref())?;
        if let Some(second) = second {
            self.wtr.write_all(&[self.delimiter])?;
            self.write_field(second.as_ref())?;
        }
        for field in fields {
            self.wtr.write_all(&[self.delimiter])?;
            self.write_field(field.as_ref())?;
        }
        self.write_terminator()
    }

    /// Writes one [`Row`], as captured by a [`Parser`](crate::Parser).
    pub fn write_record(&mut self, row: &Row) -> Result<()> {
        self.write_row(row.iter())
    }

    /// Flushes the underlying byte sink.
    pub fn flush(&mut self) -> Result<()> {
        self.wtr.flush().map_err(Error::from)
    }

    fn write_terminator(&mut self) -> Result<()> {
        self.wtr.write_all(self.terminator.as_bytes())?;
        Ok(())
    }

    fn write_field(&mut self, field: &[u8]) -> Result<()> {
        if self.needs_quotes(field) {
            self.wtr.write_all(b"\"")?;
            let mut rest = field;
            while let Some(pos) = memchr::memchr(b'"', rest) {
                self.wtr.write_all(&rest[..pos])?;
                self.wtr.write_all(b"\"\"")?;
                rest = &rest[pos + 1..];
            }
            self.wtr.write_all(rest)?;
            self.wtr.write_all(b"\"")?;
        } else {
            self.wtr.write_all(field)?;
        }
        Ok(())
    }

    fn needs_quotes(&self, field: &[u8]) -> bool {
        match self.style {
            QuoteStyle::All => true,
            QuoteStyle::Minimal => field
                .iter()
                .any(|&b| b == b'"' || b == b'\r' || b == b'\n' || b == self.delimiter),
        }
    }
}
