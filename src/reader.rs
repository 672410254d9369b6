use std::io::{self, BufRead};

use crate::error::{Error, Result};
use crate::row::Row;

const DEFAULT_BUFFER_CAPACITY: usize = 8 * (1 << 10);

/// Builds a [`Parser`] with various configuration knobs.
///
/// Once a `Parser` is built its configuration cannot be changed; `build`
/// is the only way to get one.
#[derive(Clone, Debug)]
pub struct ParserBuilder {
    delimiter: u8,
    capacity: usize,
}

impl Default for ParserBuilder {
    fn default() -> ParserBuilder {
        ParserBuilder {
            delimiter: b',',
            capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

impl ParserBuilder {
    /// Creates a new builder with the default configuration (comma
    /// delimiter, 8KiB read buffer).
    pub fn new() -> ParserBuilder {
        ParserBuilder::default()
    }

    /// The field delimiter to use when parsing. Must not be `"`, `\r`, or
    /// `\n`; violating this is caught at [`build`](ParserBuilder::build)
    /// time, since a builder setter can't itself fail.
    pub fn delimiter(&mut self, delimiter: u8) -> &mut ParserBuilder {
        self.delimiter = delimiter;
        self
    }

    /// Sets the capacity (in bytes) of the buffer used to read from the
    /// underlying byte source.
    pub fn buffer_capacity(&mut self, capacity: usize) -> &mut ParserBuilder {
        self.capacity = capacity;
        self
    }

    /// Builds a parser that reads CSV data from `rdr`.
    ///
    /// Returns `Error::InvalidFieldDelimiter` if the configured delimiter
    /// collides with the quote byte or a line terminator byte.
    pub fn build<R: io::Read>(&self, rdr: R) -> Result<Parser<R>> {
        if self.delimiter == b'"' || self.delimiter == b'\r' || self.delimiter == b'\n' {
            return Err(Error::invalid_field_delimiter(self.delimiter));
        }
        Ok(Parser {
            rdr: io::BufReader::with_capacity(self.capacity, rdr),
            delimiter: self.delimiter,
            field_buf: Vec::new(),
            done: false,
        })
    }
}

/// A two-state, one-byte-lookahead parser that pulls CSV rows out of a byte
/// source.
///
/// `Parser` owns the buffering around `R` but not `R` itself: the caller
/// provides the reader and is responsible for its lifetime.
#[derive(Debug)]
pub struct Parser<R> {
    rdr: io::BufReader<R>,
    delimiter: u8,
    field_buf: Vec<u8>,
    done: bool,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum State {
    Start,
    InField,
}

impl<R: io::Read> Parser<R> {
    /// Creates a new parser with the default configuration (comma
    /// delimiter).
    pub fn new(rdr: R) -> Result<Parser<R>> {
        ParserBuilder::new().build(rdr)
    }

    /// Pulls the next row out of the underlying byte source, reusing `row`'s
    /// backing storage instead of allocating a fresh [`Row`].
    ///
    /// Returns:
    /// - `Ok(true)` — a row was parsed into `row`.
    /// - `Ok(false)` — the source is exhausted; `row` is left empty.
    /// - `Err(_)` — an I/O or format error occurred; `row`'s partially built
    ///   content has been discarded.
    ///
    /// This is the reuse-minded counterpart to
    /// [`into_rows`](Parser::into_rows): call it in a loop with one `Row`
    /// to parse a whole stream without allocating a new row per iteration.
    pub fn read_row(&mut self, row: &mut Row) -> Result<bool> {
        row.reset();
        match self.read_row_inner(row) {
            Ok(produced) => Ok(produced),
            Err(err) => {
                row.reset();
                Err(err)
            }
        }
    }

    /// Converts this parser into an iterator over its rows.
    pub fn into_rows(self) -> Rows<R> {
        Rows {
            parser: self,
            row: Row::new(),
        }
    }

    fn read_row_inner(&mut self, row: &mut Row) -> Result<bool> {
        if self.done {
            return Ok(false);
        }
        self.field_buf.clear();
        let mut state = State::Start;
        let mut quoted = false;

        loop {
            match state {
                State::Start => match self.peek()? {
                    None => {
                        self.done = true;
                        if row.field_count() > 0 {
                            row.append(&self.field_buf)?;
                            return Ok(true);
                        }
                        return Ok(false);
                    }
                    Some(b'"') => {
                        self.bump();
                        quoted = true;
                        state = State::InField;
                    }
                    Some(c) if c == self.delimiter => {
                        self.bump();
                        row.append(&self.field_buf)?;
                        self.field_buf.clear();
                    }
                    Some(c @ (b'\r' | b'\n')) => {
                        self.bump_terminator(c)?;
                        if row.field_count() > 0 {
                            row.append(&self.field_buf)?;
                        }
                        return Ok(true);
                    }
                    Some(_) => {
                        self.scan_into_field_buf()?;
                        state = State::InField;
                    }
                },
                State::InField => match self.peek()? {
                    None => {
                        self.done = true;
                        if quoted {
                            return Err(Error::invalid_format(
                                "unclosed quoted field at end of input",
                            ));
                        }
                        row.append(&self.field_buf)?;
                        return Ok(true);
                    }
                    Some(b'"') if !quoted => {
                        return Err(Error::invalid_format(
                            "quote must be escaped inside an unquoted field",
                        ));
                    }
                    Some(b'"') => {
                        self.bump();
                        match self.peek()? {
                            Some(b'"') => {
                                self.bump();
                                self.push_field_byte(b'"')?;
                            }
                            Some(c) if c == self.delimiter => {
                                self.bump();
                                row.append(&self.field_buf)?;
                                self.field_buf.clear();
                                quoted = false;
                                state = State::Start;
                            }
                            Some(c @ (b'\r' | b'\n')) => {
                                self.bump_terminator(c)?;
                                row.append(&self.field_buf)?;
                                return Ok(true);
                            }
                            _ => {
                                return Err(Error::invalid_format(
                                    "closing quote must be followed by a \
                                     delimiter or line terminator",
                                ));
                            }
                        }
                    }
                    Some(c @ (b'\r' | b'\n')) if quoted => {
                        self.bump();
                        self.push_field_byte(c)?;
                    }
                    Some(c @ (b'\r' | b'\n')) => {
                        self.bump_terminator(c)?;
                        row.append(&self.field_buf)?;
                        return Ok(true);
                    }
                    Some(c) if c == self.delimiter && quoted => {
                        self.bump();
                        self.push_field_byte(c)?;
                    }
                    Some(c) if c == self.delimiter => {
                        self.bump();
                        row.append(&self.field_buf)?;
                        self.field_buf.clear();
                        state = State::Start;
                    }
                    Some(_) => {
                        self.scan_into_field_buf()?;
                    }
                },
            }
        }
    }

    /// Returns the next unread byte without consuming it, or `None` at EOF.
    fn peek(&mut self) -> Result<Option<u8>> {
        Ok(self.rdr.fill_buf()?.first().copied())
    }

    fn bump(&mut self) {
        self.rdr.consume(1);
    }

    /// Consumes a CR or LF terminator byte already known (via `peek`) to be
    /// next, coalescing a CRLF pair into a single consumed terminator.
    fn bump_terminator(&mut self, c: u8) -> Result<()> {
        debug_assert!(c == b'\r' || c == b'\n');
        self.bump();
        if c == b'\r' && self.peek()? == Some(b'\n') {
            self.bump();
        }
        Ok(())
    }

    fn push_field_byte(&mut self, b: u8) -> Result<()> {
        self.field_buf
            .try_reserve(1)
            .map_err(|_| Error::out_of_memory())?;
        self.field_buf.push(b);
        Ok(())
    }

    /// Copies ordinary field bytes into `field_buf` until the next
    /// delimiter, quote, CR, or LF (or EOF), refilling the underlying
    /// buffered reader as needed. Scanning for the next stop byte uses
    /// `memchr` rather than testing every byte, which is the bulk of the
    /// difference between this parser and a naive one.
    fn scan_into_field_buf(&mut self) -> Result<()> {
        loop {
            let buf = self.rdr.fill_buf()?;
            if buf.is_empty() {
                return Ok(());
            }
            match stop_byte_pos(self.delimiter, buf) {
                Some(0) => return Ok(()),
                Some(i) => {
                    self.field_buf
                        .try_reserve(i)
                        .map_err(|_| Error::out_of_memory())?;
                    self.field_buf.extend_from_slice(&buf[..i]);
                    self.rdr.consume(i);
                    return Ok(());
                }
                None => {
                    let n = buf.len();
                    self.field_buf
                        .try_reserve(n)
                        .map_err(|_| Error::out_of_memory())?;
                    self.field_buf.extend_from_slice(buf);
                    self.rdr.consume(n);
                }
            }
        }
    }
}

/// Finds the position of the first byte in `buf` that would end a run of
/// ordinary field bytes: the delimiter, a quote, CR, or LF.
fn stop_byte_pos(delimiter: u8, buf: &[u8]) -> Option<usize> {
    let quote_or_delim = memchr::memchr2(b'"', delimiter, buf);
    let cr_or_lf = memchr::memchr2(b'\r', b'\n', buf);
    match (quote_or_delim, cr_or_lf) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

/// An iterator over the rows of a [`Parser`], yielding `Result<Row>`.
///
/// This is the ergonomic counterpart to [`Parser::read_row`]: it allocates
/// one `Row` per call to `next`. For reuse across rows without per-row
/// allocation, drive `read_row` directly in a loop instead.
pub struct Rows<R> {
    parser: Parser<R>,
    row: Row,
}

impl<R: io::Read> Iterator for Rows<R> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Result<Row>> {
        match self.parser.read_row(&mut self.row) {
            Ok(true) => Some(Ok(self.row.clone())),
            Ok(false) => None,
            Err(err) => Some(Err(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Parser, ParserBuilder};
    use crate::error::ErrorKind;
    use crate::row::Row;

    fn parse_all(data: &str) -> Vec<Vec<String>> {
        let rdr = data.as_bytes();
        let mut parser = Parser::new(rdr).unwrap();
        let mut rows = Vec::new();
        let mut row = Row::new();
        while parser.read_row(&mut row).unwrap() {
            rows.push(
                row.iter()
                    .map(|f| String::from_utf8(f.to_vec()).unwrap())
                    .collect(),
            );
        }
        rows
    }

    fn parse_err(data: &str) -> ErrorKind {
        let rdr = data.as_bytes();
        let mut parser = Parser::new(rdr).unwrap();
        let mut row = Row::new();
        loop {
            match parser.read_row(&mut row) {
                Ok(true) => continue,
                Ok(false) => panic!("expected an error, got end of input"),
                Err(err) => return err.into_kind(),
            }
        }
    }

    macro_rules! rows {
        ($([$($field:expr),* $(,)?]),* $(,)?) => {
            vec![$(vec![$($field.to_string()),*]),*]
        };
    }

    #[test]
    fn simple_fields() {
        assert_eq!(parse_all("a,b,c\n"), rows![["a", "b", "c"]]);
    }

    #[test]
    fn empty_field_in_middle() {
        assert_eq!(parse_all("a,,c\n"), rows![["a", "", "c"]]);
    }

    #[test]
    fn blank_line_is_zero_field_row() {
        assert_eq!(parse_all("\n"), vec![Vec::<String>::new()]);
    }

    #[test]
    fn quoted_empty_field() {
        assert_eq!(parse_all("\"\"\n"), rows![[""]]);
    }

    #[test]
    fn quoted_escaped_quote() {
        assert_eq!(parse_all("\"\"\"\"\n"), rows![["\""]]);
    }

    #[test]
    fn quoted_field_with_delimiter_and_newline() {
        assert_eq!(parse_all("\"a,b\",\"c\nd\"\n"), rows![["a,b", "c\nd"]]);
    }

    #[test]
    fn mixed_terminators() {
        assert_eq!(parse_all("a\rb\r\nc\nd"), rows![["a"], ["b"], ["c"], ["d"]]);
    }

    #[test]
    fn unclosed_quote_at_eof_is_invalid_format() {
        assert!(matches!(parse_err("\"oops"), ErrorKind::InvalidFormat(_)));
    }

    #[test]
    fn bare_quote_in_unquoted_field_is_invalid_format() {
        assert!(matches!(parse_err("ab\"cd\n"), ErrorKind::InvalidFormat(_)));
    }

    #[test]
    fn closing_quote_followed_by_garbage_is_invalid_format() {
        assert!(matches!(parse_err("\"a\"b\n"), ErrorKind::InvalidFormat(_)));
    }

    #[test]
    fn trailing_delimiter_is_empty_final_field() {
        assert_eq!(parse_all("a,b,\n"), rows![["a", "b", ""]]);
    }

    #[test]
    fn no_trailing_terminator_still_yields_final_row() {
        assert_eq!(parse_all("a,b,c"), rows![["a", "b", "c"]]);
    }

    #[test]
    fn end_of_input_is_distinct_from_empty_row() {
        let mut parser = Parser::new("a\n".as_bytes()).unwrap();
        let mut row = Row::new();
        assert!(parser.read_row(&mut row).unwrap());
        assert_eq!(row.field_count(), 1);
        assert!(!parser.read_row(&mut row).unwrap());
        assert_eq!(row.field_count(), 0);
    }

    #[test]
    fn custom_delimiter() {
        let mut parser = ParserBuilder::new()
            .delimiter(b'\t')
            .build("a\tb\tc\n".as_bytes())
            .unwrap();
        let mut row = Row::new();
        assert!(parser.read_row(&mut row).unwrap());
        assert_eq!(row.field_at(0), Some(&b"a"[..]));
        assert_eq!(row.field_at(1), Some(&b"b"[..]));
        assert_eq!(row.field_at(2), Some(&b"c"[..]));
    }

    #[test]
    fn rejects_quote_as_delimiter() {
        let err = ParserBuilder::new()
            .delimiter(b'"')
            .build("a\n".as_bytes())
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidFieldDelimiter(b'"')));
    }

    #[test]
    fn rows_iterator() {
        let parser = Parser::new("a,b\nc,d\n".as_bytes()).unwrap();
        let got: Vec<Vec<String>> = parser
            .into_rows()
            .map(|r| {
                r.unwrap()
                    .iter()
                    .map(|f| String::from_utf8(f.to_vec()).unwrap())
                    .collect()
            })
            .collect();
        assert_eq!(got, rows![["a", "b"], ["c", "d"]]);
    }
}
