use std::error::Error as StdError;
use std::fmt;
use std::io;

/// A crate private constructor for `Error`.
fn new_error(kind: ErrorKind) -> Error {
    Error(Box::new(kind))
}

/// A type alias for `Result<T, strict_csv::Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// An error that can occur while parsing or writing CSV data.
///
/// `Error` is one pointer wide; the actual payload lives behind the `Box`
/// so that functions returning `Result<T, Error>` don't pay for the size of
/// the largest variant on every call, whether or not it errors.
#[derive(Debug)]
pub struct Error(Box<ErrorKind>);

impl Error {
    /// Return the specific kind of this error.
    pub fn kind(&self) -> &ErrorKind {
        &self.0
    }

    /// Unwrap this error into its underlying kind.
    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    /// Returns true if this is an I/O error.
    ///
    /// If this is true, the underlying `ErrorKind` is guaranteed to be
    /// `ErrorKind::Io`.
    pub fn is_io_error(&self) -> bool {
        matches!(*self.0, ErrorKind::Io(_))
    }

    pub(crate) fn out_of_memory() -> Error {
        // A unit variant allocates nothing to construct, so reporting an
        // allocation failure never itself needs the allocator.
        new_error(ErrorKind::OutOfMemory)
    }

    pub(crate) fn invalid_field_delimiter(delimiter: u8) -> Error {
        new_error(ErrorKind::InvalidFieldDelimiter(delimiter))
    }

    pub(crate) fn invalid_format(msg: impl Into<String>) -> Error {
        new_error(ErrorKind::InvalidFormat(msg.into()))
    }
}

/// The specific type of an error.
#[derive(Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// An attempt to grow a row's or field's backing storage failed.
    ///
    /// This can only occur on allocation failure; it carries no message
    /// because constructing one could itself require an allocation.
    OutOfMemory,
    /// A parser or writer was configured with a delimiter that collides
    /// with `"`, `\r`, or `\n`.
    InvalidFieldDelimiter(u8),
    /// A writer was configured with an invalid quote policy.
    InvalidQuoteStyle,
    /// A writer was configured with an invalid line terminator.
    InvalidLineBreak,
    /// An I/O error occurred while reading from the byte source or writing
    /// to the byte sink.
    Io(io::Error),
    /// The input violated the CSV grammar: an unescaped quote inside an
    /// unquoted field, a closing quote not followed by a delimiter or line
    /// terminator, or an unclosed quoted field at end of input.
    InvalidFormat(String),
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        new_error(ErrorKind::Io(err))
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match *self.0 {
            ErrorKind::Io(ref err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self.0 {
            ErrorKind::OutOfMemory => write!(f, "out of memory"),
            ErrorKind::InvalidFieldDelimiter(b) => write!(
                f,
                "invalid field delimiter {:?}: delimiter must not be \
                 a quote, CR, or LF",
                b as char
            ),
            ErrorKind::InvalidQuoteStyle => {
                write!(f, "invalid quote style")
            }
            ErrorKind::InvalidLineBreak => {
                write!(f, "invalid line terminator")
            }
            ErrorKind::Io(ref err) => err.fmt(f),
            ErrorKind::InvalidFormat(ref msg) => {
                write!(f, "CSV parse error: {}", msg)
            }
        }
    }
}
