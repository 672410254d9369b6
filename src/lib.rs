//! A strict, byte-transparent streaming CSV parser and writer.
//!
//! This crate parses and writes CSV as raw bytes rather than `str`: no
//! assumption is made about text encoding beyond the handful of ASCII
//! bytes (`,`, `"`, `\r`, `\n`) that the CSV grammar itself relies on.
//! Malformed input (an unescaped quote in an unquoted field, an unclosed
//! quoted field, a closing quote not followed by a delimiter or line
//! terminator) is rejected rather than repaired.
//!
//! # Example
//!
//! ```
//! use strict_csv::Parser;
//!
//! let data = "a,b,c\r\n1,2,3\n";
//! let mut parser = Parser::new(data.as_bytes()).unwrap();
//! let mut row = strict_csv::Row::new();
//! while parser.read_row(&mut row).unwrap() {
//!     println!("{:?}", row.iter().collect::<Vec<_>>());
//! }
//! ```

pub use crate::error::{Error, ErrorKind, Result};
pub use crate::reader::{Parser, ParserBuilder, Rows};
pub use crate::row::Row;
pub use crate::writer::{QuoteStyle, Terminator, Writer, WriterBuilder};

mod error;
mod reader;
mod row;
mod writer;
