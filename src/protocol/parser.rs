//! RESP Request Decoder
//!
//! Clients send every command as an array of bulk strings:
//!
//! ```text
//! *<argc>\r\n
//! $<len(arg0)>\r\n<arg0>\r\n
//! ...
//! $<len(argN-1)>\r\n<argN-1>\r\n
//! ```
//!
//! [`parse_request`] turns exactly one such frame into its argument tokens.
//! Decoding is all-or-nothing: a frame that is malformed or cut short yields a
//! [`ParseError`], never a partial token list. The decoder never looks past the
//! end of the slice it was given. Bytes after the first frame are left alone;
//! the returned `consumed` count says where the frame ended.

use crate::protocol::types::{prefix, CRLF};
use bytes::Bytes;
use thiserror::Error;

/// Errors that can occur while decoding a request frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Nothing to decode
    #[error("empty input")]
    EmptyInput,

    /// A frame or element did not start with the expected type byte
    #[error("expected '{expected}', got {found:#04x}")]
    UnexpectedPrefix { expected: char, found: u8 },

    /// A count or length header was not a decimal integer
    #[error("invalid integer: {0:?}")]
    InvalidInteger(String),

    /// A count or length header was negative
    #[error("invalid length: {0}")]
    InvalidLength(i64),

    /// The buffer ended before the frame did
    #[error("incomplete frame")]
    Incomplete,

    /// A bulk string was not followed by CRLF
    #[error("bulk string missing trailing CRLF")]
    MissingCrlf,
}

/// Result type for decoding operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Decodes one request frame from the front of `buf`.
///
/// Returns the argument tokens (token 0 is the command name) together with
/// the number of bytes the frame occupied. `*0\r\n` decodes to an empty list.
///
/// # Example
///
/// ```
/// use tidekv::protocol::parse_request;
///
/// let (tokens, consumed) = parse_request(b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n").unwrap();
/// assert_eq!(tokens, vec!["GET", "name"]);
/// assert_eq!(consumed, 23);
/// ```
pub fn parse_request(buf: &[u8]) -> ParseResult<(Vec<Bytes>, usize)> {
    let mut cursor = Cursor { buf, pos: 0 };

    let count = cursor.header(prefix::ARRAY)?;
    // Every element needs at least `$0\r\n\r\n`, which caps a sane capacity.
    let mut tokens = Vec::with_capacity(count.min(buf.len() / 6));

    for _ in 0..count {
        let len = cursor.header(prefix::BULK_STRING)?;
        tokens.push(cursor.payload(len)?);
    }

    Ok((tokens, cursor.pos))
}

/// Encodes arguments as a request frame.
///
/// This is the inverse of [`parse_request`] and is what a client sends.
pub fn encode_request<T: AsRef<[u8]>>(args: &[T]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.push(prefix::ARRAY);
    buf.extend_from_slice(args.len().to_string().as_bytes());
    buf.extend_from_slice(CRLF);
    for arg in args {
        let arg = arg.as_ref();
        buf.push(prefix::BULK_STRING);
        buf.extend_from_slice(arg.len().to_string().as_bytes());
        buf.extend_from_slice(CRLF);
        buf.extend_from_slice(arg);
        buf.extend_from_slice(CRLF);
    }
    buf
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl Cursor<'_> {
    /// Reads `<prefix><non-negative integer>\r\n` and returns the integer.
    fn header(&mut self, expected: u8) -> ParseResult<usize> {
        let found = match self.buf.get(self.pos) {
            Some(&b) => b,
            None if self.pos == 0 => return Err(ParseError::EmptyInput),
            None => return Err(ParseError::Incomplete),
        };
        if found != expected {
            return Err(ParseError::UnexpectedPrefix {
                expected: char::from(expected),
                found,
            });
        }

        let start = self.pos + 1;
        let end = match find_crlf(&self.buf[start..]) {
            Some(offset) => start + offset,
            None => return Err(ParseError::Incomplete),
        };

        let line = &self.buf[start..end];
        let n = std::str::from_utf8(line)
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or_else(|| {
                ParseError::InvalidInteger(String::from_utf8_lossy(line).into_owned())
            })?;
        if n < 0 {
            return Err(ParseError::InvalidLength(n));
        }

        self.pos = end + CRLF.len();
        usize::try_from(n).map_err(|_| ParseError::InvalidLength(n))
    }

    /// Reads `<len bytes>\r\n`.
    fn payload(&mut self, len: usize) -> ParseResult<Bytes> {
        let data_end = self.pos.checked_add(len).ok_or(ParseError::Incomplete)?;
        let frame_end = data_end.checked_add(CRLF.len()).ok_or(ParseError::Incomplete)?;
        if frame_end > self.buf.len() {
            return Err(ParseError::Incomplete);
        }
        if &self.buf[data_end..frame_end] != CRLF {
            return Err(ParseError::MissingCrlf);
        }

        let data = Bytes::copy_from_slice(&self.buf[self.pos..data_end]);
        self.pos = frame_end;
        Ok(data)
    }
}

/// Position of the first `\r\n` in `buf`, if any.
#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == CRLF)
}
