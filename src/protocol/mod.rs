//! RESP Protocol
//!
//! The request side decodes a single array-of-bulk-strings frame into
//! argument tokens; the reply side encodes a [`RespValue`].
//!
//! ## Example
//!
//! ```
//! use tidekv::protocol::{parse_request, RespValue};
//! use bytes::Bytes;
//!
//! let (tokens, _) = parse_request(b"*2\r\n$4\r\nECHO\r\n$2\r\nhi\r\n").unwrap();
//! assert_eq!(tokens[1], "hi");
//!
//! let reply = RespValue::bulk_string(Bytes::from("hi"));
//! assert_eq!(reply.serialize(), b"$2\r\nhi\r\n");
//! ```

pub mod parser;
pub mod types;

pub use parser::{encode_request, parse_request, ParseError, ParseResult};
pub use types::RespValue;
