//! Lenient JSON decoding for DeviceAtlas Cloud payloads
//!
//! The cloud service answers with small JSON documents. This crate decodes
//! them with a forgiving single-pass parser instead of a strict JSON library:
//!
//! - objects `{}` and arrays `[]`/`()`, where arrays become integer-keyed maps
//! - strings delimited by `"` or `'` with `\b \t \n \f \r \uXXXX \xXX` escapes
//! - unquoted scalars: `true`/`false`/`null` (any case), then numbers
//!   (`0x` hex, leading-zero octal, decimal widening `i32` to `i64` to `f64`),
//!   then plain strings
//! - trailing commas and whitespace between tokens
//!
//! # Example
//!
//! ```
//! use dacloud_json::{decode, JsonValue};
//!
//! let map = decode(r#"{"test":[0,1,2], key: value}"#).expect("valid payload");
//! let list = map["test"].as_map().expect("array");
//! assert_eq!(list["2"], JsonValue::Int(2));
//! assert_eq!(map["key"], JsonValue::from("value"));
//! ```

pub mod error;
pub mod parser;
pub mod value;

pub use error::{DecodeError, ErrorKind, Result};
pub use parser::Parser;
pub use value::{JsonMap, JsonValue};

use std::path::Path;

/// Decode a top-level object.
///
/// Nothing is returned on failure; the error carries the byte offset at
/// which decoding stopped.
pub fn decode(text: &str) -> Result<JsonMap> {
    Parser::new(text).parse_document()
}

/// Decode a payload stored on disk.
///
/// A missing file is reported as [`ErrorKind::NotFound`]; other read
/// failures and malformed content as [`ErrorKind::BadData`].
pub fn decode_file(path: impl AsRef<Path>) -> Result<JsonMap> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            DecodeError::not_found(format!("{} not found", path.display()))
        } else {
            DecodeError::bad_data(format!("failed to read {}: {e}", path.display()), 0)
        }
    })?;
    decode(&text)
}
