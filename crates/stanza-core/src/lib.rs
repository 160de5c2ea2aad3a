//! # stanza-core
//!
//! Parser for **Stanza**, an indentation-sensitive markup that combines a
//! YAML-like block mode (lists, maps, literal and folded strings) with pure
//! JSON islands. The two modes are bridged by *conversion specifiers* —
//! tokens of the form `:name:` that hand the subordinate block to a named
//! sub-parser (`raw`, `literal`, `folded`, `datetime`, `timestamp`, `json`,
//! plus any the caller registers).
//!
//! ## Quick start
//!
//! ```rust
//! use stanza_core::parse;
//!
//! let doc = "\
//! name: stanza
//! tags:
//!   - markup
//!   - parser
//! meta: :json: {\"stars\": 5}
//! ";
//! let value = parse(doc).unwrap();
//! let map = value.as_map().unwrap();
//! assert_eq!(map.get_str("name").unwrap().as_str(), Some("stanza"));
//! assert_eq!(map.get_str("tags").unwrap().as_array().unwrap().len(), 2);
//! ```
//!
//! ## Modules
//!
//! - [`parser`] — block reader and the indentation-driven state machine
//! - `json` — the strict JSON sub-parser (with `#` comments accepted as
//!   whitespace between tokens, a deliberate extension over RFC 8259)
//! - `scalar` — escape, number, date-time, and timestamp lexers
//! - [`encoder`] — canonical block-form pretty printer
//! - [`value`] — the dynamically typed value tree
//! - [`reader`] — line sources with one-line pushback
//! - [`error`] — parse errors and internal block sentinels

pub mod encoder;
pub mod error;
mod json;
pub mod parser;
pub mod reader;
mod scalar;
pub mod value;

pub use encoder::encode;
pub use error::{Result, Signal, StanzaError, Step};
pub use parser::{Parser, SubParser, MAX_BLOCK_DEPTH, MAX_JSON_DEPTH};
pub use reader::{IoSource, LineRead, StrSource};
pub use value::{Map, Timestamp, Value};

/// Parse a whole source string as a single block-mode value.
pub fn parse(input: &str) -> Result<Value> {
    Parser::new(StrSource::new(input)).parse()
}

/// Parse a whole source string as a strict JSON value (with the
/// `#`-comment extension).
pub fn parse_json(input: &str) -> Result<Value> {
    Parser::new(StrSource::new(input)).parse_json()
}
