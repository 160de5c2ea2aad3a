//! Error and status types for Stanza parsing.
//!
//! Two layers exist, following the parser's control-flow needs:
//!
//! - [`StanzaError`] is the public error: a parse failure with position, an
//!   IO failure from the line source, or an end-of-input on an empty source.
//! - [`Signal`] wraps `StanzaError` together with the two non-fatal
//!   sentinels, `EndOfBlock` and `Eof`, that terminate block iteration and
//!   the outer parse. Sub-parsers propagate a `Signal` with `?`; the
//!   sentinels never escape the public API on success paths.

use std::panic::Location;

use thiserror::Error;

/// Convenience alias for the public API.
pub type Result<T> = std::result::Result<T, StanzaError>;

/// Result alias used by sub-parsers, carrying block sentinels alongside
/// real errors.
pub type Step<T> = std::result::Result<T, Signal>;

/// Errors surfaced by [`parse`](crate::parse) and
/// [`parse_json`](crate::parse_json).
#[derive(Error, Debug)]
pub enum StanzaError {
    /// The input was not valid Stanza (or JSON, in JSON mode).
    ///
    /// `line` is 1-based; `column` is the 0-based code-point position within
    /// that line. `origin` records the parser source location that raised the
    /// error, for debugging the parser itself.
    #[error("{message} at line {line}, column {column}")]
    Parse {
        line: usize,
        column: usize,
        message: String,
        origin: &'static Location<'static>,
    },

    /// The source was empty (or all comments) at the top level.
    #[error("unexpected end of input")]
    Eof,

    /// The underlying line source failed.
    #[error("read error: {0}")]
    Io(#[from] std::io::Error),
}

impl StanzaError {
    /// Build a parse error, capturing the raising site.
    #[track_caller]
    pub fn parse(line: usize, column: usize, message: impl Into<String>) -> Self {
        StanzaError::Parse {
            line,
            column,
            message: message.into(),
            origin: Location::caller(),
        }
    }

    /// The error description, without position decoration.
    pub fn message(&self) -> &str {
        match self {
            StanzaError::Parse { message, .. } => message,
            StanzaError::Eof => "unexpected end of input",
            StanzaError::Io(_) => "read error",
        }
    }
}

/// Control-flow carrier for sub-parsers: either a real error or one of the
/// internal block sentinels.
#[derive(Debug)]
pub enum Signal {
    /// The current block has no more lines. Non-fatal; terminates the
    /// enclosing block-mode loop.
    EndOfBlock,
    /// The source is exhausted and no block is open. Non-fatal; terminates
    /// the outer parse.
    Eof,
    /// A genuine error, propagated unchanged.
    Error(StanzaError),
}

impl Signal {
    /// Collapse into a public error at the API boundary. The sentinels only
    /// reach here when nothing was parsed, which means the input ended.
    pub(crate) fn into_error(self) -> StanzaError {
        match self {
            Signal::EndOfBlock | Signal::Eof => StanzaError::Eof,
            Signal::Error(err) => err,
        }
    }
}

impl From<StanzaError> for Signal {
    fn from(err: StanzaError) -> Self {
        Signal::Error(err)
    }
}

impl From<std::io::Error> for Signal {
    fn from(err: std::io::Error) -> Self {
        Signal::Error(StanzaError::Io(err))
    }
}
