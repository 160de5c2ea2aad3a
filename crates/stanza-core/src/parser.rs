//! The block-mode parser: line buffer, block reader, and the state machine
//! that turns indentation-structured text into a [`Value`] tree.
//!
//! Parsing advances strictly through [`Parser::read_block_line`], which
//! delivers the lines of the current block and signals `EndOfBlock` when an
//! unindented line (or the end of input) closes it. The closing line is
//! pushed back into the source, so the enclosing block's next read sees it
//! again — nested structures compose without lookahead state.
//!
//! # Key design decisions
//!
//! - **One entry point for line advancement**: every loop (maps, lists,
//!   string blocks, JSON) consumes lines only through the block reader, so
//!   comment skipping and block termination behave identically everywhere.
//! - **`skip_comments` is armed on block entry**: leading comment-only and
//!   empty lines are invisible at the start of every sub-block, which is what
//!   lets comments sit between list items and map entries (each item/value is
//!   itself a sub-block).
//! - **Code-point positions**: the current line is held as `Vec<char>`, so
//!   column arithmetic (indents, quote columns, error positions) is correct
//!   when keys or values contain multi-byte characters.

use std::collections::HashMap;

use crate::error::{Signal, StanzaError, Step};
use crate::json;
use crate::reader::LineRead;
use crate::scalar::{self, is_space, skip_spaces, BLOCK_TERMINATORS};
use crate::value::{Map, Value};

/// Deepest allowed nesting of block-mode sub-parsers.
pub const MAX_BLOCK_DEPTH: usize = 100;

/// Deepest allowed nesting inside JSON arrays and objects.
pub const MAX_JSON_DEPTH: usize = 100;

/// A conversion-specifier sub-parser.
///
/// Invoked with the parser positioned on the first line of the sub-block the
/// specifier governs; must consume that whole block and return its value.
pub type SubParser<S> = fn(&mut Parser<S>) -> Step<Value>;

/// Whether `parse_value` is producing a map key or a plain value.
#[derive(Clone, Copy, PartialEq)]
enum Want {
    Value,
    Key,
}

/// Result of `parse_value` in key mode: the key plus where its value starts.
enum Outcome {
    Value(Value),
    Key(Value, Separator),
}

/// A recognized key-value separator: the optional conversion specifier named
/// after the colon, and the value's column on the same line (`None` when the
/// value begins on the next line).
struct Separator {
    spec: Option<String>,
    value_pos: Option<usize>,
}

/// Parser state for one source. Owns the line source for the duration of the
/// parse; dropping the parser releases it on every path.
pub struct Parser<S: LineRead> {
    source: S,
    /// Current line, right-trimmed, as code points.
    line: Vec<char>,
    /// Count of leading space characters in `line`.
    indent: usize,
    /// 1-based source line number of `line`.
    line_no: usize,
    /// Minimum indentation required to remain in the current block.
    block_indent: usize,
    /// Nesting depth of block-mode sub-parsers.
    block_level: usize,
    pub(crate) json_depth: usize,
    /// While set, the block reader discards leading comment-only and empty
    /// lines; cleared when the first real line of a block is delivered.
    skip_comments: bool,
    eof: bool,
    specifiers: HashMap<String, SubParser<S>>,
}

impl<S: LineRead> Parser<S> {
    /// Create a parser bound to `source`, with the built-in conversion
    /// specifiers (`raw`, `literal`, `folded`, `datetime`, `timestamp`,
    /// `json`) registered.
    pub fn new(source: S) -> Self {
        let mut specifiers: HashMap<String, SubParser<S>> = HashMap::new();
        specifiers.insert("raw".to_string(), spec_raw::<S> as SubParser<S>);
        specifiers.insert("literal".to_string(), spec_literal::<S> as SubParser<S>);
        specifiers.insert("folded".to_string(), spec_folded::<S> as SubParser<S>);
        specifiers.insert("datetime".to_string(), spec_datetime::<S> as SubParser<S>);
        specifiers.insert("timestamp".to_string(), spec_timestamp::<S> as SubParser<S>);
        specifiers.insert("json".to_string(), spec_json::<S> as SubParser<S>);
        Self {
            source,
            line: Vec::new(),
            indent: 0,
            line_no: 0,
            block_indent: 0,
            block_level: 0,
            json_depth: 0,
            skip_comments: true,
            eof: false,
            specifiers,
        }
    }

    /// Register or replace the sub-parser for conversion specifier `name`.
    pub fn set_specifier(&mut self, name: impl Into<String>, f: SubParser<S>) {
        self.specifiers.insert(name.into(), f);
    }

    /// Parse the whole source as a single block-mode value.
    ///
    /// An empty source (or one holding only comments) returns
    /// [`StanzaError::Eof`].
    pub fn parse(&mut self) -> crate::error::Result<Value> {
        self.skip_comments = true;
        self.block_indent = 0;
        self.block_level = 0;
        if let Err(sig) = self.read_block_line() {
            return Err(sig.into_error());
        }
        self.parse_block_value().map_err(Signal::into_error)
    }

    /// Parse the whole source as a strict JSON value (with the `#`-comment
    /// extension).
    pub fn parse_json(&mut self) -> crate::error::Result<Value> {
        self.skip_comments = true;
        self.block_indent = 0;
        self.block_level = 0;
        if let Err(sig) = self.read_block_line() {
            return Err(sig.into_error());
        }
        json::parse_json_block(self).map_err(Signal::into_error)
    }

    // -- accessors for custom sub-parsers ----------------------------------

    /// The current line as code points.
    pub fn current_line(&self) -> &[char] {
        &self.line
    }

    /// Count of leading spaces on the current line.
    pub fn current_indent(&self) -> usize {
        self.indent
    }

    /// Minimum indentation of the current block.
    pub fn block_indent(&self) -> usize {
        self.block_indent
    }

    /// 1-based number of the current line.
    pub fn line_number(&self) -> usize {
        self.line_no
    }

    /// Build a parse error at `column` of the current line, capturing the
    /// raising site.
    #[track_caller]
    pub fn parse_error(&self, column: usize, message: &str) -> Signal {
        Signal::Error(StanzaError::parse(self.line_no, column, message))
    }

    /// The current line's text from the block indent onward.
    pub fn block_line_text(&self) -> String {
        let from = self.block_indent.min(self.line.len());
        self.line[from..].iter().collect()
    }

    // -- line buffer and block reader --------------------------------------

    /// Read one raw line into the buffer: right-trim, recompute the indent,
    /// update the line number. Returns `false` at end of input.
    fn read_raw_line(&mut self) -> Step<bool> {
        let Some(mut text) = self.source.read_line()? else {
            return Ok(false);
        };
        while text.ends_with(' ') || text.ends_with('\t') {
            text.pop();
        }
        self.line = text.chars().collect();
        self.indent = self.line.iter().take_while(|c| **c == ' ').count();
        self.line_no = self.source.line_number();
        Ok(true)
    }

    /// Advance to the next line of the current block.
    ///
    /// Delivers empty lines as-is (blank lines are content inside string
    /// blocks). An unindented comment line is discarded; an unindented real
    /// line is pushed back into the source and `EndOfBlock` is returned, so
    /// the enclosing block can re-read it. The call is idempotent at a block
    /// boundary.
    pub fn read_block_line(&mut self) -> Step<()> {
        if self.eof {
            return Err(if self.block_level > 0 {
                Signal::EndOfBlock
            } else {
                Signal::Eof
            });
        }
        loop {
            if !self.read_raw_line()? {
                self.eof = true;
                self.line.clear();
                self.indent = 0;
                return Err(Signal::EndOfBlock);
            }
            if self.skip_comments {
                if self.line.is_empty() || self.line.get(self.indent) == Some(&'#') {
                    continue;
                }
                self.skip_comments = false;
            }
            if self.line.is_empty() {
                return Ok(());
            }
            if self.indent >= self.block_indent {
                return Ok(());
            }
            if self.line.get(self.indent) == Some(&'#') {
                // Unindented comments never terminate a block.
                continue;
            }
            let text: String = self.line.iter().collect();
            self.source.unread_line(text);
            self.line.clear();
            self.indent = 0;
            return Err(Signal::EndOfBlock);
        }
    }

    /// Read the next block line, treating a block boundary as success. Used
    /// after an inline value: the enclosing loop re-detects the boundary
    /// through its own read.
    pub fn advance_line(&mut self) -> Step<()> {
        match self.read_block_line() {
            Ok(()) | Err(Signal::EndOfBlock) | Err(Signal::Eof) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Consume the remainder of the current block, requiring it to hold only
    /// empty and comment-only lines.
    pub fn drain_block(&mut self, message: &str) -> Step<()> {
        loop {
            if !self.line.is_empty() && self.line.get(self.indent) != Some(&'#') {
                return Err(self.parse_error(self.indent, message));
            }
            match self.read_block_line() {
                Ok(()) => {}
                Err(Signal::EndOfBlock) | Err(Signal::Eof) => return Ok(()),
                Err(e) => return Err(e),
            }
        }
    }

    // -- nested-block driver -----------------------------------------------

    /// Run `f` inside a nested block whose minimum indent is `indent`,
    /// saving and restoring the enclosing block's state around it.
    fn enter_block<T>(
        &mut self,
        indent: usize,
        f: impl FnOnce(&mut Self) -> Step<T>,
    ) -> Step<T> {
        if self.block_level >= MAX_BLOCK_DEPTH {
            return Err(self.parse_error(self.indent, "Too many nested blocks"));
        }
        let saved_indent = self.block_indent;
        let saved_skip = self.skip_comments;
        self.block_indent = indent;
        self.block_level += 1;
        self.skip_comments = true;
        let result = f(self);
        self.block_indent = saved_indent;
        self.block_level -= 1;
        self.skip_comments = saved_skip;
        result
    }

    /// Nested block whose first line is already current (value inline after
    /// a key, list marker, or specifier).
    fn enter_block_inline(&mut self, indent: usize, f: SubParser<S>) -> Step<Value> {
        self.enter_block(indent, f)
    }

    /// Nested block whose content starts on the next line. `empty_message`
    /// is raised when no line belongs to the block.
    fn enter_block_next_line(
        &mut self,
        indent: usize,
        f: SubParser<S>,
        empty_message: &str,
    ) -> Step<Value> {
        self.enter_block(indent, |p| {
            match p.read_block_line() {
                Ok(()) => {}
                Err(Signal::EndOfBlock) | Err(Signal::Eof) => {
                    return Err(p.parse_error(p.indent, empty_message));
                }
                Err(e) => return Err(e),
            }
            f(p)
        })
    }

    // -- block-mode value parsing ------------------------------------------

    /// Default sub-parser: one value, then nothing else in the block.
    fn parse_block_value(&mut self) -> Step<Value> {
        match self.parse_value(Want::Value)? {
            Outcome::Value(v) => {
                self.drain_block("Extra data after parsed value")?;
                Ok(v)
            }
            Outcome::Key(..) => unreachable!("value mode never yields a key"),
        }
    }

    /// The §-machine: dispatch on the first content character of the line.
    fn parse_value(&mut self, want: Want) -> Step<Outcome> {
        debug_assert!(!self.line.is_empty());
        let start = skip_spaces(&self.line, self.block_indent);
        let len = self.line.len();
        if start >= len {
            return Err(self.parse_error(start, "Unexpected character"));
        }
        let c = self.line[start];

        // Conversion specifier, or a colon where no key may start.
        if c == ':' {
            if want == Want::Key {
                return Err(self.parse_error(
                    start,
                    "Map key expected and it cannot start with colon",
                ));
            }
            if let Some((name, after)) = self.match_specifier(start) {
                let f = *self.specifiers.get(&name).expect("specifier just matched");
                let p = skip_spaces(&self.line, after);
                let v = if p >= len || self.line[p] == '#' {
                    // Bare specifier line: the sub-parser takes over the
                    // enclosing block starting at the next line.
                    self.skip_comments = true;
                    match self.read_block_line() {
                        Ok(()) => {}
                        Err(Signal::EndOfBlock) | Err(Signal::Eof) => {
                            return Err(
                                self.parse_error(self.indent, "Unexpected end of block")
                            );
                        }
                        Err(e) => return Err(e),
                    }
                    f(self)?
                } else {
                    self.enter_block_inline(p, f)?
                };
                return Ok(Outcome::Value(v));
            }
            // Not a registered specifier: the block reads as a literal string.
            return Ok(Outcome::Value(self.parse_string_block()?));
        }

        // List item or negative number.
        if c == '-' {
            match self.line.get(start + 1).copied() {
                Some(d) if d.is_ascii_digit() => {
                    let parsed = scalar::parse_number(
                        &self.line,
                        start + 1,
                        -1,
                        BLOCK_TERMINATORS,
                        self.line_no,
                    )?;
                    return self.check_value_end(parsed.value, parsed.end, want, start);
                }
                None => {}
                Some(c2) if is_space(c2) => {}
                Some(_) => return self.parse_fallthrough(start, want),
            }
            if want == Want::Key {
                return Err(
                    self.parse_error(start, "Map key expected and it cannot be a list")
                );
            }
            return Ok(Outcome::Value(self.parse_list(start)?));
        }

        // Quoted string.
        if c == '"' || c == '\'' {
            return self.parse_quoted(start, want);
        }

        // Keywords, matched by exact length; the value-end check vets what
        // follows.
        for (kw, value) in [
            ("null", Value::Null),
            ("true", Value::Bool(true)),
            ("false", Value::Bool(false)),
        ] {
            if self.line[start..].starts_with(&kw.chars().collect::<Vec<_>>()[..]) {
                return self.check_value_end(value, start + kw.len(), want, start);
            }
        }

        // Unsigned number, with an optional explicit plus.
        if c == '+' && self.line.get(start + 1).is_some_and(|d| d.is_ascii_digit()) {
            let parsed =
                scalar::parse_number(&self.line, start + 1, 1, BLOCK_TERMINATORS, self.line_no)?;
            return self.check_value_end(parsed.value, parsed.end, want, start);
        }
        if c.is_ascii_digit() {
            let parsed =
                scalar::parse_number(&self.line, start, 1, BLOCK_TERMINATORS, self.line_no)?;
            return self.check_value_end(parsed.value, parsed.end, want, start);
        }

        self.parse_fallthrough(start, want)
    }

    /// Last resort: a line that is either a map (when it contains a
    /// key-value separator) or a literal string block.
    fn parse_fallthrough(&mut self, start: usize, want: Want) -> Step<Outcome> {
        let len = self.line.len();
        let mut k = start;
        while k < len {
            if self.line[k] == ':' {
                if let Some(sep) = self.separator_at(k) {
                    let key_text: String = self.line[start..k].iter().collect();
                    let key = Value::String(key_text.trim_end().to_string());
                    return match want {
                        Want::Key => Ok(Outcome::Key(key, sep)),
                        Want::Value => Ok(Outcome::Value(self.parse_map(start, key, sep)?)),
                    };
                }
            }
            k += 1;
        }
        match want {
            Want::Key => Err(self.parse_error(start, "Map key expected")),
            Want::Value => Ok(Outcome::Value(self.parse_string_block()?)),
        }
    }

    /// Try to read `:name:` at `start` (which holds a colon). Returns the
    /// name and the position after the closing colon, but only for names
    /// with a registered sub-parser — anything else falls back to string
    /// interpretation at the call sites.
    fn match_specifier(&self, start: usize) -> Option<(String, usize)> {
        let len = self.line.len();
        let mut i = start + 1;
        while i < len {
            let c = self.line[i];
            if c == ':' {
                if i == start + 1 {
                    return None;
                }
                let name: String = self.line[start + 1..i].iter().collect();
                if self.specifiers.contains_key(&name) {
                    return Some((name, i + 1));
                }
                return None;
            }
            if is_space(c) {
                return None;
            }
            i += 1;
        }
        None
    }

    /// Decide whether the colon at `k` separates a key from its value.
    ///
    /// It does when followed by whitespace or end of line (with the value,
    /// if any, not itself starting with a stray colon), or when immediately
    /// followed by a valid `:name:` specifier.
    fn separator_at(&self, k: usize) -> Option<Separator> {
        let len = self.line.len();
        if k + 1 >= len {
            return Some(Separator {
                spec: None,
                value_pos: None,
            });
        }
        let next = self.line[k + 1];
        if next == ':' {
            let (name, after) = self.match_specifier(k + 1)?;
            return Some(self.separator_with_spec(name, after));
        }
        if !is_space(next) {
            return None;
        }
        let p = skip_spaces(&self.line, k + 1);
        if p >= len || self.line[p] == '#' {
            return Some(Separator {
                spec: None,
                value_pos: None,
            });
        }
        if self.line[p] == ':' {
            let (name, after) = self.match_specifier(p)?;
            return Some(self.separator_with_spec(name, after));
        }
        Some(Separator {
            spec: None,
            value_pos: Some(p),
        })
    }

    fn separator_with_spec(&self, name: String, after: usize) -> Separator {
        let p = skip_spaces(&self.line, after);
        let value_pos = if p >= self.line.len() || self.line[p] == '#' {
            None
        } else {
            Some(p)
        };
        Separator {
            spec: Some(name),
            value_pos,
        }
    }

    /// After a scalar that could be a map key: only whitespace, a comment,
    /// or a key-value separator may follow. `start` is the scalar's column,
    /// which anchors the map when the scalar turns out to be its first key.
    fn check_value_end(
        &mut self,
        value: Value,
        end: usize,
        want: Want,
        start: usize,
    ) -> Step<Outcome> {
        let len = self.line.len();
        let p = skip_spaces(&self.line, end);
        if p >= len || self.line[p] == '#' {
            return match want {
                Want::Value => {
                    self.advance_line()?;
                    Ok(Outcome::Value(value))
                }
                Want::Key => Err(self.parse_error(p.min(len), "Not a key")),
            };
        }
        if self.line[p] == ':' {
            return match self.separator_at(p) {
                Some(sep) => match want {
                    Want::Key => Ok(Outcome::Key(value, sep)),
                    // A scalar before a separator opens a map keyed by it.
                    Want::Value => Ok(Outcome::Value(self.parse_map(start, value, sep)?)),
                },
                None => Err(self.parse_error(p, "Unexpected character")),
            };
        }
        Err(self.parse_error(p, "Unexpected character"))
    }

    // -- lists and maps ----------------------------------------------------

    /// Parse a list whose first `-` is at `start` on the current line. All
    /// items share the first marker's column.
    fn parse_list(&mut self, start: usize) -> Step<Value> {
        let item_indent = start;
        let mut items = Vec::new();
        loop {
            let len = self.line.len();
            let after = item_indent + 1;
            let item = if after >= len {
                self.enter_block_next_line(
                    item_indent + 2,
                    Self::parse_block_value,
                    "Empty block",
                )?
            } else if is_space(self.line[after]) {
                let p = skip_spaces(&self.line, after);
                if p >= len || self.line[p] == '#' {
                    self.enter_block_next_line(
                        item_indent + 2,
                        Self::parse_block_value,
                        "Empty block",
                    )?
                } else {
                    self.enter_block_inline(p, Self::parse_block_value)?
                }
            } else {
                return Err(self.parse_error(after, "Bad list item"));
            };
            items.push(item);
            match self.read_block_line() {
                Ok(()) => {}
                Err(Signal::EndOfBlock) | Err(Signal::Eof) => return Ok(Value::Array(items)),
                Err(e) => return Err(e),
            }
            if self.indent != item_indent {
                return Err(self.parse_error(self.indent, "Bad indentation of list item"));
            }
            if self.line.get(item_indent) != Some(&'-') {
                return Err(self.parse_error(item_indent, "Bad list item"));
            }
        }
    }

    /// Parse a map whose first key (and separator) the caller already
    /// recognized, with the first key at column `key_col`. Every entry's
    /// value is a nested block; every key must sit at the first key's column.
    fn parse_map(&mut self, key_col: usize, first_key: Value, first_sep: Separator) -> Step<Value> {
        let key_indent = key_col;
        let mut map = Map::new();
        let mut key = first_key;
        let mut sep = first_sep;
        loop {
            let value = self.parse_entry_value(key_indent, &sep)?;
            map.insert(key, value);
            match self.read_block_line() {
                Ok(()) => {}
                Err(Signal::EndOfBlock) | Err(Signal::Eof) => return Ok(Value::Map(map)),
                Err(e) => return Err(e),
            }
            if self.indent != key_indent {
                return Err(self.parse_error(self.indent, "Bad indentation of map key"));
            }
            match self.parse_value(Want::Key)? {
                Outcome::Key(k, s) => {
                    key = k;
                    sep = s;
                }
                Outcome::Value(_) => unreachable!("key mode never yields a plain value"),
            }
        }
    }

    /// Parse one entry's value as a nested block, driven by the default
    /// parser or the separator's conversion specifier.
    fn parse_entry_value(&mut self, key_indent: usize, sep: &Separator) -> Step<Value> {
        let (f, empty_message): (SubParser<S>, &str) = match &sep.spec {
            Some(name) => (
                *self.specifiers.get(name).expect("specifier checked at separator"),
                "Unexpected end of block",
            ),
            None => (Self::parse_block_value, "Empty block"),
        };
        match sep.value_pos {
            Some(pos) => self.enter_block_inline(pos, f),
            None => self.enter_block_next_line(key_indent + 1, f, empty_message),
        }
    }

    // -- strings -----------------------------------------------------------

    /// Quoted string at `start`. Single-line strings may become map keys;
    /// multi-line strings may not.
    fn parse_quoted(&mut self, start: usize, want: Want) -> Step<Outcome> {
        let quote = self.line[start];
        if let Some(close) = find_closing(&self.line, start + 1, quote) {
            let s = scalar::decode_escapes(&self.line, start + 1, close, self.line_no)?;
            return self.check_value_end(Value::String(s), close + 1, want, start);
        }
        if want == Want::Key {
            return Err(self.parse_error(start, "Not a key"));
        }
        let v = self.parse_multiline_quoted(start, quote)?;
        Ok(Outcome::Value(v))
    }

    /// Multi-line quoted string: collect continuation lines from a nested
    /// block one column deeper than the opening line, then dedent, fold, and
    /// decode.
    fn parse_multiline_quoted(&mut self, start: usize, quote: char) -> Step<Value> {
        let first_seg = self.line[start + 1..].to_vec();
        let first_line_no = self.line_no;
        let continuation_indent = self.indent + 1;

        let (tail, after_close) = self.enter_block(continuation_indent, |p| {
            let mut tail: Vec<(Vec<char>, usize)> = Vec::new();
            loop {
                match p.read_block_line() {
                    Ok(()) => {}
                    Err(Signal::EndOfBlock) | Err(Signal::Eof) => {
                        // Degenerate continuation: one more line beginning
                        // with the quote closes the string with no content.
                        if !p.eof && p.read_raw_line()? {
                            let nsp = skip_spaces(&p.line, 0);
                            if nsp < p.line.len() && p.line[nsp] == quote {
                                return Ok((tail, nsp + 1));
                            }
                        }
                        return Err(p.parse_error(p.indent, "String has no closing quote"));
                    }
                    Err(e) => return Err(e),
                }
                if let Some(close) = find_closing(&p.line, 0, quote) {
                    tail.push((p.line[..close].to_vec(), p.line_no));
                    return Ok((tail, close + 1));
                }
                tail.push((p.line.clone(), p.line_no));
            }
        })?;

        let t = skip_spaces(&self.line, after_close);
        if t < self.line.len() && self.line[t] != '#' {
            return Err(self.parse_error(t, "Bad character after quoted string"));
        }

        // Dedent the continuations to their common leading-space prefix,
        // then fold them onto the opening segment.
        let prefix = tail
            .iter()
            .filter(|(seg, _)| !seg.is_empty())
            .map(|(seg, _)| seg.iter().take_while(|c| **c == ' ').count())
            .min()
            .unwrap_or(0);
        let mut out = scalar::decode_escapes(&first_seg, 0, first_seg.len(), first_line_no)?;
        let mut prev_nonempty = !first_seg.is_empty();
        for (seg, line_no) in &tail {
            let content = &seg[prefix.min(seg.len())..];
            if content.is_empty() {
                out.push('\n');
                prev_nonempty = false;
                continue;
            }
            if prev_nonempty && !is_space(content[0]) {
                out.push(' ');
            }
            out.push_str(&scalar::decode_escapes(content, 0, content.len(), *line_no)?);
            prev_nonempty = true;
        }

        self.advance_line()?;
        Ok(Value::String(out))
    }

    /// The whole current block as a literal string (the no-separator
    /// fallthrough).
    fn parse_string_block(&mut self) -> Step<Value> {
        let lines = self.collect_block_lines()?;
        Ok(Value::String(literal_join(lines)))
    }

    /// Collect every line of the current block, each taken from the block
    /// indent onward.
    fn collect_block_lines(&mut self) -> Step<Vec<String>> {
        let mut lines = vec![self.block_line_text()];
        loop {
            match self.read_block_line() {
                Ok(()) => lines.push(self.block_line_text()),
                Err(Signal::EndOfBlock) | Err(Signal::Eof) => return Ok(lines),
                Err(e) => return Err(e),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Built-in conversion specifiers
// ---------------------------------------------------------------------------

/// `:raw:` — block lines joined verbatim with LF; a trailing LF when the
/// block had more than one line.
fn spec_raw<S: LineRead>(p: &mut Parser<S>) -> Step<Value> {
    let lines = p.collect_block_lines()?;
    let multi = lines.len() > 1;
    let mut out = lines.join("\n");
    if multi {
        out.push('\n');
    }
    Ok(Value::String(out))
}

/// `:literal:` — like raw, but dedented and with trailing empty lines
/// dropped.
fn spec_literal<S: LineRead>(p: &mut Parser<S>) -> Step<Value> {
    let lines = p.collect_block_lines()?;
    Ok(Value::String(literal_join(lines)))
}

/// `:folded:` — dedent, then join lines with single spaces; empty lines
/// become literal line feeds.
fn spec_folded<S: LineRead>(p: &mut Parser<S>) -> Step<Value> {
    let mut lines = p.collect_block_lines()?;
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    dedent(&mut lines);
    Ok(Value::String(fold(&lines)))
}

/// `:datetime:` — one date-time on the first block line; nothing else in
/// the block.
fn spec_datetime<S: LineRead>(p: &mut Parser<S>) -> Step<Value> {
    let chars: Vec<char> = p.current_line().to_vec();
    let start = skip_spaces(&chars, p.block_indent());
    let dt = scalar::parse_datetime(&chars, start, p.line_number())?;
    p.advance_line()?;
    p.drain_block("Extra data after parsed value")?;
    Ok(Value::DateTime(dt))
}

/// `:timestamp:` — one timestamp on the first block line; nothing else in
/// the block.
fn spec_timestamp<S: LineRead>(p: &mut Parser<S>) -> Step<Value> {
    let chars: Vec<char> = p.current_line().to_vec();
    let start = skip_spaces(&chars, p.block_indent());
    let ts = scalar::parse_timestamp(&chars, start, p.line_number())?;
    p.advance_line()?;
    p.drain_block("Extra data after parsed value")?;
    Ok(Value::Timestamp(ts))
}

/// `:json:` — the block holds exactly one JSON value.
fn spec_json<S: LineRead>(p: &mut Parser<S>) -> Step<Value> {
    json::parse_json_block(p)
}

// ---------------------------------------------------------------------------
// String-block assembly
// ---------------------------------------------------------------------------

/// Scan for `quote` starting at `from`, skipping escaped characters.
pub(crate) fn find_closing(chars: &[char], from: usize, quote: char) -> Option<usize> {
    let mut i = from;
    while i < chars.len() {
        if chars[i] == '\\' {
            i += 2;
        } else if chars[i] == quote {
            return Some(i);
        } else {
            i += 1;
        }
    }
    None
}

/// Strip the common leading-space prefix of the non-empty lines.
fn dedent(lines: &mut [String]) {
    let prefix = lines
        .iter()
        .filter(|l| !l.is_empty())
        .map(|l| l.chars().take_while(|c| *c == ' ').count())
        .min()
        .unwrap_or(0);
    if prefix == 0 {
        return;
    }
    for line in lines.iter_mut() {
        let cut = line
            .char_indices()
            .nth(prefix)
            .map(|(i, _)| i)
            .unwrap_or(line.len());
        line.replace_range(..cut, "");
    }
}

/// Join adjacent non-empty lines with single spaces; an empty line becomes a
/// literal LF and suppresses the joining space; a line that starts with
/// whitespace joins without an added space.
fn fold(lines: &[String]) -> String {
    let mut out = String::new();
    let mut prev_nonempty = false;
    for line in lines {
        if line.is_empty() {
            out.push('\n');
            prev_nonempty = false;
            continue;
        }
        if prev_nonempty && !line.starts_with(|c: char| is_space(c)) {
            out.push(' ');
        }
        out.push_str(line);
        prev_nonempty = true;
    }
    out
}

/// Literal-string assembly: dedent, drop trailing empty lines, join with
/// LF, and terminate with LF when more than one line remains.
fn literal_join(mut lines: Vec<String>) -> String {
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    dedent(&mut lines);
    let multi = lines.len() > 1;
    let mut out = lines.join("\n");
    if multi {
        out.push('\n');
    }
    out
}
