//! Line sources consumed by the parser.
//!
//! The parser advances through its input strictly line by line, and block
//! termination is detected one line too late — so every source must support
//! a single level of pushback: a line given back via
//! [`unread_line`](LineRead::unread_line) is returned again by the next
//! [`read_line`](LineRead::read_line), with the line number rewound to match.
//!
//! Two implementations are provided: [`StrSource`] over borrowed text and
//! [`IoSource`] over any [`std::io::BufRead`].

use std::io::{self, BufRead};

/// A line-producing input with one-slot pushback.
pub trait LineRead {
    /// Read the next line without its terminator. `Ok(None)` at end of input.
    fn read_line(&mut self) -> io::Result<Option<String>>;

    /// Push one line back; the next `read_line` returns it again. The parser
    /// holds at most one pushed-back line at any time.
    fn unread_line(&mut self, line: String);

    /// 1-based number of the last line returned by `read_line`.
    fn line_number(&self) -> usize;
}

/// Line source over borrowed text.
pub struct StrSource<'a> {
    lines: std::str::Lines<'a>,
    pushback: Option<String>,
    line_no: usize,
}

impl<'a> StrSource<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            lines: input.lines(),
            pushback: None,
            line_no: 0,
        }
    }
}

impl LineRead for StrSource<'_> {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        if let Some(line) = self.pushback.take() {
            self.line_no += 1;
            return Ok(Some(line));
        }
        match self.lines.next() {
            Some(line) => {
                self.line_no += 1;
                Ok(Some(line.to_string()))
            }
            None => Ok(None),
        }
    }

    fn unread_line(&mut self, line: String) {
        debug_assert!(self.pushback.is_none(), "only one line of pushback");
        self.pushback = Some(line);
        self.line_no -= 1;
    }

    fn line_number(&self) -> usize {
        self.line_no
    }
}

/// Line source over a buffered reader.
pub struct IoSource<R: BufRead> {
    reader: R,
    pushback: Option<String>,
    line_no: usize,
}

impl<R: BufRead> IoSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            pushback: None,
            line_no: 0,
        }
    }
}

impl<R: BufRead> LineRead for IoSource<R> {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        if let Some(line) = self.pushback.take() {
            self.line_no += 1;
            return Ok(Some(line));
        }
        let mut buf = String::new();
        let n = self.reader.read_line(&mut buf)?;
        if n == 0 {
            return Ok(None);
        }
        if buf.ends_with('\n') {
            buf.pop();
            if buf.ends_with('\r') {
                buf.pop();
            }
        }
        self.line_no += 1;
        Ok(Some(buf))
    }

    fn unread_line(&mut self, line: String) {
        debug_assert!(self.pushback.is_none(), "only one line of pushback");
        self.pushback = Some(line);
        self.line_no -= 1;
    }

    fn line_number(&self) -> usize {
        self.line_no
    }
}
