//! Strict JSON sub-parser, driven by the parser's line buffer.
//!
//! Reached through the `:json:` conversion specifier or
//! [`parse_json`](crate::parse_json). The grammar is RFC 8259 JSON with one
//! deliberate extension: `#` starts a comment that runs to end of line, and
//! comments count as whitespace anywhere between structural tokens. Strings
//! use the full Stanza escape set, numbers go through the shared number
//! lexer, and structural recursion is capped at
//! [`MAX_JSON_DEPTH`](crate::parser::MAX_JSON_DEPTH).

use crate::error::{Signal, Step};
use crate::parser::{find_closing, Parser, MAX_JSON_DEPTH};
use crate::reader::LineRead;
use crate::scalar::{self, skip_spaces, JSON_TERMINATORS};
use crate::value::{Map, Value};

/// Parse one JSON value from the current block; the rest of the block must
/// be empty.
///
/// The trailing check is intentionally doubled: first the remainder of the
/// value's own line, then the remaining lines of the block.
pub(crate) fn parse_json_block<S: LineRead>(p: &mut Parser<S>) -> Step<Value> {
    p.json_depth = 0;
    let mut pos = skip_spaces(p.current_line(), p.block_indent());
    let value = parse_value(p, &mut pos)?;

    let line = p.current_line();
    let t = skip_spaces(line, pos);
    if t < line.len() && line[t] != '#' {
        return Err(p.parse_error(t, "Garbage after JSON value"));
    }
    p.advance_line()?;
    p.drain_block("Garbage after JSON value")?;
    Ok(value)
}

/// Skip whitespace, comments, and line breaks up to the next token.
fn skip_ws<S: LineRead>(p: &mut Parser<S>, pos: &mut usize) -> Step<()> {
    loop {
        let line = p.current_line();
        *pos = skip_spaces(line, *pos);
        if *pos < line.len() && line[*pos] != '#' {
            return Ok(());
        }
        match p.read_block_line() {
            Ok(()) => *pos = p.current_indent(),
            Err(Signal::EndOfBlock) | Err(Signal::Eof) => {
                return Err(p.parse_error(p.current_indent(), "Unexpected end of block"));
            }
            Err(e) => return Err(e),
        }
    }
}

fn parse_value<S: LineRead>(p: &mut Parser<S>, pos: &mut usize) -> Step<Value> {
    skip_ws(p, pos)?;
    let c = p.current_line()[*pos];
    match c {
        '{' => parse_object(p, pos),
        '[' => parse_array(p, pos),
        '"' => Ok(Value::String(parse_string(p, pos)?)),
        'n' => keyword(p, pos, "null", Value::Null),
        't' => keyword(p, pos, "true", Value::Bool(true)),
        'f' => keyword(p, pos, "false", Value::Bool(false)),
        '-' => {
            if !p
                .current_line()
                .get(*pos + 1)
                .is_some_and(|d| d.is_ascii_digit())
            {
                return Err(p.parse_error(*pos, "Unexpected character"));
            }
            let parsed = scalar::parse_number(
                p.current_line(),
                *pos + 1,
                -1,
                JSON_TERMINATORS,
                p.line_number(),
            )?;
            *pos = parsed.end;
            Ok(parsed.value)
        }
        c if c.is_ascii_digit() => {
            let parsed = scalar::parse_number(
                p.current_line(),
                *pos,
                1,
                JSON_TERMINATORS,
                p.line_number(),
            )?;
            *pos = parsed.end;
            Ok(parsed.value)
        }
        _ => Err(p.parse_error(*pos, "Unexpected character")),
    }
}

/// Exact keyword match; the following character must end the token.
fn keyword<S: LineRead>(
    p: &mut Parser<S>,
    pos: &mut usize,
    word: &str,
    value: Value,
) -> Step<Value> {
    let line = p.current_line();
    let chars: Vec<char> = word.chars().collect();
    if !line[*pos..].starts_with(&chars[..]) {
        return Err(p.parse_error(*pos, "Unexpected character"));
    }
    let end = *pos + chars.len();
    if let Some(&c) = line.get(end) {
        if !scalar::is_space(c) && !JSON_TERMINATORS.contains(&c) {
            return Err(p.parse_error(end, "Unexpected character"));
        }
    }
    *pos = end;
    Ok(value)
}

/// JSON string on a single line, with the full Stanza escape set.
fn parse_string<S: LineRead>(p: &mut Parser<S>, pos: &mut usize) -> Step<String> {
    let line = p.current_line();
    let start = *pos + 1;
    let close = find_closing(line, start, '"')
        .ok_or_else(|| p.parse_error(*pos, "String has no closing quote"))?;
    if let Some(bad) = line[start..close].iter().position(|c| (*c as u32) < 0x20) {
        return Err(p.parse_error(start + bad, "Bad character encountered"));
    }
    let s = scalar::decode_escapes(line, start, close, p.line_number())?;
    *pos = close + 1;
    Ok(s)
}

fn parse_array<S: LineRead>(p: &mut Parser<S>, pos: &mut usize) -> Step<Value> {
    p.json_depth += 1;
    if p.json_depth > MAX_JSON_DEPTH {
        return Err(p.parse_error(*pos, "Maximum recursion depth exceeded"));
    }
    *pos += 1;
    let mut items = Vec::new();
    skip_ws(p, pos)?;
    if p.current_line()[*pos] == ']' {
        *pos += 1;
        p.json_depth -= 1;
        return Ok(Value::Array(items));
    }
    loop {
        items.push(parse_value(p, pos)?);
        skip_ws(p, pos)?;
        match p.current_line()[*pos] {
            ',' => *pos += 1,
            ']' => {
                *pos += 1;
                break;
            }
            _ => return Err(p.parse_error(*pos, "Array items must be separated with comma")),
        }
    }
    p.json_depth -= 1;
    Ok(Value::Array(items))
}

fn parse_object<S: LineRead>(p: &mut Parser<S>, pos: &mut usize) -> Step<Value> {
    p.json_depth += 1;
    if p.json_depth > MAX_JSON_DEPTH {
        return Err(p.parse_error(*pos, "Maximum recursion depth exceeded"));
    }
    *pos += 1;
    let mut map = Map::new();
    skip_ws(p, pos)?;
    if p.current_line()[*pos] == '}' {
        *pos += 1;
        p.json_depth -= 1;
        return Ok(Value::Map(map));
    }
    loop {
        skip_ws(p, pos)?;
        if p.current_line()[*pos] != '"' {
            return Err(p.parse_error(*pos, "Unexpected character"));
        }
        let key = parse_string(p, pos)?;
        skip_ws(p, pos)?;
        if p.current_line()[*pos] != ':' {
            return Err(p.parse_error(*pos, "Values must be separated from keys with colon"));
        }
        *pos += 1;
        let value = parse_value(p, pos)?;
        map.insert(Value::String(key), value);
        skip_ws(p, pos)?;
        match p.current_line()[*pos] {
            ',' => *pos += 1,
            '}' => {
                *pos += 1;
                break;
            }
            _ => return Err(p.parse_error(*pos, "Object members must be separated with comma")),
        }
    }
    p.json_depth -= 1;
    Ok(Value::Map(map))
}
