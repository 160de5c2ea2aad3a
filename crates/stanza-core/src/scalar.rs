//! Scalar lexers: escape sequences, numbers, date-times, and timestamps.
//!
//! Everything here operates on a span of the current line (a `&[char]`
//! slice, positions being code-point indices) and never touches the line
//! buffer — callers decide how the surrounding block advances.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};

use crate::error::{Signal, StanzaError, Step};
use crate::value::{Timestamp, Value};

/// Characters that may follow a number in block mode, besides whitespace
/// and end of line.
pub(crate) const BLOCK_TERMINATORS: &[char] = &['#', ':'];

/// Characters that may follow a number inside JSON, besides whitespace and
/// end of line.
pub(crate) const JSON_TERMINATORS: &[char] = &['#', ':', ',', '}', ']'];

pub(crate) fn is_space(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// Advance past spaces and tabs, returning the first non-blank position.
pub(crate) fn skip_spaces(chars: &[char], mut i: usize) -> usize {
    while i < chars.len() && is_space(chars[i]) {
        i += 1;
    }
    i
}

fn err(line: usize, column: usize, message: &str) -> Signal {
    Signal::Error(StanzaError::parse(line, column, message))
}

// ---------------------------------------------------------------------------
// Escape sequences
// ---------------------------------------------------------------------------

/// Decode the escape sequences in `chars[start..end]`.
///
/// Recognizes the simple C escapes, `\o` with 1-3 octal digits, `\x` with
/// exactly 2 hex digits, and `\u`/`\U` with exactly 4/8 hex digits. A lone
/// backslash at end of line stays a literal backslash; an unknown escape
/// keeps both the backslash and the character. Code points outside the
/// scalar-value range decode to U+FFFD.
pub(crate) fn decode_escapes(
    chars: &[char],
    start: usize,
    end: usize,
    line: usize,
) -> Step<String> {
    let mut out = String::with_capacity(end - start);
    let mut i = start;
    while i < end {
        let c = chars[i];
        if c != '\\' {
            out.push(c);
            i += 1;
            continue;
        }
        if i + 1 >= end {
            // Backslash at end of line is kept verbatim.
            out.push('\\');
            break;
        }
        let esc = chars[i + 1];
        i += 2;
        match esc {
            '\'' | '"' | '?' | '\\' => out.push(esc),
            'a' => out.push('\x07'),
            'b' => out.push('\x08'),
            'f' => out.push('\x0C'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'v' => out.push('\x0B'),
            'o' => {
                if i >= end {
                    return Err(err(line, i - 2, "Incomplete octal value"));
                }
                if !chars[i].is_digit(8) {
                    return Err(err(line, i, "Bad octal value"));
                }
                let mut value: u32 = 0;
                let mut taken = 0;
                while i < end && taken < 3 && chars[i].is_digit(8) {
                    value = value * 8 + chars[i].to_digit(8).unwrap();
                    i += 1;
                    taken += 1;
                }
                out.push(char::from_u32(value).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
            'x' => {
                let value = hex_escape(chars, &mut i, end, 2, line)?;
                out.push(char::from_u32(value).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
            'u' => {
                let value = hex_escape(chars, &mut i, end, 4, line)?;
                out.push(char::from_u32(value).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
            'U' => {
                let value = hex_escape(chars, &mut i, end, 8, line)?;
                out.push(char::from_u32(value).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
            other => {
                // Unknown escape: both characters are kept literally.
                out.push('\\');
                out.push(other);
            }
        }
    }
    Ok(out)
}

/// Read exactly `width` hex digits at `*i`, advancing past them.
fn hex_escape(chars: &[char], i: &mut usize, end: usize, width: usize, line: usize) -> Step<u32> {
    let mut value: u32 = 0;
    for _ in 0..width {
        if *i >= end {
            return Err(err(line, *i, "Incomplete hexadecimal value"));
        }
        let d = chars[*i]
            .to_digit(16)
            .ok_or_else(|| err(line, *i, "Bad hexadecimal value"))?;
        value = value * 16 + d;
        *i += 1;
    }
    Ok(value)
}

// ---------------------------------------------------------------------------
// Numbers
// ---------------------------------------------------------------------------

/// A parsed number and the position just past its last character.
pub(crate) struct ParsedNumber {
    pub value: Value,
    pub end: usize,
}

/// Parse a number starting at the first digit (the caller has consumed any
/// sign and passes it as `sign`).
///
/// Radix prefixes `0b`/`0o`/`0x` are honored only when the first digit is
/// `0`; other leading zeros in decimal are rejected. `_` and `'` act as
/// digit separators between digits. A fraction or exponent switches to
/// floating point, which is decimal only. After the digits, the next
/// character must be whitespace, end of line, or one of `terminators`.
pub(crate) fn parse_number(
    chars: &[char],
    start: usize,
    sign: i64,
    terminators: &[char],
    line: usize,
) -> Step<ParsedNumber> {
    let len = chars.len();
    if start >= len || !chars[start].is_ascii_digit() {
        return Err(err(line, start, "Bad number"));
    }

    let mut i = start;
    let mut radix: u32 = 10;
    if chars[i] == '0' && i + 1 < len {
        match chars[i + 1] {
            'b' | 'B' => radix = 2,
            'o' | 'O' => radix = 8,
            'x' | 'X' => radix = 16,
            _ => {}
        }
        if radix != 10 {
            i += 2;
            if i < len && (chars[i] == '_' || chars[i] == '\'') {
                return Err(err(line, i, "Separator is not allowed in the beginning of number"));
            }
        }
    }

    let int_start = i;
    let (int_value, int_digits, after_int) = digit_run(chars, i, radix, line)?;
    i = after_int;
    if int_digits == 0 {
        // Nothing followed the radix prefix.
        return Err(err(line, i, "Bad number"));
    }
    if radix == 10 && int_digits > 1 && chars[int_start] == '0' {
        // Leading zeros would be ambiguous with would-be octal.
        return Err(err(line, int_start, "Bad number"));
    }
    // The integer part is checked against u64 before any fraction or
    // exponent is considered.
    let Some(magnitude) = int_value else {
        return Err(err(line, start, "Numeric overflow"));
    };

    let mut is_float = false;
    if i < len && chars[i] == '.' {
        if radix != 10 {
            return Err(err(
                line,
                i,
                "Only decimal representation is supported for floating point numbers",
            ));
        }
        is_float = true;
        i += 1;
        let (_, frac_digits, after_frac) = digit_run(chars, i, 10, line)?;
        if frac_digits == 0 {
            return Err(err(line, i, "Bad number"));
        }
        i = after_frac;
    }
    if i < len && (chars[i] == 'e' || chars[i] == 'E') && radix == 10 {
        is_float = true;
        i += 1;
        if i < len && (chars[i] == '+' || chars[i] == '-') {
            i += 1;
        }
        let (_, exp_digits, after_exp) = digit_run(chars, i, 10, line)?;
        if exp_digits == 0 {
            return Err(err(line, i, "Bad exponent"));
        }
        i = after_exp;
    }
    if i < len && (chars[i] == 'e' || chars[i] == 'E') && radix != 10 {
        // Unreachable for radix 16 ('e' is a digit there); a binary or octal
        // literal followed by an exponent marker is a float request.
        return Err(err(
            line,
            i,
            "Only decimal representation is supported for floating point numbers",
        ));
    }

    // The value must stop at whitespace, end of line, or an allowed
    // terminator.
    if i < len && !is_space(chars[i]) && !terminators.contains(&chars[i]) {
        return Err(err(line, i, "Bad number"));
    }

    let value = if is_float {
        let mut text = String::with_capacity(i - start + 1);
        if sign < 0 {
            text.push('-');
        }
        text.extend(chars[start..i].iter().filter(|c| **c != '_' && **c != '\''));
        let f: f64 = text
            .parse()
            .map_err(|_| err(line, start, "Floating point conversion error"))?;
        if f.is_infinite() {
            return Err(err(line, start, "Floating point overflow"));
        }
        Value::Float(f)
    } else {
        apply_sign(magnitude, sign, line, start)?
    };

    Ok(ParsedNumber { value, end: i })
}

/// Consume a run of digits in `radix` with separator rules applied.
///
/// Returns `(value, digit_count, next_pos)`; `value` is `None` if the
/// accumulated magnitude overflowed `u64`.
fn digit_run(
    chars: &[char],
    start: usize,
    radix: u32,
    line: usize,
) -> Step<(Option<u64>, usize, usize)> {
    let len = chars.len();
    let mut i = start;
    let mut value: Option<u64> = Some(0);
    let mut digits = 0usize;
    let mut last_sep = false;
    while i < len {
        let c = chars[i];
        if c == '_' || c == '\'' {
            if digits == 0 {
                return Err(err(line, i, "Separator is not allowed in the beginning of number"));
            }
            if last_sep {
                return Err(err(line, i, "Duplicate separator in the number"));
            }
            last_sep = true;
            i += 1;
            continue;
        }
        match c.to_digit(radix) {
            Some(d) => {
                value = value
                    .and_then(|v| v.checked_mul(u64::from(radix)))
                    .and_then(|v| v.checked_add(u64::from(d)));
                digits += 1;
                last_sep = false;
                i += 1;
            }
            None => break,
        }
    }
    if last_sep {
        // A separator must sit between digits, never at the end of the run.
        return Err(err(line, i - 1, "Bad number"));
    }
    Ok((value, digits, i))
}

/// Apply the caller-supplied sign to an unsigned magnitude.
fn apply_sign(magnitude: u64, sign: i64, line: usize, column: usize) -> Step<Value> {
    if magnitude == 0 {
        return Ok(Value::Int(0));
    }
    if magnitude > i64::MAX as u64 {
        if sign < 0 {
            return Err(err(line, column, "Integer overflow"));
        }
        return Ok(Value::UInt(magnitude));
    }
    Ok(Value::Int(sign * magnitude as i64))
}

// ---------------------------------------------------------------------------
// Date-times and timestamps
// ---------------------------------------------------------------------------

/// Parse `YYYY[-]MM[-]DD`, an optional `T`- or space-separated
/// `HH[:]MM[:]SS`, an optional `.f{1,9}` fraction, and an optional `Z` or
/// `±HH[:]MM` offset. Only trailing whitespace and a comment may follow.
pub(crate) fn parse_datetime(chars: &[char], start: usize, line: usize) -> Step<DateTime<FixedOffset>> {
    let mut i = start;
    let year = fixed_digits(chars, &mut i, 4, line, "Bad date/time")?;
    eat(chars, &mut i, '-');
    let month = fixed_digits(chars, &mut i, 2, line, "Bad date/time")?;
    eat(chars, &mut i, '-');
    let day = fixed_digits(chars, &mut i, 2, line, "Bad date/time")?;

    let mut hour = 0;
    let mut minute = 0;
    let mut second = 0;
    let len = chars.len();
    let mut have_time = false;
    if i < len && chars[i] == 'T' {
        i += 1;
        have_time = true;
    } else if i < len && is_space(chars[i]) {
        let after = skip_spaces(chars, i);
        if after < len && chars[after].is_ascii_digit() {
            i = after;
            have_time = true;
        }
    }
    if have_time {
        hour = fixed_digits(chars, &mut i, 2, line, "Bad date/time")?;
        eat(chars, &mut i, ':');
        minute = fixed_digits(chars, &mut i, 2, line, "Bad date/time")?;
        eat(chars, &mut i, ':');
        second = fixed_digits(chars, &mut i, 2, line, "Bad date/time")?;
    }

    let mut nanos: u32 = 0;
    if i < len && chars[i] == '.' {
        i += 1;
        nanos = fraction_nanos(chars, &mut i, line, "Bad date/time")?;
    }

    // GMT offset, stored as signed minutes.
    let mut offset_min: i32 = 0;
    if i < len && chars[i] == 'Z' {
        i += 1;
    } else if i < len && (chars[i] == '+' || chars[i] == '-') {
        let negative = chars[i] == '-';
        i += 1;
        let oh = fixed_digits(chars, &mut i, 2, line, "Bad date/time")? as i32;
        eat(chars, &mut i, ':');
        let om = fixed_digits(chars, &mut i, 2, line, "Bad date/time")? as i32;
        offset_min = oh * 60 + om;
        if negative {
            offset_min = -offset_min;
        }
    }

    trailing_ok(chars, i, line, "Bad date/time")?;

    let date = NaiveDate::from_ymd_opt(year as i32, month, day)
        .ok_or_else(|| err(line, start, "Bad date/time"))?;
    let time = NaiveTime::from_hms_nano_opt(hour, minute, second, nanos)
        .ok_or_else(|| err(line, start, "Bad date/time"))?;
    let offset = FixedOffset::east_opt(offset_min * 60)
        .ok_or_else(|| err(line, start, "Bad date/time"))?;
    offset
        .from_local_datetime(&NaiveDateTime::new(date, time))
        .single()
        .ok_or_else(|| err(line, start, "Bad date/time"))
}

/// Parse a seconds-since-epoch timestamp with an optional `.f{1,9}`
/// fraction. Only trailing whitespace and a comment may follow.
pub(crate) fn parse_timestamp(chars: &[char], start: usize, line: usize) -> Step<Timestamp> {
    let len = chars.len();
    let mut i = start;
    if i >= len || !chars[i].is_ascii_digit() {
        return Err(err(line, i, "Bad timestamp"));
    }
    let mut secs: u64 = 0;
    while i < len && chars[i].is_ascii_digit() {
        secs = secs
            .checked_mul(10)
            .and_then(|v| v.checked_add(u64::from(chars[i].to_digit(10).unwrap())))
            .ok_or_else(|| err(line, start, "Bad timestamp"))?;
        i += 1;
    }
    let mut nanos: u32 = 0;
    if i < len && chars[i] == '.' {
        i += 1;
        nanos = fraction_nanos(chars, &mut i, line, "Bad timestamp")?;
    }
    trailing_ok(chars, i, line, "Bad timestamp")?;
    Ok(Timestamp { secs, nanos })
}

/// Read 1-9 fractional digits at `*i` and scale to nanoseconds. A tenth
/// digit is an error.
fn fraction_nanos(chars: &[char], i: &mut usize, line: usize, message: &str) -> Step<u32> {
    let len = chars.len();
    let mut value: u32 = 0;
    let mut count = 0;
    while *i < len && chars[*i].is_ascii_digit() {
        if count == 9 {
            return Err(err(line, *i, message));
        }
        value = value * 10 + chars[*i].to_digit(10).unwrap();
        count += 1;
        *i += 1;
    }
    if count == 0 {
        return Err(err(line, *i, message));
    }
    for _ in count..9 {
        value *= 10;
    }
    Ok(value)
}

/// Read exactly `width` ASCII digits at `*i` as a number.
fn fixed_digits(chars: &[char], i: &mut usize, width: usize, line: usize, message: &str) -> Step<u32> {
    let mut value: u32 = 0;
    for _ in 0..width {
        if *i >= chars.len() || !chars[*i].is_ascii_digit() {
            return Err(err(line, *i, message));
        }
        value = value * 10 + chars[*i].to_digit(10).unwrap();
        *i += 1;
    }
    Ok(value)
}

/// Skip a single optional separator character.
fn eat(chars: &[char], i: &mut usize, sep: char) {
    if *i < chars.len() && chars[*i] == sep {
        *i += 1;
    }
}

/// Verify only whitespace and an optional comment remain on the line.
fn trailing_ok(chars: &[char], i: usize, line: usize, message: &str) -> Step<()> {
    let p = skip_spaces(chars, i);
    if p < chars.len() && chars[p] != '#' {
        return Err(err(line, p, message));
    }
    Ok(())
}
