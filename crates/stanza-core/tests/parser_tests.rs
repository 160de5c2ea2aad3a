use chrono::{FixedOffset, TimeZone, Timelike};
use stanza_core::{parse, Map, StanzaError, Value};

/// Helper: build a string value.
fn s(text: &str) -> Value {
    Value::String(text.to_string())
}

/// Helper: build a map value from entries.
fn map(entries: Vec<(Value, Value)>) -> Value {
    Value::Map(entries.into_iter().collect::<Map>())
}

/// Helper: parse and unwrap, with the input in the panic message.
fn ok(input: &str) -> Value {
    match parse(input) {
        Ok(v) => v,
        Err(e) => panic!("parse failed for {input:?}: {e}"),
    }
}

/// Helper: parse expecting a parse error, returning (message, line, column).
fn fail(input: &str) -> (String, usize, usize) {
    match parse(input) {
        Err(StanzaError::Parse {
            line,
            column,
            message,
            ..
        }) => (message, line, column),
        other => panic!("expected parse error for {input:?}, got {other:?}"),
    }
}

// ============================================================================
// Flat maps
// ============================================================================

#[test]
fn flat_map() {
    let v = ok("a: 1\nb: 2\n");
    assert_eq!(v, map(vec![(s("a"), Value::Int(1)), (s("b"), Value::Int(2))]));
}

#[test]
fn map_with_mixed_scalars() {
    let v = ok("name: stanza\ncount: 42\nratio: 2.5\nready: true\nnothing: null\n");
    let m = v.as_map().unwrap();
    assert_eq!(m.get_str("name"), Some(&s("stanza")));
    assert_eq!(m.get_str("count"), Some(&Value::Int(42)));
    assert_eq!(m.get_str("ratio"), Some(&Value::Float(2.5)));
    assert_eq!(m.get_str("ready"), Some(&Value::Bool(true)));
    assert_eq!(m.get_str("nothing"), Some(&Value::Null));
}

#[test]
fn later_keys_overwrite() {
    let v = ok("a: 1\na: 2\n");
    assert_eq!(v, map(vec![(s("a"), Value::Int(2))]));
}

#[test]
fn keys_need_not_be_strings() {
    let v = ok("1: one\ntrue: yes\nnull: nothing\n-5: minus\n");
    let m = v.as_map().unwrap();
    assert_eq!(m.get(&Value::Int(1)), Some(&s("one")));
    assert_eq!(m.get(&Value::Bool(true)), Some(&s("yes")));
    assert_eq!(m.get(&Value::Null), Some(&s("nothing")));
    assert_eq!(m.get(&Value::Int(-5)), Some(&s("minus")));
}

#[test]
fn quoted_key() {
    let v = ok("\"my key\": 1\n");
    assert_eq!(v, map(vec![(s("my key"), Value::Int(1))]));
}

#[test]
fn key_may_contain_colon_without_space() {
    // `a:b` is not a separator; the one before the space is.
    let v = ok("a:b: 1\n");
    assert_eq!(v, map(vec![(s("a:b"), Value::Int(1))]));
}

#[test]
fn key_is_right_trimmed() {
    let v = ok("spaced   : 1\n");
    assert_eq!(v, map(vec![(s("spaced"), Value::Int(1))]));
}

#[test]
fn value_on_next_line() {
    let v = ok("a:\n  1\n");
    assert_eq!(v, map(vec![(s("a"), Value::Int(1))]));
}

#[test]
fn nested_maps() {
    let v = ok("server:\n  host: localhost\n  port: 8080\ndebug: true\n");
    assert_eq!(
        v,
        map(vec![
            (
                s("server"),
                map(vec![
                    (s("host"), s("localhost")),
                    (s("port"), Value::Int(8080)),
                ]),
            ),
            (s("debug"), Value::Bool(true)),
        ])
    );
}

#[test]
fn deeply_nested_maps() {
    let v = ok("a:\n  b:\n    c: deep\n");
    assert_eq!(
        v,
        map(vec![(s("a"), map(vec![(s("b"), map(vec![(s("c"), s("deep"))]))]))])
    );
}

// ============================================================================
// Lists
// ============================================================================

#[test]
fn flat_list() {
    let v = ok("- 1\n- 2\n- 3\n");
    assert_eq!(
        v,
        Value::Array(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
    );
}

#[test]
fn list_of_strings() {
    let v = ok("- red\n- dark blue\n");
    assert_eq!(v, Value::Array(vec![s("red"), s("dark blue")]));
}

#[test]
fn list_item_from_next_line() {
    let v = ok("-\n  1\n- 2\n");
    assert_eq!(v, Value::Array(vec![Value::Int(1), Value::Int(2)]));
}

#[test]
fn list_of_maps() {
    let v = ok("- name: a\n  id: 1\n- name: b\n  id: 2\n");
    assert_eq!(
        v,
        Value::Array(vec![
            map(vec![(s("name"), s("a")), (s("id"), Value::Int(1))]),
            map(vec![(s("name"), s("b")), (s("id"), Value::Int(2))]),
        ])
    );
}

#[test]
fn nested_lists() {
    let v = ok("-\n  - 1\n  - 2\n-\n  - 3\n");
    assert_eq!(
        v,
        Value::Array(vec![
            Value::Array(vec![Value::Int(1), Value::Int(2)]),
            Value::Array(vec![Value::Int(3)]),
        ])
    );
}

#[test]
fn list_as_map_value() {
    let v = ok("items:\n  - 1\n  - 2\n");
    assert_eq!(
        v,
        map(vec![(
            s("items"),
            Value::Array(vec![Value::Int(1), Value::Int(2)]),
        )])
    );
}

#[test]
fn negative_numbers_are_not_list_items() {
    let v = ok("- -5\n");
    assert_eq!(v, Value::Array(vec![Value::Int(-5)]));
}

#[test]
fn bad_list_indentation() {
    let (msg, line, column) = fail("- 1\n - 2\n");
    assert_eq!(msg, "Bad indentation of list item");
    assert_eq!(line, 2);
    assert_eq!(column, 1);
}

#[test]
fn bad_map_indentation() {
    let (msg, line, _) = fail("a: 1\n b: 2\n");
    assert_eq!(msg, "Bad indentation of map key");
    assert_eq!(line, 2);
}

#[test]
fn list_item_needs_space_after_dash() {
    let (msg, _, _) = fail("- 1\n-2\n");
    assert_eq!(msg, "Bad list item");
}

#[test]
fn list_cannot_be_a_map_key() {
    let (msg, _, _) = fail("a: 1\n- 2: 3\n");
    assert_eq!(msg, "Map key expected and it cannot be a list");
}

// ============================================================================
// Strings
// ============================================================================

#[test]
fn bare_line_is_a_string() {
    assert_eq!(ok("hello world\n"), s("hello world"));
}

#[test]
fn multi_line_block_is_a_literal_string() {
    assert_eq!(ok("hello\nworld\n"), s("hello\nworld\n"));
}

#[test]
fn quoted_string_value() {
    let v = ok("t: \"a: b # c\"\n");
    assert_eq!(v, map(vec![(s("t"), s("a: b # c"))]));
}

#[test]
fn single_quoted_string() {
    let v = ok("t: 'hi'\n");
    assert_eq!(v, map(vec![(s("t"), s("hi"))]));
}

#[test]
fn quoted_string_with_escapes() {
    let v = ok(r#"t: "line1\nline2\t\x41""#);
    assert_eq!(v, map(vec![(s("t"), s("line1\nline2\tA"))]));
}

#[test]
fn multi_line_quoted_string_folds() {
    let v = ok("t: \"multi\n line\n string\"\n");
    assert_eq!(v, map(vec![(s("t"), s("multi line string"))]));
}

#[test]
fn multi_line_quoted_blank_line_becomes_newline() {
    let v = ok("t: \"one\n two\n\n three\"\n");
    assert_eq!(v, map(vec![(s("t"), s("one two\nthree"))]));
}

#[test]
fn multi_line_quoted_extra_indent_joins_without_space() {
    // After dedent the second continuation still starts with a space, so no
    // joining space is added.
    let v = ok("t: \"a\n b\n  c\"\n");
    assert_eq!(v, map(vec![(s("t"), s("a b c"))]));
}

#[test]
fn multi_line_quoted_degenerate_continuation() {
    let v = ok("t: \"multi\n line\n\"\n");
    assert_eq!(v, map(vec![(s("t"), s("multi line"))]));
}

#[test]
fn unclosed_quote_is_an_error() {
    let (msg, _, _) = fail("t: \"multi\n line\nnext: 1\n");
    assert_eq!(msg, "String has no closing quote");
}

#[test]
fn garbage_after_closing_quote() {
    let (msg, _, _) = fail("t: \"multi\n line\" x\n");
    assert_eq!(msg, "Bad character after quoted string");
}

#[test]
fn multi_line_string_cannot_be_a_key() {
    let (msg, _, _) = fail("a: 1\n\"multi\n line\": 2\n");
    assert_eq!(msg, "Not a key");
}

// ============================================================================
// Comments and blank lines
// ============================================================================

#[test]
fn leading_comments_are_skipped() {
    let v = ok("# header\n\n# more\na: 1\n");
    assert_eq!(v, map(vec![(s("a"), Value::Int(1))]));
}

#[test]
fn comment_between_map_entries() {
    let v = ok("a: 1\n# note\nb: 2\n");
    assert_eq!(v, map(vec![(s("a"), Value::Int(1)), (s("b"), Value::Int(2))]));
}

#[test]
fn comment_between_list_items() {
    let v = ok("- 1\n# note\n- 2\n");
    assert_eq!(v, Value::Array(vec![Value::Int(1), Value::Int(2)]));
}

#[test]
fn trailing_comment_after_scalar() {
    let v = ok("a: 1 # the answer\n");
    assert_eq!(v, map(vec![(s("a"), Value::Int(1))]));
}

#[test]
fn blank_lines_between_entries() {
    let v = ok("a: 1\n\nb: 2\n");
    assert_eq!(v, map(vec![(s("a"), Value::Int(1)), (s("b"), Value::Int(2))]));
}

#[test]
fn unindented_comment_does_not_close_a_block() {
    let v = ok("a:\n  x: 1\n# comment at column zero\n  y: 2\n");
    assert_eq!(
        v,
        map(vec![(
            s("a"),
            map(vec![(s("x"), Value::Int(1)), (s("y"), Value::Int(2))]),
        )])
    );
}

#[test]
fn comment_only_source_is_eof() {
    assert!(matches!(parse("# nothing\n"), Err(StanzaError::Eof)));
    assert!(matches!(parse(""), Err(StanzaError::Eof)));
}

// ============================================================================
// Conversion specifiers
// ============================================================================

#[test]
fn literal_block() {
    let v = ok("s: :literal:\n  hello\n  world\n");
    assert_eq!(v, map(vec![(s("s"), s("hello\nworld\n"))]));
}

#[test]
fn literal_single_line_has_no_trailing_newline() {
    let v = ok("s: :literal:\n  hello\n");
    assert_eq!(v, map(vec![(s("s"), s("hello"))]));
}

#[test]
fn literal_preserves_relative_indent() {
    let v = ok("s: :literal:\n  if x:\n    go()\n");
    assert_eq!(v, map(vec![(s("s"), s("if x:\n  go()\n"))]));
}

#[test]
fn raw_block_keeps_indent() {
    let v = ok("s: :raw:\n  a\n    b\n");
    assert_eq!(v, map(vec![(s("s"), s(" a\n   b\n"))]));
}

#[test]
fn folded_block() {
    let v = ok("s: :folded:\n  one\n  two\n\n  three\n");
    assert_eq!(v, map(vec![(s("s"), s("one two\nthree"))]));
}

#[test]
fn inline_specifier_content() {
    let v = ok("s: :raw: verbatim: text # not a comment? yes it is kept\n");
    assert_eq!(
        v,
        map(vec![(s("s"), s("verbatim: text # not a comment? yes it is kept"))])
    );
}

#[test]
fn specifier_without_space_after_key() {
    let v = ok("j::json: [1, 2]\n");
    assert_eq!(
        v,
        map(vec![(s("j"), Value::Array(vec![Value::Int(1), Value::Int(2)]))])
    );
}

#[test]
fn json_island() {
    let v = ok("j: :json: {\"x\": [1, 2, 3], \"y\": null}\n");
    let expected = map(vec![(
        s("j"),
        map(vec![
            (
                s("x"),
                Value::Array(vec![Value::Int(1), Value::Int(2), Value::Int(3)]),
            ),
            (s("y"), Value::Null),
        ]),
    )]);
    assert_eq!(v, expected);
}

#[test]
fn json_island_spanning_lines() {
    let v = ok("j: :json:\n  {\"a\": [1,\n   2]}\n");
    let expected = map(vec![(
        s("j"),
        map(vec![(s("a"), Value::Array(vec![Value::Int(1), Value::Int(2)]))]),
    )]);
    assert_eq!(v, expected);
}

#[test]
fn datetime_specifier() {
    let v = ok("d: :datetime: 2024-02-29T12:34:56.5Z\n");
    let expected = FixedOffset::east_opt(0)
        .unwrap()
        .with_ymd_and_hms(2024, 2, 29, 12, 34, 56)
        .unwrap()
        .with_nanosecond(500_000_000)
        .unwrap();
    assert_eq!(v, map(vec![(s("d"), Value::DateTime(expected))]));
}

#[test]
fn timestamp_specifier() {
    let v = ok("t: :timestamp: 1700000000.25\n");
    assert_eq!(
        v,
        map(vec![(
            s("t"),
            Value::Timestamp(stanza_core::Timestamp {
                secs: 1_700_000_000,
                nanos: 250_000_000,
            }),
        )])
    );
}

#[test]
fn bare_specifier_line_takes_the_following_block() {
    let v = ok(":literal:\n  a\n  b\n");
    assert_eq!(v, s("a\nb\n"));
}

#[test]
fn bare_specifier_with_no_block_is_an_error() {
    let (msg, _, _) = fail(":literal:\n");
    assert_eq!(msg, "Unexpected end of block");
}

#[test]
fn unregistered_specifier_reads_as_a_string() {
    assert_eq!(ok(":nope: text\n"), s(":nope: text"));
}

#[test]
fn unregistered_specifier_after_key_is_not_a_separator() {
    // `:nope:` is no specifier, so the colon before it is no separator and
    // the line has none before the last colon.
    let v = ok("a: :nope: x\n");
    assert_eq!(v, map(vec![(s("a: :nope"), s("x"))]));
}

#[test]
fn custom_specifier() {
    use stanza_core::{Parser, Step, StrSource};

    fn upper(p: &mut Parser<StrSource<'_>>) -> Step<Value> {
        let text = p.block_line_text().to_uppercase();
        p.advance_line()?;
        p.drain_block("Extra data after parsed value")?;
        Ok(Value::String(text))
    }

    let mut parser = Parser::new(StrSource::new("a: :shout: hey\n"));
    parser.set_specifier("shout", upper);
    let v = parser.parse().unwrap();
    assert_eq!(v, map(vec![(s("a"), s("HEY"))]));
}

#[test]
fn custom_specifier_overrides_builtin() {
    use stanza_core::{Parser, Step, StrSource};

    fn not_raw(p: &mut Parser<StrSource<'_>>) -> Step<Value> {
        p.advance_line()?;
        p.drain_block("Extra data after parsed value")?;
        Ok(Value::Int(7))
    }

    let mut parser = Parser::new(StrSource::new("a: :raw: anything\n"));
    parser.set_specifier("raw", not_raw);
    let v = parser.parse().unwrap();
    assert_eq!(v, map(vec![(s("a"), Value::Int(7))]));
}

// ============================================================================
// Scalars as keys, maps opened by scalars
// ============================================================================

#[test]
fn number_then_separator_opens_a_map() {
    let v = ok("12: x\n34: y\n");
    let m = v.as_map().unwrap();
    assert_eq!(m.get(&Value::Int(12)), Some(&s("x")));
    assert_eq!(m.get(&Value::Int(34)), Some(&s("y")));
}

#[test]
fn quoted_string_key_with_escapes() {
    let v = ok("\"a\\tb\": 1\n");
    assert_eq!(v, map(vec![(s("a\tb"), Value::Int(1))]));
}

#[test]
fn colon_cannot_start_a_key() {
    let (msg, _, _) = fail("a: 1\n:json: 2\n");
    assert_eq!(msg, "Map key expected and it cannot start with colon");
}

#[test]
fn missing_key_is_an_error() {
    let (msg, _, _) = fail("a: 1\njust a string\n");
    assert_eq!(msg, "Map key expected");
}

#[test]
fn scalar_not_followed_by_separator_is_not_a_key() {
    let (msg, _, _) = fail("a: 1\n42\n");
    assert_eq!(msg, "Not a key");
}

// ============================================================================
// Blocks and structure errors
// ============================================================================

#[test]
fn empty_value_block_is_an_error() {
    let (msg, _, _) = fail("a:\n");
    assert_eq!(msg, "Empty block");
}

#[test]
fn extra_data_after_value() {
    let (msg, _, _) = fail("a: 1\n   2\n");
    assert_eq!(msg, "Extra data after parsed value");
}

#[test]
fn keyword_with_trailing_garbage() {
    let (msg, _, _) = fail("a: truex\n");
    assert_eq!(msg, "Unexpected character");
}

#[test]
fn block_depth_at_limit_parses() {
    let mut doc = String::new();
    for i in 0..99 {
        doc.push_str(&" ".repeat(i));
        doc.push_str("k:\n");
    }
    doc.push_str(&" ".repeat(99));
    doc.push_str("x: 1\n");
    assert!(parse(&doc).is_ok());
}

#[test]
fn block_depth_over_limit_fails() {
    let mut doc = String::new();
    for i in 0..100 {
        doc.push_str(&" ".repeat(i));
        doc.push_str("k:\n");
    }
    doc.push_str(&" ".repeat(100));
    doc.push_str("x: 1\n");
    let (msg, _, _) = fail(&doc);
    assert_eq!(msg, "Too many nested blocks");
}

// ============================================================================
// Mixed documents
// ============================================================================

#[test]
fn kitchen_sink() {
    let doc = "\
# build manifest
name: demo
owner: \"Fry, P.\"
tags:
  - alpha
  - beta
limits:
  cpu: 2.5
  mem: 1_024
payload: :json: {\"mode\": \"fast\", \"retries\": [1, 2]}
notes: :folded:
  first line
  second line
created: :datetime: 2030-01-02 03:04:05
";
    let v = ok(doc);
    let m = v.as_map().unwrap();
    assert_eq!(m.get_str("name"), Some(&s("demo")));
    assert_eq!(m.get_str("owner"), Some(&s("Fry, P.")));
    assert_eq!(
        m.get_str("tags"),
        Some(&Value::Array(vec![s("alpha"), s("beta")]))
    );
    let limits = m.get_str("limits").unwrap().as_map().unwrap();
    assert_eq!(limits.get_str("cpu"), Some(&Value::Float(2.5)));
    assert_eq!(limits.get_str("mem"), Some(&Value::Int(1024)));
    let payload = m.get_str("payload").unwrap().as_map().unwrap();
    assert_eq!(payload.get_str("mode"), Some(&s("fast")));
    assert_eq!(m.get_str("notes"), Some(&s("first line second line")));
    assert!(matches!(m.get_str("created"), Some(Value::DateTime(_))));
}

#[test]
fn list_item_map_with_nested_block() {
    let v = ok("- name: a\n  opts:\n    x: 1\n- name: b\n");
    assert_eq!(
        v,
        Value::Array(vec![
            map(vec![
                (s("name"), s("a")),
                (s("opts"), map(vec![(s("x"), Value::Int(1))])),
            ]),
            map(vec![(s("name"), s("b"))]),
        ])
    );
}
