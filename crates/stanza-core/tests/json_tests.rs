use stanza_core::{parse_json, Map, StanzaError, Value};

fn s(text: &str) -> Value {
    Value::String(text.to_string())
}

fn map(entries: Vec<(Value, Value)>) -> Value {
    Value::Map(entries.into_iter().collect::<Map>())
}

fn ok(input: &str) -> Value {
    match parse_json(input) {
        Ok(v) => v,
        Err(e) => panic!("parse_json failed for {input:?}: {e}"),
    }
}

fn fail(input: &str) -> (String, usize, usize) {
    match parse_json(input) {
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
// Values
// ============================================================================

#[test]
fn keywords() {
    assert_eq!(ok("null"), Value::Null);
    assert_eq!(ok("true"), Value::Bool(true));
    assert_eq!(ok("false"), Value::Bool(false));
}

#[test]
fn numbers() {
    assert_eq!(ok("42"), Value::Int(42));
    assert_eq!(ok("-7"), Value::Int(-7));
    assert_eq!(ok("3.5"), Value::Float(3.5));
    assert_eq!(ok("2e3"), Value::Float(2000.0));
    assert_eq!(ok("18446744073709551615"), Value::UInt(u64::MAX));
}

#[test]
fn strings() {
    assert_eq!(ok(r#""hello""#), s("hello"));
    assert_eq!(ok(r#""""#), s(""));
    assert_eq!(ok(r#""a\nb\tc""#), s("a\nb\tc"));
    assert_eq!(ok(r#""é""#), s("é"));
    assert_eq!(ok(r#""\U0001F600""#), s("\u{1F600}"));
}

#[test]
fn arrays() {
    assert_eq!(ok("[]"), Value::Array(vec![]));
    assert_eq!(
        ok("[1, 2, 3]"),
        Value::Array(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
    );
    assert_eq!(
        ok(r#"[1, "two", null, true]"#),
        Value::Array(vec![Value::Int(1), s("two"), Value::Null, Value::Bool(true)])
    );
}

#[test]
fn objects() {
    assert_eq!(ok("{}"), map(vec![]));
    assert_eq!(
        ok(r#"{"a": 1, "b": [2, 3]}"#),
        map(vec![
            (s("a"), Value::Int(1)),
            (s("b"), Value::Array(vec![Value::Int(2), Value::Int(3)])),
        ])
    );
}

#[test]
fn nested_structures() {
    let v = ok(r#"{"a": {"b": [{"c": null}]}}"#);
    let expected = map(vec![(
        s("a"),
        map(vec![(s("b"), Value::Array(vec![map(vec![(s("c"), Value::Null)])]))]),
    )]);
    assert_eq!(v, expected);
}

#[test]
fn multiline_json() {
    let v = ok("{\n  \"a\": [\n    1,\n    2\n  ]\n}\n");
    assert_eq!(
        v,
        map(vec![(s("a"), Value::Array(vec![Value::Int(1), Value::Int(2)]))])
    );
}

#[test]
fn duplicate_keys_overwrite() {
    assert_eq!(ok(r#"{"a": 1, "a": 2}"#), map(vec![(s("a"), Value::Int(2))]));
}

// ============================================================================
// The comment extension
// ============================================================================

#[test]
fn comments_are_whitespace_between_tokens() {
    let v = ok("{ # open\n  \"a\": 1, # entry\n  \"b\": 2\n} # close\n");
    assert_eq!(v, map(vec![(s("a"), Value::Int(1)), (s("b"), Value::Int(2))]));
}

#[test]
fn comment_before_value() {
    assert_eq!(ok("# leading\n[1]\n"), Value::Array(vec![Value::Int(1)]));
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn trailing_comma_in_object() {
    let (msg, line, column) = fail("{\"a\": 1,}\n");
    assert_eq!(msg, "Unexpected character");
    assert_eq!(line, 1);
    assert_eq!(column, 8);
}

#[test]
fn trailing_comma_in_array() {
    let (msg, _, _) = fail("[1,]\n");
    assert_eq!(msg, "Unexpected character");
}

#[test]
fn missing_comma_in_array() {
    let (msg, _, _) = fail("[1 2]\n");
    assert_eq!(msg, "Array items must be separated with comma");
}

#[test]
fn missing_comma_in_object() {
    let (msg, _, _) = fail(r#"{"a": 1 "b": 2}"#);
    assert_eq!(msg, "Object members must be separated with comma");
}

#[test]
fn missing_colon_in_object() {
    let (msg, _, _) = fail(r#"{"a" 1}"#);
    assert_eq!(msg, "Values must be separated from keys with colon");
}

#[test]
fn non_string_object_key() {
    let (msg, _, _) = fail("{1: 2}\n");
    assert_eq!(msg, "Unexpected character");
}

#[test]
fn garbage_after_value_same_line() {
    let (msg, _, _) = fail("[1] x\n");
    assert_eq!(msg, "Garbage after JSON value");
}

#[test]
fn garbage_after_value_next_line() {
    // The second verification pass: the rest of the block must be empty.
    let (msg, line, _) = fail("[1]\nx\n");
    assert_eq!(msg, "Garbage after JSON value");
    assert_eq!(line, 2);
}

#[test]
fn comment_after_value_is_fine() {
    assert_eq!(ok("[1]\n# done\n"), Value::Array(vec![Value::Int(1)]));
}

#[test]
fn unterminated_string() {
    let (msg, _, _) = fail("\"abc\n");
    assert_eq!(msg, "String has no closing quote");
}

#[test]
fn control_character_in_string() {
    let (msg, _, _) = fail("\"a\u{1}b\"\n");
    assert_eq!(msg, "Bad character encountered");
}

#[test]
fn unterminated_array() {
    let (msg, _, _) = fail("[1, 2\n");
    assert_eq!(msg, "Unexpected end of block");
}

#[test]
fn lone_minus() {
    let (msg, _, _) = fail("-\n");
    assert_eq!(msg, "Unexpected character");
}

#[test]
fn bare_word() {
    let (msg, _, _) = fail("hello\n");
    assert_eq!(msg, "Unexpected character");
}

#[test]
fn keyword_with_suffix() {
    let (msg, _, _) = fail("nullx\n");
    assert_eq!(msg, "Unexpected character");
}

#[test]
fn empty_input_is_eof() {
    assert!(matches!(parse_json(""), Err(StanzaError::Eof)));
    assert!(matches!(parse_json("# only comments\n"), Err(StanzaError::Eof)));
}

// ============================================================================
// Depth cap
// ============================================================================

#[test]
fn json_depth_at_limit_parses() {
    let doc = format!("{}1{}", "[".repeat(100), "]".repeat(100));
    assert!(parse_json(&doc).is_ok());
}

#[test]
fn json_depth_over_limit_fails() {
    let doc = format!("{}1{}", "[".repeat(101), "]".repeat(101));
    let (msg, _, _) = fail(&doc);
    assert_eq!(msg, "Maximum recursion depth exceeded");
}

#[test]
fn object_depth_over_limit_fails() {
    let mut doc = String::new();
    for _ in 0..101 {
        doc.push_str("{\"k\": ");
    }
    doc.push('1');
    for _ in 0..101 {
        doc.push('}');
    }
    let (msg, _, _) = fail(&doc);
    assert_eq!(msg, "Maximum recursion depth exceeded");
}
