//! Cross-module integration tests that don't fit naturally as an
//! in-module unit test for a single file.

use catcore::numeric::parse::parse_number;
use catcore::numeric::printf::{render, Args};
use catcore::parser::parse_tree;
use catcore::value::Value;

#[test]
fn source_parse_round_trips_every_value_kind() {
    let tree = parse_tree(b"[ 1 2.5 \"hi\" ident ( 3 4 ) ]").expect("parses");
    let top = tree.as_slice();
    assert_eq!(top.len(), 1);
    let items = match &top[0] {
        Value::Code(c) => c.as_slice(),
        other => panic!("expected top-level Code, got {other:?}"),
    };
    assert_eq!(items.len(), 5);
    assert_eq!(items[0], Value::Int32(1));
    assert_eq!(items[1], Value::Double(2.5));
    match &items[2] {
        Value::String(s) => assert_eq!(s.as_bytes(), b"hi"),
        other => panic!("expected String, got {other:?}"),
    }
    match &items[3] {
        Value::Ident(s) => assert_eq!(s.as_bytes(), b"ident"),
        other => panic!("expected Ident, got {other:?}"),
    }
    match &items[4] {
        Value::List(l) => {
            assert_eq!(l.as_slice(), &[Value::Int32(3), Value::Int32(4)]);
        }
        other => panic!("expected List, got {other:?}"),
    }
}

#[test]
fn printf_value_list_and_format_list_are_independent_cursors() {
    // The value list supplies `%d`/`%s` arguments; the format list
    // supplies `%*d`'s width, entirely independent cursors (spec.md §4.4.5).
    let values = vec![Value::Int32(42)];
    let formats = vec![Value::Int32(6)];
    let mut args = Args::with_format_list(&values, &formats);
    let out = render(b"[%*d]", &mut args).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "[    42]");
}

#[test]
fn numeric_parse_and_format_agree_on_a_decimal_round_trip() {
    let parsed = parse_number(b"1234.5").unwrap();
    match parsed {
        Value::Double(d) => {
            let rendered = catcore::numeric::format::format_double(d, 'f', Some(1), Default::default());
            assert_eq!(rendered, "1234.5");
        }
        other => panic!("expected Double, got {other:?}"),
    }
}

#[test]
fn source_parse_rejects_mismatched_closers() {
    assert!(parse_tree(b"[ 1 )").is_err());
}
