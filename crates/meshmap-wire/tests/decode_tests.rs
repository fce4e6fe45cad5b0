use std::collections::BTreeMap;

use meshmap_wire::{decode, decode_prefix, Value, WireError};

fn bytes(b: &[u8]) -> Value {
    Value::Bytes(b.to_vec())
}

#[test]
fn decodes_a_flat_dict() {
    let mut expected = BTreeMap::new();
    expected.insert(b"foo".to_vec(), Value::Int(1));
    assert_eq!(decode(b"d3:fooi1ee"), Ok(Value::Dict(expected)));
}

#[test]
fn decodes_a_list_of_strings() {
    assert_eq!(
        decode(b"l4:spam4:eggse"),
        Ok(Value::List(vec![bytes(b"spam"), bytes(b"eggs")]))
    );
}

#[test]
fn decodes_a_negative_integer() {
    assert_eq!(decode(b"i-3e"), Ok(Value::Int(-3)));
}

#[test]
fn decodes_nested_containers() {
    let mut inner = BTreeMap::new();
    inner.insert(b"k".to_vec(), Value::List(vec![Value::Int(0), bytes(b"")]));
    assert_eq!(
        decode(b"ld1:kli0e0:eee"),
        Ok(Value::List(vec![Value::Dict(inner)]))
    );
}

#[test]
fn truncated_byte_string_is_an_error() {
    assert_eq!(decode(b"3:ab"), Err(WireError::UnexpectedEof { offset: 4 }));
}

#[test]
fn integer_without_terminator_is_an_error() {
    assert_eq!(decode(b"i12"), Err(WireError::BadInteger { offset: 0 }));
    assert_eq!(decode(b"ie"), Err(WireError::BadInteger { offset: 0 }));
    assert_eq!(decode(b"i-e"), Err(WireError::BadInteger { offset: 0 }));
}

#[test]
fn unterminated_list_is_an_error() {
    assert_eq!(
        decode(b"l4:spam"),
        Err(WireError::UnexpectedEof { offset: 7 })
    );
}

#[test]
fn trailing_bytes_are_an_error() {
    assert_eq!(
        decode(b"i1ei2e"),
        Err(WireError::TrailingBytes { offset: 3 })
    );
}

#[test]
fn dict_with_dangling_key_is_an_error() {
    assert_eq!(decode(b"d3:fooe"), Err(WireError::DanglingKey { offset: 0 }));
}

#[test]
fn dict_with_integer_key_is_an_error() {
    assert_eq!(
        decode(b"di1ei2ee"),
        Err(WireError::NonStringKey { offset: 0 })
    );
}

#[test]
fn unknown_token_is_an_error() {
    assert_eq!(
        decode(b"x"),
        Err(WireError::UnexpectedByte {
            offset: 0,
            byte: b'x',
        })
    );
}

#[test]
fn empty_input_is_an_error() {
    assert_eq!(decode(b""), Err(WireError::UnexpectedEof { offset: 0 }));
}

#[test]
fn prefix_decoding_reports_consumed_length() {
    let (value, used) = decode_prefix(b"i7etrailing").expect("complete prefix");
    assert_eq!(value, Value::Int(7));
    assert_eq!(used, 3);
}

#[test]
fn prefix_decoding_asks_for_more_bytes_on_incomplete_input() {
    // A stream reader keeps appending until the structural end arrives.
    assert!(matches!(
        decode_prefix(b"d2:ip4:n0"),
        Err(WireError::UnexpectedEof { .. })
    ));
}
