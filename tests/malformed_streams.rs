//! Error paths, back-reference sharing, and cycle handling on hand-built
//! streams.

use demitasse::{parse, Error, Parser, Value};
use serde_json::json;

const MAGIC: [u8; 4] = [0xAC, 0xED, 0x00, 0x05];

fn push_utf(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(&u16::try_from(s.len()).expect("short string").to_be_bytes());
    out.extend_from_slice(s.as_bytes());
}

/// An object of a two-character class with no fields, no super, and the
/// given descriptor flags. `tail` holds the class data that follows.
fn object_stream(flags: u8, tail: &[u8]) -> Vec<u8> {
    let mut out = MAGIC.to_vec();
    out.extend_from_slice(&[0x73, 0x72]);
    push_utf(&mut out, "Ab");
    out.extend_from_slice(&[0; 8]);
    out.push(flags);
    out.extend_from_slice(&0_u16.to_be_bytes());
    out.push(0x78); // end of class annotations
    out.push(0x70); // null super descriptor
    out.extend_from_slice(tail);
    out
}

/// A `String[]` array whose elements are given as raw content bytes.
fn string_array_stream(len: i32, elements: &[u8]) -> Vec<u8> {
    let mut out = MAGIC.to_vec();
    out.extend_from_slice(&[0x75, 0x72]);
    push_utf(&mut out, "[Ljava.lang.String;");
    out.extend_from_slice(&[0xAD, 0xD2, 0x56, 0xE7, 0xE9, 0x1D, 0x7B, 0x47]);
    out.push(0x02);
    out.extend_from_slice(&0_u16.to_be_bytes());
    out.push(0x78);
    out.push(0x70);
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(elements);
    out
}

#[test]
fn references_share_the_decoded_string() {
    // Handles: 0 = array class descriptor, 1 = the array, 2 = "abc".
    let mut elements = vec![0x74];
    push_utf(&mut elements, "abc");
    elements.extend_from_slice(&[0x71, 0x00, 0x7E, 0x00, 0x02]);
    let value = parse(&string_array_stream(2, &elements)).unwrap();
    assert_eq!(
        value,
        Value::Array(vec![Value::Str("abc".into()), Value::Str("abc".into())])
    );
}

#[test]
fn self_reference_becomes_the_cycle_sentinel() {
    // The first element points back at the array's own reserved handle.
    let mut elements = vec![0x71, 0x00, 0x7E, 0x00, 0x01];
    elements.push(0x74);
    push_utf(&mut elements, "abc");
    let value = parse(&string_array_stream(2, &elements)).unwrap();
    assert_eq!(
        value,
        Value::Array(vec![Value::Str("[CYCLE]".into()), Value::Str("abc".into())])
    );
}

#[test]
fn cycle_sentinel_is_configurable() {
    let mut elements = vec![0x71, 0x00, 0x7E, 0x00, 0x01];
    elements.push(0x74);
    push_utf(&mut elements, "abc");
    let stream = string_array_stream(2, &elements);
    let mut parser = Parser::new(stream.as_slice());
    parser.set_cycle_reference_value(Value::Str("loop".into()));
    assert_eq!(
        parser.parse().unwrap(),
        Value::Array(vec![Value::Str("loop".into()), Value::Str("abc".into())])
    );
}

#[test]
fn null_array_class_yields_a_class_and_length_shell() {
    // Array tag with a Null class descriptor: no elements follow the size.
    let mut out = MAGIC.to_vec();
    out.extend_from_slice(&[0x75, 0x70]);
    out.extend_from_slice(&5_i32.to_be_bytes());
    let value = parse(&out).unwrap();
    assert_eq!(
        serde_json::Value::from(value),
        json!({"class": null, "length": 5})
    );
}

#[test]
fn references_to_a_null_class_array_resolve_to_its_shell() {
    // An object array whose second element references the first: an inner
    // array with a Null class descriptor. Handles: 0 = outer class
    // descriptor, 1 = outer array, 2 = inner array.
    let mut elements = vec![0x75, 0x70];
    elements.extend_from_slice(&5_i32.to_be_bytes());
    elements.extend_from_slice(&[0x71, 0x00, 0x7E, 0x00, 0x02]);
    let value = parse(&string_array_stream(2, &elements)).unwrap();
    assert_eq!(
        serde_json::Value::from(value),
        json!([
            {"class": null, "length": 5},
            {"class": null, "length": 5}
        ])
    );
}

#[test]
fn out_of_range_references_decode_as_null() {
    let high = [0x71, 0x00, 0x7E, 0x00, 0xFF];
    let value = parse(&string_array_stream(1, &high)).unwrap();
    assert_eq!(value, Value::Array(vec![Value::Null]));

    // An ID below the handle base underflows to a negative index.
    let low = [0x71, 0x00, 0x00, 0x00, 0x00];
    let value = parse(&string_array_stream(1, &low)).unwrap();
    assert_eq!(value, Value::Array(vec![Value::Null]));
}

#[test]
fn serializable_flag_layouts_decode() {
    assert_eq!(
        serde_json::Value::from(parse(&object_stream(0x02, &[])).unwrap()),
        json!({})
    );
    assert_eq!(
        serde_json::Value::from(parse(&object_stream(0x03, &[0x78])).unwrap()),
        json!({})
    );
    assert_eq!(
        serde_json::Value::from(parse(&object_stream(0x0C, &[0x78])).unwrap()),
        json!({})
    );
}

#[test]
fn legacy_external_data_is_rejected() {
    let err = parse(&object_stream(0x04, &[])).unwrap_err();
    assert!(matches!(err.root_cause(), Error::ExternalContent));
    assert_eq!(
        err.root_cause().to_string(),
        "unable to parse version 1 external content"
    );
}

#[test]
fn unknown_flag_layouts_are_rejected() {
    for flags in [0x00, 0x01, 0x05, 0x0B] {
        let err = parse(&object_stream(flags, &[])).unwrap_err();
        assert!(
            matches!(err.root_cause(), Error::UnsupportedClassFlags(f) if *f == flags),
            "flags {flags:#04x}"
        );
    }
}

#[test]
fn unknown_field_types_are_rejected_when_read() {
    let mut out = MAGIC.to_vec();
    out.extend_from_slice(&[0x73, 0x72]);
    push_utf(&mut out, "Ab");
    out.extend_from_slice(&[0; 8]);
    out.push(0x02);
    out.extend_from_slice(&1_u16.to_be_bytes());
    out.push(b'X');
    push_utf(&mut out, "f");
    out.push(0x78);
    out.push(0x70);
    let err = parse(&out).unwrap_err();
    assert_eq!(
        err.root_cause().to_string(),
        "unknown field type 'X'"
    );
}

#[test]
fn unknown_type_tags_are_rejected() {
    let err = parse(&[0xAC, 0xED, 0x00, 0x05, 0x7F]).unwrap_err();
    assert!(matches!(err.root_cause(), Error::UnknownType(0x7F)));
    assert_eq!(err.root_cause().to_string(), "unknown type 0x7f");
}

#[test]
fn recognized_but_unsupported_tags_say_so() {
    let err = parse(&[0xAC, 0xED, 0x00, 0x05, 0x79]).unwrap_err();
    assert_eq!(
        err.root_cause().to_string(),
        "parsing Reset is currently not supported"
    );
}

#[test]
fn tags_outside_the_descriptor_allow_list_are_rejected() {
    // An Object tag where the object's class descriptor should be.
    let err = parse(&[0xAC, 0xED, 0x00, 0x05, 0x73, 0x73]).unwrap_err();
    assert!(matches!(
        err.root_cause(),
        Error::TypeNotAllowedHere("Object")
    ));
    assert_eq!(err.root_cause().to_string(), "Object not allowed here");
}

#[test]
fn one_character_class_names_are_rejected() {
    let mut out = MAGIC.to_vec();
    out.extend_from_slice(&[0x73, 0x72]);
    push_utf(&mut out, "A");
    let err = parse(&out).unwrap_err();
    assert!(matches!(
        err.root_cause(),
        Error::InvalidClassName(name) if name == "A"
    ));
}

#[test]
fn trailing_bytes_fail_after_a_complete_value() {
    let mut bytes = b"\xac\xed\x00\x05\x74\x00\x0cHello, World".to_vec();
    assert!(parse(&bytes).is_ok());
    bytes.push(0x00);
    let err = parse(&bytes).unwrap_err();
    assert!(matches!(err, Error::TrailingData));
}

#[test]
fn truncated_streams_fail_with_premature_eof() {
    let bytes = b"\xac\xed\x00\x05\x74\x00\x0cHello";
    let err = parse(bytes).unwrap_err();
    assert!(matches!(err, Error::PrematureEof));
}
