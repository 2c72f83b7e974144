use crate::*;

fn encode(value: &Value) -> Vec<u8> {
    let mut enc = Encoder::new();
    encode_value(&mut enc, value).expect("encoding failed");
    enc.finish().expect("scopes open")
}

fn decode(bytes: &[u8]) -> Result<Value> {
    decode_value(&mut Decoder::new(bytes))
}

// ============================================================================
//  ENCODER STRUCTURE
// ============================================================================

#[test]
fn test_scalar_layout() {
    let mut enc = Encoder::new();
    enc.uint(480).unwrap();
    let bytes = enc.finish().unwrap();

    assert_eq!(bytes[0], Tag::UInt as u8);
    assert_eq!(&bytes[1..], &480u64.to_le_bytes());
}

#[test]
fn test_container_length_is_backpatched() {
    let mut enc = Encoder::new();
    enc.list_begin().unwrap();
    enc.null().unwrap();
    enc.bool(true).unwrap();
    enc.list_end().unwrap();
    let bytes = enc.finish().unwrap();

    assert_eq!(bytes[0], Tag::List as u8);
    assert_eq!(u32::from_le_bytes(bytes[1..5].try_into().unwrap()), 2);
    assert_eq!(bytes.len(), 7);
}

#[test]
fn test_map_rejects_bare_items() {
    let mut enc = Encoder::new();
    enc.map_begin().unwrap();
    assert_eq!(enc.str("loose"), Err(Error::InvalidMapItem(Tag::String)));
}

#[test]
fn test_entry_holds_exactly_one_item() {
    let mut enc = Encoder::new();
    enc.entry_begin("seq").unwrap();
    enc.uint(1).unwrap();
    assert_eq!(enc.uint(2), Err(Error::TooManyItems(Scope::Entry)));
}

#[test]
fn test_empty_entry_cannot_close() {
    let mut enc = Encoder::new();
    enc.entry_begin("seq").unwrap();
    assert_eq!(enc.entry_end(), Err(Error::MissingPayload(Scope::Entry)));
}

#[test]
fn test_mismatched_close() {
    let mut enc = Encoder::new();
    enc.list_begin().unwrap();
    assert_eq!(
        enc.map_end(),
        Err(Error::ScopeMismatch { expected: Scope::Map, actual: Scope::List })
    );
}

#[test]
fn test_close_at_root_underflows() {
    let mut enc = Encoder::new();
    assert_eq!(enc.list_end(), Err(Error::ScopeUnderflow));
}

#[test]
fn test_finish_with_open_scope() {
    let mut enc = Encoder::new();
    enc.ok_begin().unwrap();
    assert!(matches!(enc.finish(), Err(Error::ScopeStillOpen)));
}

// ============================================================================
//  DECODER
// ============================================================================

#[test]
fn test_nested_value_survives_the_wire() {
    let value = Value::Map(vec![
        ("appId".into(), Value::Int(480)),
        ("steamId".into(), Value::UInt(76561197960287930)),
        ("name".into(), Value::String("Spacewar 🚀".into())),
        ("ratio".into(), Value::Float(0.5)),
        ("flags".into(), Value::List(vec![Value::Bool(true), Value::Null])),
        ("ticket".into(), Value::Bytes(vec![0xde, 0xad, 0xbe, 0xef])),
    ]);

    assert_eq!(decode(&encode(&value)).unwrap(), value);
}

#[test]
fn test_skip_jumps_over_containers() {
    let mut enc = Encoder::new();
    enc.list_begin().unwrap();
    enc.str("ignored").unwrap();
    enc.list_end().unwrap();
    enc.int(-7).unwrap();
    let bytes = enc.finish().unwrap();

    let mut dec = Decoder::new(&bytes);
    dec.skip().unwrap();
    assert_eq!(dec.int().unwrap(), -7);
    assert_eq!(dec.remaining(), 0);
}

#[test]
fn test_map_iteration_yields_names() {
    let mut enc = Encoder::new();
    enc.map_begin().unwrap();
    enc.entry_str("interface", "Utils").unwrap();
    enc.entry_uint("seq", 9).unwrap();
    enc.map_end().unwrap();
    let bytes = enc.finish().unwrap();

    let mut dec = Decoder::new(&bytes);
    let names: Vec<&str> = dec.map().unwrap().map(|e| e.unwrap().0).collect();
    assert_eq!(names, vec!["interface", "seq"]);
}

#[test]
fn test_wrong_tag_is_reported() {
    let bytes = encode(&Value::Int(1));
    let mut dec = Decoder::new(&bytes);
    assert_eq!(
        dec.str(),
        Err(Error::UnexpectedTag { expected: Tag::String, found: Tag::Int })
    );
}

#[test]
fn test_truncated_buffer() {
    let bytes = encode(&Value::String("truncated".into()));
    assert_eq!(decode(&bytes[..bytes.len() - 2]), Err(Error::UnexpectedEnd));
}

#[test]
fn test_unknown_tag_byte() {
    assert_eq!(decode(&[0xFF]), Err(Error::InvalidTag(0xFF)));
}

#[test]
fn test_invalid_utf8() {
    let bytes = [Tag::String as u8, 2, 0, 0, 0, 0xC3, 0x28];
    assert_eq!(decode(&bytes), Err(Error::InvalidUtf8));
}

#[test]
fn test_depth_limit_on_encode() {
    let mut value = Value::Null;
    for _ in 0..=MAX_DEPTH {
        value = Value::List(vec![value]);
    }
    let mut enc = Encoder::new();
    assert_eq!(encode_value(&mut enc, &value), Err(Error::DepthExceeded));
}

#[test]
fn test_depth_limit_is_inclusive() {
    let mut value = Value::Null;
    for _ in 0..MAX_DEPTH {
        value = Value::List(vec![value]);
    }
    assert_eq!(decode(&encode(&value)), Ok(value));
}

#[test]
fn test_depth_limit_on_decode() {
    // Hand-build a buffer nested one level too deep.
    let mut enc = Encoder::new();
    for _ in 0..=MAX_DEPTH {
        enc.list_begin().unwrap();
    }
    enc.null().unwrap();
    for _ in 0..=MAX_DEPTH {
        enc.list_end().unwrap();
    }
    let bytes = enc.finish().unwrap();

    assert_eq!(decode(&bytes), Err(Error::DepthExceeded));
}

#[test]
fn test_value_accessors() {
    let value = Value::Map(vec![("appId".into(), Value::from(480u32))]);
    assert_eq!(value.get("appId").and_then(Value::as_i64), Some(480));
    assert!(value.get("missing").is_none());
    assert_eq!(Value::from(Some("x")), Value::String("x".into()));
    assert!(Value::from(None::<bool>).is_null());
}
