use wirepack::Decoder;
use wirepack::Encoder;
use wirepack::Value;

use crate::*;

fn wire(frame: &Frame) -> Frame {
    let bytes = frame.to_bytes().expect("encoding failed");
    Frame::from_bytes(&bytes).expect("decoding failed")
}

#[test]
fn test_call_frame() {
    let frame = Frame::Call(CallFrame {
        seq: 7,
        interface: "Achievement".into(),
        method: "activate".into(),
        args: vec![Value::from("ACH_WIN_ONE_GAME")],
    });
    assert_eq!(wire(&frame), frame);
    assert_eq!(frame.seq(), Some(7));
}

#[test]
fn test_register_and_disconnect_frames() {
    let register = Frame::Register(RegisterFrame {
        seq: 3,
        callback_type: "PersonaStateChange".into(),
        id: 12,
    });
    assert_eq!(wire(&register), register);

    let disconnect = Frame::Disconnect { id: 12 };
    assert_eq!(wire(&disconnect), disconnect);
    assert_eq!(disconnect.seq(), None);
}

#[test]
fn test_reply_carries_fault_message_verbatim() {
    let frame = Frame::Reply(ReplyFrame {
        seq: 4,
        outcome: Err(Fault::new(FaultKind::Invocation, "achievement not found")),
    });

    let Frame::Reply(reply) = wire(&frame) else { panic!("expected reply") };
    let fault = reply.outcome.unwrap_err();
    assert_eq!(fault.kind, FaultKind::Invocation);
    assert_eq!(fault.to_string(), "achievement not found");
}

#[test]
fn test_reply_success_value() {
    let frame = Frame::Reply(ReplyFrame { seq: 1, outcome: Ok(Value::Int(480)) });
    assert_eq!(wire(&frame), frame);
}

#[test]
fn test_reflect_fired_console_frames() {
    let reflect = Frame::Reflect(ReflectFrame {
        seq: 2,
        path: vec!["callback".into(), "SteamCallback".into()],
    });
    assert_eq!(wire(&reflect), reflect);

    let fired = Frame::Fired(FiredFrame {
        id: 1,
        args: vec![Value::Map(vec![("steamId".into(), Value::UInt(1))])],
    });
    assert_eq!(wire(&fired), fired);

    let console = Frame::Console(ConsoleFrame {
        level: LogLevel::Warn,
        message: "hello".into(),
    });
    assert_eq!(wire(&console), console);
}

#[test]
fn test_unknown_fields_are_skipped() {
    let mut enc = Encoder::new();
    enc.entry_begin("Disconnect").unwrap();
    enc.map_begin().unwrap();
    enc.entry_str("future", "ignored").unwrap();
    enc.entry_uint("id", 5).unwrap();
    enc.map_end().unwrap();
    enc.entry_end().unwrap();
    let bytes = enc.finish().unwrap();

    assert_eq!(Frame::from_bytes(&bytes).unwrap(), Frame::Disconnect { id: 5 });
}

#[test]
fn test_unknown_frame_name() {
    let mut enc = Encoder::new();
    enc.entry_begin("Teleport").unwrap();
    enc.null().unwrap();
    enc.entry_end().unwrap();
    let bytes = enc.finish().unwrap();

    let mut dec = Decoder::new(&bytes);
    assert_eq!(Frame::decode(&mut dec), Err(Error::UnknownFrame("Teleport".into())));
}

#[test]
fn test_missing_field() {
    let mut enc = Encoder::new();
    enc.entry_begin("Call").unwrap();
    enc.map_begin().unwrap();
    enc.entry_uint("seq", 1).unwrap();
    enc.map_end().unwrap();
    enc.entry_end().unwrap();
    let bytes = enc.finish().unwrap();

    assert_eq!(Frame::from_bytes(&bytes), Err(Error::MissingField("interface")));
    // The sequence number is still recoverable for an error reply.
    assert_eq!(decode_seq(&bytes), Ok(1));
}

#[test]
fn test_decode_seq_rejects_push_frames() {
    let bytes = Frame::Disconnect { id: 1 }.to_bytes().unwrap();
    assert_eq!(decode_seq(&bytes), Err(Error::UnknownFrame("Disconnect".into())));
}

#[test]
fn test_fault_kind_tags() {
    for kind in [
        FaultKind::NotInitialized,
        FaultKind::UnknownInterface,
        FaultKind::NoSuchMember,
        FaultKind::UnknownCallbackType,
        FaultKind::Invocation,
        FaultKind::UnknownOperation,
        FaultKind::Protocol,
    ] {
        assert_eq!(FaultKind::from_tag(kind.as_tag()), Ok(kind));
    }
    assert!(FaultKind::from_tag("Nope").is_err());
    assert!(LogLevel::parse("debug").is_err());
}
