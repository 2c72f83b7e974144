//! # Protocol Frames
//!
//! Every frame is an entry named after its kind, wrapping a map of fields:
//!
//! ```text
//! Entry("Call", Map { seq, interface, method, args })
//! Entry("Reply", Ok(Map { seq, value }) | Err(Map { seq, kind, message }))
//! ```

use wirepack::Decoder;
use wirepack::Encoder;
use wirepack::MapIter;
use wirepack::Value;
use wirepack::decode_value;
use wirepack::encode_value;

use crate::error::Error;
use crate::error::Fault;
use crate::error::FaultKind;
use crate::error::Result;

/// `interface.method(args)` issued by the guest.
#[derive(Debug, Clone, PartialEq)]
pub struct CallFrame {
    pub seq: u64,
    pub interface: String,
    pub method: String,
    pub args: Vec<Value>,
}

/// Subscribe guest callback `id` to the native event `callback_type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterFrame {
    pub seq: u64,
    pub callback_type: String,
    pub id: u64,
}

/// List the member names found at `path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflectFrame {
    pub seq: u64,
    pub path: Vec<String>,
}

/// The outcome of the request numbered `seq`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyFrame {
    pub seq: u64,
    pub outcome: std::result::Result<Value, Fault>,
}

/// A native event delivered to subscription `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct FiredFrame {
    pub id: u64,
    pub args: Vec<Value>,
}

/// Console severities the guest understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Log,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "log" => Ok(Self::Log),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(Error::UnknownVariant(other.to_string())),
        }
    }
}

/// A message the host wants shown in the guest console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleFrame {
    pub level: LogLevel,
    pub message: String,
}

/// Every frame of the protocol.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Call(CallFrame),
    Register(RegisterFrame),
    Disconnect { id: u64 },
    Reflect(ReflectFrame),
    Reply(ReplyFrame),
    Fired(FiredFrame),
    Console(ConsoleFrame),
}

impl Frame {
    fn name(&self) -> &'static str {
        match self {
            Frame::Call(_) => "Call",
            Frame::Register(_) => "Register",
            Frame::Disconnect { .. } => "Disconnect",
            Frame::Reflect(_) => "Reflect",
            Frame::Reply(_) => "Reply",
            Frame::Fired(_) => "Fired",
            Frame::Console(_) => "Console",
        }
    }

    /// The correlation number, for frames that expect or carry a reply.
    pub fn seq(&self) -> Option<u64> {
        match self {
            Frame::Call(c) => Some(c.seq),
            Frame::Register(r) => Some(r.seq),
            Frame::Reflect(r) => Some(r.seq),
            Frame::Reply(r) => Some(r.seq),
            Frame::Disconnect { .. } | Frame::Fired(_) | Frame::Console(_) => None,
        }
    }

    pub fn encode(&self, enc: &mut Encoder) -> Result<()> {
        enc.entry_begin(self.name())?;
        match self {
            Frame::Call(call) => {
                enc.map_begin()?;
                enc.entry_uint("seq", call.seq)?;
                enc.entry_str("interface", &call.interface)?;
                enc.entry_str("method", &call.method)?;
                write_values(enc, "args", &call.args)?;
                enc.map_end()?;
            }
            Frame::Register(reg) => {
                enc.map_begin()?;
                enc.entry_uint("seq", reg.seq)?;
                enc.entry_str("callbackType", &reg.callback_type)?;
                enc.entry_uint("id", reg.id)?;
                enc.map_end()?;
            }
            Frame::Disconnect { id } => {
                enc.map_begin()?;
                enc.entry_uint("id", *id)?;
                enc.map_end()?;
            }
            Frame::Reflect(reflect) => {
                enc.map_begin()?;
                enc.entry_uint("seq", reflect.seq)?;
                enc.entry_begin("path")?;
                enc.list_begin()?;
                for segment in &reflect.path {
                    enc.str(segment)?;
                }
                enc.list_end()?;
                enc.entry_end()?;
                enc.map_end()?;
            }
            Frame::Reply(reply) => match &reply.outcome {
                Ok(value) => {
                    enc.ok_begin()?;
                    enc.map_begin()?;
                    enc.entry_uint("seq", reply.seq)?;
                    enc.entry_begin("value")?;
                    encode_value(enc, value)?;
                    enc.entry_end()?;
                    enc.map_end()?;
                    enc.ok_end()?;
                }
                Err(fault) => {
                    enc.err_begin()?;
                    enc.map_begin()?;
                    enc.entry_uint("seq", reply.seq)?;
                    enc.entry_str("kind", fault.kind.as_tag())?;
                    enc.entry_str("message", &fault.message)?;
                    enc.map_end()?;
                    enc.err_end()?;
                }
            },
            Frame::Fired(fired) => {
                enc.map_begin()?;
                enc.entry_uint("id", fired.id)?;
                write_values(enc, "args", &fired.args)?;
                enc.map_end()?;
            }
            Frame::Console(console) => {
                enc.map_begin()?;
                enc.entry_str("level", console.level.as_str())?;
                enc.entry_str("message", &console.message)?;
                enc.map_end()?;
            }
        }
        enc.entry_end()?;
        Ok(())
    }

    /// Encodes the frame as a standalone buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut enc = Encoder::new();
        self.encode(&mut enc)?;
        Ok(enc.finish()?)
    }

    pub fn decode(dec: &mut Decoder) -> Result<Self> {
        let (name, mut body) = dec.entry()?;
        let frame = match name {
            "Call" => {
                let mut f = Fields::default();
                f.read(body.map()?)?;
                Frame::Call(CallFrame {
                    seq: f.seq.ok_or(Error::MissingField("seq"))?,
                    interface: f.interface.ok_or(Error::MissingField("interface"))?,
                    method: f.method.ok_or(Error::MissingField("method"))?,
                    args: f.args.ok_or(Error::MissingField("args"))?,
                })
            }
            "Register" => {
                let mut f = Fields::default();
                f.read(body.map()?)?;
                Frame::Register(RegisterFrame {
                    seq: f.seq.ok_or(Error::MissingField("seq"))?,
                    callback_type: f.callback_type.ok_or(Error::MissingField("callbackType"))?,
                    id: f.id.ok_or(Error::MissingField("id"))?,
                })
            }
            "Disconnect" => {
                let mut f = Fields::default();
                f.read(body.map()?)?;
                Frame::Disconnect { id: f.id.ok_or(Error::MissingField("id"))? }
            }
            "Reflect" => {
                let mut f = Fields::default();
                f.read(body.map()?)?;
                Frame::Reflect(ReflectFrame {
                    seq: f.seq.ok_or(Error::MissingField("seq"))?,
                    path: f.path.ok_or(Error::MissingField("path"))?,
                })
            }
            "Reply" => {
                let mut f = Fields::default();
                let outcome = match body.result()? {
                    Ok(mut ok) => {
                        f.read(ok.map()?)?;
                        Ok(f.value.take().ok_or(Error::MissingField("value"))?)
                    }
                    Err(mut err) => {
                        f.read(err.map()?)?;
                        let kind = f.kind.as_deref().ok_or(Error::MissingField("kind"))?;
                        let kind = FaultKind::from_tag(kind)?;
                        let message = f.message.take().ok_or(Error::MissingField("message"))?;
                        Err(Fault { kind, message })
                    }
                };
                Frame::Reply(ReplyFrame { seq: f.seq.ok_or(Error::MissingField("seq"))?, outcome })
            }
            "Fired" => {
                let mut f = Fields::default();
                f.read(body.map()?)?;
                Frame::Fired(FiredFrame {
                    id: f.id.ok_or(Error::MissingField("id"))?,
                    args: f.args.ok_or(Error::MissingField("args"))?,
                })
            }
            "Console" => {
                let mut f = Fields::default();
                f.read(body.map()?)?;
                let level = f.level.as_deref().ok_or(Error::MissingField("level"))?;
                Frame::Console(ConsoleFrame {
                    level: LogLevel::parse(level)?,
                    message: f.message.ok_or(Error::MissingField("message"))?,
                })
            }
            other => return Err(Error::UnknownFrame(other.to_string())),
        };
        Ok(frame)
    }

    /// Decodes a standalone buffer holding exactly one frame.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Frame::decode(&mut Decoder::new(bytes))
    }
}

/// Reads only the sequence number of a request or reply.
///
/// A host uses this to answer a request whose remaining fields failed to decode.
pub fn decode_seq(bytes: &[u8]) -> Result<u64> {
    let mut dec = Decoder::new(bytes);
    let (name, mut body) = dec.entry()?;
    let map = match name {
        "Call" | "Register" | "Reflect" => body.map()?,
        "Reply" => match body.result()? {
            Ok(mut ok) => ok.map()?,
            Err(mut err) => err.map()?,
        },
        other => return Err(Error::UnknownFrame(other.to_string())),
    };

    for entry in map {
        let (key, mut val) = entry?;
        if key == "seq" {
            return Ok(val.uint()?);
        }
    }

    Err(Error::MissingField("seq"))
}

fn write_values(enc: &mut Encoder, key: &str, values: &[Value]) -> Result<()> {
    enc.entry_begin(key)?;
    enc.list_begin()?;
    for value in values {
        encode_value(enc, value)?;
    }
    enc.list_end()?;
    enc.entry_end()?;
    Ok(())
}

fn read_values(dec: &mut Decoder) -> Result<Vec<Value>> {
    let mut values = Vec::new();
    for item in dec.list()? {
        values.push(decode_value(&mut item?)?);
    }
    Ok(values)
}

/// Union of all frame fields; each frame kind picks the ones it needs.
#[derive(Default)]
struct Fields {
    seq: Option<u64>,
    id: Option<u64>,
    interface: Option<String>,
    method: Option<String>,
    callback_type: Option<String>,
    args: Option<Vec<Value>>,
    path: Option<Vec<String>>,
    value: Option<Value>,
    kind: Option<String>,
    message: Option<String>,
    level: Option<String>,
}

impl Fields {
    fn read(&mut self, map: MapIter) -> Result<()> {
        for entry in map {
            let (key, mut val) = entry?;
            match key {
                "seq" => self.seq = Some(val.uint()?),
                "id" => self.id = Some(val.uint()?),
                "interface" => self.interface = Some(val.str()?.to_string()),
                "method" => self.method = Some(val.str()?.to_string()),
                "callbackType" => self.callback_type = Some(val.str()?.to_string()),
                "args" => self.args = Some(read_values(&mut val)?),
                "path" => {
                    let mut path = Vec::new();
                    for item in val.list()? {
                        path.push(item?.str()?.to_string());
                    }
                    self.path = Some(path);
                }
                "value" => self.value = Some(decode_value(&mut val)?),
                "kind" => self.kind = Some(val.str()?.to_string()),
                "message" => self.message = Some(val.str()?.to_string()),
                "level" => self.level = Some(val.str()?.to_string()),
                // Unknown fields are already bounded by their entry.
                _ => {}
            }
        }
        Ok(())
    }
}
