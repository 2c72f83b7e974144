//! Dynamic values: the arguments and results that cross the bridge.

use crate::Decoder;
use crate::Encoder;
use crate::Error;
use crate::Result;
use crate::Tag;

/// The most lists or maps any part of a `Value` may sit inside.
///
/// A scalar wrapped in 64 lists encodes; wrapped in 65 it does not.
pub const MAX_DEPTH: usize = 64;

/// A serializable value without a schema.
///
/// Maps keep their insertion order so results read back the way the sdk produced them.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Map(Vec<(String, Value)>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer view of `Int` and `UInt` values that fit in an `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::UInt(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Looks up a key of a `Map` value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self { Value::Bool(v) }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self { Value::Int(v as i64) }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self { Value::Int(v) }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self { Value::Int(v as i64) }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self { Value::UInt(v) }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self { Value::Float(v) }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self { Value::String(v.to_string()) }
}

impl From<String> for Value {
    fn from(v: String) -> Self { Value::String(v) }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self { Value::List(v.into_iter().map(Into::into).collect()) }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self { v.map_or(Value::Null, Into::into) }
}

/// Writes a value into the encoder.
///
/// # Errors
/// Returns `Error::DepthExceeded` when some part of the value sits inside more than
/// `MAX_DEPTH` containers.
pub fn encode_value(enc: &mut Encoder, value: &Value) -> Result<()> {
    encode_at(enc, value, 0)
}

fn encode_at(enc: &mut Encoder, value: &Value, depth: usize) -> Result<()> {
    if depth > MAX_DEPTH {
        return Err(Error::DepthExceeded);
    }

    match value {
        Value::Null => enc.null(),
        Value::Bool(b) => enc.bool(*b),
        Value::Int(v) => enc.int(*v),
        Value::UInt(v) => enc.uint(*v),
        Value::Float(v) => enc.float(*v),
        Value::String(s) => enc.str(s),
        Value::Bytes(b) => enc.bytes(b),
        Value::List(items) => {
            enc.list_begin()?;
            for item in items {
                encode_at(enc, item, depth + 1)?;
            }
            enc.list_end()
        }
        Value::Map(entries) => {
            enc.map_begin()?;
            for (key, item) in entries {
                enc.entry_begin(key)?;
                encode_at(enc, item, depth + 1)?;
                enc.entry_end()?;
            }
            enc.map_end()
        }
    }
}

/// Reads one value from the decoder.
pub fn decode_value(dec: &mut Decoder) -> Result<Value> {
    decode_at(dec, 0)
}

fn decode_at(dec: &mut Decoder, depth: usize) -> Result<Value> {
    if depth > MAX_DEPTH {
        return Err(Error::DepthExceeded);
    }

    let value = match dec.peek_tag()? {
        Tag::Null => { dec.null()?; Value::Null }
        Tag::True | Tag::False => Value::Bool(dec.bool()?),
        Tag::Int => Value::Int(dec.int()?),
        Tag::UInt => Value::UInt(dec.uint()?),
        Tag::Float => Value::Float(dec.float()?),
        Tag::String => Value::String(dec.str()?.to_string()),
        Tag::Bytes => Value::Bytes(dec.bytes()?.to_vec()),
        Tag::List => {
            let mut items = Vec::new();
            for item in dec.list()? {
                items.push(decode_at(&mut item?, depth + 1)?);
            }
            Value::List(items)
        }
        Tag::Map => {
            let mut entries = Vec::new();
            for entry in dec.map()? {
                let (key, mut payload) = entry?;
                entries.push((key.to_string(), decode_at(&mut payload, depth + 1)?));
            }
            Value::Map(entries)
        }
        found @ (Tag::Entry | Tag::Ok | Tag::Err) => {
            return Err(Error::UnexpectedTag { expected: Tag::Null, found });
        }
    };
    Ok(value)
}
