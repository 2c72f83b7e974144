//! # Wirepack
//!
//! The byte format spoken on both sides of the sdk bridge.
//!
//! ## Philosophy
//!
//! - **Self-describing**: Every item starts with a one byte `Tag`, so a reader can
//!   skip anything it does not understand.
//! - **Strict writers**: The `Encoder` tracks open containers on an explicit stack and
//!   refuses writes that would produce an ill-formed buffer.
//! - **Borrowing readers**: The `Decoder` is a bounds-checked view over a slice. It never
//!   copies string or blob data.
//!
//! ## Format
//!
//! - **Scalars**: `[Tag: 1b][Data: 0, 8b]`
//! - **Blobs**: `[Tag: 1b][Len: 4b][Data: Len]`
//! - **Containers**: `[Tag: 1b][Len: 4b][Body: Len]`
//!
//! All integers are Little-Endian.

mod value;

#[cfg(test)]
mod tests;

pub use value::Value;
pub use value::decode_value;
pub use value::encode_value;
pub use value::MAX_DEPTH;

/// Wirepack encoding and decoding errors.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Byte does not correspond to a valid `Tag`.
    InvalidTag(u8),
    /// A different tag was found where a specific one was required.
    UnexpectedTag { expected: Tag, found: Tag },
    /// String data is not valid UTF-8.
    InvalidUtf8,
    /// Buffer exhausted while reading.
    UnexpectedEnd,
    /// Blob or container length exceeds `u32::MAX`.
    TooLarge(usize),
    /// Closing a container that is not the innermost open one.
    ScopeMismatch { expected: Scope, actual: Scope },
    /// Closing a container when none is open.
    ScopeUnderflow,
    /// Finishing the buffer while containers are still open.
    ScopeStillOpen,
    /// Writing a second payload into an `Entry`, `Ok` or `Err`.
    TooManyItems(Scope),
    /// Closing an `Entry`, `Ok` or `Err` without its payload.
    MissingPayload(Scope),
    /// Writing anything but an `Entry` directly into a `Map`.
    InvalidMapItem(Tag),
    /// A value inside more than `MAX_DEPTH` lists or maps.
    DepthExceeded,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidTag(b) => write!(f, "invalid tag byte {:#04x}", b),
            Error::UnexpectedTag { expected, found } => {
                write!(f, "expected {:?}, found {:?}", expected, found)
            }
            Error::InvalidUtf8 => write!(f, "string is not valid utf-8"),
            Error::UnexpectedEnd => write!(f, "unexpected end of buffer"),
            Error::TooLarge(len) => write!(f, "length {} does not fit in 32 bits", len),
            Error::ScopeMismatch { expected, actual } => {
                write!(f, "closing {:?} while {:?} is open", expected, actual)
            }
            Error::ScopeUnderflow => write!(f, "no open container to close"),
            Error::ScopeStillOpen => write!(f, "buffer finished with open containers"),
            Error::TooManyItems(s) => write!(f, "{:?} holds exactly one item", s),
            Error::MissingPayload(s) => write!(f, "{:?} closed without its item", s),
            Error::InvalidMapItem(t) => write!(f, "maps only hold entries, got {:?}", t),
            Error::DepthExceeded => write!(f, "value nested deeper than {} levels", MAX_DEPTH),
        }
    }
}

impl std::error::Error for Error {}

/// Specialized `Result` for wirepack operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Identifies the kind of the next encoded item.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Null = 0x01,
    True = 0x02,
    False = 0x03,
    Int = 0x04,
    UInt = 0x05,
    Float = 0x06,

    // Blobs
    String = 0x10,
    Bytes = 0x11,

    // Containers
    List = 0x20,
    Map = 0x21,
    Entry = 0x22,
    Ok = 0x30,
    Err = 0x31,
}

impl Tag {
    /// Returns the tag for a byte, or `None` if the byte is not a tag.
    pub fn from_u8(b: u8) -> Option<Self> {
        let tag = match b {
            0x01 => Tag::Null,
            0x02 => Tag::True,
            0x03 => Tag::False,
            0x04 => Tag::Int,
            0x05 => Tag::UInt,
            0x06 => Tag::Float,
            0x10 => Tag::String,
            0x11 => Tag::Bytes,
            0x20 => Tag::List,
            0x21 => Tag::Map,
            0x22 => Tag::Entry,
            0x30 => Tag::Ok,
            0x31 => Tag::Err,
            _ => return None,
        };
        Some(tag)
    }
}

/// The kind of container currently open on the `Encoder` stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Top level; allows any number of items.
    Root,
    /// Ordered sequence.
    List,
    /// Named items; only `Entry` may be written directly inside.
    Map,
    /// A name followed by exactly one item.
    Entry,
    /// Exactly one item.
    Ok,
    /// Exactly one item.
    Err,
}

impl Scope {
    fn is_single(self) -> bool {
        matches!(self, Scope::Entry | Scope::Ok | Scope::Err)
    }
}

struct Open {
    scope: Scope,
    body_start: usize,
    items: usize,
}

/// A container-aware encoder.
///
/// Length headers of containers are written as placeholders and patched when the
/// container closes.
///
/// # Invariants
///
/// 1. Inside a `Map` only `entry_begin` is accepted.
/// 2. `Entry`, `Ok` and `Err` hold exactly one item.
/// 3. `finish` fails while any container is open.
pub struct Encoder {
    buf: Vec<u8>,
    stack: Vec<Open>,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder {
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(256),
            stack: vec![Open { scope: Scope::Root, body_start: 0, items: 0 }],
        }
    }

    /// Consumes the encoder and returns the bytes.
    pub fn finish(self) -> Result<Vec<u8>> {
        if self.stack.len() > 1 {
            return Err(Error::ScopeStillOpen);
        }
        Ok(self.buf)
    }

    fn top(&mut self) -> &mut Open {
        // The root frame is never popped.
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    fn admit(&mut self, tag: Tag) -> Result<()> {
        let top = self.top();
        match top.scope {
            Scope::Root | Scope::List => Ok(()),
            Scope::Map if tag == Tag::Entry => Ok(()),
            Scope::Map => Err(Error::InvalidMapItem(tag)),
            single if top.items >= 1 => Err(Error::TooManyItems(single)),
            _ => Ok(()),
        }
    }

    fn written(&mut self) {
        self.top().items += 1;
    }

    fn scalar(&mut self, tag: Tag, data: &[u8]) -> Result<()> {
        self.admit(tag)?;
        self.buf.push(tag as u8);
        self.buf.extend_from_slice(data);
        self.written();
        Ok(())
    }

    fn blob(&mut self, tag: Tag, data: &[u8]) -> Result<()> {
        let len = u32::try_from(data.len()).map_err(|_| Error::TooLarge(data.len()))?;
        self.admit(tag)?;
        self.buf.push(tag as u8);
        self.buf.extend_from_slice(&len.to_le_bytes());
        self.buf.extend_from_slice(data);
        self.written();
        Ok(())
    }

    fn open(&mut self, tag: Tag, scope: Scope) -> Result<()> {
        self.admit(tag)?;
        self.buf.push(tag as u8);
        self.buf.extend_from_slice(&[0; 4]);
        let body_start = self.buf.len();
        self.stack.push(Open { scope, body_start, items: 0 });
        Ok(())
    }

    fn close(&mut self, expected: Scope) -> Result<()> {
        if self.stack.len() <= 1 {
            return Err(Error::ScopeUnderflow);
        }
        let top = self.top();
        if top.scope != expected {
            return Err(Error::ScopeMismatch { expected, actual: top.scope });
        }
        if top.scope.is_single() && top.items == 0 {
            return Err(Error::MissingPayload(top.scope));
        }

        let Some(open) = self.stack.pop() else {
            return Err(Error::ScopeUnderflow);
        };
        let body_len = self.buf.len() - open.body_start;
        let len = u32::try_from(body_len).map_err(|_| Error::TooLarge(body_len))?;
        self.buf[open.body_start - 4..open.body_start].copy_from_slice(&len.to_le_bytes());
        self.written();
        Ok(())
    }

    pub fn null(&mut self) -> Result<()> { self.scalar(Tag::Null, &[]) }
    pub fn bool(&mut self, v: bool) -> Result<()> { self.scalar(if v { Tag::True } else { Tag::False }, &[]) }
    pub fn int(&mut self, v: i64) -> Result<()> { self.scalar(Tag::Int, &v.to_le_bytes()) }
    pub fn uint(&mut self, v: u64) -> Result<()> { self.scalar(Tag::UInt, &v.to_le_bytes()) }
    pub fn float(&mut self, v: f64) -> Result<()> { self.scalar(Tag::Float, &v.to_le_bytes()) }
    pub fn str(&mut self, v: &str) -> Result<()> { self.blob(Tag::String, v.as_bytes()) }
    pub fn bytes(&mut self, v: &[u8]) -> Result<()> { self.blob(Tag::Bytes, v) }

    pub fn list_begin(&mut self) -> Result<()> { self.open(Tag::List, Scope::List) }
    pub fn list_end(&mut self) -> Result<()> { self.close(Scope::List) }

    pub fn map_begin(&mut self) -> Result<()> { self.open(Tag::Map, Scope::Map) }
    pub fn map_end(&mut self) -> Result<()> { self.close(Scope::Map) }

    pub fn ok_begin(&mut self) -> Result<()> { self.open(Tag::Ok, Scope::Ok) }
    pub fn ok_end(&mut self) -> Result<()> { self.close(Scope::Ok) }

    pub fn err_begin(&mut self) -> Result<()> { self.open(Tag::Err, Scope::Err) }
    pub fn err_end(&mut self) -> Result<()> { self.close(Scope::Err) }

    /// Opens a named entry. Exactly one item must follow before `entry_end`.
    pub fn entry_begin(&mut self, name: &str) -> Result<()> {
        self.open(Tag::Entry, Scope::Entry)?;
        self.str(name)?;
        // The name is not the payload.
        self.top().items = 0;
        Ok(())
    }
    pub fn entry_end(&mut self) -> Result<()> { self.close(Scope::Entry) }

    /// Writes `name => str` as a complete entry.
    pub fn entry_str(&mut self, name: &str, v: &str) -> Result<()> {
        self.entry_begin(name)?;
        self.str(v)?;
        self.entry_end()
    }

    /// Writes `name => uint` as a complete entry.
    pub fn entry_uint(&mut self, name: &str, v: u64) -> Result<()> {
        self.entry_begin(name)?;
        self.uint(v)?;
        self.entry_end()
    }
}

/// A bounds-checked cursor over encoded bytes.
///
/// Entering a container yields a new `Decoder` restricted to the container body.
#[derive(Debug, Clone)]
pub struct Decoder<'a> {
    buf: &'a [u8],
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    /// Bytes left in this view.
    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    /// Returns the next tag without consuming it.
    pub fn peek_tag(&self) -> Result<Tag> {
        let Some(&b) = self.buf.first() else {
            return Err(Error::UnexpectedEnd);
        };
        Tag::from_u8(b).ok_or(Error::InvalidTag(b))
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.buf.len() {
            return Err(Error::UnexpectedEnd);
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn take_len(&mut self) -> Result<usize> {
        Ok(u32::from_le_bytes(self.take_array()?) as usize)
    }

    fn expect(&mut self, expected: Tag) -> Result<()> {
        let found = self.peek_tag()?;
        if found != expected {
            return Err(Error::UnexpectedTag { expected, found });
        }
        self.take(1)?;
        Ok(())
    }

    fn body(&mut self, tag: Tag) -> Result<Decoder<'a>> {
        self.expect(tag)?;
        let len = self.take_len()?;
        Ok(Decoder::new(self.take(len)?))
    }

    /// Skips the next item including everything nested in it.
    pub fn skip(&mut self) -> Result<()> {
        let tag = self.peek_tag()?;
        self.take(1)?;
        match tag {
            Tag::Null | Tag::True | Tag::False => {}
            Tag::Int | Tag::UInt | Tag::Float => {
                self.take(8)?;
            }
            Tag::String | Tag::Bytes | Tag::List | Tag::Map | Tag::Entry | Tag::Ok | Tag::Err => {
                let len = self.take_len()?;
                self.take(len)?;
            }
        }
        Ok(())
    }

    /// Splits off the next item as its own decoder.
    pub fn item(&mut self) -> Result<Decoder<'a>> {
        let mut probe = self.clone();
        probe.skip()?;
        let len = self.remaining() - probe.remaining();
        Ok(Decoder::new(self.take(len)?))
    }

    pub fn null(&mut self) -> Result<()> { self.expect(Tag::Null) }

    pub fn bool(&mut self) -> Result<bool> {
        match self.peek_tag()? {
            Tag::True => { self.take(1)?; Ok(true) }
            Tag::False => { self.take(1)?; Ok(false) }
            found => Err(Error::UnexpectedTag { expected: Tag::True, found }),
        }
    }

    pub fn int(&mut self) -> Result<i64> { self.expect(Tag::Int)?; Ok(i64::from_le_bytes(self.take_array()?)) }
    pub fn uint(&mut self) -> Result<u64> { self.expect(Tag::UInt)?; Ok(u64::from_le_bytes(self.take_array()?)) }
    pub fn float(&mut self) -> Result<f64> { self.expect(Tag::Float)?; Ok(f64::from_le_bytes(self.take_array()?)) }

    pub fn str(&mut self) -> Result<&'a str> {
        self.expect(Tag::String)?;
        let len = self.take_len()?;
        std::str::from_utf8(self.take(len)?).map_err(|_| Error::InvalidUtf8)
    }

    pub fn bytes(&mut self) -> Result<&'a [u8]> {
        self.expect(Tag::Bytes)?;
        let len = self.take_len()?;
        self.take(len)
    }

    /// Enters a list; the iterator yields one decoder per item.
    pub fn list(&mut self) -> Result<ListIter<'a>> {
        Ok(ListIter { dec: self.body(Tag::List)? })
    }

    /// Enters a map; the iterator yields `(name, payload)` per entry.
    pub fn map(&mut self) -> Result<MapIter<'a>> {
        Ok(MapIter { dec: self.body(Tag::Map)? })
    }

    /// Reads a named entry and returns its name and payload.
    pub fn entry(&mut self) -> Result<(&'a str, Decoder<'a>)> {
        let mut inner = self.body(Tag::Entry)?;
        let name = inner.str()?;
        Ok((name, inner))
    }

    /// Reads an `Ok` or `Err` container.
    pub fn result(&mut self) -> Result<std::result::Result<Decoder<'a>, Decoder<'a>>> {
        match self.peek_tag()? {
            Tag::Ok => Ok(Ok(self.body(Tag::Ok)?)),
            Tag::Err => Ok(Err(self.body(Tag::Err)?)),
            found => Err(Error::UnexpectedTag { expected: Tag::Ok, found }),
        }
    }
}

/// Items of a list.
#[derive(Debug)]
pub struct ListIter<'a> {
    dec: Decoder<'a>,
}

impl<'a> Iterator for ListIter<'a> {
    type Item = Result<Decoder<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.dec.remaining() == 0 {
            return None;
        }
        Some(self.dec.item())
    }
}

/// Entries of a map.
#[derive(Debug)]
pub struct MapIter<'a> {
    dec: Decoder<'a>,
}

impl<'a> Iterator for MapIter<'a> {
    type Item = Result<(&'a str, Decoder<'a>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.dec.remaining() == 0 {
            return None;
        }
        Some(self.dec.entry())
    }
}
