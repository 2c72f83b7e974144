//! # Error Definitions
//!
//! `Error` is a local failure to read or write a frame. `Fault` is the remote side
//! telling us that a request failed, and travels inside a `Reply`.

use wirepack::Error as PackError;

/// Failures while encoding or decoding frames.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The underlying wirepack buffer was malformed.
    Pack(PackError),
    /// The frame name is not part of the protocol.
    UnknownFrame(String),
    /// A required field was absent.
    MissingField(&'static str),
    /// A fault kind or log level name was not recognised.
    UnknownVariant(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pack(e) => write!(f, "malformed frame: {}", e),
            Self::UnknownFrame(name) => write!(f, "unknown frame '{}'", name),
            Self::MissingField(field) => write!(f, "frame is missing '{}'", field),
            Self::UnknownVariant(name) => write!(f, "unknown variant '{}'", name),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Pack(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PackError> for Error {
    fn from(e: PackError) -> Self { Self::Pack(e) }
}

/// A specialized Result type for frame operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classification of a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// The sdk client never initialized.
    NotInitialized,
    /// The interface name is not exposed.
    UnknownInterface,
    /// The method is not a member of the interface.
    NoSuchMember,
    /// The callback type name is not in the callback table.
    UnknownCallbackType,
    /// The sdk method itself failed.
    Invocation,
    /// The host does not offer this operation.
    UnknownOperation,
    /// The request frame could not be understood.
    Protocol,
}

impl FaultKind {
    pub fn as_tag(&self) -> &'static str {
        match self {
            Self::NotInitialized => "NotInitialized",
            Self::UnknownInterface => "UnknownInterface",
            Self::NoSuchMember => "NoSuchMember",
            Self::UnknownCallbackType => "UnknownCallbackType",
            Self::Invocation => "Invocation",
            Self::UnknownOperation => "UnknownOperation",
            Self::Protocol => "Protocol",
        }
    }

    pub fn from_tag(tag: &str) -> Result<Self> {
        let kind = match tag {
            "NotInitialized" => Self::NotInitialized,
            "UnknownInterface" => Self::UnknownInterface,
            "NoSuchMember" => Self::NoSuchMember,
            "UnknownCallbackType" => Self::UnknownCallbackType,
            "Invocation" => Self::Invocation,
            "UnknownOperation" => Self::UnknownOperation,
            "Protocol" => Self::Protocol,
            other => return Err(Error::UnknownVariant(other.to_string())),
        };
        Ok(kind)
    }
}

/// The error side of a `Reply`.
///
/// `message` is plain human text. It never carries framing added by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub kind: FaultKind,
    pub message: String,
}

impl Fault {
    pub fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }
}

impl std::fmt::Display for Fault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for Fault {}
