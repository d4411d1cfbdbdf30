// ABOUTME: Error types for BSON encoding and decoding.
// ABOUTME: Each variant maps onto one of the coarse ErrorKind categories callers match on.

use std::cell::RefCell;
use std::fmt;

/// The result type for BSON operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The buffer is smaller than a statically or dynamically required size.
    ShortInput,
    /// The buffer is large enough but violates a format invariant.
    InvalidInput,
    /// A value (host or wire) has no supported mapping.
    UnsupportedType,
    /// A document exceeds a size or nesting limit.
    SizeExceeded,
    /// The decode target cannot receive the encoded shape.
    Target,
    /// Writing the encoded bytes failed.
    Io,
}

/// Errors that can occur during BSON encoding or decoding.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// Not enough bytes to decode `what`.
    #[error(
        "short input decoding {what} at offset {offset}: \
         expected at least {expected} bytes, got {actual}"
    )]
    ShortInput {
        what: &'static str,
        offset: usize,
        expected: usize,
        actual: usize,
    },

    /// Enough bytes, but the content is malformed.
    #[error("invalid input decoding {what} at offset {offset}: {reason}")]
    InvalidInput {
        what: &'static str,
        offset: usize,
        reason: String,
    },

    /// Type tag that is not part of the BSON specification.
    #[error("unknown element type 0x{tag:02x} at offset {offset}")]
    UnknownElementType { tag: u8, offset: usize },

    /// Type tag from the BSON specification that this codec does not handle
    /// (undefined, DBPointer, JavaScript, symbol, decimal128, min/max key).
    #[error("unsupported element type 0x{tag:02x} ({name}) at offset {offset}")]
    UnsupportedElementType {
        tag: u8,
        name: &'static str,
        offset: usize,
    },

    /// A host value with no wire mapping.
    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    /// Encoded document larger than the allowed maximum.
    #[error("document size {size} exceeds maximum of {max} bytes")]
    SizeExceeded { size: usize, max: usize },

    /// Documents nested deeper than the configured maximum.
    #[error("maximum nesting depth of {0} exceeded")]
    MaxDepthExceeded(usize),

    /// Unconsumed bytes after the top-level document.
    #[error("{0} trailing bytes after document")]
    TrailingBytes(usize),

    /// The decode target cannot hold a document.
    #[error("invalid decode target: {0}")]
    InvalidTarget(String),

    /// The destination writer failed.
    #[error("I/O error: {0}")]
    Io(String),

    /// Custom error message (for serde integration).
    #[error("{0}")]
    Custom(String),
}

thread_local! {
    /// An error raised inside a model type's serde impl, waiting to be
    /// reclaimed when serde converts its message back into an [`Error`].
    static CARRIED: RefCell<Option<Error>> = const { RefCell::new(None) };
}

impl Error {
    pub(crate) fn short(what: &'static str, expected: usize, actual: usize) -> Self {
        Error::ShortInput {
            what,
            offset: 0,
            expected,
            actual,
        }
    }

    pub(crate) fn invalid(what: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidInput {
            what,
            offset: 0,
            reason: reason.into(),
        }
    }

    /// Shift the offset carried by this error by `base` bytes.
    ///
    /// Scalar decoders report offsets relative to the slice they were given;
    /// the reader rebases them onto the enclosing buffer.
    #[must_use]
    pub(crate) fn offset_by(self, base: usize) -> Self {
        match self {
            Error::ShortInput {
                what,
                offset,
                expected,
                actual,
            } => Error::ShortInput {
                what,
                offset: offset + base,
                expected,
                actual,
            },
            Error::InvalidInput {
                what,
                offset,
                reason,
            } => Error::InvalidInput {
                what,
                offset: offset + base,
                reason,
            },
            Error::UnknownElementType { tag, offset } => Error::UnknownElementType {
                tag,
                offset: offset + base,
            },
            Error::UnsupportedElementType { tag, name, offset } => {
                Error::UnsupportedElementType {
                    tag,
                    name,
                    offset: offset + base,
                }
            }
            other => other,
        }
    }

    /// Returns the coarse category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ShortInput { .. } => ErrorKind::ShortInput,
            Error::InvalidInput { .. }
            | Error::UnknownElementType { .. }
            | Error::TrailingBytes(_) => ErrorKind::InvalidInput,
            Error::UnsupportedElementType { .. } | Error::UnsupportedType(_) => {
                ErrorKind::UnsupportedType
            }
            Error::SizeExceeded { .. } | Error::MaxDepthExceeded(_) => ErrorKind::SizeExceeded,
            Error::InvalidTarget(_) | Error::Custom(_) => ErrorKind::Target,
            Error::Io(_) => ErrorKind::Io,
        }
    }

    /// Returns a stable snake_case name for this error.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Error::ShortInput { .. } => "short_input",
            Error::InvalidInput { .. } => "invalid_input",
            Error::UnknownElementType { .. } => "unknown_element_type",
            Error::UnsupportedElementType { .. } => "unsupported_element_type",
            Error::UnsupportedType(_) => "unsupported_type",
            Error::SizeExceeded { .. } => "size_exceeded",
            Error::MaxDepthExceeded(_) => "max_depth_exceeded",
            Error::TrailingBytes(_) => "trailing_bytes",
            Error::InvalidTarget(_) => "invalid_target",
            Error::Io(_) => "io_error",
            Error::Custom(_) => "custom",
        }
    }

    /// Returns true if this error was caused by truncated input.
    #[must_use]
    pub fn is_short_input(&self) -> bool {
        self.kind() == ErrorKind::ShortInput
    }
}

impl Error {
    /// Hand this error to a serde error type through its message.
    ///
    /// Serde only lets errors cross a generic `Serialize`/`Deserialize` impl
    /// as text. The error is parked in a thread-local slot, and when the far
    /// side is this crate's own [`Error`], `custom` gives it back unchanged.
    pub(crate) fn carry(self) -> String {
        let msg = self.to_string();
        CARRIED.with(|slot| *slot.borrow_mut() = Some(self));
        msg
    }

    fn reclaim(msg: String) -> Self {
        CARRIED.with(|slot| match slot.borrow_mut().take() {
            Some(err) if err.to_string() == msg => err,
            _ => Error::Custom(msg),
        })
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::reclaim(msg.to_string())
    }
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::reclaim(msg.to_string())
    }
}
