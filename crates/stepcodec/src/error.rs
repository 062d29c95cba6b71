//! Error types for stepcodec streams, serializers and protocols.

use std::io;

use thiserror::Error;

/// Broad classification of an [`Error`].
///
/// None of these are retried internally. Callers that want partial reads
/// opt in through [`crate::BinaryOptions::skip_completed_check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad magic bytes, version or schema, or malformed encoded data.
    Format,
    /// A protocol step was called out of order or a stream was left unconsumed.
    Protocol,
    /// A value does not fit the schema (range, length, shape).
    Value,
    /// The source ran out of bytes.
    Eof,
    /// The underlying sink or source failed.
    Io,
}

impl ErrorKind {
    /// Returns a short lowercase name for the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Format => "format",
            ErrorKind::Protocol => "protocol",
            ErrorKind::Value => "value",
            ErrorKind::Eof => "eof",
            ErrorKind::Io => "io",
        }
    }
}

/// Errors raised while encoding, decoding or sequencing a protocol.
#[derive(Debug, Error)]
pub enum Error {
    // === Format ===
    #[error("data in the stream is not in the expected format: invalid magic bytes {found:?}")]
    InvalidMagic { found: Vec<u8> },

    #[error("data in the stream is not in the expected format: unsupported version {version}")]
    UnsupportedVersion { version: u32 },

    #[error("the schema of the data to be read is not compatible with protocol {protocol}")]
    SchemaMismatch { protocol: String },

    #[error("varint exceeds maximum length (10 bytes)")]
    VarintTooLong,

    #[error("varint overflow (value exceeds u64)")]
    VarintOverflow,

    #[error("invalid UTF-8 in {context}")]
    InvalidUtf8 { context: &'static str },

    #[error("invalid {context} byte: {value}")]
    InvalidByte { context: &'static str, value: u8 },

    #[error("invalid union case index {index} for {union} ({cases} cases)")]
    InvalidUnionCase {
        union: &'static str,
        index: u8,
        cases: usize,
    },

    #[error("binary index not found in stream")]
    IndexNotFound,

    #[error("binary index is corrupt: {context}")]
    CorruptIndex { context: &'static str },

    #[error("step '{step}' not found in binary index")]
    StepNotIndexed { step: String },

    // === Protocol ===
    #[error("{0}")]
    Protocol(String),

    // === Value ===
    #[error("value {value} is out of range for {type_name}")]
    OutOfRange { type_name: &'static str, value: i128 },

    #[error("expected {expected} elements, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("array shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("array rank mismatch: expected {expected} dimensions, got {actual}")]
    RankMismatch { expected: usize, actual: usize },

    #[error("array of shape {shape:?} holds {expected} elements, got {actual}")]
    ElementCountMismatch {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },

    #[error("invalid {type_name} value: {value}")]
    InvalidValue { type_name: &'static str, value: i128 },

    #[error("stream '{step}' has {count} items, cannot start at index {index}")]
    StreamIndexOutOfRange {
        step: String,
        index: u64,
        count: u64,
    },

    // === Eof / Io ===
    #[error("unexpected end of stream while reading {context}")]
    Eof { context: &'static str },

    #[error("I/O error: {0}")]
    Io(io::Error),
}

impl Error {
    /// Returns the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidMagic { .. }
            | Error::UnsupportedVersion { .. }
            | Error::SchemaMismatch { .. }
            | Error::VarintTooLong
            | Error::VarintOverflow
            | Error::InvalidUtf8 { .. }
            | Error::InvalidByte { .. }
            | Error::InvalidUnionCase { .. }
            | Error::IndexNotFound
            | Error::CorruptIndex { .. }
            | Error::StepNotIndexed { .. } => ErrorKind::Format,
            Error::Protocol(_) => ErrorKind::Protocol,
            Error::OutOfRange { .. }
            | Error::LengthMismatch { .. }
            | Error::ShapeMismatch { .. }
            | Error::RankMismatch { .. }
            | Error::ElementCountMismatch { .. }
            | Error::InvalidValue { .. }
            | Error::StreamIndexOutOfRange { .. } => ErrorKind::Value,
            Error::Eof { .. } => ErrorKind::Eof,
            Error::Io(_) => ErrorKind::Io,
        }
    }

    /// Builds a protocol error from a message.
    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Error::Protocol(message.into())
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Error::Eof { context: "bytes" }
        } else {
            Error::Io(err)
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_eof_maps_to_eof_kind() {
        let err: Error = io::Error::new(io::ErrorKind::UnexpectedEof, "short").into();
        assert_eq!(err.kind(), ErrorKind::Eof);

        let err: Error = io::Error::new(io::ErrorKind::PermissionDenied, "nope").into();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_messages_name_expected_and_actual() {
        let err = Error::ShapeMismatch {
            expected: vec![2, 3],
            actual: vec![3, 2],
        };
        assert_eq!(
            err.to_string(),
            "array shape mismatch: expected [2, 3], got [3, 2]"
        );
        assert_eq!(err.kind(), ErrorKind::Value);
        assert_eq!(ErrorKind::Protocol.as_str(), "protocol");
    }
}
