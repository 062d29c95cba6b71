//! stepcodec: schema-driven binary codec with protocol step sequencing.
//!
//! A protocol is an ordered list of named steps. Each step carries either a
//! single value or a stream of values, and is encoded with a [`Serializer`]
//! composed from primitive, container, record and union serializers.
//! Writers and readers enforce the step order; the indexed variants record
//! step and stream-block offsets so a reader can jump straight to any step
//! or stream item.
//!
//! # Quick Start
//!
//! ```rust
//! use std::io::Cursor;
//!
//! use stepcodec::serializer::{Int64Serializer, StringSerializer};
//! use stepcodec::{BinaryReader, BinaryWriter, ProtocolDescriptor, StepDescriptor, StepWriter};
//!
//! static STEPS: [StepDescriptor; 2] = [StepDescriptor::scalar("title"), StepDescriptor::stream("values")];
//! static PROTOCOL: ProtocolDescriptor = ProtocolDescriptor {
//!     name: "Series",
//!     schema: r#"{"protocol":{"name":"Series"}}"#,
//!     steps: &STEPS,
//! };
//!
//! let mut writer = BinaryWriter::new(Vec::new(), &PROTOCOL).unwrap();
//! writer.write_step(0, &StringSerializer, &"squares".to_string()).unwrap();
//! writer.write_stream(1, &Int64Serializer, (0..5i64).map(|i| i * i)).unwrap();
//! let bytes = writer.close().unwrap();
//!
//! let mut reader = BinaryReader::new(Cursor::new(bytes), &PROTOCOL).unwrap();
//! assert_eq!(reader.read_step(0, &StringSerializer).unwrap(), "squares");
//! let values: Vec<i64> = reader
//!     .read_stream(1, Int64Serializer)
//!     .unwrap()
//!     .collect::<stepcodec::Result<_>>()
//!     .unwrap();
//! assert_eq!(values, vec![0, 1, 4, 9, 16]);
//! reader.close().unwrap();
//! ```
//!
//! # Modules
//!
//! - [`codec`]: buffered coded streams and the stream header
//! - [`serializer`]: the [`Serializer`] trait and its implementations
//! - [`model`]: value types (NDArray, temporal types, complex numbers)
//! - [`protocol`]: step descriptors and the ordering state machine
//! - [`binary`]: plain and indexed protocol writers and readers
//! - [`util`]: RFC 3339 parsing and formatting
//! - [`error`]: error types
//! - [`limits`]: wire constants and decoding limits
//!
//! # Wire Format
//!
//! Every stream starts with `STEPC` magic, a u32 version and the schema
//! string. Integers are varints (zigzag for signed types). Stream items are
//! each preceded by a `1` byte and the stream ends with a `0` byte. Indexed
//! streams append a checksummed index trailer after the last step.
//!
//! # Security
//!
//! Decoding untrusted input never over-allocates: preallocation is capped by
//! [`limits::MAX_PREALLOC_BYTES`] and varints longer than ten bytes are
//! rejected.

pub mod binary;
pub mod codec;
pub mod error;
pub mod limits;
pub mod model;
pub mod protocol;
pub mod serializer;
pub mod util;

// Re-export commonly used types at crate root
pub use binary::{BinaryOptions, BinaryReader, BinaryWriter, Index, IndexedBinaryReader, IndexedBinaryWriter};
pub use error::{Error, ErrorKind, Result};
pub use model::{Complex32, Complex64, Date, DateTime, NDArray, Time};
pub use protocol::{ProtocolDescriptor, ProtocolState, StepDescriptor, StepKind, StepWriter};
pub use serializer::{Recursive, Serializer};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
