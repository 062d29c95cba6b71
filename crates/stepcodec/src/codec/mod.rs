//! Binary stream primitives.
//!
//! - [`coded_stream`]: buffered varint/fixed-width output and input streams
//! - [`header`]: the magic/version/schema preamble of every stream

pub mod coded_stream;
pub mod header;

pub use coded_stream::{CodedInputStream, CodedOutputStream, zigzag_decode, zigzag_encode};
pub use header::{read_header, verify_schema, write_header};
