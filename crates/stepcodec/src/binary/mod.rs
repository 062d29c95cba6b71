//! Binary protocol writers and readers.
//!
//! [`BinaryWriter`] and [`BinaryReader`] stream steps in order.
//! [`IndexedBinaryWriter`] additionally records where every step and stream
//! block starts and appends that [`Index`] as a trailer, which
//! [`IndexedBinaryReader`] uses for random access.

pub mod index;
pub mod indexed;
pub mod reader;
pub mod writer;

pub use index::{Index, StreamBlock};
pub use indexed::{IndexedBinaryReader, IndexedBinaryWriter, IndexedStreamItems};
pub use reader::{BinaryReader, StreamItems};
pub use writer::BinaryWriter;

use crate::limits::DEFAULT_BUFFER_SIZE;

/// Options shared by binary writers and readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinaryOptions {
    /// Size of the coded stream buffer in bytes.
    pub buffer_size: usize,

    /// Allow a reader to close before every step was read.
    ///
    /// Partial reads leave the remaining data untouched; without this flag
    /// closing early is a protocol error.
    pub skip_completed_check: bool,

    /// Reject streams whose header schema differs from the protocol's.
    pub verify_schema: bool,
}

impl Default for BinaryOptions {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            skip_completed_check: false,
            verify_schema: true,
        }
    }
}

impl BinaryOptions {
    /// Creates default options.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_skip_completed_check(mut self, skip: bool) -> Self {
        self.skip_completed_check = skip;
        self
    }

    pub fn with_verify_schema(mut self, verify: bool) -> Self {
        self.verify_schema = verify;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_defaults() {
        let options = BinaryOptions::new();
        assert_eq!(options.buffer_size, 64 * 1024);
        assert!(!options.skip_completed_check);
        assert!(options.verify_schema);

        let options = options.with_buffer_size(32).with_skip_completed_check(true);
        assert_eq!(options.buffer_size, 32);
        assert!(options.skip_completed_check);
    }
}
