//! Wire-format constants and decoding limits.

/// Magic bytes at the start of every binary stream.
pub const MAGIC_BYTES: [u8; 5] = *b"STEPC";

/// Binary format version written after the magic bytes.
pub const FORMAT_VERSION: u32 = 1;

/// Magic bytes at the start of the index trailer.
pub const INDEX_MAGIC: [u8; 8] = *b"STEPCIDX";

/// Magic bytes closing the index footer.
pub const INDEX_FOOTER_MAGIC: [u8; 8] = *b"STEPCEND";

/// Index trailer format version.
pub const INDEX_VERSION: u32 = 1;

/// Footer size: u64 trailer offset + footer magic.
pub const INDEX_FOOTER_LEN: u64 = 16;

/// Length of the truncated SHA-256 digest stored with the index.
pub const INDEX_DIGEST_LEN: usize = 8;

/// Default size of the coded stream buffers.
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Maximum bytes for a 64-bit varint.
pub const MAX_VARINT_BYTES: usize = 10;

/// Nanoseconds in one day; `Time` values must be below this.
pub const NANOS_PER_DAY: i64 = 86_400 * 1_000_000_000;

/// Upper bound on bytes reserved ahead of decoding a length-prefixed
/// collection. Larger collections grow as their elements arrive.
pub const MAX_PREALLOC_BYTES: usize = 1 << 20;
