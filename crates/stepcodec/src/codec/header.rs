//! Stream header: magic bytes, format version and schema string.
//!
//! ```text
//! "STEPC" | u32 LE version | varint length | schema UTF-8
//! ```

use std::io::{Read, Write};

use tracing::debug;

use super::{CodedInputStream, CodedOutputStream};
use crate::error::{Error, Result};
use crate::limits::{FORMAT_VERSION, MAGIC_BYTES};

/// Writes the header for a protocol with the given schema.
pub fn write_header<W: Write>(stream: &mut CodedOutputStream<W>, schema: &str) -> Result<()> {
    stream.write_bytes(&MAGIC_BYTES)?;
    stream.write_fixed_u32(FORMAT_VERSION)?;
    stream.write_string(schema)?;
    debug!(schema_len = schema.len(), "wrote header");
    Ok(())
}

/// Reads and validates the magic bytes and version, returning the schema.
pub fn read_header<R: Read>(stream: &mut CodedInputStream<R>) -> Result<String> {
    let mut magic = [0u8; MAGIC_BYTES.len()];
    stream.read_into(&mut magic, "magic")?;
    if magic != MAGIC_BYTES {
        return Err(Error::InvalidMagic {
            found: magic.to_vec(),
        });
    }

    let version = stream.read_fixed_u32("version")?;
    if version != FORMAT_VERSION {
        return Err(Error::UnsupportedVersion { version });
    }

    let schema = stream.read_string("schema")?;
    debug!(version, schema_len = schema.len(), "read header");
    Ok(schema)
}

/// Checks a schema read from a header against the one a protocol expects.
pub fn verify_schema(found: &str, expected: &str, protocol: &str) -> Result<()> {
    if found != expected {
        return Err(Error::SchemaMismatch {
            protocol: protocol.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn header_bytes(schema: &str) -> Vec<u8> {
        let mut out = CodedOutputStream::new(Vec::new());
        write_header(&mut out, schema).unwrap();
        out.into_inner().unwrap()
    }

    #[test]
    fn test_header_layout() {
        let bytes = header_bytes("{}");
        assert_eq!(&bytes[..5], b"STEPC");
        assert_eq!(&bytes[5..9], &[1, 0, 0, 0]);
        assert_eq!(&bytes[9..], &[2, b'{', b'}']);

        let mut input = CodedInputStream::new(&bytes[..]);
        assert_eq!(read_header(&mut input).unwrap(), "{}");
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = header_bytes("{}");
        bytes[0] = b'X';
        let err = read_header(&mut CodedInputStream::new(&bytes[..])).unwrap_err();
        assert!(matches!(err, Error::InvalidMagic { .. }));
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn test_bad_version() {
        let mut bytes = header_bytes("{}");
        bytes[5] = 9;
        let err = read_header(&mut CodedInputStream::new(&bytes[..])).unwrap_err();
        assert!(matches!(err, Error::UnsupportedVersion { version: 9 }));
    }

    #[test]
    fn test_truncated_header() {
        let err = read_header(&mut CodedInputStream::new(&b"STE"[..])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Eof);
    }

    #[test]
    fn test_garbage_schema_length() {
        let mut bytes = b"STEPC".to_vec();
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x1F, b'x']);
        let err = read_header(&mut CodedInputStream::new(&bytes[..])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Eof);
    }

    #[test]
    fn test_schema_mismatch() {
        assert!(verify_schema("a", "a", "P").is_ok());
        let err = verify_schema("a", "b", "P").unwrap_err();
        assert_eq!(
            err.to_string(),
            "the schema of the data to be read is not compatible with protocol P"
        );
    }
}
