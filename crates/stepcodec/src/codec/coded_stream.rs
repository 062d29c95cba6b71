//! Buffered coded streams.
//!
//! Unsigned integers use base-128 "varint" encoding; signed integers are
//! first mapped to unsigned with zigzag encoding. Fixed-width integers are
//! written little-endian.

use std::borrow::Cow;
use std::io::{Read, Seek, SeekFrom, Write};

use crate::error::{Error, Result};
use crate::limits::{DEFAULT_BUFFER_SIZE, MAX_PREALLOC_BYTES, MAX_VARINT_BYTES};

// =============================================================================
// ENCODING
// =============================================================================

/// A buffered output stream over any [`Write`] sink.
#[derive(Debug)]
pub struct CodedOutputStream<W: Write> {
    inner: W,
    buf: Vec<u8>,
    capacity: usize,
    /// Bytes already handed to `inner`.
    flushed: u64,
}

impl<W: Write> CodedOutputStream<W> {
    /// Creates a stream with the default 64 KiB buffer.
    pub fn new(inner: W) -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE, inner)
    }

    /// Creates a stream with a buffer of `capacity` bytes.
    pub fn with_capacity(capacity: usize, inner: W) -> Self {
        let capacity = capacity.max(MAX_VARINT_BYTES);
        Self {
            inner,
            buf: Vec::with_capacity(capacity),
            capacity,
            flushed: 0,
        }
    }

    /// Returns the absolute number of bytes written so far, buffered or not.
    pub fn pos(&self) -> u64 {
        self.flushed + self.buf.len() as u64
    }

    /// Writes a single byte.
    #[inline]
    pub fn write_byte(&mut self, byte: u8) -> Result<()> {
        if self.buf.len() == self.capacity {
            self.flush_buffer()?;
        }
        self.buf.push(byte);
        Ok(())
    }

    /// Writes raw bytes.
    ///
    /// Payloads that do not fit in the remaining buffer space go straight to
    /// the sink after the buffer is flushed.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        if self.buf.len() + data.len() <= self.capacity {
            self.buf.extend_from_slice(data);
            return Ok(());
        }
        self.flush_buffer()?;
        if data.len() >= self.capacity {
            self.inner.write_all(data)?;
            self.flushed += data.len() as u64;
        } else {
            self.buf.extend_from_slice(data);
        }
        Ok(())
    }

    /// Writes an unsigned varint (LEB128).
    #[inline]
    pub fn write_unsigned_varint(&mut self, mut value: u64) -> Result<()> {
        let mut buf = [0u8; MAX_VARINT_BYTES];
        let mut len = 0;
        loop {
            let mut byte = (value & 0x7F) as u8;
            value >>= 7;
            if value != 0 {
                byte |= 0x80;
            }
            buf[len] = byte;
            len += 1;
            if value == 0 {
                break;
            }
        }
        self.write_bytes(&buf[..len])
    }

    /// Writes a signed varint (zigzag encoded).
    #[inline]
    pub fn write_signed_varint(&mut self, value: i64) -> Result<()> {
        self.write_unsigned_varint(zigzag_encode(value))
    }

    /// Writes a little-endian u32.
    pub fn write_fixed_u32(&mut self, value: u32) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Writes a little-endian u64.
    pub fn write_fixed_u64(&mut self, value: u64) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Writes a length-prefixed UTF-8 string.
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        self.write_unsigned_varint(value.len() as u64)?;
        self.write_bytes(value.as_bytes())
    }

    /// Flushes the buffer and the underlying sink.
    pub fn flush(&mut self) -> Result<()> {
        self.flush_buffer()?;
        self.inner.flush()?;
        Ok(())
    }

    /// Flushes everything and returns the underlying sink.
    pub fn into_inner(mut self) -> Result<W> {
        self.flush()?;
        Ok(self.inner)
    }

    fn flush_buffer(&mut self) -> Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        self.inner.write_all(&self.buf)?;
        self.flushed += self.buf.len() as u64;
        self.buf.clear();
        Ok(())
    }
}

// =============================================================================
// DECODING
// =============================================================================

/// A buffered input stream reading data written by a [`CodedOutputStream`].
#[derive(Debug)]
pub struct CodedInputStream<R: Read> {
    inner: R,
    buf: Box<[u8]>,
    /// Read cursor within `buf`.
    start: usize,
    /// End of valid data within `buf`.
    end: usize,
    /// Absolute offset of `buf[0]` in the source.
    buf_offset: u64,
}

impl<R: Read> CodedInputStream<R> {
    /// Creates a stream with the default 64 KiB buffer.
    pub fn new(inner: R) -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE, inner)
    }

    /// Creates a stream with a buffer of `capacity` bytes.
    pub fn with_capacity(capacity: usize, inner: R) -> Self {
        let capacity = capacity.max(MAX_VARINT_BYTES);
        Self {
            inner,
            buf: vec![0u8; capacity].into_boxed_slice(),
            start: 0,
            end: 0,
            buf_offset: 0,
        }
    }

    /// Returns the absolute position of the next byte to be read.
    pub fn pos(&self) -> u64 {
        self.buf_offset + self.start as u64
    }

    /// Returns the underlying source.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Reads a single byte.
    #[inline]
    pub fn read_byte(&mut self, context: &'static str) -> Result<u8> {
        if self.start == self.end {
            self.fill(context)?;
        }
        let byte = self.buf[self.start];
        self.start += 1;
        Ok(byte)
    }

    /// Reads an unsigned varint (LEB128).
    pub fn read_unsigned_varint(&mut self, context: &'static str) -> Result<u64> {
        let mut result: u64 = 0;
        let mut shift = 0;

        for _ in 0..MAX_VARINT_BYTES {
            let byte = self.read_byte(context)?;
            let value = (byte & 0x7F) as u64;

            if shift == 63 && value > 1 {
                return Err(Error::VarintOverflow);
            }

            result |= value << shift;

            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
        }

        Err(Error::VarintTooLong)
    }

    /// Reads a signed varint (zigzag encoded).
    pub fn read_signed_varint(&mut self, context: &'static str) -> Result<i64> {
        let unsigned = self.read_unsigned_varint(context)?;
        Ok(zigzag_decode(unsigned))
    }

    /// Reads a little-endian u32.
    pub fn read_fixed_u32(&mut self, context: &'static str) -> Result<u32> {
        let mut bytes = [0u8; 4];
        self.read_into(&mut bytes, context)?;
        Ok(u32::from_le_bytes(bytes))
    }

    /// Reads a little-endian u64.
    pub fn read_fixed_u64(&mut self, context: &'static str) -> Result<u64> {
        let mut bytes = [0u8; 8];
        self.read_into(&mut bytes, context)?;
        Ok(u64::from_le_bytes(bytes))
    }

    /// Reads a length-prefixed UTF-8 string.
    pub fn read_string(&mut self, context: &'static str) -> Result<String> {
        let len = self.read_unsigned_varint(context)? as usize;
        let bytes = self.read_bytearray(len, context)?;
        String::from_utf8(bytes).map_err(|_| Error::InvalidUtf8 { context })
    }

    /// Fills `dst` completely, spanning buffer refills.
    pub fn read_into(&mut self, dst: &mut [u8], context: &'static str) -> Result<()> {
        let mut filled = 0;
        while filled < dst.len() {
            if self.start == self.end {
                let remaining = dst.len() - filled;
                if remaining >= self.buf.len() {
                    // Bypass the buffer for large payloads.
                    self.buf_offset += self.end as u64;
                    self.start = 0;
                    self.end = 0;
                    read_fully(&mut self.inner, &mut dst[filled..], context)?;
                    self.buf_offset += remaining as u64;
                    return Ok(());
                }
                self.fill(context)?;
            }
            let n = (self.end - self.start).min(dst.len() - filled);
            dst[filled..filled + n].copy_from_slice(&self.buf[self.start..self.start + n]);
            self.start += n;
            filled += n;
        }
        Ok(())
    }

    /// Reads exactly `n` bytes into a new vector.
    ///
    /// `n` usually comes from the input, so the vector grows in bounded
    /// chunks and a short source fails with [`Error::Eof`] before much is
    /// allocated.
    pub fn read_bytearray(&mut self, n: usize, context: &'static str) -> Result<Vec<u8>> {
        let chunk = n.min(MAX_PREALLOC_BYTES).max(1);
        let mut out = Vec::with_capacity(chunk.min(n));
        while out.len() < n {
            let start = out.len();
            let end = start + chunk.min(n - start);
            out.resize(end, 0);
            self.read_into(&mut out[start..end], context)?;
        }
        Ok(out)
    }

    /// Reads exactly `n` bytes, borrowing from the buffer when they fit in it.
    pub fn read_view(&mut self, n: usize, context: &'static str) -> Result<Cow<'_, [u8]>> {
        if n > self.buf.len() {
            return self.read_bytearray(n, context).map(Cow::Owned);
        }
        if self.end - self.start < n {
            self.compact();
            while self.end < n {
                let read = read_some(&mut self.inner, &mut self.buf[self.end..])?;
                if read == 0 {
                    return Err(Error::Eof { context });
                }
                self.end += read;
            }
        }
        let view = &self.buf[self.start..self.start + n];
        self.start += n;
        Ok(Cow::Borrowed(view))
    }

    /// Refills an exhausted buffer.
    fn fill(&mut self, context: &'static str) -> Result<()> {
        debug_assert_eq!(self.start, self.end);
        self.buf_offset += self.end as u64;
        self.start = 0;
        self.end = 0;
        let read = read_some(&mut self.inner, &mut self.buf)?;
        if read == 0 {
            return Err(Error::Eof { context });
        }
        self.end = read;
        Ok(())
    }

    /// Moves unconsumed bytes to the front of the buffer.
    fn compact(&mut self) {
        if self.start == 0 {
            return;
        }
        self.buf.copy_within(self.start..self.end, 0);
        self.buf_offset += self.start as u64;
        self.end -= self.start;
        self.start = 0;
    }
}

impl<R: Read + Seek> CodedInputStream<R> {
    /// Moves the read position to the absolute `offset`.
    ///
    /// Offsets inside the buffered window are served without touching the
    /// source.
    pub fn seek(&mut self, offset: u64) -> Result<()> {
        let window_end = self.buf_offset + self.end as u64;
        if offset >= self.buf_offset && offset <= window_end {
            self.start = (offset - self.buf_offset) as usize;
            return Ok(());
        }
        self.inner.seek(SeekFrom::Start(offset))?;
        self.buf_offset = offset;
        self.start = 0;
        self.end = 0;
        Ok(())
    }

    /// Returns the total length of the source in bytes.
    pub fn stream_len(&mut self) -> Result<u64> {
        let source_pos = self.buf_offset + self.end as u64;
        let len = self.inner.seek(SeekFrom::End(0))?;
        self.inner.seek(SeekFrom::Start(source_pos))?;
        Ok(len)
    }
}

fn read_some<R: Read>(inner: &mut R, dst: &mut [u8]) -> Result<usize> {
    loop {
        match inner.read(dst) {
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

fn read_fully<R: Read>(inner: &mut R, dst: &mut [u8], context: &'static str) -> Result<()> {
    let mut filled = 0;
    while filled < dst.len() {
        let read = read_some(inner, &mut dst[filled..])?;
        if read == 0 {
            return Err(Error::Eof { context });
        }
        filled += read;
    }
    Ok(())
}

// =============================================================================
// ZIGZAG ENCODING
// =============================================================================

/// Encodes a signed integer using zigzag encoding.
///
/// Maps negative numbers to odd positive numbers:
/// 0 -> 0, -1 -> 1, 1 -> 2, -2 -> 3, 2 -> 4, ...
#[inline]
pub fn zigzag_encode(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

/// Decodes a zigzag-encoded unsigned integer back to signed.
#[inline]
pub fn zigzag_decode(n: u64) -> i64 {
    ((n >> 1) as i64) ^ (-((n & 1) as i64))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use proptest::prelude::*;

    use super::*;
    use crate::error::ErrorKind;

    fn encode(f: impl FnOnce(&mut CodedOutputStream<Vec<u8>>) -> Result<()>) -> Vec<u8> {
        let mut out = CodedOutputStream::with_capacity(16, Vec::new());
        f(&mut out).unwrap();
        out.into_inner().unwrap()
    }

    #[test]
    fn test_zigzag_values() {
        assert_eq!(zigzag_encode(0), 0);
        assert_eq!(zigzag_encode(-1), 1);
        assert_eq!(zigzag_encode(1), 2);
        assert_eq!(zigzag_encode(-2), 3);
        assert_eq!(zigzag_encode(2), 4);
        assert_eq!(zigzag_encode(i64::MIN), u64::MAX);
    }

    #[test]
    fn test_varint_wire_form() {
        assert_eq!(encode(|s| s.write_unsigned_varint(0)), [0x00]);
        assert_eq!(encode(|s| s.write_unsigned_varint(127)), [0x7F]);
        assert_eq!(encode(|s| s.write_unsigned_varint(128)), [0x80, 0x01]);
        assert_eq!(encode(|s| s.write_unsigned_varint(300)), [0xAC, 0x02]);
        assert_eq!(encode(|s| s.write_signed_varint(-1)), [0x01]);
        assert_eq!(encode(|s| s.write_unsigned_varint(u64::MAX)).len(), 10);
    }

    #[test]
    fn test_varint_extremes_roundtrip() {
        let unsigned = [0u64, 1, 127, 128, 16383, 16384, u32::MAX as u64, u64::MAX];
        let signed = [0i64, 1, -1, i32::MIN as i64, i32::MAX as i64, i64::MIN, i64::MAX];

        let bytes = encode(|s| {
            for v in unsigned {
                s.write_unsigned_varint(v)?;
            }
            for v in signed {
                s.write_signed_varint(v)?;
            }
            Ok(())
        });

        let mut input = CodedInputStream::with_capacity(16, Cursor::new(bytes));
        for v in unsigned {
            assert_eq!(input.read_unsigned_varint("test").unwrap(), v);
        }
        for v in signed {
            assert_eq!(input.read_signed_varint("test").unwrap(), v);
        }
    }

    #[test]
    fn test_varint_too_long() {
        let data = [0x80u8; 11];
        let mut input = CodedInputStream::new(&data[..]);
        assert!(matches!(
            input.read_unsigned_varint("test"),
            Err(Error::VarintTooLong)
        ));
    }

    #[test]
    fn test_varint_overflow() {
        let mut data = [0xFFu8; 10];
        data[9] = 0x02;
        let mut input = CodedInputStream::new(&data[..]);
        assert!(matches!(
            input.read_unsigned_varint("test"),
            Err(Error::VarintOverflow)
        ));
    }

    #[test]
    fn test_large_write_bypasses_buffer() {
        let payload: Vec<u8> = (0..100u8).collect();
        let bytes = encode(|s| {
            s.write_byte(7)?;
            s.write_bytes(&payload)?;
            assert_eq!(s.pos(), 101);
            s.write_byte(9)
        });
        assert_eq!(bytes.len(), 102);
        assert_eq!(bytes[0], 7);
        assert_eq!(&bytes[1..101], &payload[..]);
        assert_eq!(bytes[101], 9);
    }

    #[test]
    fn test_reads_span_refills() {
        let payload: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let mut input = CodedInputStream::with_capacity(16, Cursor::new(payload.clone()));

        assert_eq!(input.read_byte("test").unwrap(), 0);
        let middle = input.read_bytearray(10, "test").unwrap();
        assert_eq!(&middle[..], &payload[1..11]);
        let view = input.read_view(12, "test").unwrap().into_owned();
        assert_eq!(&view[..], &payload[11..23]);
        let rest = input.read_bytearray(977, "test").unwrap();
        assert_eq!(&rest[..], &payload[23..]);
        assert_eq!(input.pos(), 1000);
    }

    #[test]
    fn test_read_view_borrows_when_buffered() {
        let mut input = CodedInputStream::new(&b"hello world"[..]);
        let view = input.read_view(5, "test").unwrap();
        assert!(matches!(view, Cow::Borrowed(b"hello")));
    }

    #[test]
    fn test_short_read_is_eof() {
        let mut input = CodedInputStream::new(&[1u8, 2, 3][..]);
        let err = input.read_bytearray(10, "payload").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Eof);
        assert!(err.to_string().contains("payload"));
    }

    #[test]
    fn test_huge_length_prefix_is_eof() {
        for len in [1u64 << 40, u64::MAX] {
            let mut bytes = encode(|s| s.write_unsigned_varint(len));
            bytes.extend_from_slice(b"abc");
            let mut input = CodedInputStream::new(&bytes[..]);
            let err = input.read_string("string").unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Eof);
        }

        let mut input = CodedInputStream::new(&b"abc"[..]);
        assert_eq!(input.read_bytearray(usize::MAX, "bytes").unwrap_err().kind(), ErrorKind::Eof);
    }

    #[test]
    fn test_bytearray_larger_than_one_chunk() {
        let payload: Vec<u8> = (0..=255u8).cycle().take(MAX_PREALLOC_BYTES + 5).collect();
        let mut input = CodedInputStream::with_capacity(16, Cursor::new(payload.clone()));
        assert_eq!(input.read_bytearray(payload.len(), "test").unwrap(), payload);
        assert_eq!(input.pos(), payload.len() as u64);
    }

    #[test]
    fn test_seek_inside_and_outside_buffer() {
        let payload: Vec<u8> = (0..200u8).collect();
        let mut input = CodedInputStream::with_capacity(16, Cursor::new(payload));

        input.read_byte("test").unwrap();
        input.seek(10).unwrap();
        assert_eq!(input.read_byte("test").unwrap(), 10);

        input.seek(150).unwrap();
        assert_eq!(input.pos(), 150);
        assert_eq!(input.read_byte("test").unwrap(), 150);

        input.seek(3).unwrap();
        assert_eq!(input.read_byte("test").unwrap(), 3);
        assert_eq!(input.stream_len().unwrap(), 200);
        assert_eq!(input.read_byte("test").unwrap(), 4);
    }

    proptest! {
        #[test]
        fn prop_unsigned_varint_roundtrip(v in any::<u64>()) {
            let bytes = encode(|s| s.write_unsigned_varint(v));
            let mut input = CodedInputStream::new(&bytes[..]);
            prop_assert_eq!(input.read_unsigned_varint("test").unwrap(), v);
        }

        #[test]
        fn prop_signed_varint_roundtrip(v in any::<i64>()) {
            prop_assert_eq!(zigzag_decode(zigzag_encode(v)), v);
            let bytes = encode(|s| s.write_signed_varint(v));
            let mut input = CodedInputStream::new(&bytes[..]);
            prop_assert_eq!(input.read_signed_varint("test").unwrap(), v);
        }
    }
}
