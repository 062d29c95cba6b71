//! Step and stream-block offsets for random access.
//!
//! The index is appended to an indexed stream as a trailer:
//!
//! ```text
//! "STEPCIDX" | u32 LE version
//! varint step count   | (name, varint offset)*
//! varint stream count | (name, varint block count, (varint offset, varint count)*)*
//! 8-byte truncated SHA-256 of everything above
//! u64 LE trailer offset | "STEPCEND"
//! ```

use std::fmt;
use std::io::{Read, Seek, Write};

use rustc_hash::FxHashMap;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::codec::{CodedInputStream, CodedOutputStream};
use crate::error::{Error, Result};
use crate::limits::{INDEX_DIGEST_LEN, INDEX_FOOTER_LEN, INDEX_FOOTER_MAGIC, INDEX_MAGIC, INDEX_VERSION};

/// A run of consecutive stream items written by one stream-write call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamBlock {
    /// Offset of the continuation byte of the block's first item.
    pub offset: u64,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct StreamIndex {
    blocks: Vec<StreamBlock>,
    /// `ends[i]` is the number of items in blocks `0..=i`.
    ends: Vec<u64>,
}

impl StreamIndex {
    fn push(&mut self, block: StreamBlock) {
        let end = self.total() + block.count;
        self.blocks.push(block);
        self.ends.push(end);
    }

    fn total(&self) -> u64 {
        self.ends.last().copied().unwrap_or(0)
    }
}

/// Offsets of every step and of every block of every stream step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Index {
    steps: FxHashMap<String, u64>,
    streams: FxHashMap<String, StreamIndex>,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records where `step` starts. Later calls for the same step are ignored.
    pub fn set_step_offset(&mut self, step: &str, offset: u64) {
        self.steps.entry(step.to_string()).or_insert(offset);
    }

    /// Appends a block to stream `step`. Empty blocks are not recorded.
    pub fn add_stream_block(&mut self, step: &str, offset: u64, count: u64) {
        if count == 0 {
            return;
        }
        self.streams
            .entry(step.to_string())
            .or_default()
            .push(StreamBlock { offset, count });
    }

    pub fn step_offset(&self, step: &str) -> Result<u64> {
        self.steps.get(step).copied().ok_or_else(|| Error::StepNotIndexed {
            step: step.to_string(),
        })
    }

    pub fn stream_blocks(&self, step: &str) -> &[StreamBlock] {
        self.streams.get(step).map_or(&[][..], |s| s.blocks.as_slice())
    }

    /// Total items written to stream `step`.
    pub fn count(&self, step: &str) -> Result<u64> {
        self.step_offset(step)?;
        Ok(self.streams.get(step).map_or(0, StreamIndex::total))
    }

    /// Locates item `start` of stream `step`.
    ///
    /// Returns the offset to seek to and how many items must be decoded and
    /// discarded from there. `start` equal to the item count positions the
    /// reader on the end marker.
    pub fn find_stream_item(&self, step: &str, start: u64) -> Result<(u64, u64)> {
        let step_offset = self.step_offset(step)?;
        let stream = match self.streams.get(step) {
            Some(stream) if !stream.blocks.is_empty() => stream,
            _ if start == 0 => return Ok((step_offset, 0)),
            _ => {
                return Err(Error::StreamIndexOutOfRange {
                    step: step.to_string(),
                    index: start,
                    count: 0,
                });
            }
        };

        let total = stream.total();
        if start > total {
            return Err(Error::StreamIndexOutOfRange {
                step: step.to_string(),
                index: start,
                count: total,
            });
        }

        let block = stream.ends.partition_point(|&end| end <= start);
        if block == stream.blocks.len() {
            // start == total: skip the whole last block.
            let last = stream.blocks[block - 1];
            return Ok((last.offset, last.count));
        }
        let before = if block == 0 { 0 } else { stream.ends[block - 1] };
        Ok((stream.blocks[block].offset, start - before))
    }

    // =========================================================================
    // TRAILER
    // =========================================================================

    /// Encodes the trailer body (everything the digest covers).
    fn encode_body(&self) -> Result<Vec<u8>> {
        let mut out = CodedOutputStream::new(Vec::new());
        out.write_bytes(&INDEX_MAGIC)?;
        out.write_fixed_u32(INDEX_VERSION)?;

        let mut steps: Vec<(&String, &u64)> = self.steps.iter().collect();
        steps.sort_by(|a, b| (a.1, a.0).cmp(&(b.1, b.0)));
        out.write_unsigned_varint(steps.len() as u64)?;
        for (name, offset) in steps {
            out.write_string(name)?;
            out.write_unsigned_varint(*offset)?;
        }

        let mut streams: Vec<(&String, &StreamIndex)> = self.streams.iter().collect();
        streams.sort_by(|a, b| {
            let first = |s: &StreamIndex| s.blocks.first().map(|block| block.offset);
            (first(a.1), a.0).cmp(&(first(b.1), b.0))
        });
        out.write_unsigned_varint(streams.len() as u64)?;
        for (name, stream) in streams {
            out.write_string(name)?;
            out.write_unsigned_varint(stream.blocks.len() as u64)?;
            for block in &stream.blocks {
                out.write_unsigned_varint(block.offset)?;
                out.write_unsigned_varint(block.count)?;
            }
        }
        out.into_inner()
    }

    fn decode_body(body: &[u8]) -> Result<Self> {
        let mut input = CodedInputStream::new(body);
        let mut magic = [0u8; INDEX_MAGIC.len()];
        input.read_into(&mut magic, "index magic")?;
        if magic != INDEX_MAGIC {
            return Err(Error::CorruptIndex { context: "magic" });
        }
        let version = input.read_fixed_u32("index version")?;
        if version != INDEX_VERSION {
            return Err(Error::UnsupportedVersion { version });
        }

        let mut index = Index::new();
        let step_count = input.read_unsigned_varint("index step count")?;
        for _ in 0..step_count {
            let name = input.read_string("index step name")?;
            let offset = input.read_unsigned_varint("index step offset")?;
            if index.steps.insert(name, offset).is_some() {
                return Err(Error::CorruptIndex { context: "duplicate step" });
            }
        }

        let stream_count = input.read_unsigned_varint("index stream count")?;
        for _ in 0..stream_count {
            let name = input.read_string("index stream name")?;
            if !index.steps.contains_key(&name) {
                return Err(Error::CorruptIndex { context: "stream without step offset" });
            }
            let block_count = input.read_unsigned_varint("index block count")?;
            let mut stream = StreamIndex::default();
            for _ in 0..block_count {
                let offset = input.read_unsigned_varint("index block offset")?;
                let count = input.read_unsigned_varint("index block count")?;
                if count == 0
                    || stream.total().checked_add(count).is_none()
                    || stream.blocks.last().is_some_and(|b| b.offset >= offset)
                {
                    return Err(Error::CorruptIndex { context: "stream blocks" });
                }
                stream.push(StreamBlock { offset, count });
            }
            if index.streams.insert(name, stream).is_some() {
                return Err(Error::CorruptIndex { context: "duplicate stream" });
            }
        }

        if input.pos() != body.len() as u64 {
            return Err(Error::CorruptIndex { context: "trailing bytes" });
        }
        Ok(index)
    }

    /// Appends the trailer at the stream's current position.
    pub fn write_trailer<W: Write>(&self, stream: &mut CodedOutputStream<W>) -> Result<()> {
        let start = stream.pos();
        let body = self.encode_body()?;
        let digest = Sha256::digest(&body);
        stream.write_bytes(&body)?;
        stream.write_bytes(&digest[..INDEX_DIGEST_LEN])?;
        stream.write_fixed_u64(start)?;
        stream.write_bytes(&INDEX_FOOTER_MAGIC)?;
        debug!(
            offset = start,
            steps = self.steps.len(),
            streams = self.streams.len(),
            "wrote index trailer"
        );
        Ok(())
    }

    /// Locates and decodes the trailer at the end of a seekable stream.
    pub fn read_trailer<R: Read + Seek>(stream: &mut CodedInputStream<R>) -> Result<Self> {
        let len = stream.stream_len()?;
        let min_len = INDEX_FOOTER_LEN + INDEX_DIGEST_LEN as u64;
        if len < min_len {
            return Err(Error::IndexNotFound);
        }

        stream.seek(len - INDEX_FOOTER_LEN)?;
        let start = stream.read_fixed_u64("index footer")?;
        let mut magic = [0u8; INDEX_FOOTER_MAGIC.len()];
        stream.read_into(&mut magic, "index footer")?;
        if magic != INDEX_FOOTER_MAGIC {
            return Err(Error::IndexNotFound);
        }

        let digest_offset = len - min_len;
        if start > digest_offset {
            return Err(Error::CorruptIndex { context: "trailer offset" });
        }
        stream.seek(start)?;
        let body = stream.read_bytearray((digest_offset - start) as usize, "index")?;
        let mut digest = [0u8; INDEX_DIGEST_LEN];
        stream.read_into(&mut digest, "index digest")?;
        if Sha256::digest(&body)[..INDEX_DIGEST_LEN] != digest {
            return Err(Error::CorruptIndex { context: "digest mismatch" });
        }

        let index = Self::decode_body(&body)?;
        debug!(
            offset = start,
            steps = index.steps.len(),
            streams = index.streams.len(),
            "read index trailer"
        );
        Ok(index)
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut steps: Vec<(&String, &u64)> = self.steps.iter().collect();
        steps.sort_by(|a, b| (a.1, a.0).cmp(&(b.1, b.0)));
        writeln!(f, "Index ({} steps)", steps.len())?;
        for (name, offset) in steps {
            match self.streams.get(name.as_str()) {
                Some(stream) => {
                    writeln!(
                        f,
                        "  {} @ {} (stream: {} items in {} blocks)",
                        name,
                        offset,
                        stream.total(),
                        stream.blocks.len()
                    )?;
                    for (i, block) in stream.blocks.iter().enumerate() {
                        writeln!(f, "    block {}: offset {}, {} items", i, block.offset, block.count)?;
                    }
                }
                None => writeln!(f, "  {} @ {}", name, offset)?,
            }
        }
        Ok(())
    }
}
