//! Indexed binary protocol writer and random-access reader.

use std::borrow::Borrow;
use std::io::{Read, Seek, Write};
use std::iter::FusedIterator;

use tracing::{debug, trace};

use super::{BinaryOptions, BinaryWriter, Index};
use crate::codec::{CodedInputStream, read_header, verify_schema};
use crate::error::{Error, Result};
use crate::protocol::{ProtocolDescriptor, StepKind, StepWriter};
use crate::serializer::{Serializer, StreamSerializer};

/// A [`BinaryWriter`] that also records an [`Index`] and appends it as a
/// trailer on close.
///
/// The bytes before the trailer are identical to what [`BinaryWriter`]
/// produces for the same calls.
#[derive(Debug)]
pub struct IndexedBinaryWriter<W: Write> {
    inner: BinaryWriter<W>,
    index: Index,
}

impl<W: Write> IndexedBinaryWriter<W> {
    pub fn new(sink: W, descriptor: &'static ProtocolDescriptor) -> Result<Self> {
        Self::with_options(sink, descriptor, BinaryOptions::default())
    }

    pub fn with_options(sink: W, descriptor: &'static ProtocolDescriptor, options: BinaryOptions) -> Result<Self> {
        Ok(Self {
            inner: BinaryWriter::with_options(sink, descriptor, options)?,
            index: Index::new(),
        })
    }

    pub fn descriptor(&self) -> &'static ProtocolDescriptor {
        self.inner.descriptor()
    }

    /// The index recorded so far.
    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn pos(&self) -> u64 {
        self.inner.pos()
    }
}

impl<W: Write> StepWriter for IndexedBinaryWriter<W> {
    type Output = W;

    fn write_step<S: Serializer>(&mut self, ordinal: usize, serializer: &S, value: &S::Value) -> Result<()> {
        let name = self.inner.begin_step(ordinal, StepKind::Scalar)?;
        self.index.set_step_offset(name, self.inner.pos());
        self.inner.write_value(ordinal, serializer, value)
    }

    fn try_write_stream<S, I, T>(&mut self, ordinal: usize, serializer: &S, items: I) -> Result<()>
    where
        S: Serializer,
        I: IntoIterator<Item = Result<T>>,
        T: Borrow<S::Value>,
    {
        let name = self.inner.begin_step(ordinal, StepKind::Stream)?;
        self.index.set_step_offset(name, self.inner.pos());
        let (offset, count, written) = self.inner.write_items(ordinal, serializer, items);
        trace!(step = name, offset, count, complete = written.is_ok(), "indexed stream block");
        self.index.add_stream_block(name, offset, count);
        written
    }

    fn close(mut self) -> Result<W> {
        let complete = self.inner.finish();
        if complete.is_ok() {
            self.index.write_trailer(self.inner.stream_mut())?;
        }
        let sink = self.inner.into_sink()?;
        complete?;
        debug!("closed indexed binary writer");
        Ok(sink)
    }
}

/// Reads steps of an indexed stream in any order.
///
/// Construction reads the header and the index trailer. Every read seeks
/// to the recorded offset, so no ordering is enforced.
#[derive(Debug)]
pub struct IndexedBinaryReader<R: Read + Seek> {
    stream: CodedInputStream<R>,
    descriptor: &'static ProtocolDescriptor,
    index: Index,
    schema: String,
}

impl<R: Read + Seek> IndexedBinaryReader<R> {
    pub fn new(source: R, descriptor: &'static ProtocolDescriptor) -> Result<Self> {
        Self::with_options(source, descriptor, BinaryOptions::default())
    }

    pub fn with_options(source: R, descriptor: &'static ProtocolDescriptor, options: BinaryOptions) -> Result<Self> {
        let mut stream = CodedInputStream::with_capacity(options.buffer_size, source);
        let schema = read_header(&mut stream)?;
        if options.verify_schema {
            verify_schema(&schema, descriptor.schema, descriptor.name)?;
        }
        let index = Index::read_trailer(&mut stream)?;
        debug!(protocol = descriptor.name, "opened indexed binary reader");
        Ok(Self {
            stream,
            descriptor,
            index,
            schema,
        })
    }

    pub fn descriptor(&self) -> &'static ProtocolDescriptor {
        self.descriptor
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Schema string found in the header.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Number of items in stream step `ordinal`.
    pub fn count(&self, ordinal: usize) -> Result<u64> {
        let step = self.descriptor.expect_step(ordinal, StepKind::Stream)?;
        self.index.count(step.name)
    }

    /// Reads the value of scalar step `ordinal`.
    pub fn read_step<S: Serializer>(&mut self, ordinal: usize, serializer: &S) -> Result<S::Value> {
        let step = self.descriptor.expect_step(ordinal, StepKind::Scalar)?;
        let offset = self.index.step_offset(step.name)?;
        self.stream.seek(offset)?;
        serializer.read(&mut self.stream)
    }

    /// Reads stream step `ordinal` starting at item `start`.
    ///
    /// `start` equal to the item count yields nothing; beyond it is an error.
    pub fn read_stream<S: Serializer>(
        &mut self,
        ordinal: usize,
        serializer: S,
        start: u64,
    ) -> Result<IndexedStreamItems<'_, R, S>> {
        let step = self.descriptor.expect_step(ordinal, StepKind::Stream)?;
        let (offset, skip) = self.index.find_stream_item(step.name, start)?;
        trace!(step = step.name, start, offset, skip, "seeking stream item");
        self.stream.seek(offset)?;

        let items = StreamSerializer::new(serializer);
        for _ in 0..skip {
            if items.read_item(&mut self.stream)?.is_none() {
                return Err(Error::CorruptIndex {
                    context: "stream block count",
                });
            }
        }
        Ok(IndexedStreamItems {
            stream: &mut self.stream,
            items,
            done: false,
        })
    }

    /// Reads step `ordinal` in full and writes it to `writer`.
    pub fn copy_step<S, W>(&mut self, ordinal: usize, serializer: &S, writer: &mut W) -> Result<()>
    where
        S: Serializer,
        W: StepWriter,
    {
        match self.descriptor.step(ordinal).map(|step| step.kind) {
            Some(StepKind::Stream) => {
                let items = self.read_stream(ordinal, serializer, 0)?;
                writer.try_write_stream(ordinal, serializer, items)
            }
            _ => {
                let value = self.read_step(ordinal, serializer)?;
                writer.write_step(ordinal, serializer, &value)
            }
        }
    }

    /// Closes the reader. Unread steps are not an error.
    pub fn close(self) -> Result<()> {
        debug!(protocol = self.descriptor.name, "closed indexed binary reader");
        Ok(())
    }
}

/// Lazily decoded items of an indexed stream step, from a start position to
/// the end of the stream.
pub struct IndexedStreamItems<'a, R: Read, S: Serializer> {
    stream: &'a mut CodedInputStream<R>,
    items: StreamSerializer<S>,
    done: bool,
}

impl<R: Read, S: Serializer> IndexedStreamItems<'_, R, S> {
    pub fn is_finished(&self) -> bool {
        self.done
    }
}

impl<R: Read, S: Serializer> Iterator for IndexedStreamItems<'_, R, S> {
    type Item = Result<S::Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.items.read_item(&mut *self.stream) {
            Ok(Some(value)) => Some(Ok(value)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

impl<R: Read, S: Serializer> FusedIterator for IndexedStreamItems<'_, R, S> {}
