//! Sequential binary protocol writer.

use std::borrow::Borrow;
use std::io::Write;

use tracing::{debug, warn};

use super::BinaryOptions;
use crate::codec::{CodedOutputStream, write_header};
use crate::error::Result;
use crate::protocol::{ProtocolDescriptor, ProtocolState, StepKind, StepWriter};
use crate::serializer::{Serializer, StreamSerializer};

/// Writes protocol steps, in order, to any [`Write`] sink.
///
/// The header is written on construction. Call [`StepWriter::close`] when
/// done; dropping the writer discards buffered bytes.
#[derive(Debug)]
pub struct BinaryWriter<W: Write> {
    stream: CodedOutputStream<W>,
    state: ProtocolState,
}

impl<W: Write> BinaryWriter<W> {
    pub fn new(sink: W, descriptor: &'static ProtocolDescriptor) -> Result<Self> {
        Self::with_options(sink, descriptor, BinaryOptions::default())
    }

    pub fn with_options(sink: W, descriptor: &'static ProtocolDescriptor, options: BinaryOptions) -> Result<Self> {
        let mut stream = CodedOutputStream::with_capacity(options.buffer_size, sink);
        write_header(&mut stream, descriptor.schema)?;
        debug!(protocol = descriptor.name, "opened binary writer");
        Ok(Self {
            stream,
            state: ProtocolState::new(descriptor),
        })
    }

    pub fn descriptor(&self) -> &'static ProtocolDescriptor {
        self.state.descriptor()
    }

    pub fn state(&self) -> &ProtocolState {
        &self.state
    }

    /// Bytes written so far, header included.
    pub fn pos(&self) -> u64 {
        self.stream.pos()
    }

    /// Validates a write to step `ordinal`, terminating an open stream first
    /// when the write moves past it.
    pub(crate) fn begin_step(&mut self, ordinal: usize, kind: StepKind) -> Result<&'static str> {
        if self.state.begin_write(ordinal, kind)?.is_some() {
            self.stream.write_byte(0)?;
            self.state.end_stream();
        }
        Ok(self.state.step(ordinal, kind)?.name)
    }

    pub(crate) fn write_value<S: Serializer>(&mut self, ordinal: usize, serializer: &S, value: &S::Value) -> Result<()> {
        serializer.write(&mut self.stream, value)?;
        self.state.complete_step(ordinal);
        Ok(())
    }

    /// Writes stream items.
    ///
    /// Returns the offset of the first item and how many items were written
    /// before the iterator was exhausted or an error stopped the write. Items
    /// counted here are in the output even when the result is an error.
    pub(crate) fn write_items<S, I, T>(&mut self, ordinal: usize, serializer: &S, items: I) -> (u64, u64, Result<()>)
    where
        S: Serializer,
        I: IntoIterator<Item = Result<T>>,
        T: Borrow<S::Value>,
    {
        self.state.enter_stream(ordinal);
        let stream_serializer = StreamSerializer::new(serializer);
        let stream = &mut self.stream;
        let start = stream.pos();
        let mut count = 0u64;
        let written = items.into_iter().try_for_each(|item| {
            let item = item?;
            stream_serializer.write_item(&mut *stream, <T as Borrow<S::Value>>::borrow(&item))?;
            count += 1;
            Ok(())
        });
        (start, count, written)
    }

    /// Ends any open stream and checks every step was written.
    pub(crate) fn finish(&mut self) -> Result<()> {
        if self.state.open_stream().is_some() {
            self.stream.write_byte(0)?;
            self.state.end_stream();
        }
        self.state.check_writer_complete().inspect_err(|err| {
            warn!(protocol = self.state.descriptor().name, %err, "closing incomplete protocol writer");
        })
    }

    pub(crate) fn stream_mut(&mut self) -> &mut CodedOutputStream<W> {
        &mut self.stream
    }

    /// Flushes and returns the sink.
    pub(crate) fn into_sink(self) -> Result<W> {
        self.stream.into_inner()
    }
}

impl<W: Write> StepWriter for BinaryWriter<W> {
    type Output = W;

    fn write_step<S: Serializer>(&mut self, ordinal: usize, serializer: &S, value: &S::Value) -> Result<()> {
        self.begin_step(ordinal, StepKind::Scalar)?;
        self.write_value(ordinal, serializer, value)
    }

    fn try_write_stream<S, I, T>(&mut self, ordinal: usize, serializer: &S, items: I) -> Result<()>
    where
        S: Serializer,
        I: IntoIterator<Item = Result<T>>,
        T: Borrow<S::Value>,
    {
        self.begin_step(ordinal, StepKind::Stream)?;
        let (_, _, written) = self.write_items(ordinal, serializer, items);
        written
    }

    fn close(mut self) -> Result<W> {
        let complete = self.finish();
        let sink = self.into_sink()?;
        complete?;
        debug!("closed binary writer");
        Ok(sink)
    }
}
