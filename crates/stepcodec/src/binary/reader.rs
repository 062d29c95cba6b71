//! Sequential binary protocol reader.

use std::io::Read;
use std::iter::FusedIterator;

use tracing::debug;

use super::BinaryOptions;
use crate::codec::{CodedInputStream, read_header, verify_schema};
use crate::error::{Error, Result};
use crate::protocol::{ProtocolDescriptor, ProtocolState, StepKind, StepWriter};
use crate::serializer::{Serializer, StreamSerializer};

/// Reads protocol steps, in order, from any [`Read`] source.
///
/// The header is read and checked on construction.
#[derive(Debug)]
pub struct BinaryReader<R: Read> {
    stream: CodedInputStream<R>,
    state: ProtocolState,
    options: BinaryOptions,
    schema: String,
}

impl<R: Read> BinaryReader<R> {
    pub fn new(source: R, descriptor: &'static ProtocolDescriptor) -> Result<Self> {
        Self::with_options(source, descriptor, BinaryOptions::default())
    }

    pub fn with_options(source: R, descriptor: &'static ProtocolDescriptor, options: BinaryOptions) -> Result<Self> {
        let mut stream = CodedInputStream::with_capacity(options.buffer_size, source);
        let schema = read_header(&mut stream)?;
        if options.verify_schema {
            verify_schema(&schema, descriptor.schema, descriptor.name)?;
        }
        debug!(protocol = descriptor.name, "opened binary reader");
        Ok(Self {
            stream,
            state: ProtocolState::new(descriptor),
            options,
            schema,
        })
    }

    pub fn descriptor(&self) -> &'static ProtocolDescriptor {
        self.state.descriptor()
    }

    pub fn state(&self) -> &ProtocolState {
        &self.state
    }

    /// Schema string found in the header.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Reads the value of scalar step `ordinal`.
    pub fn read_step<S: Serializer>(&mut self, ordinal: usize, serializer: &S) -> Result<S::Value> {
        self.state.check_read(ordinal, StepKind::Scalar)?;
        let value = serializer.read(&mut self.stream)?;
        self.state.complete_step(ordinal);
        Ok(value)
    }

    /// Starts reading stream step `ordinal`.
    ///
    /// The returned iterator decodes one item per call and must be drained
    /// before the next step can be read.
    pub fn read_stream<S: Serializer>(&mut self, ordinal: usize, serializer: S) -> Result<StreamItems<'_, R, S>> {
        self.state.check_read(ordinal, StepKind::Stream)?;
        self.state.enter_stream(ordinal);
        Ok(StreamItems {
            reader: self,
            items: StreamSerializer::new(serializer),
            ordinal,
            done: false,
        })
    }

    /// Reads step `ordinal` and writes it to `writer`. Streams are copied
    /// item by item.
    pub fn copy_step<S, W>(&mut self, ordinal: usize, serializer: &S, writer: &mut W) -> Result<()>
    where
        S: Serializer,
        W: StepWriter,
    {
        match self.descriptor().step(ordinal).map(|step| step.kind) {
            Some(StepKind::Scalar) => {
                let value = self.read_step(ordinal, serializer)?;
                writer.write_step(ordinal, serializer, &value)
            }
            Some(StepKind::Stream) => {
                let items = self.read_stream(ordinal, serializer)?;
                writer.try_write_stream(ordinal, serializer, items)
            }
            None => Err(Error::protocol(format!(
                "Protocol '{}' has no step with ordinal {}.",
                self.descriptor().name,
                ordinal
            ))),
        }
    }

    /// Closes the reader, checking every step was consumed unless
    /// [`BinaryOptions::skip_completed_check`] is set.
    pub fn close(self) -> Result<()> {
        if !self.options.skip_completed_check {
            self.state.check_reader_complete()?;
        }
        debug!(protocol = self.descriptor().name, state = self.state.current(), "closed binary reader");
        Ok(())
    }
}

/// Lazily decoded items of a stream step.
///
/// Yields `Err` at most once, then stops.
pub struct StreamItems<'a, R: Read, S: Serializer> {
    reader: &'a mut BinaryReader<R>,
    items: StreamSerializer<S>,
    ordinal: usize,
    done: bool,
}

impl<R: Read, S: Serializer> StreamItems<'_, R, S> {
    /// True once the end marker (or an error) has been reached.
    pub fn is_finished(&self) -> bool {
        self.done
    }
}

impl<R: Read, S: Serializer> Iterator for StreamItems<'_, R, S> {
    type Item = Result<S::Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.items.read_item(&mut self.reader.stream) {
            Ok(Some(value)) => Some(Ok(value)),
            Ok(None) => {
                self.done = true;
                self.reader.state.complete_step(self.ordinal);
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

impl<R: Read, S: Serializer> FusedIterator for StreamItems<'_, R, S> {}
