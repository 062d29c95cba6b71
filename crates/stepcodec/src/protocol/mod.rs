//! Protocol descriptors and the step-writer seam.
//!
//! A protocol is an ordered list of steps. Scalar steps carry exactly one
//! value; stream steps carry zero or more values. Writers and readers must
//! visit the steps in order, which [`ProtocolState`] enforces.

use std::borrow::Borrow;

use crate::error::{Error, Result};
use crate::serializer::Serializer;

pub mod state;

pub use state::ProtocolState;

/// Whether a step carries one value or a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Scalar,
    Stream,
}

/// One named step of a protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepDescriptor {
    /// Step name in snake_case; method names derive from it.
    pub name: &'static str,
    pub kind: StepKind,
}

impl StepDescriptor {
    pub const fn scalar(name: &'static str) -> Self {
        Self {
            name,
            kind: StepKind::Scalar,
        }
    }

    pub const fn stream(name: &'static str) -> Self {
        Self {
            name,
            kind: StepKind::Stream,
        }
    }

    pub fn is_stream(&self) -> bool {
        self.kind == StepKind::Stream
    }
}

/// Static description of a protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolDescriptor {
    pub name: &'static str,
    /// Schema string written into, and checked against, stream headers.
    pub schema: &'static str,
    pub steps: &'static [StepDescriptor],
}

impl ProtocolDescriptor {
    pub fn step(&self, ordinal: usize) -> Option<&StepDescriptor> {
        self.steps.get(ordinal)
    }

    /// Looks up step `ordinal`, checking it has the expected kind.
    pub fn expect_step(&self, ordinal: usize, kind: StepKind) -> Result<&StepDescriptor> {
        let step = self.steps.get(ordinal).ok_or_else(|| {
            Error::protocol(format!(
                "Protocol '{}' has no step with ordinal {}.",
                self.name, ordinal
            ))
        })?;
        if step.kind != kind {
            let actual = match step.kind {
                StepKind::Scalar => "scalar",
                StepKind::Stream => "stream",
            };
            return Err(Error::protocol(format!(
                "Step '{}' of protocol '{}' is a {} step.",
                step.name, self.name, actual
            )));
        }
        Ok(step)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Terminal state reached once every step has been visited.
    pub fn terminal_state(&self) -> usize {
        2 * self.steps.len()
    }
}

/// The writing side of a protocol, implemented by the plain and indexed
/// binary writers.
///
/// Typed protocol writers are generic over this trait, so the same step
/// sequence can target either format, and readers can copy into either.
pub trait StepWriter {
    /// What [`StepWriter::close`] hands back, typically the sink.
    type Output;

    /// Writes the single value of scalar step `ordinal`.
    fn write_step<S: Serializer>(&mut self, ordinal: usize, serializer: &S, value: &S::Value) -> Result<()>;

    /// Appends items to stream step `ordinal`, stopping at the first error.
    ///
    /// May be called repeatedly for the same step; the stream ends when a
    /// later step is written or the writer is closed.
    fn try_write_stream<S, I, T>(&mut self, ordinal: usize, serializer: &S, items: I) -> Result<()>
    where
        S: Serializer,
        I: IntoIterator<Item = Result<T>>,
        T: Borrow<S::Value>;

    /// Appends items to stream step `ordinal`.
    fn write_stream<S, I>(&mut self, ordinal: usize, serializer: &S, items: I) -> Result<()>
    where
        S: Serializer,
        I: IntoIterator,
        I::Item: Borrow<S::Value>,
    {
        self.try_write_stream(ordinal, serializer, items.into_iter().map(Ok))
    }

    /// Ends any open stream, checks that every step was written and flushes.
    fn close(self) -> Result<Self::Output>
    where
        Self: Sized;
}

#[cfg(test)]
mod tests {
    use super::*;

    static STEPS: [StepDescriptor; 2] = [StepDescriptor::scalar("header"), StepDescriptor::stream("samples")];
    static PROTOCOL: ProtocolDescriptor = ProtocolDescriptor {
        name: "MyProtocol",
        schema: "{}",
        steps: &STEPS,
    };

    #[test]
    fn test_descriptor() {
        assert_eq!(PROTOCOL.len(), 2);
        assert_eq!(PROTOCOL.terminal_state(), 4);
        assert!(PROTOCOL.step(1).is_some_and(StepDescriptor::is_stream));
        assert!(PROTOCOL.step(2).is_none());
        assert!(PROTOCOL.expect_step(0, StepKind::Scalar).is_ok());
        let err = PROTOCOL.expect_step(1, StepKind::Scalar).unwrap_err();
        assert_eq!(err.to_string(), "Step 'samples' of protocol 'MyProtocol' is a stream step.");
    }
}
