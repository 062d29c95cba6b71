//! Step ordering state machine.
//!
//! The state is a single integer. `2k` means step `k` is next; `2k + 1`
//! means step `k` is a stream that is still being written or read. The
//! protocol is complete at `2N` for `N` steps.

use tracing::debug;

use super::{ProtocolDescriptor, StepDescriptor, StepKind};
use crate::error::{Error, Result};

/// Tracks which step of a protocol may be called next.
#[derive(Debug, Clone)]
pub struct ProtocolState {
    descriptor: &'static ProtocolDescriptor,
    state: usize,
}

impl ProtocolState {
    pub fn new(descriptor: &'static ProtocolDescriptor) -> Self {
        Self { descriptor, state: 0 }
    }

    pub fn descriptor(&self) -> &'static ProtocolDescriptor {
        self.descriptor
    }

    pub fn current(&self) -> usize {
        self.state
    }

    pub fn is_complete(&self) -> bool {
        self.state == self.descriptor.terminal_state()
    }

    /// The stream step currently open, if any.
    pub fn open_stream(&self) -> Option<usize> {
        (self.state % 2 == 1).then_some(self.state / 2)
    }

    /// Looks up step `ordinal` and checks it has the expected kind.
    pub fn step(&self, ordinal: usize, kind: StepKind) -> Result<&'static StepDescriptor> {
        self.descriptor.expect_step(ordinal, kind)
    }

    // === Writing ===

    /// Validates a write to step `ordinal`.
    ///
    /// Returns the ordinal of an open stream that must be terminated before
    /// the write starts. Appending to the open stream itself is allowed.
    pub fn begin_write(&self, ordinal: usize, kind: StepKind) -> Result<Option<usize>> {
        self.step(ordinal, kind)?;
        let open = self.open_stream();
        if kind == StepKind::Stream && open == Some(ordinal) {
            return Ok(None);
        }
        let effective = match open {
            Some(j) => 2 * j + 2,
            None => self.state,
        };
        if effective != 2 * ordinal {
            return Err(Error::protocol(format!(
                "Expected call to '{}' but received call to '{}'.",
                self.method_name("write", effective),
                self.method_name("write", 2 * ordinal)
            )));
        }
        Ok(open)
    }

    /// Marks the open stream, if any, as terminated.
    pub fn end_stream(&mut self) {
        if self.state % 2 == 1 {
            self.state += 1;
            debug!(state = self.state, "stream ended");
        }
    }

    /// Checks that a writer may close; any open stream must already be ended.
    pub fn check_writer_complete(&self) -> Result<()> {
        if self.is_complete() {
            return Ok(());
        }
        let expected = (self.state + 1) & !1;
        Err(Error::protocol(format!(
            "Protocol writer closed before all steps were called. Expected call to '{}'.",
            self.method_name("write", expected)
        )))
    }

    // === Reading ===

    /// Validates a read of step `ordinal`.
    pub fn check_read(&self, ordinal: usize, kind: StepKind) -> Result<()> {
        self.step(ordinal, kind)?;
        if self.state == 2 * ordinal {
            return Ok(());
        }
        let actual = self.method_name("read", 2 * ordinal);
        let message = match self.open_stream() {
            Some(_) => format!(
                "Received call to '{}' but the iterable returned by '{}' was not fully consumed.",
                actual,
                self.method_name("read", self.state - 1)
            ),
            None => format!(
                "Expected call to '{}' but received call to '{}'.",
                self.method_name("read", self.state),
                actual
            ),
        };
        Err(Error::protocol(message))
    }

    /// Checks that a reader consumed everything.
    pub fn check_reader_complete(&self) -> Result<()> {
        if self.is_complete() {
            return Ok(());
        }
        let message = match self.open_stream() {
            Some(_) => format!(
                "Protocol reader closed before all data was consumed. The iterable returned by '{}' was not fully consumed.",
                self.method_name("read", self.state - 1)
            ),
            None => format!(
                "Protocol reader closed before all data was consumed. Expected call to '{}'.",
                self.method_name("read", self.state)
            ),
        };
        Err(Error::protocol(message))
    }

    // === Transitions ===

    /// Records that scalar step `ordinal` is done.
    pub fn complete_step(&mut self, ordinal: usize) {
        self.state = 2 * ordinal + 2;
        debug!(protocol = self.descriptor.name, state = self.state, "step complete");
    }

    /// Records that stream step `ordinal` has started.
    pub fn enter_stream(&mut self, ordinal: usize) {
        if self.state != 2 * ordinal + 1 {
            self.state = 2 * ordinal + 1;
            debug!(protocol = self.descriptor.name, state = self.state, "stream started");
        }
    }

    /// Method name for the step expected in `state`.
    fn method_name(&self, prefix: &str, state: usize) -> String {
        match self.descriptor.steps.get(state / 2) {
            Some(step) => format!("{}_{}", prefix, step.name),
            None => "close".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static STEPS: [StepDescriptor; 3] = [
        StepDescriptor::scalar("header"),
        StepDescriptor::stream("samples"),
        StepDescriptor::scalar("footer"),
    ];
    static PROTOCOL: ProtocolDescriptor = ProtocolDescriptor {
        name: "Demo",
        schema: "{}",
        steps: &STEPS,
    };

    #[test]
    fn test_writer_sequence() {
        let mut state = ProtocolState::new(&PROTOCOL);
        assert_eq!(state.begin_write(0, StepKind::Scalar).unwrap(), None);
        state.complete_step(0);
        assert_eq!(state.begin_write(1, StepKind::Stream).unwrap(), None);
        state.enter_stream(1);
        assert_eq!(state.current(), 3);
        // Appending to the open stream.
        assert_eq!(state.begin_write(1, StepKind::Stream).unwrap(), None);
        // Moving on ends the stream first.
        assert_eq!(state.begin_write(2, StepKind::Scalar).unwrap(), Some(1));
        state.end_stream();
        state.complete_step(2);
        assert!(state.is_complete());
        assert!(state.check_writer_complete().is_ok());
    }

    #[test]
    fn test_writer_out_of_order() {
        let state = ProtocolState::new(&PROTOCOL);
        let err = state.begin_write(1, StepKind::Stream).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Expected call to 'write_header' but received call to 'write_samples'."
        );
    }

    #[test]
    fn test_writer_after_completion() {
        let mut state = ProtocolState::new(&PROTOCOL);
        state.complete_step(2);
        let err = state.begin_write(0, StepKind::Scalar).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Expected call to 'close' but received call to 'write_header'."
        );
    }

    #[test]
    fn test_writer_premature_close() {
        let mut state = ProtocolState::new(&PROTOCOL);
        state.complete_step(0);
        state.enter_stream(1);
        state.end_stream();
        let err = state.check_writer_complete().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Protocol writer closed before all steps were called. Expected call to 'write_footer'."
        );
    }

    #[test]
    fn test_kind_mismatch() {
        let state = ProtocolState::new(&PROTOCOL);
        assert!(state.begin_write(0, StepKind::Stream).is_err());
        assert!(state.check_read(7, StepKind::Scalar).is_err());
    }

    #[test]
    fn test_reader_unconsumed_stream() {
        let mut state = ProtocolState::new(&PROTOCOL);
        state.check_read(0, StepKind::Scalar).unwrap();
        state.complete_step(0);
        state.check_read(1, StepKind::Stream).unwrap();
        state.enter_stream(1);

        let err = state.check_read(2, StepKind::Scalar).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Received call to 'read_footer' but the iterable returned by 'read_samples' was not fully consumed."
        );
        let err = state.check_reader_complete().unwrap_err();
        assert!(err.to_string().contains("'read_samples' was not fully consumed"));

        state.complete_step(1);
        state.check_read(2, StepKind::Scalar).unwrap();
        let err = state.check_reader_complete().unwrap_err();
        assert!(err.to_string().ends_with("Expected call to 'read_footer'."));
    }
}
