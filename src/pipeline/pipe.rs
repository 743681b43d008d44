//! Capacity-1 pipe between two adjacent stages.
//!
//! The coordinator hands records over synchronously: a write is immediately
//! followed by the consumer's read, so a pipe never holds more than one
//! unconsumed record. A second write before that read is a capacity violation
//! and fails with [`PipeError::Full`] rather than buffering.

use crate::pipeline::error::PipeError;
use crate::pipeline::record::Record;
use crate::pipeline::stop::StopToken;

/// Result of [`Pipe::read`].
#[derive(Debug, Clone, PartialEq)]
pub enum PipeRead {
    Record(Record),
    /// Open but nothing pending.
    Empty,
    /// Closed and drained. No record will ever follow.
    EndOfInput,
}

#[derive(Debug)]
pub struct Pipe {
    slot: Option<Record>,
    closed: bool,
    stop: StopToken,
    written: u64,
    read: u64,
}

impl Pipe {
    pub fn new(stop: StopToken) -> Self {
        Self {
            slot: None,
            closed: false,
            stop,
            written: 0,
            read: 0,
        }
    }

    /// Place `record` in the slot.
    pub fn write(&mut self, record: Record) -> Result<(), PipeError> {
        if self.stop.is_signaled() {
            return Err(PipeError::Stopped);
        }
        if self.closed {
            return Err(PipeError::Closed);
        }
        if self.slot.is_some() {
            return Err(PipeError::Full);
        }
        self.slot = Some(record);
        self.written += 1;
        Ok(())
    }

    /// Take the pending record, if any.
    ///
    /// A stopped pipe reads as closed so a reader never waits on a halted
    /// producer.
    pub fn read(&mut self) -> PipeRead {
        if let Some(record) = self.slot.take() {
            self.read += 1;
            return PipeRead::Record(record);
        }
        if self.closed || self.stop.is_signaled() {
            PipeRead::EndOfInput
        } else {
            PipeRead::Empty
        }
    }

    /// No further writes. Idempotent; a pending record can still be read.
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Number of unconsumed records (0 or 1).
    pub fn pending(&self) -> usize {
        usize::from(self.slot.is_some())
    }

    /// Total records written and read over the pipe's life.
    pub fn counts(&self) -> (u64, u64) {
        (self.written, self.read)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::id::CommandId;
    use crate::pipeline::record::{RecordPayload, RecordSequencer, RecordSource};
    use crate::types::Value;

    fn record(seq: &mut RecordSequencer, n: i64) -> Record {
        seq.emit(
            RecordPayload::Object(Value::Int(n)),
            RecordSource::new(CommandId(0), "Gen"),
        )
    }

    #[test]
    fn test_capacity_one() {
        let mut seq = RecordSequencer::new();
        let mut pipe = Pipe::new(StopToken::new());
        pipe.write(record(&mut seq, 1)).unwrap();
        assert_eq!(pipe.pending(), 1);
        assert_eq!(pipe.write(record(&mut seq, 2)), Err(PipeError::Full));

        let PipeRead::Record(first) = pipe.read() else {
            panic!("expected a record");
        };
        assert_eq!(first.as_object(), Some(&Value::Int(1)));
        assert_eq!(pipe.read(), PipeRead::Empty);
        assert_eq!(pipe.counts(), (1, 1));
    }

    #[test]
    fn test_close_drains_then_end_of_input() {
        let mut seq = RecordSequencer::new();
        let mut pipe = Pipe::new(StopToken::new());
        pipe.write(record(&mut seq, 1)).unwrap();
        pipe.close();
        pipe.close();
        assert!(pipe.is_closed());
        assert_eq!(pipe.write(record(&mut seq, 2)), Err(PipeError::Closed));
        assert!(matches!(pipe.read(), PipeRead::Record(_)));
        assert_eq!(pipe.read(), PipeRead::EndOfInput);
        assert_eq!(pipe.read(), PipeRead::EndOfInput);
    }

    #[test]
    fn test_stopped_pipe() {
        let mut seq = RecordSequencer::new();
        let stop = StopToken::new();
        let mut pipe = Pipe::new(stop.clone());
        stop.signal();
        assert_eq!(pipe.write(record(&mut seq, 1)), Err(PipeError::Stopped));
        assert_eq!(pipe.read(), PipeRead::EndOfInput);
    }
}
