use thiserror::Error;

use crate::SequenceNumber;

/// Errors that can occur while arranging incoming invocations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReceiverError {
    /// The sender ran too far ahead of the last delivered invocation
    #[error("Sequence {sequence} is {distance} ahead of the next expected {expected}, the reorder window is {window}")]
    WindowExceeded {
        sequence: SequenceNumber,
        expected: SequenceNumber,
        distance: u16,
        window: u16,
    },
}
