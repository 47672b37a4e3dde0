use crate::SequenceNumber;

/// Hands out the per-sender sequence numbers stamped on every envelope
#[derive(Clone, Debug, Default)]
pub struct OutgoingSequence {
    next: SequenceNumber,
}

impl OutgoingSequence {
    pub fn new() -> Self {
        Self { next: 0 }
    }

    pub fn starting_at(next: SequenceNumber) -> Self {
        Self { next }
    }

    pub fn next(&mut self) -> SequenceNumber {
        let sequence = self.next;
        self.next = self.next.wrapping_add(1);
        sequence
    }

    pub fn peek(&self) -> SequenceNumber {
        self.next
    }
}
