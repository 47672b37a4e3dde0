use std::collections::VecDeque;

use log::{debug, warn};

use crate::{messages::error::ReceiverError, sequence_less_than, SequenceNumber};

/// Default number of sequence numbers that may be buffered ahead of the next
/// expected one
pub const DEFAULT_REORDER_WINDOW: u16 = 1024;

enum Slot<T> {
    NotReceived,
    Received(T),
}

impl<T> Slot<T> {
    fn is_not_received(&self) -> bool {
        matches!(self, Slot::NotReceived)
    }
}

/// Delivers one sender's invocations in sequence order, exactly once.
///
/// Early arrivals wait in the buffer until the gap before them fills.
/// Anything already delivered, or already waiting, is a duplicate and is
/// dropped.
pub struct OrderedReceiver<T> {
    buffer: VecDeque<(SequenceNumber, Slot<T>)>,
    next_expected: SequenceNumber,
    window: u16,
    duplicates: u64,
}

impl<T> OrderedReceiver<T> {
    pub fn new() -> Self {
        Self::with_window(0, DEFAULT_REORDER_WINDOW)
    }

    pub fn starting_at(next_expected: SequenceNumber) -> Self {
        Self::with_window(next_expected, DEFAULT_REORDER_WINDOW)
    }

    pub fn with_window(next_expected: SequenceNumber, window: u16) -> Self {
        Self {
            buffer: VecDeque::new(),
            next_expected,
            window: window.max(1),
            duplicates: 0,
        }
    }

    pub fn next_expected(&self) -> SequenceNumber {
        self.next_expected
    }

    /// Number of duplicate invocations dropped so far
    pub fn duplicates(&self) -> u64 {
        self.duplicates
    }

    /// Number of invocations waiting for an earlier gap to fill
    pub fn pending(&self) -> usize {
        self.buffer
            .iter()
            .filter(|(_, slot)| !slot.is_not_received())
            .count()
    }

    /// Accepts an invocation and returns everything now deliverable, in order
    pub fn try_receive(
        &mut self,
        sequence: SequenceNumber,
        payload: T,
    ) -> Result<Vec<T>, ReceiverError> {
        if sequence_less_than(sequence, self.next_expected) {
            debug!("dropping already delivered sequence {}", sequence);
            self.duplicates += 1;
            return Ok(Vec::new());
        }

        let distance = sequence.wrapping_sub(self.next_expected);
        if distance >= self.window {
            return Err(ReceiverError::WindowExceeded {
                sequence,
                expected: self.next_expected,
                distance,
                window: self.window,
            });
        }

        // Put the payload where it needs to go in the buffer
        let index = distance as usize;
        while self.buffer.len() <= index {
            let filler = self.next_expected.wrapping_add(self.buffer.len() as u16);
            self.buffer.push_back((filler, Slot::NotReceived));
        }
        let Some((_, slot)) = self.buffer.get_mut(index) else {
            return Ok(Vec::new());
        };
        if !slot.is_not_received() {
            debug!("dropping duplicate of buffered sequence {}", sequence);
            self.duplicates += 1;
            return Ok(Vec::new());
        }
        *slot = Slot::Received(payload);

        // Pop payloads out in order
        let mut output = Vec::new();
        while let Some((_, Slot::Received(_))) = self.buffer.front() {
            if let Some((_, Slot::Received(payload))) = self.buffer.pop_front() {
                output.push(payload);
                self.next_expected = self.next_expected.wrapping_add(1);
            }
        }
        Ok(output)
    }

    /// Like [`OrderedReceiver::try_receive`], but drops the invocation with a
    /// warning when it falls outside the reorder window
    pub fn receive(&mut self, sequence: SequenceNumber, payload: T) -> Vec<T> {
        match self.try_receive(sequence, payload) {
            Ok(delivered) => delivered,
            Err(error) => {
                warn!("{}", error);
                Vec::new()
            }
        }
    }
}

impl<T> Default for OrderedReceiver<T> {
    fn default() -> Self {
        Self::new()
    }
}
