use accord_shared::{Notify, ParticipantId};

/// Who a queued Notify goes to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Recipient {
    All,
    Only(ParticipantId),
}

/// Every Notify issued during one tick, in issue order. Flushed once per
/// tick so all peers observe broadcasts in the same relative order
#[derive(Default)]
pub struct Outbox {
    queue: Vec<(Recipient, Notify)>,
}

impl Outbox {
    pub fn new() -> Self {
        Self { queue: Vec::new() }
    }

    pub fn broadcast(&mut self, notify: Notify) {
        self.queue.push((Recipient::All, notify));
    }

    pub fn send_to(&mut self, participant: ParticipantId, notify: Notify) {
        self.queue.push((Recipient::Only(participant), notify));
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn take(&mut self) -> Vec<(Recipient, Notify)> {
        std::mem::take(&mut self.queue)
    }
}
