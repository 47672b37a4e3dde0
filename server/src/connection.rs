use log::warn;

use accord_shared::{
    Address, Endpoint, Envelope, Notify, OrderedReceiver, OutgoingSequence, Packet, ParticipantId,
    Request, Tick, TransportError,
};

/// The authority's view of one joined peer
pub struct Connection {
    pub address: Address,
    pub participant: ParticipantId,
    requests: OrderedReceiver<Envelope<Request>>,
    notify_sequence: OutgoingSequence,
    ticks_since_heard: u16,
}

impl Connection {
    pub fn new(address: Address, participant: ParticipantId) -> Self {
        Self {
            address,
            participant,
            requests: OrderedReceiver::new(),
            notify_sequence: OutgoingSequence::new(),
            ticks_since_heard: 0,
        }
    }

    /// Any packet from the peer counts as a sign of life
    pub fn mark_heard(&mut self) {
        self.ticks_since_heard = 0;
    }

    pub fn tick_silence(&mut self) -> u16 {
        self.ticks_since_heard = self.ticks_since_heard.saturating_add(1);
        self.ticks_since_heard
    }

    /// Arranges an incoming Request envelope, returning those now
    /// deliverable in the peer's send order
    pub fn receive_request(&mut self, envelope: Envelope<Request>) -> Vec<Envelope<Request>> {
        let sequence = envelope.sequence;
        self.requests.receive(sequence, envelope)
    }

    pub fn duplicate_requests(&self) -> u64 {
        self.requests.duplicates()
    }

    pub fn next_notify(&mut self, tick: Tick, notify: Notify) -> Packet {
        Packet::Notify(Envelope::new(self.notify_sequence.next(), tick, notify))
    }

    pub fn send(
        &mut self,
        endpoint: &Endpoint,
        tick: Tick,
        notify: Notify,
    ) -> Result<(), TransportError> {
        let packet = self.next_notify(tick, notify);
        endpoint.send(self.address, packet).inspect_err(|error| {
            warn!("failed to notify {}: {}", self.participant, error);
        })
    }
}
