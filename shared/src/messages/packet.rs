use crate::{
    error::ConnectionError,
    messages::{notify::Notify, request::Request},
    session::SessionDescriptor,
    ParticipantId, SequenceNumber, SessionId, Tick,
};

/// A remote invocation, stamped with the sender's sequence number and the
/// sender's simulation tick
#[derive(Clone, Debug, PartialEq)]
pub struct Envelope<T> {
    pub sequence: SequenceNumber,
    pub tick: Tick,
    pub payload: T,
}

impl<T> Envelope<T> {
    pub fn new(sequence: SequenceNumber, tick: Tick, payload: T) -> Self {
        Self {
            sequence,
            tick,
            payload,
        }
    }
}

/// Everything that travels between endpoints
#[derive(Clone, Debug, PartialEq)]
pub enum Packet {
    JoinRequest {
        name: String,
    },
    JoinAccepted {
        participant: ParticipantId,
        session: SessionId,
        tick: Tick,
    },
    JoinRejected {
        error: ConnectionError,
    },
    Leave,
    Heartbeat,
    DiscoveryProbe,
    DiscoveryReply {
        descriptor: SessionDescriptor,
    },
    Request(Envelope<Request>),
    Notify(Envelope<Notify>),
}

impl Packet {
    pub fn name(&self) -> &'static str {
        match self {
            Packet::JoinRequest { .. } => "join request",
            Packet::JoinAccepted { .. } => "join accepted",
            Packet::JoinRejected { .. } => "join rejected",
            Packet::Leave => "leave",
            Packet::Heartbeat => "heartbeat",
            Packet::DiscoveryProbe => "discovery probe",
            Packet::DiscoveryReply { .. } => "discovery reply",
            Packet::Request(_) => "request",
            Packet::Notify(_) => "notify",
        }
    }
}
