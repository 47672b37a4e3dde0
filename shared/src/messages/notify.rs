use crate::{
    participant::Participant,
    puzzle::{PuzzleEvent, PuzzleSnapshot},
    scene::{SceneId, SceneOutcome},
    world::{field::FieldUpdate, ownership::Epoch, replica_world::EntityUpdate, WorldError},
    EntityId, ParticipantId, PuzzleId, SequenceNumber,
};

/// A state change broadcast by the authority. Peers apply these to their
/// read-only mirrors in the order they were issued
#[derive(Clone, Debug, PartialEq)]
pub enum Notify {
    RosterChanged {
        participants: Vec<Participant>,
    },
    ReadyChanged {
        participant: ParticipantId,
        ready: bool,
    },
    SceneTransitionStarted {
        scene: SceneId,
    },
    SceneReady {
        outcome: SceneOutcome,
    },
    EntitySpawned {
        entity: EntityId,
        kind: String,
        owner: ParticipantId,
        epoch: Epoch,
        fields: Vec<FieldUpdate>,
    },
    EntityUpdated(EntityUpdate),
    OwnershipChanged {
        entity: EntityId,
        owner: ParticipantId,
        epoch: Epoch,
    },
    EntityDespawned {
        entity: EntityId,
    },
    /// Full puzzle state, sent when a puzzle is hosted and to late joiners
    PuzzleSnapshot {
        puzzle: PuzzleId,
        snapshot: PuzzleSnapshot,
    },
    Puzzle {
        puzzle: PuzzleId,
        event: PuzzleEvent,
    },
    /// Sent only to the requester
    RequestRejected {
        sequence: SequenceNumber,
        reason: WorldError,
    },
    SessionClosed {
        reason: String,
    },
}

impl Notify {
    pub fn name(&self) -> &'static str {
        match self {
            Notify::RosterChanged { .. } => "roster changed",
            Notify::ReadyChanged { .. } => "ready changed",
            Notify::SceneTransitionStarted { .. } => "scene transition started",
            Notify::SceneReady { .. } => "scene ready",
            Notify::EntitySpawned { .. } => "entity spawned",
            Notify::EntityUpdated(_) => "entity updated",
            Notify::OwnershipChanged { .. } => "ownership changed",
            Notify::EntityDespawned { .. } => "entity despawned",
            Notify::PuzzleSnapshot { .. } => "puzzle snapshot",
            Notify::Puzzle { .. } => "puzzle",
            Notify::RequestRejected { .. } => "request rejected",
            Notify::SessionClosed { .. } => "session closed",
        }
    }
}
