use accord_shared::{
    puzzle::PuzzleEvent, ConnectionError, EntityId, Epoch, FieldId, ParticipantId, PuzzleId,
    SceneId, SceneOutcome, SequenceNumber, WorldError,
};

/// Something the authority told this client, after it was applied to the
/// local mirrors
#[derive(Clone, Debug, PartialEq)]
pub enum ClientEvent {
    RosterChanged,
    ReadyChanged {
        participant: ParticipantId,
        ready: bool,
    },
    SceneTransitionStarted {
        scene: SceneId,
    },
    /// The local scene loader finished and the authority was told
    SceneLoaded {
        scene: SceneId,
    },
    SceneReady(SceneOutcome),
    EntitySpawned {
        entity: EntityId,
        kind: String,
    },
    EntityUpdated {
        entity: EntityId,
        fields: Vec<FieldId>,
    },
    OwnershipChanged {
        entity: EntityId,
        owner: ParticipantId,
        epoch: Epoch,
    },
    EntityDespawned {
        entity: EntityId,
    },
    PuzzleSynced {
        puzzle: PuzzleId,
    },
    Puzzle {
        puzzle: PuzzleId,
        event: PuzzleEvent,
    },
    /// One of this client's Requests failed validation
    RequestRejected {
        sequence: SequenceNumber,
        reason: WorldError,
    },
    /// The session ended for this client. Re-joining is explicit
    Disconnected(ConnectionError),
}

/// A change to one mirrored entity, delivered to that entity's subscribers
#[derive(Clone, Debug, PartialEq)]
pub enum EntityChange {
    Updated { fields: Vec<FieldId> },
    OwnershipChanged { owner: ParticipantId, epoch: Epoch },
    Despawned,
}
