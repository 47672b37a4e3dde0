use thiserror::Error;

use crate::{
    puzzle::{ElementId, PuzzlePhase},
    scene::SceneId,
    transport::Address,
    EntityId, Epoch, ParticipantId, PuzzleId, SessionId,
};

/// Transport-level failures. These are retryable, but never retried
/// automatically
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    #[error("Timed out after {waited_ms}ms waiting for {address} to accept the connection")]
    TimedOut { address: Address, waited_ms: u64 },

    #[error("No endpoint is bound at {address}")]
    Unreachable { address: Address },

    #[error("Session {session} is full ({max_players} participants)")]
    SessionFull { session: SessionId, max_players: usize },

    #[error("Connection was rejected: {reason}")]
    Rejected { reason: String },

    #[error("Connection to the session was closed: {reason}")]
    Closed { reason: String },
}

impl ConnectionError {
    /// Whether an explicit retry by the caller could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            ConnectionError::TimedOut { .. }
            | ConnectionError::Unreachable { .. }
            | ConnectionError::SessionFull { .. }
            | ConnectionError::Closed { .. } => true,
            ConnectionError::Rejected { .. } => false,
        }
    }
}

/// A Request that violates a precondition. Rejected by the authority
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Slot {slot} of {puzzle} is already occupied")]
    SlotOccupied { puzzle: PuzzleId, slot: usize },

    #[error("Slot {slot} is out of range, {puzzle} has {slot_count} slots")]
    SlotOutOfRange {
        puzzle: PuzzleId,
        slot: usize,
        slot_count: usize,
    },

    #[error("{puzzle} does not accept {operation} while {phase:?}")]
    PuzzleNotAccepting {
        puzzle: PuzzleId,
        phase: PuzzlePhase,
        operation: &'static str,
    },

    #[error("{puzzle} has no element {element}")]
    UnknownElement { puzzle: PuzzleId, element: ElementId },

    #[error("{puzzle} does not support {operation}")]
    UnsupportedOperation {
        puzzle: PuzzleId,
        operation: &'static str,
    },

    #[error("No puzzle {puzzle} is hosted in this session")]
    UnknownPuzzle { puzzle: PuzzleId },

    #[error("No entity {entity} exists in this session")]
    UnknownEntity { entity: EntityId },

    #[error("{entity} is held by {owner}")]
    EntityHeld { entity: EntityId, owner: ParticipantId },

    #[error("Entity spawns are held until scene {scene} has loaded on every peer")]
    SceneNotReady { scene: SceneId },

    #[error("A scene transition to {scene} is already in progress")]
    SceneTransitionInProgress { scene: SceneId },

    #[error("{participant} reported loading {reported}, but the session is loading {expected:?}")]
    UnexpectedScene {
        participant: ParticipantId,
        reported: SceneId,
        expected: Option<SceneId>,
    },

    #[error("Not every participant is ready")]
    NotAllReady,

    #[error("{count} participants connected, {required} required")]
    NotEnoughPlayers { count: usize, required: usize },

    #[error("{participant} is not registered in this session")]
    UnknownParticipant { participant: ParticipantId },
}

/// A bounded wait that ran out
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeoutError {
    #[error("Session discovery window of {window_ms}ms elapsed with {unanswered} hosts unanswered")]
    Discovery { window_ms: u64, unanswered: usize },

    #[error("Scene {scene} did not finish loading on {stragglers} participants in time")]
    SceneLoad { scene: SceneId, stragglers: usize },

    #[error("Handshake with {address} did not complete within {waited_ms}ms")]
    Handshake { address: Address, waited_ms: u64 },
}

/// A message arriving at, or from, the wrong participant. Always dropped
/// without notifying anyone
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorityMismatchError {
    #[error("{operation} may only be executed by the session authority")]
    NotAuthority { operation: &'static str },

    #[error("{writer} attempted to write {entity}, which is owned by {owner}")]
    NotOwner {
        entity: EntityId,
        writer: ParticipantId,
        owner: ParticipantId,
    },

    #[error("Update for {entity} carries stale epoch {received:?}, current epoch is {current:?}")]
    StaleEpoch {
        entity: EntityId,
        received: Epoch,
        current: Epoch,
    },
}
