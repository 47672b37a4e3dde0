use std::fmt;

use thiserror::Error;

use crate::{error::ValidationError, PuzzleId, Tick};

pub mod composed;
pub mod lever;
pub mod mirror;
pub mod note_slots;
pub mod playback;
pub mod sequence;
pub mod target;
pub mod timer;

/// One discrete sub-element of a puzzle: a lever, a note, a key
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u32);

impl From<char> for ElementId {
    fn from(value: char) -> Self {
        ElementId(value as u32)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match char::from_u32(self.0) {
            Some(c) if c.is_ascii_alphanumeric() => write!(f, "'{}'", c),
            _ => write!(f, "element#{}", self.0),
        }
    }
}

/// Builds element ids from the characters of `text`, e.g. a target word
pub fn elements_from_str(text: &str) -> Vec<ElementId> {
    text.chars().map(ElementId::from).collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PuzzlePhase {
    Idle,
    PatternDisplay,
    Collecting,
    Playback,
    Solved,
    Failed,
}

/// A state transition of a puzzle, broadcast by the authority in a Notify
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PuzzleEvent {
    Activated {
        element: ElementId,
        correct_count: usize,
    },
    Deactivated {
        element: ElementId,
        correct_count: usize,
    },
    Failed {
        element: Option<ElementId>,
        reset_ticks: u16,
    },
    Solved,
    /// Back to `Idle`. Carries the re-derived target for puzzles that
    /// display one
    Reset {
        target: Option<Vec<ElementId>>,
    },
    PatternShown {
        pattern: Vec<ElementId>,
        display_ticks: u16,
    },
    CollectionStarted,
    SlotFilled {
        slot: usize,
        note: ElementId,
    },
    SlotCleared {
        slot: usize,
    },
    PlaybackStarted,
    PlaybackNote {
        index: usize,
        note: ElementId,
    },
}

/// Full state of a puzzle, sent to participants that join mid-session
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PuzzleSnapshot {
    pub phase: PuzzlePhase,
    pub partial: Vec<ElementId>,
    pub correct_count: usize,
    pub slots: Vec<Option<ElementId>>,
    pub shown_target: Option<Vec<ElementId>>,
}

/// Why a puzzle refused an operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PuzzleRejection {
    #[error("{operation} is not accepted while {phase:?}")]
    NotAccepting {
        phase: PuzzlePhase,
        operation: &'static str,
    },
    #[error("{0} is not part of this puzzle")]
    UnknownElement(ElementId),
    #[error("slot {0} is already occupied")]
    SlotOccupied(usize),
    #[error("slot {slot} is out of range ({slot_count} slots)")]
    SlotOutOfRange { slot: usize, slot_count: usize },
    #[error("{0} is not supported by this puzzle")]
    Unsupported(&'static str),
}

impl PuzzleRejection {
    pub fn into_validation(self, puzzle: PuzzleId) -> ValidationError {
        match self {
            PuzzleRejection::NotAccepting { phase, operation } => {
                ValidationError::PuzzleNotAccepting {
                    puzzle,
                    phase,
                    operation,
                }
            }
            PuzzleRejection::UnknownElement(element) => {
                ValidationError::UnknownElement { puzzle, element }
            }
            PuzzleRejection::SlotOccupied(slot) => ValidationError::SlotOccupied { puzzle, slot },
            PuzzleRejection::SlotOutOfRange { slot, slot_count } => {
                ValidationError::SlotOutOfRange {
                    puzzle,
                    slot,
                    slot_count,
                }
            }
            PuzzleRejection::Unsupported(operation) => {
                ValidationError::UnsupportedOperation { puzzle, operation }
            }
        }
    }
}

pub type PuzzleResult = Result<Vec<PuzzleEvent>, PuzzleRejection>;

/// A puzzle hosted by the authority. Every method is called from inside the
/// authority's simulation tick; the returned events are broadcast in order.
///
/// Operations must be idempotent: repeating one that already took effect
/// returns no events.
pub trait PuzzleMachine: Send {
    fn phase(&self) -> PuzzlePhase;

    fn activate(&mut self, element: ElementId) -> PuzzleResult;

    fn deactivate(&mut self, element: ElementId) -> PuzzleResult;

    fn start(&mut self, _tick: Tick) -> PuzzleResult {
        Err(PuzzleRejection::Unsupported("start"))
    }

    fn place(&mut self, _slot: usize, _note: ElementId) -> PuzzleResult {
        Err(PuzzleRejection::Unsupported("place"))
    }

    fn clear_slot(&mut self, _slot: usize) -> PuzzleResult {
        Err(PuzzleRejection::Unsupported("clear slot"))
    }

    /// Advances timers by one simulation tick
    fn tick(&mut self, tick: Tick) -> Vec<PuzzleEvent>;

    fn snapshot(&self) -> PuzzleSnapshot;
}

pub use composed::{ComposedPuzzle, ComposedPuzzleConfig};
pub use lever::{Lever, LeverConfig, LeverSignal, LEVER_ANGLE};
pub use mirror::PuzzleMirror;
pub use note_slots::NoteSlots;
pub use playback::{PlaybackMachine, PlaybackStep, PlaybackVerdict};
pub use sequence::{ActivationStyle, SequencePuzzle, SequencePuzzleConfig, TargetSource};
pub use target::derive_target;
pub use timer::TickTimer;
