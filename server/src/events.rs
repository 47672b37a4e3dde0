use std::{mem, vec::IntoIter};

use accord_shared::{
    puzzle::PuzzleEvent, ParticipantId, PuzzleId, SceneOutcome, Tick, WorldError,
};

use crate::AccordServerError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DisconnectReason {
    Left,
    TimedOut,
    /// Its endpoint went away while a Notify was being sent to it
    Unreachable,
    SessionClosed,
}

/// Everything that happened on the authority since the last read
pub struct Events {
    connections: Vec<ParticipantId>,
    disconnections: Vec<(ParticipantId, DisconnectReason)>,
    ready_changes: Vec<(ParticipantId, bool)>,
    scene_outcomes: Vec<SceneOutcome>,
    puzzle_events: Vec<(PuzzleId, PuzzleEvent)>,
    rejections: Vec<(ParticipantId, &'static str, WorldError)>,
    ticks: Vec<Tick>,
    errors: Vec<AccordServerError>,

    empty: bool,
}

impl Events {
    pub(crate) fn new() -> Self {
        Self {
            connections: Vec::new(),
            disconnections: Vec::new(),
            ready_changes: Vec::new(),
            scene_outcomes: Vec::new(),
            puzzle_events: Vec::new(),
            rejections: Vec::new(),
            ticks: Vec::new(),
            errors: Vec::new(),

            empty: true,
        }
    }

    // Public

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    pub fn read<V: Event>(&mut self) -> V::Iter {
        V::iter(self)
    }

    pub fn has<V: Event>(&self) -> bool {
        V::has(self)
    }

    /// Moves every event of `other` to the end of this batch
    pub fn append(&mut self, mut other: Events) {
        if other.empty {
            return;
        }
        self.connections.append(&mut other.connections);
        self.disconnections.append(&mut other.disconnections);
        self.ready_changes.append(&mut other.ready_changes);
        self.scene_outcomes.append(&mut other.scene_outcomes);
        self.puzzle_events.append(&mut other.puzzle_events);
        self.rejections.append(&mut other.rejections);
        self.ticks.append(&mut other.ticks);
        self.errors.append(&mut other.errors);
        self.empty = false;
    }

    // Crate-public

    pub(crate) fn push_connection(&mut self, participant: ParticipantId) {
        self.connections.push(participant);
        self.empty = false;
    }

    pub(crate) fn push_disconnection(&mut self, participant: ParticipantId, reason: DisconnectReason) {
        self.disconnections.push((participant, reason));
        self.empty = false;
    }

    pub(crate) fn push_ready_change(&mut self, participant: ParticipantId, ready: bool) {
        self.ready_changes.push((participant, ready));
        self.empty = false;
    }

    pub(crate) fn push_scene_outcome(&mut self, outcome: SceneOutcome) {
        self.scene_outcomes.push(outcome);
        self.empty = false;
    }

    pub(crate) fn push_puzzle_event(&mut self, puzzle: PuzzleId, event: PuzzleEvent) {
        self.puzzle_events.push((puzzle, event));
        self.empty = false;
    }

    pub(crate) fn push_rejection(
        &mut self,
        participant: ParticipantId,
        request: &'static str,
        reason: WorldError,
    ) {
        self.rejections.push((participant, request, reason));
        self.empty = false;
    }

    pub(crate) fn push_tick(&mut self, tick: Tick) {
        self.ticks.push(tick);
        self.empty = false;
    }

    pub(crate) fn push_error(&mut self, error: AccordServerError) {
        self.errors.push(error);
        self.empty = false;
    }
}

impl Default for Events {
    fn default() -> Self {
        Self::new()
    }
}

// Event Trait
pub trait Event {
    type Iter;

    fn iter(events: &mut Events) -> Self::Iter;

    fn has(events: &Events) -> bool;
}

// ConnectEvent
pub struct ConnectEvent;
impl Event for ConnectEvent {
    type Iter = IntoIter<ParticipantId>;

    fn iter(events: &mut Events) -> Self::Iter {
        mem::take(&mut events.connections).into_iter()
    }

    fn has(events: &Events) -> bool {
        !events.connections.is_empty()
    }
}

// DisconnectEvent
pub struct DisconnectEvent;
impl Event for DisconnectEvent {
    type Iter = IntoIter<(ParticipantId, DisconnectReason)>;

    fn iter(events: &mut Events) -> Self::Iter {
        mem::take(&mut events.disconnections).into_iter()
    }

    fn has(events: &Events) -> bool {
        !events.disconnections.is_empty()
    }
}

// ReadyEvent
pub struct ReadyEvent;
impl Event for ReadyEvent {
    type Iter = IntoIter<(ParticipantId, bool)>;

    fn iter(events: &mut Events) -> Self::Iter {
        mem::take(&mut events.ready_changes).into_iter()
    }

    fn has(events: &Events) -> bool {
        !events.ready_changes.is_empty()
    }
}

// SceneReadyEvent
pub struct SceneReadyEvent;
impl Event for SceneReadyEvent {
    type Iter = IntoIter<SceneOutcome>;

    fn iter(events: &mut Events) -> Self::Iter {
        mem::take(&mut events.scene_outcomes).into_iter()
    }

    fn has(events: &Events) -> bool {
        !events.scene_outcomes.is_empty()
    }
}

// PuzzleStateEvent
pub struct PuzzleStateEvent;
impl Event for PuzzleStateEvent {
    type Iter = IntoIter<(PuzzleId, PuzzleEvent)>;

    fn iter(events: &mut Events) -> Self::Iter {
        mem::take(&mut events.puzzle_events).into_iter()
    }

    fn has(events: &Events) -> bool {
        !events.puzzle_events.is_empty()
    }
}

// RejectEvent
pub struct RejectEvent;
impl Event for RejectEvent {
    type Iter = IntoIter<(ParticipantId, &'static str, WorldError)>;

    fn iter(events: &mut Events) -> Self::Iter {
        mem::take(&mut events.rejections).into_iter()
    }

    fn has(events: &Events) -> bool {
        !events.rejections.is_empty()
    }
}

// TickEvent
pub struct TickEvent;
impl Event for TickEvent {
    type Iter = IntoIter<Tick>;

    fn iter(events: &mut Events) -> Self::Iter {
        mem::take(&mut events.ticks).into_iter()
    }

    fn has(events: &Events) -> bool {
        !events.ticks.is_empty()
    }
}

// ErrorEvent
pub struct ErrorEvent;
impl Event for ErrorEvent {
    type Iter = IntoIter<AccordServerError>;

    fn iter(events: &mut Events) -> Self::Iter {
        mem::take(&mut events.errors).into_iter()
    }

    fn has(events: &Events) -> bool {
        !events.errors.is_empty()
    }
}
