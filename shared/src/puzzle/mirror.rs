use crate::puzzle::{ElementId, PuzzleEvent, PuzzlePhase, PuzzleSnapshot};

/// A peer's read-only view of a puzzle, rebuilt from the authority's
/// Notifies
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PuzzleMirror {
    pub phase: PuzzlePhase,
    pub partial: Vec<ElementId>,
    pub correct_count: usize,
    pub slots: Vec<Option<ElementId>>,
    pub shown_target: Option<Vec<ElementId>>,
    pub last_played: Option<ElementId>,
}

impl PuzzleMirror {
    pub fn new() -> Self {
        Self {
            phase: PuzzlePhase::Idle,
            partial: Vec::new(),
            correct_count: 0,
            slots: Vec::new(),
            shown_target: None,
            last_played: None,
        }
    }

    pub fn from_snapshot(snapshot: PuzzleSnapshot) -> Self {
        Self {
            phase: snapshot.phase,
            partial: snapshot.partial,
            correct_count: snapshot.correct_count,
            slots: snapshot.slots,
            shown_target: snapshot.shown_target,
            last_played: None,
        }
    }

    pub fn apply(&mut self, event: &PuzzleEvent) {
        match event {
            PuzzleEvent::Activated {
                element,
                correct_count,
            } => {
                self.partial.push(*element);
                self.correct_count = *correct_count;
                self.phase = PuzzlePhase::Collecting;
            }
            PuzzleEvent::Deactivated {
                element,
                correct_count,
            } => {
                self.partial.retain(|active| active != element);
                self.correct_count = *correct_count;
                if self.partial.is_empty() {
                    self.phase = PuzzlePhase::Idle;
                }
            }
            PuzzleEvent::Failed { .. } => {
                self.phase = PuzzlePhase::Failed;
            }
            PuzzleEvent::Solved => {
                self.phase = PuzzlePhase::Solved;
            }
            PuzzleEvent::Reset { target } => {
                self.phase = PuzzlePhase::Idle;
                self.partial.clear();
                self.correct_count = 0;
                for slot in self.slots.iter_mut() {
                    *slot = None;
                }
                self.last_played = None;
                if target.is_some() {
                    self.shown_target = target.clone();
                }
            }
            PuzzleEvent::PatternShown { pattern, .. } => {
                self.phase = PuzzlePhase::PatternDisplay;
                self.shown_target = Some(pattern.clone());
                self.slots = vec![None; pattern.len()];
            }
            PuzzleEvent::CollectionStarted => {
                self.phase = PuzzlePhase::Collecting;
            }
            PuzzleEvent::SlotFilled { slot, note } => {
                if *slot >= self.slots.len() {
                    self.slots.resize(slot + 1, None);
                }
                self.slots[*slot] = Some(*note);
            }
            PuzzleEvent::SlotCleared { slot } => {
                if let Some(entry) = self.slots.get_mut(*slot) {
                    *entry = None;
                }
            }
            PuzzleEvent::PlaybackStarted => {
                self.phase = PuzzlePhase::Playback;
            }
            PuzzleEvent::PlaybackNote { note, .. } => {
                self.last_played = Some(*note);
            }
        }
    }
}

impl Default for PuzzleMirror {
    fn default() -> Self {
        Self::new()
    }
}
