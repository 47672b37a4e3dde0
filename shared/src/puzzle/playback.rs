use crate::puzzle::{
    sequence::{SequencePuzzle, SequencePuzzleConfig},
    timer::TickTimer,
    ElementId, PuzzleEvent, PuzzleMachine, PuzzlePhase,
};

/// Result handed to the owner of a [`PlaybackMachine`] when it completes
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlaybackVerdict {
    Correct,
    /// The note at `index` did not match the target
    Wrong { index: usize, note: ElementId },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlaybackStep {
    Waiting,
    Note { index: usize, note: ElementId },
    Complete(PlaybackVerdict),
}

/// Plays a row of notes back one per step, feeding each into a nested
/// sequence check. Stops at the first wrong note
pub struct PlaybackMachine {
    notes: Vec<ElementId>,
    cursor: usize,
    step_ticks: u16,
    step_timer: TickTimer,
    check: SequencePuzzle,
    verdict: Option<PlaybackVerdict>,
}

impl PlaybackMachine {
    pub fn new(notes: Vec<ElementId>, target: Vec<ElementId>, step_ticks: u16) -> Self {
        let mut step_timer = TickTimer::new();
        step_timer.arm(step_ticks);
        Self {
            notes,
            cursor: 0,
            step_ticks,
            step_timer,
            check: SequencePuzzle::new(SequencePuzzleConfig::keys(target, 0), 0),
            verdict: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.verdict.is_some()
    }

    pub fn tick(&mut self) -> PlaybackStep {
        if let Some(verdict) = &self.verdict {
            return PlaybackStep::Complete(verdict.clone());
        }
        if !self.step_timer.tick() {
            return PlaybackStep::Waiting;
        }

        let Some(note) = self.notes.get(self.cursor).copied() else {
            let verdict = if self.check.phase() == PuzzlePhase::Solved {
                PlaybackVerdict::Correct
            } else {
                PlaybackVerdict::Wrong {
                    index: self.cursor,
                    note: ElementId(0),
                }
            };
            self.verdict = Some(verdict.clone());
            return PlaybackStep::Complete(verdict);
        };

        let index = self.cursor;
        self.cursor += 1;
        let events = self.check.activate(note).unwrap_or_default();
        let failed = events
            .iter()
            .any(|event| matches!(event, PuzzleEvent::Failed { .. }));
        if failed || (self.check.phase() != PuzzlePhase::Solved && self.cursor == self.notes.len())
        {
            // the last note still plays; the verdict lands on the next step
            self.verdict = Some(PlaybackVerdict::Wrong { index, note });
            self.cursor = self.notes.len();
        }
        self.step_timer.arm(self.step_ticks);
        PlaybackStep::Note { index, note }
    }

    /// Decided as soon as a wrong note plays, or after the last note
    pub fn verdict(&self) -> Option<&PlaybackVerdict> {
        self.verdict.as_ref()
    }
}
