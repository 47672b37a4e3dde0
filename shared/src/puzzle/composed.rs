use log::info;

use crate::{
    puzzle::{
        note_slots::NoteSlots,
        playback::{PlaybackMachine, PlaybackStep, PlaybackVerdict},
        target::derive_target,
        timer::TickTimer,
        ElementId, PuzzleEvent, PuzzleMachine, PuzzlePhase, PuzzleRejection, PuzzleResult,
        PuzzleSnapshot,
    },
    Tick,
};

#[derive(Clone, Debug)]
pub struct ComposedPuzzleConfig {
    /// Notes the pattern is drawn from
    pub pool: Vec<ElementId>,
    /// Pattern length, also the number of slots
    pub length: usize,
    /// How long the pattern is shown before collection begins
    pub display_ticks: u16,
    /// Ticks between notes during playback
    pub playback_step_ticks: u16,
    pub reset_ticks: u16,
}

/// Pattern display, then collection into note slots, then ordered playback
/// of the slots against the pattern.
///
/// Display is gated by a countdown, playback by the nested
/// [`PlaybackMachine`] reporting completion.
pub struct ComposedPuzzle {
    config: ComposedPuzzleConfig,
    phase: PuzzlePhase,
    target: Vec<ElementId>,
    display_timer: TickTimer,
    slots: NoteSlots,
    playback: Option<PlaybackMachine>,
    reset_timer: TickTimer,
}

impl ComposedPuzzle {
    pub fn new(config: ComposedPuzzleConfig, tick: Tick) -> Self {
        let target = derive_target(&config.pool, config.length, tick);
        let slots = NoteSlots::new(target.len());
        Self {
            config,
            phase: PuzzlePhase::Idle,
            target,
            display_timer: TickTimer::new(),
            slots,
            playback: None,
            reset_timer: TickTimer::new(),
        }
    }

    pub fn target(&self) -> &[ElementId] {
        &self.target
    }

    pub fn slots(&self) -> &NoteSlots {
        &self.slots
    }

    fn require_phase(&self, phase: PuzzlePhase, operation: &'static str) -> Result<(), PuzzleRejection> {
        if self.phase != phase {
            return Err(PuzzleRejection::NotAccepting {
                phase: self.phase,
                operation,
            });
        }
        Ok(())
    }

    fn on_playback_complete(&mut self, verdict: PlaybackVerdict) -> Vec<PuzzleEvent> {
        self.playback = None;
        match verdict {
            PlaybackVerdict::Correct => {
                info!("composed puzzle solved");
                self.phase = PuzzlePhase::Solved;
                vec![PuzzleEvent::Solved]
            }
            PlaybackVerdict::Wrong { index, note } => {
                info!("composed puzzle failed at note {} ({})", index, note);
                self.phase = PuzzlePhase::Failed;
                self.reset_timer.arm(self.config.reset_ticks);
                vec![PuzzleEvent::Failed {
                    element: Some(note),
                    reset_ticks: self.config.reset_ticks,
                }]
            }
        }
    }

    fn reset(&mut self, tick: Tick) -> PuzzleEvent {
        self.phase = PuzzlePhase::Idle;
        self.slots.reset();
        self.playback = None;
        self.display_timer.cancel();
        self.target = derive_target(&self.config.pool, self.config.length, tick);
        PuzzleEvent::Reset {
            target: Some(self.target.clone()),
        }
    }
}

impl PuzzleMachine for ComposedPuzzle {
    fn phase(&self) -> PuzzlePhase {
        self.phase
    }

    fn activate(&mut self, _element: ElementId) -> PuzzleResult {
        Err(PuzzleRejection::Unsupported("activate"))
    }

    fn deactivate(&mut self, _element: ElementId) -> PuzzleResult {
        Err(PuzzleRejection::Unsupported("deactivate"))
    }

    fn start(&mut self, _tick: Tick) -> PuzzleResult {
        if self.phase != PuzzlePhase::Idle {
            // already running, a repeated start changes nothing
            return Ok(Vec::new());
        }
        self.phase = PuzzlePhase::PatternDisplay;
        self.display_timer.arm(self.config.display_ticks);
        Ok(vec![PuzzleEvent::PatternShown {
            pattern: self.target.clone(),
            display_ticks: self.config.display_ticks,
        }])
    }

    fn place(&mut self, slot: usize, note: ElementId) -> PuzzleResult {
        self.require_phase(PuzzlePhase::Collecting, "place")?;
        if !self.config.pool.contains(&note) {
            return Err(PuzzleRejection::UnknownElement(note));
        }
        if !self.slots.place(slot, note)? {
            return Ok(Vec::new());
        }

        let mut events = vec![PuzzleEvent::SlotFilled { slot, note }];
        if let Some(notes) = self.slots.contents() {
            self.phase = PuzzlePhase::Playback;
            self.playback = Some(PlaybackMachine::new(
                notes,
                self.target.clone(),
                self.config.playback_step_ticks,
            ));
            events.push(PuzzleEvent::PlaybackStarted);
        }
        Ok(events)
    }

    fn clear_slot(&mut self, slot: usize) -> PuzzleResult {
        self.require_phase(PuzzlePhase::Collecting, "clear slot")?;
        if !self.slots.clear(slot)? {
            return Ok(Vec::new());
        }
        Ok(vec![PuzzleEvent::SlotCleared { slot }])
    }

    fn tick(&mut self, tick: Tick) -> Vec<PuzzleEvent> {
        match self.phase {
            PuzzlePhase::PatternDisplay => {
                if self.display_timer.tick() {
                    self.phase = PuzzlePhase::Collecting;
                    return vec![PuzzleEvent::CollectionStarted];
                }
                Vec::new()
            }
            PuzzlePhase::Playback => {
                let Some(playback) = self.playback.as_mut() else {
                    return Vec::new();
                };
                match playback.tick() {
                    PlaybackStep::Waiting => Vec::new(),
                    PlaybackStep::Note { index, note } => {
                        vec![PuzzleEvent::PlaybackNote { index, note }]
                    }
                    PlaybackStep::Complete(verdict) => self.on_playback_complete(verdict),
                }
            }
            PuzzlePhase::Failed => {
                if self.reset_timer.tick() {
                    return vec![self.reset(tick)];
                }
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn snapshot(&self) -> PuzzleSnapshot {
        let shown_target = match self.phase {
            PuzzlePhase::Idle | PuzzlePhase::Collecting => None,
            _ => Some(self.target.clone()),
        };
        PuzzleSnapshot {
            phase: self.phase,
            partial: Vec::new(),
            correct_count: 0,
            slots: self.slots.slots().to_vec(),
            shown_target,
        }
    }
}
