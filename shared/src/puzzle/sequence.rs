use log::{debug, info};

use crate::{
    puzzle::{
        target::derive_target, timer::TickTimer, ElementId, PuzzleEvent, PuzzleMachine,
        PuzzlePhase, PuzzleRejection, PuzzleResult, PuzzleSnapshot,
    },
    Tick,
};

/// Where a sequence puzzle's target comes from
#[derive(Clone, Debug)]
pub enum TargetSource {
    Fixed(Vec<ElementId>),
    /// Re-derived from `pool`, seeded by the tick, on every reset. The
    /// target is shown to players
    Random { pool: Vec<ElementId>, length: usize },
}

/// How an element behaves once activated
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ActivationStyle {
    /// Stays on until deactivated, so it appears in the partial sequence at
    /// most once. Levers and switches
    #[default]
    Toggle,
    /// Springs back at once; every activation appends, and the target may
    /// repeat elements. Piano keys
    Press,
}

#[derive(Clone, Debug)]
pub struct SequencePuzzleConfig {
    pub target: TargetSource,
    /// Ticks between a failure and the automatic reset to `Idle`
    pub reset_ticks: u16,
    /// Elements that may be activated. `None` accepts any element
    pub elements: Option<Vec<ElementId>>,
    pub style: ActivationStyle,
}

impl SequencePuzzleConfig {
    pub fn fixed(target: Vec<ElementId>, reset_ticks: u16) -> Self {
        Self {
            target: TargetSource::Fixed(target),
            reset_ticks,
            elements: None,
            style: ActivationStyle::Toggle,
        }
    }

    /// A fixed melody played on keys
    pub fn keys(target: Vec<ElementId>, reset_ticks: u16) -> Self {
        Self {
            style: ActivationStyle::Press,
            ..Self::fixed(target, reset_ticks)
        }
    }
}

/// Elements must be activated in the order of a target sequence.
///
/// Each activation is checked against the next expected position at the
/// moment it arrives, so a wrong activation fails the puzzle immediately.
/// Deactivating a toggled element removes it from the partial sequence; the
/// correct-count is the length of the prefix that still matches. Pressed
/// elements are never deactivated.
pub struct SequencePuzzle {
    config: SequencePuzzleConfig,
    phase: PuzzlePhase,
    partial: Vec<ElementId>,
    target: Vec<ElementId>,
    reset_timer: TickTimer,
}

impl SequencePuzzle {
    pub fn new(config: SequencePuzzleConfig, tick: Tick) -> Self {
        let target = match &config.target {
            TargetSource::Fixed(target) => target.clone(),
            TargetSource::Random { pool, length } => derive_target(pool, *length, tick),
        };
        Self {
            config,
            phase: PuzzlePhase::Idle,
            partial: Vec::new(),
            target,
            reset_timer: TickTimer::new(),
        }
    }

    pub fn partial(&self) -> &[ElementId] {
        &self.partial
    }

    pub fn target(&self) -> &[ElementId] {
        &self.target
    }

    pub fn reset_timer(&self) -> &TickTimer {
        &self.reset_timer
    }

    /// Length of the prefix of the partial sequence that matches the target.
    /// Entries after the first mismatch never count
    pub fn correct_count(&self) -> usize {
        self.partial
            .iter()
            .zip(self.target.iter())
            .take_while(|(activated, expected)| activated == expected)
            .count()
    }

    fn shows_target(&self) -> bool {
        matches!(self.config.target, TargetSource::Random { .. })
    }

    fn check_element(&self, element: ElementId) -> Result<(), PuzzleRejection> {
        match &self.config.elements {
            Some(elements) if !elements.contains(&element) => {
                Err(PuzzleRejection::UnknownElement(element))
            }
            _ => Ok(()),
        }
    }

    fn check_accepting(&self, operation: &'static str) -> Result<(), PuzzleRejection> {
        match self.phase {
            PuzzlePhase::Solved | PuzzlePhase::Failed => Err(PuzzleRejection::NotAccepting {
                phase: self.phase,
                operation,
            }),
            _ => Ok(()),
        }
    }

    fn fail(&mut self, element: Option<ElementId>, events: &mut Vec<PuzzleEvent>) {
        info!("sequence failed at {:?}, partial {:?}", element, self.partial);
        self.phase = PuzzlePhase::Failed;
        self.reset_timer.arm(self.config.reset_ticks);
        events.push(PuzzleEvent::Failed {
            element,
            reset_ticks: self.config.reset_ticks,
        });
    }

    fn reset(&mut self, tick: Tick) -> PuzzleEvent {
        self.partial.clear();
        self.phase = PuzzlePhase::Idle;
        self.reset_timer.cancel();
        let target = match &self.config.target {
            TargetSource::Fixed(_) => None,
            TargetSource::Random { pool, length } => {
                self.target = derive_target(pool, *length, tick);
                Some(self.target.clone())
            }
        };
        debug!("sequence reset at tick {}", tick);
        PuzzleEvent::Reset { target }
    }
}

impl PuzzleMachine for SequencePuzzle {
    fn phase(&self) -> PuzzlePhase {
        self.phase
    }

    fn activate(&mut self, element: ElementId) -> PuzzleResult {
        self.check_element(element)?;
        self.check_accepting("activate")?;
        if self.config.style == ActivationStyle::Toggle && self.partial.contains(&element) {
            return Ok(Vec::new());
        }

        let mut events = Vec::new();
        if self.phase == PuzzlePhase::Idle {
            self.phase = PuzzlePhase::Collecting;
        }

        let expected = self.target.get(self.partial.len()).copied();
        self.partial.push(element);
        let correct_count = self.correct_count();
        events.push(PuzzleEvent::Activated {
            element,
            correct_count,
        });

        if expected != Some(element) {
            self.fail(Some(element), &mut events);
        } else if correct_count == self.target.len() {
            info!("sequence solved");
            self.phase = PuzzlePhase::Solved;
            events.push(PuzzleEvent::Solved);
        }
        Ok(events)
    }

    fn deactivate(&mut self, element: ElementId) -> PuzzleResult {
        self.check_element(element)?;
        self.check_accepting("deactivate")?;
        if self.config.style == ActivationStyle::Press {
            return Ok(Vec::new());
        }
        let Some(index) = self.partial.iter().position(|active| *active == element) else {
            return Ok(Vec::new());
        };
        self.partial.remove(index);
        if self.partial.is_empty() {
            self.phase = PuzzlePhase::Idle;
        }
        Ok(vec![PuzzleEvent::Deactivated {
            element,
            correct_count: self.correct_count(),
        }])
    }

    fn tick(&mut self, tick: Tick) -> Vec<PuzzleEvent> {
        if self.reset_timer.tick() {
            return vec![self.reset(tick)];
        }
        Vec::new()
    }

    fn snapshot(&self) -> PuzzleSnapshot {
        PuzzleSnapshot {
            phase: self.phase,
            partial: self.partial.clone(),
            correct_count: self.correct_count(),
            slots: Vec::new(),
            shown_target: self.shows_target().then(|| self.target.clone()),
        }
    }
}
