use std::collections::BTreeMap;

use log::debug;

use accord_shared::{
    puzzle::{PuzzleEvent, PuzzleMachine, PuzzleResult, PuzzleSnapshot},
    KeyGenerator, PuzzleId, Tick, ValidationError,
};

/// The puzzles hosted by the authority
pub struct PuzzleHost {
    puzzles: BTreeMap<PuzzleId, Box<dyn PuzzleMachine>>,
    keys: KeyGenerator<PuzzleId>,
}

impl PuzzleHost {
    pub fn new() -> Self {
        Self {
            puzzles: BTreeMap::new(),
            keys: KeyGenerator::new(),
        }
    }

    /// Picks the id the next hosted puzzle will be known by
    pub fn reserve(&mut self) -> PuzzleId {
        self.keys.generate()
    }

    pub fn host(&mut self, puzzle: PuzzleId, machine: Box<dyn PuzzleMachine>) {
        debug!("hosting {}", puzzle);
        self.puzzles.insert(puzzle, machine);
    }

    pub fn get(&self, puzzle: &PuzzleId) -> Option<&dyn PuzzleMachine> {
        self.puzzles.get(puzzle).map(|machine| machine.as_ref())
    }

    pub fn snapshots(&self) -> Vec<(PuzzleId, PuzzleSnapshot)> {
        self.puzzles
            .iter()
            .map(|(puzzle, machine)| (*puzzle, machine.snapshot()))
            .collect()
    }

    /// Runs `operation` against one puzzle, translating its refusal into a
    /// validation error
    pub fn apply<F>(&mut self, puzzle: PuzzleId, operation: F) -> Result<Vec<PuzzleEvent>, ValidationError>
    where
        F: FnOnce(&mut dyn PuzzleMachine) -> PuzzleResult,
    {
        let machine = self
            .puzzles
            .get_mut(&puzzle)
            .ok_or(ValidationError::UnknownPuzzle { puzzle })?;
        operation(machine.as_mut()).map_err(|rejection| rejection.into_validation(puzzle))
    }

    /// Advances every puzzle's timers by one tick, in puzzle order
    pub fn tick(&mut self, tick: Tick) -> Vec<(PuzzleId, PuzzleEvent)> {
        let mut output = Vec::new();
        for (puzzle, machine) in self.puzzles.iter_mut() {
            for event in machine.tick(tick) {
                output.push((*puzzle, event));
            }
        }
        output
    }
}

impl Default for PuzzleHost {
    fn default() -> Self {
        Self::new()
    }
}
