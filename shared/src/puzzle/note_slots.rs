use crate::puzzle::{ElementId, PuzzleRejection};

/// A fixed row of slots that each hold at most one note
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NoteSlots {
    slots: Vec<Option<ElementId>>,
}

impl NoteSlots {
    pub fn new(count: usize) -> Self {
        Self {
            slots: vec![None; count],
        }
    }

    /// Returns whether the slot changed. Placing the note a slot already
    /// holds is a no-op, placing a different one is refused
    pub fn place(&mut self, slot: usize, note: ElementId) -> Result<bool, PuzzleRejection> {
        let slot_count = self.slots.len();
        let entry = self
            .slots
            .get_mut(slot)
            .ok_or(PuzzleRejection::SlotOutOfRange { slot, slot_count })?;
        match entry {
            Some(existing) if *existing == note => Ok(false),
            Some(_) => Err(PuzzleRejection::SlotOccupied(slot)),
            None => {
                *entry = Some(note);
                Ok(true)
            }
        }
    }

    /// Returns whether the slot held a note
    pub fn clear(&mut self, slot: usize) -> Result<bool, PuzzleRejection> {
        let slot_count = self.slots.len();
        let entry = self
            .slots
            .get_mut(slot)
            .ok_or(PuzzleRejection::SlotOutOfRange { slot, slot_count })?;
        Ok(entry.take().is_some())
    }

    pub fn is_full(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// Slot contents in slot order, once every slot is filled
    pub fn contents(&self) -> Option<Vec<ElementId>> {
        self.slots.iter().copied().collect()
    }

    pub fn slots(&self) -> &[Option<ElementId>] {
        &self.slots
    }

    pub fn reset(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
    }
}
