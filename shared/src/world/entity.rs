use std::collections::{BTreeMap, BTreeSet};

use crate::{
    error::AuthorityMismatchError,
    world::{
        field::{FieldId, FieldUpdate, FieldValue},
        ownership::{Epoch, Ownership},
    },
    EntityId, ParticipantId, SimulationTick,
};

/// An entity as held by the session authority
#[derive(Clone, Debug)]
pub struct ReplicatedEntity {
    id: EntityId,
    kind: String,
    ownership: Ownership,
    fields: BTreeMap<FieldId, FieldValue>,
    dirty: BTreeSet<FieldId>,
}

impl ReplicatedEntity {
    pub fn new(
        id: EntityId,
        kind: impl Into<String>,
        owner: ParticipantId,
        fields: Vec<FieldUpdate>,
    ) -> Self {
        Self {
            id,
            kind: kind.into(),
            ownership: Ownership::new(owner),
            fields: fields.into_iter().collect(),
            dirty: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn owner(&self) -> ParticipantId {
        self.ownership.owner()
    }

    pub fn epoch(&self) -> Epoch {
        self.ownership.epoch()
    }

    pub fn get(&self, field: &FieldId) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn fields(&self) -> Vec<FieldUpdate> {
        self.fields
            .iter()
            .map(|(id, value)| (*id, value.clone()))
            .collect()
    }

    /// Writes a field from inside the owner's simulation tick
    pub fn write(
        &mut self,
        tick: &SimulationTick,
        field: FieldId,
        value: FieldValue,
    ) -> Result<(), AuthorityMismatchError> {
        self.ownership.check_writer(self.id, tick.writer())?;
        self.set(field, value);
        Ok(())
    }

    /// Applies fields written by a peer owner on its own tick, after checking
    /// that the peer still owns the entity under the stamped epoch
    pub fn apply_owner_update(
        &mut self,
        writer: ParticipantId,
        epoch: Epoch,
        fields: Vec<FieldUpdate>,
    ) -> Result<(), AuthorityMismatchError> {
        self.ownership.check_update(self.id, writer, epoch)?;
        for (field, value) in fields {
            self.set(field, value);
        }
        Ok(())
    }

    pub fn hand_off(&mut self, new_owner: ParticipantId) -> Epoch {
        self.ownership.hand_off(new_owner)
    }

    /// Fields changed since the last call
    pub fn take_dirty(&mut self) -> Vec<FieldUpdate> {
        let dirty = std::mem::take(&mut self.dirty);
        dirty
            .into_iter()
            .filter_map(|field| self.fields.get(&field).map(|value| (field, value.clone())))
            .collect()
    }

    fn set(&mut self, field: FieldId, value: FieldValue) {
        if self.fields.get(&field) == Some(&value) {
            return;
        }
        self.fields.insert(field, value);
        self.dirty.insert(field);
    }
}
