use std::collections::BTreeMap;

use log::{debug, trace};

use crate::{
    error::AuthorityMismatchError,
    interpolation::DisplayValue,
    world::{
        field::{FieldId, FieldUpdate, FieldValue},
        ownership::{Epoch, Ownership},
        replica_world::EntityUpdate,
    },
    EntityId, ParticipantId, SimulationTick,
};

/// A peer's read-only copy of one replicated entity, plus the display copies
/// that presentation code interpolates
#[derive(Clone, Debug)]
pub struct MirrorEntity {
    id: EntityId,
    kind: String,
    ownership: Ownership,
    authoritative: BTreeMap<FieldId, FieldValue>,
    display: BTreeMap<FieldId, DisplayValue>,
    pending: BTreeMap<FieldId, FieldValue>,
    /// A release was asked for; no local writes until the authority answers
    releasing: bool,
}

impl MirrorEntity {
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

    pub fn authoritative(&self, field: &FieldId) -> Option<&FieldValue> {
        self.authoritative.get(field)
    }

    pub fn display(&self, field: &FieldId) -> Option<&FieldValue> {
        self.display.get(field).map(DisplayValue::current)
    }

    fn accept(&mut self, field: FieldId, value: FieldValue) {
        if !self.display.contains_key(&field) {
            self.display.insert(field, DisplayValue::new(value.clone()));
        }
        self.authoritative.insert(field, value);
    }
}

/// The set of entities a peer mirrors from the authority
pub struct MirrorWorld {
    local: ParticipantId,
    entities: BTreeMap<EntityId, MirrorEntity>,
}

impl MirrorWorld {
    pub fn new(local: ParticipantId) -> Self {
        Self {
            local,
            entities: BTreeMap::new(),
        }
    }

    pub fn local(&self) -> ParticipantId {
        self.local
    }

    pub fn get(&self, entity: &EntityId) -> Option<&MirrorEntity> {
        self.entities.get(entity)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MirrorEntity> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn owns(&self, entity: &EntityId) -> bool {
        self.entities
            .get(entity)
            .map(|record| record.owner() == self.local)
            .unwrap_or(false)
    }

    pub fn apply_spawn(
        &mut self,
        entity: EntityId,
        kind: String,
        owner: ParticipantId,
        epoch: Epoch,
        fields: Vec<FieldUpdate>,
    ) {
        let mut record = MirrorEntity {
            id: entity,
            kind,
            ownership: Ownership::with_epoch(owner, epoch),
            authoritative: BTreeMap::new(),
            display: BTreeMap::new(),
            pending: BTreeMap::new(),
            releasing: false,
        };
        for (field, value) in fields {
            record.accept(field, value);
        }
        self.entities.insert(entity, record);
    }

    /// Applies an authoritative update. Updates stamped with an epoch older
    /// than the one this mirror knows are from a previous owner and are
    /// discarded. Returns the fields that changed
    pub fn apply_update(
        &mut self,
        update: EntityUpdate,
    ) -> Result<Vec<FieldId>, AuthorityMismatchError> {
        let local = self.local;
        let Some(record) = self.entities.get_mut(&update.entity) else {
            debug!("update for unknown {}, dropping", update.entity);
            return Ok(Vec::new());
        };
        if update.epoch.is_older_than(&record.epoch()) {
            return Err(AuthorityMismatchError::StaleEpoch {
                entity: update.entity,
                received: update.epoch,
                current: record.epoch(),
            });
        }
        if record.owner() == local {
            trace!("ignoring echo of locally owned {}", update.entity);
            return Ok(Vec::new());
        }
        let mut changed = Vec::with_capacity(update.fields.len());
        for (field, value) in update.fields {
            changed.push(field);
            record.accept(field, value);
        }
        Ok(changed)
    }

    pub fn apply_ownership(&mut self, entity: &EntityId, owner: ParticipantId, epoch: Epoch) -> bool {
        let Some(record) = self.entities.get_mut(entity) else {
            return false;
        };
        let accepted = record.ownership.observe(owner, epoch);
        if accepted {
            record.releasing = false;
        }
        if accepted && owner != self.local {
            // anything written locally under the old epoch would be rejected
            record.pending.clear();
        }
        accepted
    }

    /// Fences local writes to an owned entity that is being handed back.
    /// Writes already taken are still sent. Returns the epoch to release
    pub fn begin_release(&mut self, entity: &EntityId) -> Option<Epoch> {
        let record = self.entities.get_mut(entity)?;
        record.releasing = true;
        Some(record.epoch())
    }

    pub fn is_releasing(&self, entity: &EntityId) -> bool {
        self.entities
            .get(entity)
            .map(|record| record.releasing)
            .unwrap_or(false)
    }

    pub fn despawn(&mut self, entity: &EntityId) -> Option<MirrorEntity> {
        self.entities.remove(entity)
    }

    /// Writes a field of an entity this peer owns, from inside its own
    /// simulation tick. The write is sent to the authority on the next flush
    pub fn write(
        &mut self,
        tick: &SimulationTick,
        entity: &EntityId,
        field: FieldId,
        value: FieldValue,
    ) -> Result<(), AuthorityMismatchError> {
        let local = self.local;
        let Some(record) = self.entities.get_mut(entity) else {
            return Err(AuthorityMismatchError::NotAuthority {
                operation: "write unknown entity",
            });
        };
        record.ownership.check_writer(*entity, tick.writer())?;
        record.ownership.check_writer(*entity, local)?;
        if record.releasing {
            return Err(AuthorityMismatchError::NotAuthority {
                operation: "write an entity being released",
            });
        }
        record.pending.insert(field, value.clone());
        record.accept(field, value);
        Ok(())
    }

    /// Locally written fields awaiting transmission to the authority
    pub fn take_pending(&mut self) -> Vec<EntityUpdate> {
        self.entities
            .values_mut()
            .filter(|record| !record.pending.is_empty())
            .map(|record| EntityUpdate {
                entity: record.id,
                epoch: record.epoch(),
                fields: std::mem::take(&mut record.pending).into_iter().collect(),
            })
            .collect()
    }

    /// Presentation step: moves every display copy toward its authoritative
    /// value. Never touches authoritative state
    pub fn present(&mut self, dt: f32, rate: f32) {
        for record in self.entities.values_mut() {
            for (field, display) in record.display.iter_mut() {
                if let Some(target) = record.authoritative.get(field) {
                    display.step(target, dt, rate);
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.entities.clear();
    }
}
