use std::collections::BTreeMap;

use log::{debug, info};
use thiserror::Error;

use crate::{
    error::{AuthorityMismatchError, ValidationError},
    world::{
        entity::ReplicatedEntity,
        field::{FieldId, FieldUpdate, FieldValue},
        ownership::Epoch,
    },
    EntityId, KeyGenerator, ParticipantId, SimulationTick,
};

/// Errors that can occur while writing to a [`ReplicaWorld`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorldError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    AuthorityMismatch(#[from] AuthorityMismatchError),
}

/// A batch of changed fields for one entity, stamped with the epoch they
/// were written under
#[derive(Clone, Debug, PartialEq)]
pub struct EntityUpdate {
    pub entity: EntityId,
    pub epoch: Epoch,
    pub fields: Vec<FieldUpdate>,
}

/// The authority's canonical store of replicated entities
pub struct ReplicaWorld {
    entities: BTreeMap<EntityId, ReplicatedEntity>,
    keys: KeyGenerator<EntityId>,
}

impl ReplicaWorld {
    pub fn new() -> Self {
        Self {
            entities: BTreeMap::new(),
            keys: KeyGenerator::new(),
        }
    }

    /// Allocates an id now for an entity that will be inserted on a later tick
    pub fn reserve_id(&mut self) -> EntityId {
        self.keys.generate()
    }

    pub fn insert(&mut self, entity: ReplicatedEntity) {
        info!("spawned {} ({}) owned by {}", entity.id(), entity.kind(), entity.owner());
        self.entities.insert(entity.id(), entity);
    }

    pub fn spawn(
        &mut self,
        kind: impl Into<String>,
        owner: ParticipantId,
        fields: Vec<FieldUpdate>,
    ) -> EntityId {
        let id = self.reserve_id();
        self.insert(ReplicatedEntity::new(id, kind, owner, fields));
        id
    }

    pub fn despawn(&mut self, entity: &EntityId) -> Option<ReplicatedEntity> {
        let removed = self.entities.remove(entity);
        if removed.is_some() {
            info!("despawned {}", entity);
        }
        removed
    }

    pub fn contains(&self, entity: &EntityId) -> bool {
        self.entities.contains_key(entity)
    }

    pub fn get(&self, entity: &EntityId) -> Option<&ReplicatedEntity> {
        self.entities.get(entity)
    }

    pub fn field(&self, entity: &EntityId, field: &FieldId) -> Option<&FieldValue> {
        self.entities.get(entity)?.get(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReplicatedEntity> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn write(
        &mut self,
        tick: &SimulationTick,
        entity: &EntityId,
        field: FieldId,
        value: FieldValue,
    ) -> Result<(), WorldError> {
        let record = self.get_mut(entity)?;
        record.write(tick, field, value)?;
        Ok(())
    }

    pub fn apply_owner_update(
        &mut self,
        writer: ParticipantId,
        update: EntityUpdate,
    ) -> Result<(), WorldError> {
        let record = self.get_mut(&update.entity)?;
        record.apply_owner_update(writer, update.epoch, update.fields)?;
        Ok(())
    }

    pub fn transfer_ownership(
        &mut self,
        entity: &EntityId,
        new_owner: ParticipantId,
    ) -> Result<Epoch, ValidationError> {
        let record = self
            .entities
            .get_mut(entity)
            .ok_or(ValidationError::UnknownEntity { entity: *entity })?;
        let previous = record.owner();
        let epoch = record.hand_off(new_owner);
        debug!("{} handed off {} -> {} at {:?}", entity, previous, new_owner, epoch);
        Ok(epoch)
    }

    /// Hands every entity owned by `participant` back to `fallback`
    pub fn revert_ownership(
        &mut self,
        participant: &ParticipantId,
        fallback: ParticipantId,
    ) -> Vec<(EntityId, Epoch)> {
        self.entities
            .values_mut()
            .filter(|record| record.owner() == *participant)
            .map(|record| (record.id(), record.hand_off(fallback)))
            .collect()
    }

    /// Drains changed fields, in entity order
    pub fn collect_updates(&mut self) -> Vec<EntityUpdate> {
        self.entities
            .values_mut()
            .filter_map(|record| {
                let fields = record.take_dirty();
                if fields.is_empty() {
                    return None;
                }
                Some(EntityUpdate {
                    entity: record.id(),
                    epoch: record.epoch(),
                    fields,
                })
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.entities.clear();
    }

    fn get_mut(&mut self, entity: &EntityId) -> Result<&mut ReplicatedEntity, ValidationError> {
        self.entities
            .get_mut(entity)
            .ok_or(ValidationError::UnknownEntity { entity: *entity })
    }
}

impl Default for ReplicaWorld {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{Key, TickClock, TickConfig};

    fn tick_for(writer: ParticipantId) -> SimulationTick {
        let mut clock = TickClock::new(&TickConfig::default());
        clock.advance(Duration::from_millis(50));
        clock.next_tick(writer).unwrap()
    }

    #[test]
    fn only_owner_writes_on_tick() {
        let host = ParticipantId::from_u64(1);
        let peer = ParticipantId::from_u64(2);
        let mut world = ReplicaWorld::new();
        let lever = world.spawn("lever", host, vec![(FieldId(0), FieldValue::Angle(0.0))]);

        assert!(world
            .write(&tick_for(host), &lever, FieldId(0), FieldValue::Angle(0.5))
            .is_ok());
        let result = world.write(&tick_for(peer), &lever, FieldId(0), FieldValue::Angle(1.0));
        assert!(matches!(
            result,
            Err(WorldError::AuthorityMismatch(AuthorityMismatchError::NotOwner { .. }))
        ));
        assert_eq!(world.field(&lever, &FieldId(0)), Some(&FieldValue::Angle(0.5)));
    }

    #[test]
    fn unchanged_writes_are_not_dirty() {
        let host = ParticipantId::from_u64(1);
        let mut world = ReplicaWorld::new();
        let lever = world.spawn("lever", host, vec![(FieldId(0), FieldValue::Bool(false))]);
        world
            .write(&tick_for(host), &lever, FieldId(0), FieldValue::Bool(false))
            .unwrap();
        assert!(world.collect_updates().is_empty());

        world
            .write(&tick_for(host), &lever, FieldId(0), FieldValue::Bool(true))
            .unwrap();
        let updates = world.collect_updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].fields, vec![(FieldId(0), FieldValue::Bool(true))]);
        assert!(world.collect_updates().is_empty());
    }

    #[test]
    fn stale_owner_update_is_discarded_after_handoff() {
        let host = ParticipantId::from_u64(1);
        let peer = ParticipantId::from_u64(2);
        let mut world = ReplicaWorld::new();
        let lever = world.spawn("lever", host, vec![]);

        let granted = world.transfer_ownership(&lever, peer).unwrap();
        world
            .apply_owner_update(
                peer,
                EntityUpdate {
                    entity: lever,
                    epoch: granted,
                    fields: vec![(FieldId(0), FieldValue::Angle(0.3))],
                },
            )
            .unwrap();

        world.transfer_ownership(&lever, host).unwrap();
        let late = world.apply_owner_update(
            peer,
            EntityUpdate {
                entity: lever,
                epoch: granted,
                fields: vec![(FieldId(0), FieldValue::Angle(0.9))],
            },
        );
        assert!(matches!(
            late,
            Err(WorldError::AuthorityMismatch(AuthorityMismatchError::StaleEpoch { .. }))
        ));
        assert_eq!(world.field(&lever, &FieldId(0)), Some(&FieldValue::Angle(0.3)));
    }
}
