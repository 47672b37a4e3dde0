use crate::{
    error::AuthorityMismatchError, sequence_less_than, EntityId, ParticipantId,
};

/// Counts ownership handoffs of one entity. Wraps, compared with sequence
/// arithmetic
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Epoch(pub u16);

impl Epoch {
    pub const INITIAL: Epoch = Epoch(0);

    pub fn next(self) -> Self {
        Epoch(self.0.wrapping_add(1))
    }

    pub fn is_older_than(&self, other: &Epoch) -> bool {
        sequence_less_than(self.0, other.0)
    }
}

/// Who may write an entity's fields right now
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ownership {
    owner: ParticipantId,
    epoch: Epoch,
}

impl Ownership {
    pub fn new(owner: ParticipantId) -> Self {
        Self::with_epoch(owner, Epoch::INITIAL)
    }

    pub fn with_epoch(owner: ParticipantId, epoch: Epoch) -> Self {
        Self { owner, epoch }
    }

    pub fn owner(&self) -> ParticipantId {
        self.owner
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Moves ownership to `new_owner`, returning the new epoch. The previous
    /// owner's in-flight updates now carry a stale epoch
    pub fn hand_off(&mut self, new_owner: ParticipantId) -> Epoch {
        self.owner = new_owner;
        self.epoch = self.epoch.next();
        self.epoch
    }

    /// Accepts an ownership change announced by the authority, unless it is
    /// older than what is already known
    pub fn observe(&mut self, owner: ParticipantId, epoch: Epoch) -> bool {
        if epoch.is_older_than(&self.epoch) {
            return false;
        }
        self.owner = owner;
        self.epoch = epoch;
        true
    }

    pub fn check_writer(
        &self,
        entity: EntityId,
        writer: ParticipantId,
    ) -> Result<(), AuthorityMismatchError> {
        if writer != self.owner {
            return Err(AuthorityMismatchError::NotOwner {
                entity,
                writer,
                owner: self.owner,
            });
        }
        Ok(())
    }

    /// Validates an update sent by `writer` stamped with `epoch`
    pub fn check_update(
        &self,
        entity: EntityId,
        writer: ParticipantId,
        epoch: Epoch,
    ) -> Result<(), AuthorityMismatchError> {
        if epoch != self.epoch {
            return Err(AuthorityMismatchError::StaleEpoch {
                entity,
                received: epoch,
                current: self.epoch,
            });
        }
        self.check_writer(entity, writer)
    }
}
