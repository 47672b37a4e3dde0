use std::cmp::Ordering;

use log::{debug, info};
use thiserror::Error;

use crate::{Participant, ParticipantId};

/// Errors that can occur while mutating a [`PlayerRegistry`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("{participant} is already registered")]
    AlreadyRegistered { participant: ParticipantId },

    #[error("Cannot register {participant} as host, {existing} is already the host")]
    HostAlreadyPresent {
        participant: ParticipantId,
        existing: ParticipantId,
    },

    #[error("Cannot register {participant} as local, {existing} is already local to this process")]
    LocalAlreadyPresent {
        participant: ParticipantId,
        existing: ParticipantId,
    },

    #[error("{participant} is not registered")]
    NotRegistered { participant: ParticipantId },
}

/// How [`PlayerRegistry::players_list`] orders its output
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PlayerOrdering {
    /// Host first, then the local participant, then everyone else by name
    /// (ties broken by id)
    #[default]
    HostLocalAlphabetical,
    /// The order participants registered in
    JoinOrder,
}

/// Tracks who is in the session and whether they are ready.
///
/// The authority holds the canonical registry. Every peer holds a mirror
/// that is rebuilt from roster Notifies.
#[derive(Clone, Debug, Default)]
pub struct PlayerRegistry {
    participants: Vec<Participant>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self {
            participants: Vec::new(),
        }
    }

    pub fn register(&mut self, participant: Participant) -> Result<(), RegistryError> {
        if self.contains(&participant.id) {
            return Err(RegistryError::AlreadyRegistered {
                participant: participant.id,
            });
        }
        if participant.is_host {
            if let Some(existing) = self.host() {
                return Err(RegistryError::HostAlreadyPresent {
                    participant: participant.id,
                    existing: existing.id,
                });
            }
        }
        if participant.is_local {
            if let Some(existing) = self.local_participant() {
                return Err(RegistryError::LocalAlreadyPresent {
                    participant: participant.id,
                    existing: existing.id,
                });
            }
        }

        info!("registered {} ({})", participant.id, participant.name);
        self.participants.push(participant);
        Ok(())
    }

    pub fn unregister(&mut self, participant: &ParticipantId) -> Option<Participant> {
        let index = self
            .participants
            .iter()
            .position(|existing| existing.id == *participant)?;
        let removed = self.participants.remove(index);
        info!("unregistered {} ({})", removed.id, removed.name);
        Some(removed)
    }

    /// Returns whether the ready flag actually changed
    pub fn set_ready(
        &mut self,
        participant: &ParticipantId,
        ready: bool,
    ) -> Result<bool, RegistryError> {
        let entry = self
            .participants
            .iter_mut()
            .find(|existing| existing.id == *participant)
            .ok_or(RegistryError::NotRegistered {
                participant: *participant,
            })?;
        if entry.is_ready == ready {
            return Ok(false);
        }
        debug!("{} ready: {}", entry.id, ready);
        entry.is_ready = ready;
        Ok(true)
    }

    pub fn contains(&self, participant: &ParticipantId) -> bool {
        self.get(participant).is_some()
    }

    pub fn get(&self, participant: &ParticipantId) -> Option<&Participant> {
        self.participants
            .iter()
            .find(|existing| existing.id == *participant)
    }

    pub fn player_count(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn all_ready(&self) -> bool {
        !self.participants.is_empty() && self.participants.iter().all(|p| p.is_ready)
    }

    pub fn host(&self) -> Option<&Participant> {
        self.participants.iter().find(|p| p.is_host)
    }

    pub fn local_participant(&self) -> Option<&Participant> {
        self.participants.iter().find(|p| p.is_local)
    }

    pub fn ids(&self) -> impl Iterator<Item = ParticipantId> + '_ {
        self.participants.iter().map(|p| p.id)
    }

    pub fn players_list(&self, ordering: PlayerOrdering) -> Vec<&Participant> {
        let mut list: Vec<&Participant> = self.participants.iter().collect();
        if ordering == PlayerOrdering::HostLocalAlphabetical {
            list.sort_by(|a, b| display_order(a, b));
        }
        list
    }

    /// The roster as replicated to peers: join order, no local flags
    pub fn to_remote(&self) -> Vec<Participant> {
        self.participants.iter().map(Participant::to_remote).collect()
    }

    /// Replace the whole mirror with a roster received from the authority,
    /// flagging `local` as this process's participant
    pub fn replace_from_remote(&mut self, roster: Vec<Participant>, local: ParticipantId) {
        self.participants = roster
            .into_iter()
            .map(|mut participant| {
                participant.is_local = participant.id == local;
                participant
            })
            .collect();
    }
}

fn display_order(a: &Participant, b: &Participant) -> Ordering {
    b.is_host
        .cmp(&a.is_host)
        .then_with(|| b.is_local.cmp(&a.is_local))
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.id.cmp(&b.id))
}
