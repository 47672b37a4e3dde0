use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use log::debug;

use crate::{transport::Address, SessionId};

/// Where hosted sessions can be found. Discovery probes every advertised
/// address and waits for replies; the directory itself holds no session
/// details
#[derive(Clone, Default)]
pub struct SessionDirectory {
    entries: Arc<Mutex<BTreeMap<SessionId, Address>>>,
}

impl SessionDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<SessionId, Address>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lists `session` at `address` until the returned guard is dropped
    #[must_use = "the session is withdrawn as soon as the advertisement is dropped"]
    pub fn advertise(&self, session: SessionId, address: Address) -> Advertisement {
        debug!("advertising {} at {}", session, address);
        self.lock().insert(session, address);
        Advertisement {
            directory: self.clone(),
            session,
        }
    }

    pub fn withdraw(&self, session: &SessionId) -> bool {
        self.lock().remove(session).is_some()
    }

    pub fn address_of(&self, session: &SessionId) -> Option<Address> {
        self.lock().get(session).copied()
    }

    pub fn addresses(&self) -> Vec<(SessionId, Address)> {
        self.lock()
            .iter()
            .map(|(session, address)| (*session, *address))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Keeps a session listed in a [`SessionDirectory`]
pub struct Advertisement {
    directory: SessionDirectory,
    session: SessionId,
}

impl Advertisement {
    pub fn session(&self) -> SessionId {
        self.session
    }
}

impl Drop for Advertisement {
    fn drop(&mut self) {
        if self.directory.withdraw(&self.session) {
            debug!("withdrew {}", self.session);
        }
    }
}
