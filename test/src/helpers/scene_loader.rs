use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex, PoisonError,
};

use log::debug;

use accord_client::{SceneLoadDone, SceneLoader};
use accord_shared::SceneId;

/// A scene loader a test controls. Finishes loads instantly until told to
/// hold them, after which they wait for [`ScriptedSceneLoader::finish_all`]
#[derive(Default)]
pub struct ScriptedSceneLoader {
    hold: AtomicBool,
    pending: Mutex<Vec<SceneLoadDone>>,
    requested: Mutex<Vec<SceneId>>,
}

impl ScriptedSceneLoader {
    pub fn holding() -> Self {
        let loader = Self::default();
        loader.hold(true);
        loader
    }

    pub fn hold(&self, hold: bool) {
        self.hold.store(hold, Ordering::SeqCst);
    }

    /// Completes every held load, returning how many there were
    pub fn finish_all(&self) -> usize {
        let pending: Vec<SceneLoadDone> = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        let count = pending.len();
        for done in pending {
            done.report();
        }
        count
    }

    /// Drops every held load without reporting it
    pub fn abandon_all(&self) -> usize {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        let count = pending.len();
        pending.clear();
        count
    }

    pub fn pending(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Every scene this loader was asked for, in order
    pub fn requested(&self) -> Vec<SceneId> {
        self.requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SceneLoader for ScriptedSceneLoader {
    fn load(&self, scene: &SceneId, done: SceneLoadDone) {
        self.requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(scene.clone());
        if self.hold.load(Ordering::SeqCst) {
            debug!("holding load of {}", scene);
            self.pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(done);
        } else {
            done.report();
        }
    }
}
