use std::sync::Arc;

use accord_client::{Client, ClientEvent, Collaborators};
use accord_server::{Server, ServerHandle};
use accord_session::{AppContext, SessionManager};
use accord_shared::{LocalNetwork, ParticipantId};

use crate::{RecordingAudio, RecordingHaptics, ScriptedSceneLoader};

/// A session manager wired to recording collaborators, plus everything it
/// reported from `update`
pub struct TestPlayer {
    pub manager: SessionManager,
    pub audio: Arc<RecordingAudio>,
    pub haptics: Arc<RecordingHaptics>,
    pub scenes: Arc<ScriptedSceneLoader>,
    pub events: Vec<ClientEvent>,
}

impl TestPlayer {
    pub fn new(network: &LocalNetwork, name: &str) -> Self {
        Self::with_context(AppContext::new(network.clone(), name))
    }

    /// Uses `context`, replacing its collaborators with recording ones
    pub fn with_context(context: AppContext) -> Self {
        let audio = Arc::new(RecordingAudio::default());
        let haptics = Arc::new(RecordingHaptics::default());
        let scenes = Arc::new(ScriptedSceneLoader::default());
        let context = context.with_collaborators(Collaborators {
            audio: audio.clone(),
            haptics: haptics.clone(),
            scene_loader: scenes.clone(),
        });
        Self {
            manager: SessionManager::new(&context),
            audio,
            haptics,
            scenes,
            events: Vec::new(),
        }
    }

    pub fn client(&self) -> &Client {
        self.manager.client().expect("player is connected")
    }

    pub fn client_mut(&mut self) -> &mut Client {
        self.manager.client_mut().expect("player is connected")
    }

    pub fn id(&self) -> ParticipantId {
        self.client().participant_id()
    }

    /// The hosted authority. Panics unless this player is hosting
    pub fn server(&self) -> &ServerHandle {
        self.manager.server().expect("player is hosting")
    }

    pub fn with_server<R>(&self, f: impl FnOnce(&mut Server) -> R) -> R {
        self.server().with(f)
    }

    /// Takes the events gathered so far
    pub fn take_events(&mut self) -> Vec<ClientEvent> {
        std::mem::take(&mut self.events)
    }
}
