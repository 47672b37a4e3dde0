use std::{mem, time::Duration};

use log::{info, warn};
use tokio::time;

use accord_client::{discover, Client, ClientEvent};
use accord_server::{spawn_loop, AccordServerError, ErrorEvent, Server, ServerHandle};
use accord_shared::{
    Advertisement, ConnectionError, SceneId, SceneOutcome, SessionDescriptor, SessionFilter,
    SessionId, ValidationError,
};

use crate::{state::Transition, AppContext, LifecycleResult, SessionError, SessionState};

/// The authority this process runs while hosting. Dropping it stops the
/// loop and withdraws the session from discovery
struct Hosted {
    handle: ServerHandle,
    _advertisement: Advertisement,
}

/// Drives one participant's way through sessions: hosting or joining one,
/// playing in it, and leaving it again.
///
/// Lifecycle operations suspend and may be cancelled by dropping their
/// future, which releases everything they had set up. Everything else is
/// fire-and-forget; its outcome arrives as [`ClientEvent`]s from
/// [`SessionManager::update`].
pub struct SessionManager {
    context: AppContext,
    state: SessionState,
    hosted: Option<Hosted>,
    client: Option<Client>,
    events: Vec<ClientEvent>,
}

impl SessionManager {
    pub fn new(context: &AppContext) -> Self {
        Self {
            context: context.clone(),
            state: SessionState::Disconnected,
            hosted: None,
            client: None,
            events: Vec::new(),
        }
    }

    // Queries

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_host(&self) -> bool {
        self.state == SessionState::Hosting
    }

    pub fn client(&self) -> Option<&Client> {
        self.client.as_ref()
    }

    pub fn client_mut(&mut self) -> Option<&mut Client> {
        self.client.as_mut()
    }

    /// The authority's loop, while hosting
    pub fn server(&self) -> Option<&ServerHandle> {
        self.hosted.as_ref().map(|hosted| &hosted.handle)
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.client.as_ref().map(Client::session_id)
    }

    // Lifecycle

    /// Hosts a new session and joins it as its host
    pub async fn create_session(&mut self, name: &str, max_participants: usize) -> LifecycleResult {
        let result = self.try_create_session(name, max_participants).await;
        report("create session", result)
    }

    pub async fn try_create_session(
        &mut self,
        name: &str,
        max_participants: usize,
    ) -> Result<(), SessionError> {
        if max_participants == 0 {
            return Err(SessionError::NoCapacity);
        }
        let transition = Transition::begin(&mut self.state, "create a session")?;
        let network = &self.context.network;

        let mut server = Server::new(
            self.context.server.clone(),
            network.bind(),
            name,
            max_participants,
        );
        let loopback = network.bind();
        server.set_host_address(loopback.address());
        let address = server.address();
        let session = server.session_id();
        let handle = spawn_loop(server);
        let advertisement = network.directory().advertise(session, address);

        let mut client = Client::connect(
            loopback,
            address,
            self.context.player_name.clone(),
            self.context.client.clone(),
        )
        .await?;
        client.set_collaborators(self.context.collaborators.clone());
        info!("hosting {} '{}' at {}", session, name, address);

        self.hosted = Some(Hosted {
            handle,
            _advertisement: advertisement,
        });
        self.client = Some(client);
        transition.complete(SessionState::Hosting);
        Ok(())
    }

    /// Joins the session `descriptor` describes
    pub async fn join_session(&mut self, descriptor: &SessionDescriptor) -> LifecycleResult {
        let result = self.try_join_session(descriptor).await;
        report("join session", result)
    }

    pub async fn try_join_session(
        &mut self,
        descriptor: &SessionDescriptor,
    ) -> Result<(), SessionError> {
        let transition = Transition::begin(&mut self.state, "join a session")?;
        let network = &self.context.network;
        let address = network
            .directory()
            .address_of(&descriptor.id)
            .ok_or(SessionError::UnknownSession {
                session: descriptor.id,
            })?;

        let mut client = Client::connect(
            network.bind(),
            address,
            self.context.player_name.clone(),
            self.context.client.clone(),
        )
        .await?;
        client.set_collaborators(self.context.collaborators.clone());

        self.client = Some(client);
        transition.complete(SessionState::Connected);
        Ok(())
    }

    /// Leaves the session. When hosting, this ends it for everyone
    pub fn leave_session(&mut self) -> LifecycleResult {
        let result = self.try_leave_session();
        report("leave session", result)
    }

    pub fn try_leave_session(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Hosting | SessionState::Connected => {}
            state => {
                return Err(SessionError::InvalidTransition {
                    operation: "leave the session",
                    state,
                })
            }
        }
        self.state = SessionState::Leaving;
        if let Some(hosted) = self.hosted.take() {
            hosted.handle.shutdown("the host left");
        }
        if let Some(mut client) = self.client.take() {
            client.leave();
        }
        self.state = SessionState::Disconnected;
        Ok(())
    }

    /// Lists the advertised sessions matching `filter` that answer within
    /// the discovery window
    pub async fn list_sessions(&self, filter: &SessionFilter) -> Vec<SessionDescriptor> {
        discover(
            &self.context.network,
            filter,
            self.context.session.discovery_window,
        )
        .await
    }

    // Host commands

    /// Moves every participant to `scene`. Resolves once all of them
    /// loaded it, or the load timed out; the outcome names who did not
    /// make it in time. This participant's own load is driven while
    /// waiting
    pub async fn request_scene_transition(
        &mut self,
        scene: SceneId,
    ) -> Result<SceneOutcome, SessionError> {
        let hosted = self.hosted_mut("request a scene transition")?;
        let mut ready = hosted
            .handle
            .with(|server| server.request_scene_transition(scene))?;

        let tick_interval = self.context.server.tick.tick_interval;
        loop {
            tokio::select! {
                outcome = &mut ready => {
                    return outcome.map_err(|_| SessionError::TransitionAbandoned);
                }
                _ = time::sleep(tick_interval) => {
                    self.pump(tick_interval);
                    if self.state != SessionState::Hosting {
                        return Err(SessionError::TransitionAbandoned);
                    }
                }
            }
        }
    }

    /// Starts the match once every participant is ready and there are
    /// enough of them. The scene transition it triggers completes in the
    /// background
    pub fn start_match(&mut self) -> bool {
        match self.try_start_match() {
            Ok(()) => true,
            Err(error) => {
                info!("match not started: {}", error);
                false
            }
        }
    }

    pub fn try_start_match(&mut self) -> Result<(), SessionError> {
        let required = self.context.session.min_players_to_start;
        let scene = self.context.session.match_scene.clone();
        let hosted = self.hosted_mut("start the match")?;
        hosted.handle.with(|server| -> Result<(), AccordServerError> {
            let registry = server.registry();
            if !registry.all_ready() {
                return Err(ValidationError::NotAllReady.into());
            }
            let count = registry.player_count();
            if count < required {
                return Err(ValidationError::NotEnoughPlayers { count, required }.into());
            }
            server.request_scene_transition(scene).map(drop)
        })?;
        Ok(())
    }

    // Player commands

    /// Asks to flip this participant's ready flag. Returns the value asked
    /// for; the registry changes once the authority confirms it
    pub fn toggle_ready(&mut self) -> Result<bool, SessionError> {
        let client = self.client.as_mut().ok_or(SessionError::NotConnected)?;
        Ok(client.toggle_ready()?)
    }

    // Main loop

    /// Must be called once per presentation frame. Runs the client's
    /// simulation ticks, interpolates display state, and returns what
    /// happened since the last call. A lost connection tears the session
    /// down locally
    pub fn update(&mut self, dt: Duration) -> Vec<ClientEvent> {
        self.pump(dt);
        if let Some(client) = self.client.as_mut() {
            client.present(dt);
        }
        mem::take(&mut self.events)
    }

    fn pump(&mut self, dt: Duration) {
        let Some(client) = self.client.as_mut() else {
            return;
        };
        client.update(dt);
        let events = client.receive();

        if let Some(hosted) = self.hosted.as_mut() {
            for error in hosted.handle.events().read::<ErrorEvent>() {
                warn!("authority: {}", error);
            }
        }

        let lost = events.iter().find_map(|event| match event {
            ClientEvent::Disconnected(error) => Some(error.clone()),
            _ => None,
        });
        self.events.extend(events);
        if let Some(error) = lost {
            self.tear_down(error);
        }
    }

    fn tear_down(&mut self, error: ConnectionError) {
        info!("session lost while {}: {}", self.state, error);
        if let Some(hosted) = self.hosted.take() {
            hosted.handle.shutdown(error.to_string());
        }
        self.client = None;
        self.state = SessionState::Disconnected;
    }

    fn hosted_mut(&mut self, operation: &'static str) -> Result<&mut Hosted, SessionError> {
        match (self.state, self.hosted.as_mut()) {
            (SessionState::Hosting, Some(hosted)) => Ok(hosted),
            _ => Err(SessionError::NotHost { operation }),
        }
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        if let Some(hosted) = self.hosted.take() {
            hosted.handle.shutdown("the host went away");
        }
    }
}

fn report(operation: &str, result: Result<(), SessionError>) -> LifecycleResult {
    if let Err(error) = &result {
        warn!("{} failed: {}", operation, error);
    }
    result.into()
}
