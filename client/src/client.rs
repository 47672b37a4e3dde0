use std::{
    collections::{BTreeMap, VecDeque},
    mem,
    time::Duration,
};

use log::{debug, info, warn};
use tokio::sync::oneshot::{self, error::TryRecvError};

use accord_shared::{
    puzzle::{
        ElementId, Lever, LeverConfig, LeverSignal, PuzzleEvent, PuzzleMirror, LEVER_ANGLE,
    },
    Address, ConnectionError, Endpoint, EntityId, Envelope, EventBus, FieldValue, MirrorWorld,
    Notify, OrderedReceiver, OutgoingSequence, Packet, Participant, ParticipantId,
    PlayerRegistry, PoseSnapshot, PuzzleId, Request, SceneId, SequenceNumber, SessionId,
    SimulationTick, StreamPlayback, SubscriptionKey, Tick, TickClock, ValidationError,
};

use crate::{
    collaborators::{Collaborators, SceneLoadDone},
    events::{ClientEvent, EntityChange},
    handshake::{self, Accepted},
    AccordClientError, ClientConfig,
};

/// A lever entity this participant has grabbed
struct HeldLever {
    lever: Lever,
    puzzle: PuzzleId,
    element: ElementId,
    /// Moved since the last simulated tick
    unwritten: Option<f32>,
}

/// One participant's connection to a session authority.
///
/// Everything the client knows about the session is a read-only mirror,
/// refreshed by the Notifies the authority sends. Changes are asked for with
/// Requests; their outcome arrives later as a Notify.
pub struct Client {
    config: ClientConfig,
    endpoint: Endpoint,
    server: Address,
    session: SessionId,
    local: ParticipantId,
    name: String,
    registry: PlayerRegistry,
    world: MirrorWorld,
    puzzles: BTreeMap<PuzzleId, PuzzleMirror>,
    poses: BTreeMap<EntityId, StreamPlayback<PoseSnapshot>>,
    levers: BTreeMap<EntityId, HeldLever>,
    clock: TickClock,
    requests: OutgoingSequence,
    notifies: OrderedReceiver<Envelope<Notify>>,
    backlog: VecDeque<Packet>,
    current_scene: Option<SceneId>,
    loading: Option<(SceneId, oneshot::Receiver<SceneId>)>,
    collaborators: Collaborators,
    bus: EventBus<ClientEvent>,
    entity_buses: BTreeMap<EntityId, EventBus<EntityChange>>,
    since_heartbeat: Duration,
    silence: Duration,
    events: Vec<ClientEvent>,
    closed: Option<ConnectionError>,
}

impl Client {
    /// Joins the session whose authority listens at `server`. Fails with a
    /// retryable [`ConnectionError`] when the join is rejected or not
    /// answered within the handshake timeout
    pub async fn connect(
        mut endpoint: Endpoint,
        server: Address,
        name: impl Into<String>,
        config: ClientConfig,
    ) -> Result<Self, AccordClientError> {
        let name = name.into();
        let accepted =
            handshake::join(&mut endpoint, server, &name, config.handshake_timeout).await?;
        info!(
            "{} joined {} as {}",
            name, accepted.session, accepted.participant
        );
        Ok(Self::new(config, endpoint, server, name, accepted))
    }

    fn new(
        config: ClientConfig,
        endpoint: Endpoint,
        server: Address,
        name: String,
        accepted: Accepted,
    ) -> Self {
        let clock = TickClock::starting_at(&config.tick, accepted.tick);
        Self {
            config,
            endpoint,
            server,
            session: accepted.session,
            local: accepted.participant,
            name,
            registry: PlayerRegistry::new(),
            world: MirrorWorld::new(accepted.participant),
            puzzles: BTreeMap::new(),
            poses: BTreeMap::new(),
            levers: BTreeMap::new(),
            clock,
            requests: OutgoingSequence::new(),
            notifies: OrderedReceiver::new(),
            backlog: accepted.backlog,
            current_scene: None,
            loading: None,
            collaborators: Collaborators::default(),
            bus: EventBus::new(),
            entity_buses: BTreeMap::new(),
            since_heartbeat: Duration::ZERO,
            silence: Duration::ZERO,
            events: Vec::new(),
            closed: None,
        }
    }

    pub fn set_collaborators(&mut self, collaborators: Collaborators) {
        self.collaborators = collaborators;
    }

    // Queries

    pub fn participant_id(&self) -> ParticipantId {
        self.local
    }

    pub fn session_id(&self) -> SessionId {
        self.session
    }

    pub fn server_address(&self) -> Address {
        self.server
    }

    pub fn address(&self) -> Address {
        self.endpoint.address()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Mirror of the authority's player registry
    pub fn registry(&self) -> &PlayerRegistry {
        &self.registry
    }

    pub fn local_participant(&self) -> Option<&Participant> {
        self.registry.get(&self.local)
    }

    pub fn is_host(&self) -> bool {
        self.local_participant()
            .map(|participant| participant.is_host)
            .unwrap_or(false)
    }

    pub fn world(&self) -> &MirrorWorld {
        &self.world
    }

    pub fn puzzle(&self, puzzle: &PuzzleId) -> Option<&PuzzleMirror> {
        self.puzzles.get(puzzle)
    }

    /// The pose currently being played back for an avatar
    pub fn pose(&self, avatar: &EntityId) -> Option<&PoseSnapshot> {
        self.poses.get(avatar).and_then(StreamPlayback::current)
    }

    pub fn buffered_poses(&self, avatar: &EntityId) -> usize {
        self.poses
            .get(avatar)
            .map(StreamPlayback::buffered)
            .unwrap_or(0)
    }

    /// The last scene the authority declared ready
    pub fn current_scene(&self) -> Option<&SceneId> {
        self.current_scene.as_ref()
    }

    /// The scene the local loader is working on, if any
    pub fn loading_scene(&self) -> Option<&SceneId> {
        self.loading.as_ref().map(|(scene, _)| scene)
    }

    pub fn current_tick(&self) -> Tick {
        self.clock.current_tick()
    }

    pub fn is_connected(&self) -> bool {
        self.closed.is_none()
    }

    /// Why the session ended, once it has
    pub fn disconnect_reason(&self) -> Option<&ConnectionError> {
        self.closed.as_ref()
    }

    /// Notifies received more than once and dropped
    pub fn duplicate_notifies(&self) -> u64 {
        self.notifies.duplicates()
    }

    // Subscriptions

    /// Calls `handler` with every event this client produces, until
    /// unsubscribed
    pub fn subscribe<F>(&mut self, handler: F) -> SubscriptionKey
    where
        F: FnMut(&ClientEvent) + Send + 'static,
    {
        self.bus.subscribe(handler)
    }

    pub fn unsubscribe(&mut self, key: &SubscriptionKey) -> bool {
        self.bus.unsubscribe(key)
    }

    /// Calls `handler` with each change to `entity`. The subscription ends
    /// by itself when the entity is despawned. Returns `None` for entities
    /// this client does not mirror
    pub fn subscribe_entity<F>(&mut self, entity: EntityId, handler: F) -> Option<SubscriptionKey>
    where
        F: FnMut(&EntityChange) + Send + 'static,
    {
        self.world.get(&entity)?;
        Some(self.entity_buses.entry(entity).or_default().subscribe(handler))
    }

    pub fn unsubscribe_entity(&mut self, entity: &EntityId, key: &SubscriptionKey) -> bool {
        let Some(bus) = self.entity_buses.get_mut(entity) else {
            return false;
        };
        let removed = bus.unsubscribe(key);
        if bus.is_empty() {
            self.entity_buses.remove(entity);
        }
        removed
    }

    pub fn entity_subscriptions(&self, entity: &EntityId) -> usize {
        self.entity_buses.get(entity).map(EventBus::len).unwrap_or(0)
    }

    // Main loop

    /// Must be called regularly, applies everything the authority sent
    /// since the last call and returns the resulting events in order
    pub fn receive(&mut self) -> Vec<ClientEvent> {
        if self.closed.is_none() {
            self.maintain_socket();
            self.poll_scene_load();
        }
        mem::take(&mut self.events)
    }

    /// Advances the peer's own simulation clock by `elapsed`. Keeps the
    /// connection alive, and detects an authority that went silent
    pub fn update(&mut self, elapsed: Duration) -> u16 {
        self.simulate(elapsed, |_, _| {})
    }

    /// Like [`Client::update`], running `simulation` once per due tick.
    /// It may write the entities this participant owns; those writes are
    /// sent to the authority after the last tick
    pub fn simulate<F>(&mut self, elapsed: Duration, mut simulation: F) -> u16
    where
        F: FnMut(&SimulationTick, &mut MirrorWorld),
    {
        if self.closed.is_some() {
            return 0;
        }

        self.silence += elapsed;
        if self.silence > self.config.disconnection_timeout {
            warn!(
                "no word from the authority at {} for {:?}",
                self.server, self.silence
            );
            self.shut_down(ConnectionError::TimedOut {
                address: self.server,
                waited_ms: self.silence.as_millis() as u64,
            });
            return 0;
        }

        self.since_heartbeat += elapsed;
        if self.since_heartbeat >= self.config.heartbeat_interval {
            self.since_heartbeat = Duration::ZERO;
            if let Err(error) = self.endpoint.send(self.server, Packet::Heartbeat) {
                // the authority's endpoint is gone
                warn!("heartbeat failed: {}", error);
                self.shut_down(error.into());
                return 0;
            }
        }

        self.clock.advance(elapsed);
        let mut ran = 0;
        while let Some(tick) = self.clock.next_tick(self.local) {
            self.write_levers(&tick);
            simulation(&tick, &mut self.world);
            ran += 1;
        }
        for update in self.world.take_pending() {
            if let Err(error) = self.send(Request::UpdateFields(update)) {
                warn!("could not send owned entity update: {}", error);
            }
        }
        ran
    }

    fn write_levers(&mut self, tick: &SimulationTick) {
        for (entity, held) in self.levers.iter_mut() {
            // keeps the angle until the claim is granted
            if !self.world.owns(entity) || self.world.is_releasing(entity) {
                continue;
            }
            let Some(angle) = held.unwritten.take() else {
                continue;
            };
            if let Err(error) = self
                .world
                .write(tick, entity, LEVER_ANGLE, FieldValue::Angle(angle))
            {
                warn!("could not write lever {}: {}", entity, error);
            }
        }
    }

    /// Presentation step: display copies converge on the latest
    /// authoritative values, and avatar poses play back. Never changes
    /// authoritative state
    pub fn present(&mut self, dt: Duration) {
        self.world
            .present(dt.as_secs_f32(), self.config.presentation_rate);
        for playback in self.poses.values_mut() {
            playback.advance(dt);
        }
    }

    fn maintain_socket(&mut self) {
        let mut packets: Vec<Packet> = self.backlog.drain(..).collect();
        for (address, packet) in self.endpoint.drain() {
            if address != self.server {
                debug!("dropping {} from unknown {}", packet.name(), address);
                continue;
            }
            packets.push(packet);
        }

        for packet in packets {
            if self.closed.is_some() {
                break;
            }
            self.silence = Duration::ZERO;
            match packet {
                Packet::Notify(envelope) => {
                    let sequence = envelope.sequence;
                    for envelope in self.notifies.receive(sequence, envelope) {
                        self.apply_notify(envelope.payload);
                    }
                }
                Packet::Heartbeat | Packet::JoinAccepted { .. } => {}
                Packet::Request(envelope) => {
                    warn!(
                        "dropping {} request, only the authority executes requests",
                        envelope.payload.name()
                    );
                }
                other => debug!("ignoring {} from the authority", other.name()),
            }
        }
    }

    fn apply_notify(&mut self, notify: Notify) {
        debug!("{} applying {}", self.local, notify.name());
        match notify {
            Notify::RosterChanged { participants } => {
                self.registry.replace_from_remote(participants, self.local);
                self.emit(ClientEvent::RosterChanged);
            }
            Notify::ReadyChanged { participant, ready } => {
                if let Err(error) = self.registry.set_ready(&participant, ready) {
                    debug!("ready change for a participant not mirrored: {}", error);
                }
                self.emit(ClientEvent::ReadyChanged { participant, ready });
            }
            Notify::SceneTransitionStarted { scene } => self.begin_scene_load(scene),
            Notify::SceneReady { outcome } => {
                if outcome.stragglers.contains(&self.local) {
                    warn!("{} opened before this participant finished loading it", outcome.scene);
                }
                self.current_scene = Some(outcome.scene.clone());
                self.emit(ClientEvent::SceneReady(outcome));
            }
            Notify::EntitySpawned {
                entity,
                kind,
                owner,
                epoch,
                fields,
            } => {
                for (_, value) in &fields {
                    if let FieldValue::Pose(pose) = value {
                        self.pose_playback(entity).receive(pose.clone());
                    }
                }
                self.world
                    .apply_spawn(entity, kind.clone(), owner, epoch, fields);
                self.emit(ClientEvent::EntitySpawned { entity, kind });
            }
            Notify::EntityUpdated(update) => {
                let entity = update.entity;
                let poses: Vec<PoseSnapshot> = update
                    .fields
                    .iter()
                    .filter_map(|(_, value)| value.as_pose().cloned())
                    .collect();
                match self.world.apply_update(update) {
                    Ok(fields) if fields.is_empty() => {}
                    Ok(fields) => {
                        for pose in poses {
                            self.pose_playback(entity).receive(pose);
                        }
                        self.publish_entity(
                            &entity,
                            EntityChange::Updated {
                                fields: fields.clone(),
                            },
                        );
                        self.emit(ClientEvent::EntityUpdated { entity, fields });
                    }
                    Err(error) => debug!("dropping update: {}", error),
                }
            }
            Notify::OwnershipChanged {
                entity,
                owner,
                epoch,
            } => {
                if !self.world.apply_ownership(&entity, owner, epoch) {
                    debug!("ignoring outdated ownership of {}", entity);
                    return;
                }
                self.publish_entity(&entity, EntityChange::OwnershipChanged { owner, epoch });
                self.emit(ClientEvent::OwnershipChanged {
                    entity,
                    owner,
                    epoch,
                });
            }
            Notify::EntityDespawned { entity } => {
                self.world.despawn(&entity);
                self.poses.remove(&entity);
                self.levers.remove(&entity);
                if let Some(mut bus) = self.entity_buses.remove(&entity) {
                    bus.publish(&EntityChange::Despawned);
                }
                self.emit(ClientEvent::EntityDespawned { entity });
            }
            Notify::PuzzleSnapshot { puzzle, snapshot } => {
                self.puzzles
                    .insert(puzzle, PuzzleMirror::from_snapshot(snapshot));
                self.emit(ClientEvent::PuzzleSynced { puzzle });
            }
            Notify::Puzzle { puzzle, event } => {
                self.puzzles.entry(puzzle).or_default().apply(&event);
                if matches!(event, PuzzleEvent::Reset { .. }) {
                    for held in self.levers.values_mut() {
                        if held.puzzle == puzzle {
                            held.lever.set_active(false);
                        }
                    }
                }
                self.collaborators.puzzle_feedback(&event);
                self.emit(ClientEvent::Puzzle { puzzle, event });
            }
            Notify::RequestRejected { sequence, reason } => {
                info!("request #{} was rejected: {}", sequence, reason);
                self.emit(ClientEvent::RequestRejected { sequence, reason });
            }
            Notify::SessionClosed { reason } => {
                info!("{} was closed by the authority: {}", self.session, reason);
                self.shut_down(ConnectionError::Closed { reason });
            }
        }
    }

    fn pose_playback(&mut self, avatar: EntityId) -> &mut StreamPlayback<PoseSnapshot> {
        let capacity = self.config.pose_buffer_capacity;
        let interval = self.config.pose_playback_interval;
        self.poses
            .entry(avatar)
            .or_insert_with(|| StreamPlayback::new(capacity, interval))
    }

    fn publish_entity(&mut self, entity: &EntityId, change: EntityChange) {
        if let Some(bus) = self.entity_buses.get_mut(entity) {
            bus.publish(&change);
        }
    }

    fn emit(&mut self, event: ClientEvent) {
        self.bus.publish(&event);
        self.events.push(event);
    }

    // Scenes

    fn begin_scene_load(&mut self, scene: SceneId) {
        let (done, receiver) = SceneLoadDone::new(scene.clone());
        self.loading = Some((scene.clone(), receiver));
        self.emit(ClientEvent::SceneTransitionStarted {
            scene: scene.clone(),
        });
        let loader = self.collaborators.scene_loader.clone();
        loader.load(&scene, done);
        self.poll_scene_load();
    }

    fn poll_scene_load(&mut self) {
        let Some((_, receiver)) = self.loading.as_mut() else {
            return;
        };
        match receiver.try_recv() {
            Ok(scene) => {
                self.loading = None;
                if let Err(error) = self.send(Request::SceneLoaded {
                    scene: scene.clone(),
                }) {
                    warn!("could not report {} loaded: {}", scene, error);
                }
                self.emit(ClientEvent::SceneLoaded { scene });
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Closed) => {
                if let Some((scene, _)) = self.loading.take() {
                    warn!("loader for {} gave up without reporting", scene);
                }
            }
        }
    }

    // Requests

    /// Sends a Request to the authority, returning its sequence number
    pub fn send(&mut self, request: Request) -> Result<SequenceNumber, AccordClientError> {
        if self.closed.is_some() {
            return Err(AccordClientError::NotConnected);
        }
        let sequence = self.requests.next();
        debug!("{} sending {} (#{})", self.local, request.name(), sequence);
        let envelope = Envelope::new(sequence, self.clock.current_tick(), request);
        self.endpoint.send(self.server, Packet::Request(envelope))?;
        Ok(sequence)
    }

    pub fn set_ready(&mut self, ready: bool) -> Result<SequenceNumber, AccordClientError> {
        self.send(Request::SetReady(ready))
    }

    /// Asks for the opposite of this participant's mirrored ready flag.
    /// Returns the requested value
    pub fn toggle_ready(&mut self) -> Result<bool, AccordClientError> {
        let ready = !self
            .local_participant()
            .map(|participant| participant.is_ready)
            .unwrap_or(false);
        self.set_ready(ready)?;
        Ok(ready)
    }

    pub fn activate(
        &mut self,
        puzzle: PuzzleId,
        element: ElementId,
    ) -> Result<SequenceNumber, AccordClientError> {
        self.send(Request::Activate { puzzle, element })
    }

    pub fn deactivate(
        &mut self,
        puzzle: PuzzleId,
        element: ElementId,
    ) -> Result<SequenceNumber, AccordClientError> {
        self.send(Request::Deactivate { puzzle, element })
    }

    pub fn start_puzzle(&mut self, puzzle: PuzzleId) -> Result<SequenceNumber, AccordClientError> {
        self.send(Request::StartPuzzle { puzzle })
    }

    pub fn place_note(
        &mut self,
        puzzle: PuzzleId,
        slot: usize,
        note: ElementId,
    ) -> Result<SequenceNumber, AccordClientError> {
        self.send(Request::PlaceNote { puzzle, slot, note })
    }

    pub fn clear_slot(
        &mut self,
        puzzle: PuzzleId,
        slot: usize,
    ) -> Result<SequenceNumber, AccordClientError> {
        self.send(Request::ClearSlot { puzzle, slot })
    }

    /// Takes hold of a lever entity, claiming it unless this participant
    /// already owns it. Crossing its activation angle counts as `element`
    /// of `puzzle`
    pub fn grab_lever(
        &mut self,
        entity: EntityId,
        config: LeverConfig,
        puzzle: PuzzleId,
        element: ElementId,
    ) -> Result<(), AccordClientError> {
        if self.world.get(&entity).is_none() {
            return Err(ValidationError::UnknownEntity { entity }.into());
        }
        if !self.world.owns(&entity) {
            self.claim(entity)?;
        }
        self.levers.insert(
            entity,
            HeldLever {
                lever: Lever::new(config),
                puzzle,
                element,
                unwritten: None,
            },
        );
        Ok(())
    }

    /// Moves a grabbed lever toward the hand's angle, in the lever's local
    /// space. The clamped angle is written into the entity on the next
    /// simulated tick; an activation or deactivation is sent right away
    pub fn pull_lever(
        &mut self,
        entity: EntityId,
        local_angle: f32,
    ) -> Result<Option<LeverSignal>, AccordClientError> {
        let held = self
            .levers
            .get_mut(&entity)
            .ok_or(AccordClientError::LeverNotHeld { entity })?;
        let signal = held.lever.apply_grab(local_angle);
        held.unwritten = Some(held.lever.angle());
        let (puzzle, element) = (held.puzzle, held.element);
        match signal {
            Some(LeverSignal::Activated) => {
                self.activate(puzzle, element)?;
            }
            Some(LeverSignal::Deactivated) => {
                self.deactivate(puzzle, element)?;
            }
            None => {}
        }
        Ok(signal)
    }

    pub fn lever(&self, entity: &EntityId) -> Option<&Lever> {
        self.levers.get(entity).map(|held| &held.lever)
    }

    /// Asks to take over an entity. Granted only when nobody else holds it
    pub fn claim(&mut self, entity: EntityId) -> Result<SequenceNumber, AccordClientError> {
        self.send(Request::ClaimOwnership { entity })
    }

    /// Hands an owned entity back to the authority, letting go of it if it
    /// is a grabbed lever. Local writes to it fail from now on
    pub fn release(&mut self, entity: EntityId) -> Result<SequenceNumber, AccordClientError> {
        let epoch = self
            .world
            .begin_release(&entity)
            .ok_or(ValidationError::UnknownEntity { entity })?;
        self.levers.remove(&entity);
        self.send(Request::ReleaseOwnership { entity, epoch })
    }

    /// Leaves the session. The client cannot be used afterwards
    pub fn leave(&mut self) {
        if self.closed.is_some() {
            return;
        }
        info!("{} leaving {}", self.local, self.session);
        if let Err(error) = self.endpoint.send(self.server, Packet::Leave) {
            debug!("could not tell the authority: {}", error);
        }
        self.shut_down(ConnectionError::Closed {
            reason: "left the session".to_string(),
        });
    }

    fn shut_down(&mut self, error: ConnectionError) {
        if self.closed.is_some() {
            return;
        }
        self.world.clear();
        self.poses.clear();
        self.levers.clear();
        self.entity_buses.clear();
        self.puzzles.clear();
        self.registry.replace_from_remote(Vec::new(), self.local);
        self.loading = None;
        self.current_scene = None;
        self.closed = Some(error.clone());
        self.emit(ClientEvent::Disconnected(error));
    }
}
