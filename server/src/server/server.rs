use std::{
    collections::{BTreeMap, BTreeSet, HashMap, VecDeque},
    mem,
    time::Duration,
};

use log::{debug, info, warn};
use tokio::sync::oneshot;

use accord_shared::{
    puzzle::{PuzzleEvent, PuzzleMachine, PuzzleResult, TickTimer},
    Address, AuthorityMismatchError, ConnectionError, Endpoint, EntityId, Envelope, Epoch,
    FieldUpdate, FieldValue, Key, KeyGenerator, Notify, Packet, Participant, ParticipantId,
    PlayerRegistry, PoseSnapshot, PuzzleId, ReplicaWorld, ReplicatedEntity, Request, SceneId,
    SceneOutcome, SessionDescriptor, SessionId, SimulationTick, Tick, TickClock, TimeoutError,
    ValidationError, WorldError,
};

use crate::{
    connection::Connection,
    events::{DisconnectReason, Events},
    outbox::{Outbox, Recipient},
    pose_relay::{PoseRelay, AVATAR_KIND, POSE_FIELD},
    puzzle_host::PuzzleHost,
    scene_gate::SceneGate,
    AccordServerError, PoseSource, ServerConfig, Simulation,
};

enum Incoming {
    Join { address: Address, name: String },
    Leave { participant: ParticipantId },
    Request {
        participant: ParticipantId,
        envelope: Envelope<Request>,
    },
    Command(HostCommand),
}

/// A change the hosting process asked for between ticks, applied at the
/// start of the next one
enum HostCommand {
    Spawn {
        entity: ReplicatedEntity,
        defer: bool,
    },
    Despawn {
        entity: EntityId,
    },
    Transfer {
        entity: EntityId,
        participant: ParticipantId,
    },
    HostPuzzle {
        puzzle: PuzzleId,
        machine: Box<dyn PuzzleMachine>,
    },
    AttachPose {
        participant: ParticipantId,
        avatar: EntityId,
        source: Box<dyn PoseSource>,
    },
    SceneTransition {
        scene: SceneId,
        ready: oneshot::Sender<SceneOutcome>,
    },
}

/// The single authority of a session.
///
/// Packets are read whenever the server is updated, but their effects are
/// applied only inside the simulation tick, in arrival order. Commands from
/// the hosting process queue up the same way. Every Notify issued during a
/// tick is flushed to peers at the end of that tick.
pub struct Server {
    config: ServerConfig,
    endpoint: Endpoint,
    descriptor: SessionDescriptor,
    host_address: Option<Address>,
    authority: ParticipantId,
    participant_keys: KeyGenerator<ParticipantId>,
    clock: TickClock,
    registry: PlayerRegistry,
    connections: BTreeMap<ParticipantId, Connection>,
    addresses: HashMap<Address, ParticipantId>,
    inbox: VecDeque<Incoming>,
    outbox: Outbox,
    world: ReplicaWorld,
    gate: SceneGate,
    queued_scene: Option<SceneId>,
    deferred_spawns: Vec<ReplicatedEntity>,
    puzzles: PuzzleHost,
    poses: PoseRelay,
    simulation: Option<Box<dyn Simulation>>,
    heartbeat: TickTimer,
    heartbeat_ticks: u16,
    silence_limit: u16,
    events: Events,
    closed: Option<String>,
}

impl Server {
    /// Create a new Server, listening on `endpoint`
    pub fn new(
        config: ServerConfig,
        endpoint: Endpoint,
        name: impl Into<String>,
        max_players: usize,
    ) -> Self {
        let mut participant_keys = KeyGenerator::new();
        let authority = participant_keys.generate();
        let clock = TickClock::new(&config.tick);
        let descriptor = SessionDescriptor {
            id: SessionId::from_u64(fastrand::u64(1..)),
            name: name.into(),
            current_players: 0,
            max_players,
            region: config.region.clone(),
        };
        let heartbeat_ticks = clock.ticks_for(config.heartbeat_interval).max(1);
        let mut heartbeat = TickTimer::new();
        heartbeat.arm(heartbeat_ticks);
        let silence_limit = clock.ticks_for(config.disconnection_timeout).max(1);
        let poses = PoseRelay::new(clock.ticks_for(config.pose_sample_interval));

        info!(
            "{} '{}' listening at {}",
            descriptor.id,
            descriptor.name,
            endpoint.address()
        );

        Self {
            config,
            endpoint,
            descriptor,
            host_address: None,
            authority,
            participant_keys,
            clock,
            registry: PlayerRegistry::new(),
            connections: BTreeMap::new(),
            addresses: HashMap::new(),
            inbox: VecDeque::new(),
            outbox: Outbox::new(),
            world: ReplicaWorld::new(),
            gate: SceneGate::new(),
            queued_scene: None,
            deferred_spawns: Vec::new(),
            puzzles: PuzzleHost::new(),
            poses,
            simulation: None,
            heartbeat,
            heartbeat_ticks,
            silence_limit,
            events: Events::new(),
            closed: None,
        }
    }

    /// The participant joining from `address` is registered as the host
    pub fn set_host_address(&mut self, address: Address) {
        self.host_address = Some(address);
    }

    pub fn set_simulation<S: Simulation + 'static>(&mut self, simulation: S) {
        self.simulation = Some(Box::new(simulation));
    }

    // Queries

    pub fn address(&self) -> Address {
        self.endpoint.address()
    }

    pub fn session_id(&self) -> SessionId {
        self.descriptor.id
    }

    /// The descriptor answered to discovery probes
    pub fn descriptor(&self) -> SessionDescriptor {
        SessionDescriptor {
            current_players: self.registry.player_count(),
            ..self.descriptor.clone()
        }
    }

    /// The identity the authority writes its own entities under. Entities
    /// owned by it are free to be claimed
    pub fn authority_id(&self) -> ParticipantId {
        self.authority
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn registry(&self) -> &PlayerRegistry {
        &self.registry
    }

    pub fn world(&self) -> &ReplicaWorld {
        &self.world
    }

    pub fn gate(&self) -> &SceneGate {
        &self.gate
    }

    pub fn puzzle(&self, puzzle: &PuzzleId) -> Option<&dyn PuzzleMachine> {
        self.puzzles.get(puzzle)
    }

    pub fn current_tick(&self) -> Tick {
        self.clock.current_tick()
    }

    pub fn tick_interval(&self) -> Duration {
        self.clock.tick_interval()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_some()
    }

    /// Total duplicate Requests dropped across all connections
    pub fn duplicate_requests(&self) -> u64 {
        self.connections
            .values()
            .map(Connection::duplicate_requests)
            .sum()
    }

    // Main loop

    /// Must be called regularly, maintains connections to all peers and
    /// returns everything that happened since the last call
    pub fn receive(&mut self) -> Events {
        self.maintain_socket();
        self.take_events()
    }

    pub fn take_events(&mut self) -> Events {
        mem::take(&mut self.events)
    }

    /// Reads incoming packets, then runs every simulation tick that `elapsed`
    /// made due. Returns the number of ticks run
    pub fn update(&mut self, elapsed: Duration) -> u16 {
        self.maintain_socket();
        if self.closed.is_some() {
            return 0;
        }
        self.clock.advance(elapsed);
        let mut ran = 0;
        while let Some(tick) = self.clock.next_tick(self.authority) {
            self.run_tick(tick);
            ran += 1;
        }
        ran
    }

    fn maintain_socket(&mut self) {
        while let Some((address, packet)) = self.endpoint.try_receive() {
            let participant = self.addresses.get(&address).copied();
            if let Some(connection) = participant.and_then(|p| self.connections.get_mut(&p)) {
                connection.mark_heard();
            }

            match packet {
                Packet::DiscoveryProbe => {
                    let reply = Packet::DiscoveryReply {
                        descriptor: self.descriptor(),
                    };
                    if let Err(error) = self.endpoint.send(address, reply) {
                        debug!("discovery reply to {} failed: {}", address, error);
                    }
                }
                Packet::JoinRequest { name } => {
                    if let Some(reason) = &self.closed {
                        let error = ConnectionError::Closed {
                            reason: reason.clone(),
                        };
                        let _ = self.endpoint.send(address, Packet::JoinRejected { error });
                        continue;
                    }
                    self.inbox.push_back(Incoming::Join { address, name });
                }
                Packet::Leave => {
                    if let Some(participant) = participant {
                        self.inbox.push_back(Incoming::Leave { participant });
                    }
                }
                Packet::Heartbeat => {}
                Packet::Request(envelope) => {
                    let Some(participant) = participant else {
                        warn!("dropping request from unknown address {}", address);
                        continue;
                    };
                    let Some(connection) = self.connections.get_mut(&participant) else {
                        continue;
                    };
                    for envelope in connection.receive_request(envelope) {
                        self.inbox.push_back(Incoming::Request {
                            participant,
                            envelope,
                        });
                    }
                }
                other => {
                    warn!(
                        "dropping {} from {}, the authority only accepts requests",
                        other.name(),
                        address
                    );
                }
            }
        }
    }

    fn run_tick(&mut self, tick: SimulationTick) {
        let current = tick.tick();
        self.events.push_tick(current);

        while let Some(incoming) = self.inbox.pop_front() {
            self.handle_incoming(&tick, incoming);
        }

        for (puzzle, event) in self.puzzles.tick(current) {
            self.publish_puzzle_event(puzzle, event);
        }

        if let Some(outcome) = self.gate.tick() {
            self.on_scene_ready(outcome);
        }

        if let Some(simulation) = self.simulation.as_mut() {
            simulation.tick(&tick, &mut self.world);
        }
        self.poses.tick(&tick, &mut self.world);

        for update in self.world.collect_updates() {
            self.outbox.broadcast(Notify::EntityUpdated(update));
        }

        self.check_liveness();
        self.flush(current);
    }

    fn handle_incoming(&mut self, tick: &SimulationTick, incoming: Incoming) {
        match incoming {
            Incoming::Join { address, name } => self.accept_join(tick.tick(), address, name),
            Incoming::Leave { participant } => {
                self.disconnect(&participant, DisconnectReason::Left)
            }
            Incoming::Request {
                participant,
                envelope,
            } => {
                if !self.connections.contains_key(&participant) {
                    debug!("dropping request from departed {}", participant);
                    return;
                }
                self.handle_request(tick, participant, envelope);
            }
            Incoming::Command(command) => self.apply_command(command),
        }
    }

    // Connections

    fn accept_join(&mut self, tick: Tick, address: Address, name: String) {
        if let Some(participant) = self.addresses.get(&address).copied() {
            // a resent handshake, answer it again
            let _ = self.endpoint.send(
                address,
                Packet::JoinAccepted {
                    participant,
                    session: self.descriptor.id,
                    tick,
                },
            );
            return;
        }

        if self.registry.player_count() >= self.descriptor.max_players {
            info!("rejecting {} from {}, session is full", name, address);
            let error = ConnectionError::SessionFull {
                session: self.descriptor.id,
                max_players: self.descriptor.max_players,
            };
            let _ = self.endpoint.send(address, Packet::JoinRejected { error });
            return;
        }

        let participant = self.participant_keys.generate();
        let mut record = Participant::new(participant, name);
        if self.host_address == Some(address) {
            record = record.host();
        }
        if let Err(error) = self.registry.register(record) {
            let reason = error.to_string();
            self.events.push_error(error.into());
            let error = ConnectionError::Rejected { reason };
            let _ = self.endpoint.send(address, Packet::JoinRejected { error });
            return;
        }

        self.connections
            .insert(participant, Connection::new(address, participant));
        self.addresses.insert(address, participant);
        if let Err(error) = self.endpoint.send(
            address,
            Packet::JoinAccepted {
                participant,
                session: self.descriptor.id,
                tick,
            },
        ) {
            warn!("join accept to {} failed: {}", address, error);
        }

        // bring the newcomer up to date before any broadcast reaches it
        for entity in self.world.iter() {
            self.outbox.send_to(
                participant,
                Notify::EntitySpawned {
                    entity: entity.id(),
                    kind: entity.kind().to_string(),
                    owner: entity.owner(),
                    epoch: entity.epoch(),
                    fields: entity.fields(),
                },
            );
        }
        for (puzzle, snapshot) in self.puzzles.snapshots() {
            self.outbox
                .send_to(participant, Notify::PuzzleSnapshot { puzzle, snapshot });
        }
        if let Some(scene) = self.gate.scene().cloned() {
            self.outbox.send_to(
                participant,
                Notify::SceneTransitionStarted {
                    scene: scene.clone(),
                },
            );
            if self.gate.is_open() {
                let outcome = SceneOutcome {
                    scene,
                    stragglers: Vec::new(),
                };
                self.outbox
                    .send_to(participant, Notify::SceneReady { outcome });
            }
        }
        self.broadcast_roster();
        self.events.push_connection(participant);
    }

    fn disconnect(&mut self, participant: &ParticipantId, reason: DisconnectReason) {
        let Some(connection) = self.connections.remove(participant) else {
            return;
        };
        info!("{} disconnected: {:?}", participant, reason);
        self.addresses.remove(&connection.address);
        self.registry.unregister(participant);

        for (entity, epoch) in self.world.revert_ownership(participant, self.authority) {
            self.outbox.broadcast(Notify::OwnershipChanged {
                entity,
                owner: self.authority,
                epoch,
            });
        }
        for avatar in self.poses.detach(participant) {
            if self.world.despawn(&avatar).is_some() {
                self.outbox
                    .broadcast(Notify::EntityDespawned { entity: avatar });
            }
        }
        if let Some(outcome) = self.gate.forget(participant) {
            self.on_scene_ready(outcome);
        }

        self.broadcast_roster();
        self.events.push_disconnection(*participant, reason);
    }

    fn check_liveness(&mut self) {
        let limit = self.silence_limit;
        let silent: Vec<ParticipantId> = self
            .connections
            .values_mut()
            .filter_map(|connection| (connection.tick_silence() > limit).then_some(connection.participant))
            .collect();
        for participant in silent {
            self.disconnect(&participant, DisconnectReason::TimedOut);
        }

        if self.heartbeat.tick() {
            self.heartbeat.arm(self.heartbeat_ticks);
            for connection in self.connections.values() {
                let _ = self.endpoint.send(connection.address, Packet::Heartbeat);
            }
        }
    }

    /// Sends every queued Notify, in issue order. A peer whose endpoint is
    /// gone is disconnected at once, and what that changes goes out too
    fn flush(&mut self, tick: Tick) {
        loop {
            let unreachable = self.flush_outbox(tick);
            if unreachable.is_empty() {
                return;
            }
            for participant in unreachable {
                self.disconnect(&participant, DisconnectReason::Unreachable);
            }
        }
    }

    fn flush_outbox(&mut self, tick: Tick) -> BTreeSet<ParticipantId> {
        let mut unreachable = BTreeSet::new();
        for (recipient, notify) in self.outbox.take() {
            match recipient {
                Recipient::All => {
                    for connection in self.connections.values_mut() {
                        if unreachable.contains(&connection.participant) {
                            continue;
                        }
                        if connection.send(&self.endpoint, tick, notify.clone()).is_err() {
                            unreachable.insert(connection.participant);
                        }
                    }
                }
                Recipient::Only(participant) => {
                    if unreachable.contains(&participant) {
                        continue;
                    }
                    if let Some(connection) = self.connections.get_mut(&participant) {
                        if connection.send(&self.endpoint, tick, notify).is_err() {
                            unreachable.insert(participant);
                        }
                    }
                }
            }
        }
        unreachable
    }

    fn broadcast_roster(&mut self) {
        self.outbox.broadcast(Notify::RosterChanged {
            participants: self.registry.to_remote(),
        });
    }

    // Requests

    fn handle_request(
        &mut self,
        tick: &SimulationTick,
        participant: ParticipantId,
        envelope: Envelope<Request>,
    ) {
        let Envelope {
            sequence,
            payload: request,
            ..
        } = envelope;
        let name = request.name();
        debug!("{} requests {} (#{})", participant, name, sequence);

        let result = match request {
            Request::SetReady(ready) => self.set_ready(participant, ready),
            Request::Activate { puzzle, element } => {
                self.apply_puzzle(puzzle, |machine| machine.activate(element))
            }
            Request::Deactivate { puzzle, element } => {
                self.apply_puzzle(puzzle, |machine| machine.deactivate(element))
            }
            Request::StartPuzzle { puzzle } => {
                let current = tick.tick();
                self.apply_puzzle(puzzle, |machine| machine.start(current))
            }
            Request::PlaceNote { puzzle, slot, note } => {
                self.apply_puzzle(puzzle, |machine| machine.place(slot, note))
            }
            Request::ClearSlot { puzzle, slot } => {
                self.apply_puzzle(puzzle, |machine| machine.clear_slot(slot))
            }
            Request::UpdateFields(update) => self.world.apply_owner_update(participant, update),
            Request::ClaimOwnership { entity } => self.claim_ownership(participant, entity),
            Request::ReleaseOwnership { entity, epoch } => {
                self.release_ownership(participant, entity, epoch)
            }
            Request::SceneLoaded { scene } => self.scene_loaded(participant, scene),
        };

        let Err(reason) = result else {
            return;
        };
        match &reason {
            WorldError::AuthorityMismatch(error) => {
                warn!("dropping {} from {}: {}", name, participant, error);
            }
            WorldError::Validation(error) => {
                info!("rejecting {} from {}: {}", name, participant, error);
                self.outbox.send_to(
                    participant,
                    Notify::RequestRejected {
                        sequence,
                        reason: reason.clone(),
                    },
                );
            }
        }
        self.events.push_rejection(participant, name, reason);
    }

    fn set_ready(&mut self, participant: ParticipantId, ready: bool) -> Result<(), WorldError> {
        let changed = self
            .registry
            .set_ready(&participant, ready)
            .map_err(|_| ValidationError::UnknownParticipant { participant })?;
        if changed {
            self.outbox
                .broadcast(Notify::ReadyChanged { participant, ready });
            self.events.push_ready_change(participant, ready);
        }
        Ok(())
    }

    fn apply_puzzle<F>(&mut self, puzzle: PuzzleId, operation: F) -> Result<(), WorldError>
    where
        F: FnOnce(&mut dyn PuzzleMachine) -> PuzzleResult,
    {
        let events = self.puzzles.apply(puzzle, operation)?;
        for event in events {
            self.publish_puzzle_event(puzzle, event);
        }
        Ok(())
    }

    fn publish_puzzle_event(&mut self, puzzle: PuzzleId, event: PuzzleEvent) {
        self.outbox.broadcast(Notify::Puzzle {
            puzzle,
            event: event.clone(),
        });
        self.events.push_puzzle_event(puzzle, event);
    }

    fn claim_ownership(
        &mut self,
        participant: ParticipantId,
        entity: EntityId,
    ) -> Result<(), WorldError> {
        let owner = self
            .world
            .get(&entity)
            .ok_or(ValidationError::UnknownEntity { entity })?
            .owner();
        if owner == participant {
            return Ok(());
        }
        if owner != self.authority {
            return Err(ValidationError::EntityHeld { entity, owner }.into());
        }
        let epoch = self.world.transfer_ownership(&entity, participant)?;
        self.outbox.broadcast(Notify::OwnershipChanged {
            entity,
            owner: participant,
            epoch,
        });
        Ok(())
    }

    fn release_ownership(
        &mut self,
        participant: ParticipantId,
        entity: EntityId,
        epoch: Epoch,
    ) -> Result<(), WorldError> {
        let record = self
            .world
            .get(&entity)
            .ok_or(ValidationError::UnknownEntity { entity })?;
        if record.owner() != participant {
            // already released
            return Ok(());
        }
        if record.epoch() != epoch {
            return Err(AuthorityMismatchError::StaleEpoch {
                entity,
                received: epoch,
                current: record.epoch(),
            }
            .into());
        }
        let epoch = self.world.transfer_ownership(&entity, self.authority)?;
        self.outbox.broadcast(Notify::OwnershipChanged {
            entity,
            owner: self.authority,
            epoch,
        });
        Ok(())
    }

    fn scene_loaded(&mut self, participant: ParticipantId, scene: SceneId) -> Result<(), WorldError> {
        if let Some(outcome) = self.gate.report(participant, &scene)? {
            self.on_scene_ready(outcome);
        }
        Ok(())
    }

    fn on_scene_ready(&mut self, outcome: SceneOutcome) {
        if outcome.timed_out() {
            self.events.push_error(
                TimeoutError::SceneLoad {
                    scene: outcome.scene.clone(),
                    stragglers: outcome.stragglers.len(),
                }
                .into(),
            );
        }
        self.outbox.broadcast(Notify::SceneReady {
            outcome: outcome.clone(),
        });
        self.events.push_scene_outcome(outcome);

        for entity in mem::take(&mut self.deferred_spawns) {
            self.insert_entity(entity);
        }
    }

    // Commands
    //
    // Called by the hosting process between ticks. Each one is checked right
    // away, then queued behind the Requests already received and applied in
    // the next tick.

    /// Spawns an entity owned by `owner`, or by the authority when `None`.
    /// Refused while a scene transition is in progress
    pub fn spawn(
        &mut self,
        kind: impl Into<String>,
        owner: Option<ParticipantId>,
        fields: Vec<FieldUpdate>,
    ) -> Result<EntityId, AccordServerError> {
        if let Some(scene) = self.loading_scene() {
            return Err(ValidationError::SceneNotReady { scene }.into());
        }
        self.queue_entity(kind, owner, fields, false)
    }

    /// Like [`Server::spawn`], but holds the spawn back until the scene in
    /// progress is ready instead of refusing it
    pub fn queue_spawn(
        &mut self,
        kind: impl Into<String>,
        owner: Option<ParticipantId>,
        fields: Vec<FieldUpdate>,
    ) -> Result<EntityId, AccordServerError> {
        self.queue_entity(kind, owner, fields, true)
    }

    /// Returns whether `entity` exists or is about to
    pub fn despawn(&mut self, entity: &EntityId) -> bool {
        if !self.knows_entity(entity) {
            return false;
        }
        self.queue_command(HostCommand::Despawn { entity: *entity });
        true
    }

    /// Hands an entity to `participant`, as if it had claimed it
    pub fn transfer_ownership(
        &mut self,
        entity: &EntityId,
        participant: ParticipantId,
    ) -> Result<(), AccordServerError> {
        if !self.registry.contains(&participant) && participant != self.authority {
            return Err(ValidationError::UnknownParticipant { participant }.into());
        }
        if !self.knows_entity(entity) {
            return Err(ValidationError::UnknownEntity { entity: *entity }.into());
        }
        self.queue_command(HostCommand::Transfer {
            entity: *entity,
            participant,
        });
        Ok(())
    }

    pub fn host_puzzle(&mut self, machine: Box<dyn PuzzleMachine>) -> PuzzleId {
        let puzzle = self.puzzles.reserve();
        self.queue_command(HostCommand::HostPuzzle { puzzle, machine });
        puzzle
    }

    /// Samples `source` at the configured pose rate into a new avatar entity
    pub fn attach_pose_source<S: PoseSource + 'static>(
        &mut self,
        participant: ParticipantId,
        source: S,
    ) -> Result<EntityId, AccordServerError> {
        if !self.registry.contains(&participant) {
            return Err(ValidationError::UnknownParticipant { participant }.into());
        }
        let initial = PoseSnapshot::at_rest(self.current_tick(), [0.0; 3]);
        let avatar = self.spawn(
            AVATAR_KIND,
            None,
            vec![(POSE_FIELD, FieldValue::Pose(initial))],
        )?;
        self.queue_command(HostCommand::AttachPose {
            participant,
            avatar,
            source: Box::new(source),
        });
        Ok(avatar)
    }

    /// Tells every participant to load `scene`, holding spawns until they
    /// all report it loaded or the load times out. The receiver resolves
    /// with the outcome of this transition
    pub fn request_scene_transition(
        &mut self,
        scene: SceneId,
    ) -> Result<oneshot::Receiver<SceneOutcome>, AccordServerError> {
        if let Some(reason) = &self.closed {
            return Err(AccordServerError::Closed {
                reason: reason.clone(),
            });
        }
        if let Some(loading) = self.loading_scene() {
            return Err(ValidationError::SceneTransitionInProgress { scene: loading }.into());
        }
        let (ready, receiver) = oneshot::channel();
        self.queued_scene = Some(scene.clone());
        self.queue_command(HostCommand::SceneTransition { scene, ready });
        Ok(receiver)
    }

    /// Ends the session for everyone. Peers are told why before the server
    /// stops answering
    pub fn close(&mut self, reason: impl Into<String>) {
        if self.closed.is_some() {
            return;
        }
        let reason = reason.into();
        info!("closing {}: {}", self.descriptor.id, reason);
        self.outbox.broadcast(Notify::SessionClosed {
            reason: reason.clone(),
        });
        self.flush(self.clock.current_tick());
        for participant in mem::take(&mut self.connections).into_keys() {
            self.events
                .push_disconnection(participant, DisconnectReason::SessionClosed);
        }
        self.addresses.clear();
        self.inbox.clear();
        self.queued_scene = None;
        self.closed = Some(reason);
    }

    fn loading_scene(&self) -> Option<SceneId> {
        if let Some(scene) = &self.queued_scene {
            return Some(scene.clone());
        }
        if self.gate.is_open() {
            return None;
        }
        self.gate.scene().cloned()
    }

    fn queue_command(&mut self, command: HostCommand) {
        self.inbox.push_back(Incoming::Command(command));
    }

    fn queue_entity(
        &mut self,
        kind: impl Into<String>,
        owner: Option<ParticipantId>,
        fields: Vec<FieldUpdate>,
        defer: bool,
    ) -> Result<EntityId, AccordServerError> {
        let owner = owner.unwrap_or(self.authority);
        if owner != self.authority && !self.registry.contains(&owner) {
            return Err(ValidationError::UnknownParticipant { participant: owner }.into());
        }
        let id = self.world.reserve_id();
        let entity = ReplicatedEntity::new(id, kind, owner, fields);
        self.queue_command(HostCommand::Spawn { entity, defer });
        Ok(id)
    }

    /// Whether `entity` is in the world, held back by the scene gate, or
    /// queued to spawn
    fn knows_entity(&self, entity: &EntityId) -> bool {
        self.world.get(entity).is_some()
            || self.deferred_spawns.iter().any(|deferred| deferred.id() == *entity)
            || self.inbox.iter().any(|incoming| {
                matches!(
                    incoming,
                    Incoming::Command(HostCommand::Spawn { entity: queued, .. })
                        if queued.id() == *entity
                )
            })
    }

    fn apply_command(&mut self, command: HostCommand) {
        match command {
            // plain spawns were refused while a transition was queued, so
            // only deferred ones can meet a closed gate
            HostCommand::Spawn { entity, defer } => {
                if defer && !self.gate.is_open() {
                    debug!("deferring spawn of {} until the scene is ready", entity.id());
                    self.deferred_spawns.push(entity);
                } else {
                    self.insert_entity(entity);
                }
            }
            HostCommand::Despawn { entity } => {
                self.deferred_spawns.retain(|deferred| deferred.id() != entity);
                if self.world.despawn(&entity).is_none() {
                    return;
                }
                self.poses.forget_avatar(&entity);
                self.outbox.broadcast(Notify::EntityDespawned { entity });
            }
            HostCommand::Transfer {
                entity,
                participant,
            } => {
                if !self.registry.contains(&participant) && participant != self.authority {
                    debug!("{} left before {} was handed over", participant, entity);
                    return;
                }
                match self.world.transfer_ownership(&entity, participant) {
                    Ok(epoch) => self.outbox.broadcast(Notify::OwnershipChanged {
                        entity,
                        owner: participant,
                        epoch,
                    }),
                    Err(error) => {
                        warn!("could not hand {} to {}: {}", entity, participant, error);
                        self.events.push_error(error.into());
                    }
                }
            }
            HostCommand::HostPuzzle { puzzle, machine } => {
                let snapshot = machine.snapshot();
                self.puzzles.host(puzzle, machine);
                self.outbox
                    .broadcast(Notify::PuzzleSnapshot { puzzle, snapshot });
            }
            HostCommand::AttachPose {
                participant,
                avatar,
                source,
            } => {
                if !self.registry.contains(&participant) {
                    debug!("{} left before its avatar was attached", participant);
                    if self.world.despawn(&avatar).is_some() {
                        self.outbox
                            .broadcast(Notify::EntityDespawned { entity: avatar });
                    }
                    return;
                }
                self.poses.attach(participant, avatar, source);
            }
            HostCommand::SceneTransition { scene, ready } => {
                self.queued_scene = None;
                self.begin_scene_transition(scene, ready);
            }
        }
    }

    fn begin_scene_transition(&mut self, scene: SceneId, ready: oneshot::Sender<SceneOutcome>) {
        let timeout_ticks = self.clock.ticks_for(self.config.scene_load_timeout);
        let participants: Vec<ParticipantId> = self.registry.ids().collect();
        let immediate = match self.gate.begin(scene.clone(), participants, timeout_ticks) {
            Ok(immediate) => immediate,
            Err(error) => {
                warn!("scene transition to {} refused: {}", scene, error);
                self.events.push_error(error.into());
                return;
            }
        };
        self.outbox
            .broadcast(Notify::SceneTransitionStarted { scene });
        if let Some(outcome) = immediate {
            self.on_scene_ready(outcome);
        }
        self.gate.attach(ready);
    }

    fn insert_entity(&mut self, entity: ReplicatedEntity) {
        info!("spawned {} ({}) owned by {}", entity.id(), entity.kind(), entity.owner());
        self.outbox.broadcast(Notify::EntitySpawned {
            entity: entity.id(),
            kind: entity.kind().to_string(),
            owner: entity.owner(),
            epoch: entity.epoch(),
            fields: entity.fields(),
        });
        self.world.insert(entity);
    }
}
