use log::{trace, warn};

use accord_shared::{
    puzzle::TickTimer, EntityId, FieldId, FieldValue, ParticipantId, PoseSnapshot, ReplicaWorld,
    SimulationTick, Tick,
};

/// Field of an avatar entity holding its latest sampled pose
pub const POSE_FIELD: FieldId = FieldId(0);

/// Entity kind of avatars spawned for pose sources
pub const AVATAR_KIND: &str = "avatar";

/// Somewhere the authority can read a participant's current pose from
pub trait PoseSource: Send {
    fn sample(&mut self, tick: Tick) -> Option<PoseSnapshot>;
}

struct Relay {
    participant: ParticipantId,
    avatar: EntityId,
    source: Box<dyn PoseSource>,
}

/// Samples every pose source at a fixed low rate and writes the snapshot to
/// that participant's avatar entity, from which it replicates like any other
/// field
pub struct PoseRelay {
    relays: Vec<Relay>,
    interval_ticks: u16,
    timer: TickTimer,
}

impl PoseRelay {
    pub fn new(interval_ticks: u16) -> Self {
        let interval_ticks = interval_ticks.max(1);
        let mut timer = TickTimer::new();
        timer.arm(interval_ticks);
        Self {
            relays: Vec::new(),
            interval_ticks,
            timer,
        }
    }

    pub fn attach(&mut self, participant: ParticipantId, avatar: EntityId, source: Box<dyn PoseSource>) {
        self.relays.push(Relay {
            participant,
            avatar,
            source,
        });
    }

    /// Detaches every source of `participant`, returning their avatars
    pub fn detach(&mut self, participant: &ParticipantId) -> Vec<EntityId> {
        let mut avatars = Vec::new();
        self.relays.retain(|relay| {
            if relay.participant == *participant {
                avatars.push(relay.avatar);
                return false;
            }
            true
        });
        avatars
    }

    /// Stops sampling into `avatar`, e.g. after it was despawned
    pub fn forget_avatar(&mut self, avatar: &EntityId) {
        self.relays.retain(|relay| relay.avatar != *avatar);
    }

    pub fn len(&self) -> usize {
        self.relays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relays.is_empty()
    }

    pub fn tick(&mut self, tick: &SimulationTick, world: &mut ReplicaWorld) {
        if !self.timer.tick() {
            return;
        }
        self.timer.arm(self.interval_ticks);
        for relay in self.relays.iter_mut() {
            let Some(pose) = relay.source.sample(tick.tick()) else {
                continue;
            };
            trace!("sampled pose of {} at tick {}", relay.participant, tick.tick());
            if let Err(error) = world.write(tick, &relay.avatar, POSE_FIELD, FieldValue::Pose(pose)) {
                warn!("dropping pose of {}: {}", relay.participant, error);
            }
        }
    }
}
