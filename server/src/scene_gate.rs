use std::collections::BTreeSet;

use log::{debug, info, warn};
use tokio::sync::oneshot;

use accord_shared::{
    puzzle::TickTimer, ParticipantId, SceneId, SceneOutcome, ValidationError,
};

#[derive(Debug)]
pub enum GateState {
    /// Spawns are permitted. `scene` is the last scene every participant
    /// loaded, if any
    Open { scene: Option<SceneId> },
    /// Spawns are held until every participant in `waiting` reports `scene`
    /// loaded, or the deadline passes
    Loading {
        scene: SceneId,
        waiting: BTreeSet<ParticipantId>,
        deadline: TickTimer,
    },
}

/// Holds entity spawns back while a scene transition is in progress
pub struct SceneGate {
    state: GateState,
    waiters: Vec<oneshot::Sender<SceneOutcome>>,
}

impl SceneGate {
    pub fn new() -> Self {
        Self {
            state: GateState::Open { scene: None },
            waiters: Vec::new(),
        }
    }

    pub fn state(&self) -> &GateState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, GateState::Open { .. })
    }

    /// The scene participants are on, or loading
    pub fn scene(&self) -> Option<&SceneId> {
        match &self.state {
            GateState::Open { scene } => scene.as_ref(),
            GateState::Loading { scene, .. } => Some(scene),
        }
    }

    /// Closes the gate until every one of `participants` reports `scene`
    /// loaded. Opens immediately when there is nobody to wait for
    pub fn begin(
        &mut self,
        scene: SceneId,
        participants: impl IntoIterator<Item = ParticipantId>,
        timeout_ticks: u16,
    ) -> Result<Option<SceneOutcome>, ValidationError> {
        if let GateState::Loading { scene: loading, .. } = &self.state {
            return Err(ValidationError::SceneTransitionInProgress {
                scene: loading.clone(),
            });
        }
        let waiting: BTreeSet<ParticipantId> = participants.into_iter().collect();
        info!(
            "scene transition to {} started, waiting on {} participants",
            scene,
            waiting.len()
        );
        if waiting.is_empty() {
            return Ok(Some(self.finish(scene, Vec::new())));
        }
        let mut deadline = TickTimer::new();
        deadline.arm(timeout_ticks);
        self.state = GateState::Loading {
            scene,
            waiting,
            deadline,
        };
        Ok(None)
    }

    /// Records that `participant` finished loading `scene`. Repeated reports
    /// are no-ops
    pub fn report(
        &mut self,
        participant: ParticipantId,
        reported: &SceneId,
    ) -> Result<Option<SceneOutcome>, ValidationError> {
        match &mut self.state {
            GateState::Open { scene } => {
                if scene.as_ref() == Some(reported) {
                    debug!("{} reported {} after the gate opened", participant, reported);
                    return Ok(None);
                }
                Err(ValidationError::UnexpectedScene {
                    participant,
                    reported: reported.clone(),
                    expected: scene.clone(),
                })
            }
            GateState::Loading { scene, waiting, .. } => {
                if scene != reported {
                    return Err(ValidationError::UnexpectedScene {
                        participant,
                        reported: reported.clone(),
                        expected: Some(scene.clone()),
                    });
                }
                if waiting.remove(&participant) {
                    debug!("{} loaded {}, {} remaining", participant, reported, waiting.len());
                }
                Ok(self.finish_if_done())
            }
        }
    }

    /// Stops waiting on a participant that left mid-transition
    pub fn forget(&mut self, participant: &ParticipantId) -> Option<SceneOutcome> {
        if let GateState::Loading { waiting, .. } = &mut self.state {
            waiting.remove(participant);
        }
        self.finish_if_done()
    }

    /// Counts down the load deadline by one tick. On expiry the gate opens
    /// anyway and the participants still loading are reported as stragglers
    pub fn tick(&mut self) -> Option<SceneOutcome> {
        let GateState::Loading {
            scene,
            waiting,
            deadline,
        } = &mut self.state
        else {
            return None;
        };
        if !deadline.tick() {
            return None;
        }
        let scene = scene.clone();
        let stragglers: Vec<ParticipantId> = waiting.iter().copied().collect();
        warn!(
            "scene {} load timed out, {} participants still loading",
            scene,
            stragglers.len()
        );
        Some(self.finish(scene, stragglers))
    }

    /// Hands `waiter` the outcome of the transition in progress. With the
    /// gate open it gets the scene already loaded, or waits for the first
    /// transition when there is none
    pub fn attach(&mut self, waiter: oneshot::Sender<SceneOutcome>) {
        match &self.state {
            GateState::Open { scene: Some(scene) } => {
                let _ = waiter.send(SceneOutcome {
                    scene: scene.clone(),
                    stragglers: Vec::new(),
                });
            }
            _ => self.waiters.push(waiter),
        }
    }

    fn finish_if_done(&mut self) -> Option<SceneOutcome> {
        match &self.state {
            GateState::Loading { scene, waiting, .. } if waiting.is_empty() => {
                let scene = scene.clone();
                Some(self.finish(scene, Vec::new()))
            }
            _ => None,
        }
    }

    fn finish(&mut self, scene: SceneId, stragglers: Vec<ParticipantId>) -> SceneOutcome {
        info!("scene {} ready", scene);
        self.state = GateState::Open {
            scene: Some(scene.clone()),
        };
        let outcome = SceneOutcome { scene, stragglers };
        for waiter in self.waiters.drain(..) {
            // the subscriber may have been cancelled
            let _ = waiter.send(outcome.clone());
        }
        outcome
    }
}

impl Default for SceneGate {
    fn default() -> Self {
        Self::new()
    }
}
