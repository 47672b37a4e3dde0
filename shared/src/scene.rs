use std::fmt;

use crate::ParticipantId;

/// Names a scene that every peer loads through its own scene loader
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SceneId(pub String);

impl SceneId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a scene transition finished. Entity spawns are permitted once this
/// exists, even when some participants timed out
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SceneOutcome {
    pub scene: SceneId,
    /// Participants that had not reported a finished load when the wait
    /// timed out
    pub stragglers: Vec<ParticipantId>,
}

impl SceneOutcome {
    pub fn timed_out(&self) -> bool {
        !self.stragglers.is_empty()
    }
}
