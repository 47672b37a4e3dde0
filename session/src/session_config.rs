use std::time::Duration;

use accord_shared::SceneId;

/// Contains Config properties which will be used by a SessionManager
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// How long a session listing waits for hosts to answer
    pub discovery_window: Duration,
    /// Fewest participants a match may start with
    pub min_players_to_start: usize,
    /// The scene `start_match` transitions to
    pub match_scene: SceneId,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            discovery_window: Duration::from_secs(2),
            min_players_to_start: 2,
            match_scene: SceneId::new("match"),
        }
    }
}
