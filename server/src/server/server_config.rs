use std::{default::Default, time::Duration};

use accord_shared::TickConfig;

/// Contains Config properties which will be used by the Server
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Rate of the authoritative simulation tick
    pub tick: TickConfig,
    /// Advertised to discovery alongside the session name
    pub region: String,
    /// How long the authority waits for every participant to report a scene
    /// loaded before opening the gate anyway
    pub scene_load_timeout: Duration,
    /// How often the authority sends a heartbeat to every connection
    pub heartbeat_interval: Duration,
    /// A connection silent for this long is disconnected
    pub disconnection_timeout: Duration,
    /// How often pose sources are sampled
    pub pose_sample_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick: TickConfig::default(),
            region: "local".to_string(),
            scene_load_timeout: Duration::from_secs(10),
            heartbeat_interval: Duration::from_secs(1),
            disconnection_timeout: Duration::from_secs(5),
            pose_sample_interval: Duration::from_millis(500),
        }
    }
}
