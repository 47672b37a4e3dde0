use std::time::Duration;

use accord_shared::TickConfig;

/// Contains Config properties which will be used by a Client
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Rate of the peer's own simulation tick, used for entities it owns
    pub tick: TickConfig,
    /// How long to wait for the authority to accept a join
    pub handshake_timeout: Duration,
    /// The duration between heartbeats sent to the authority
    pub heartbeat_interval: Duration,
    /// The duration to wait for any packet from the authority before
    /// considering it gone
    pub disconnection_timeout: Duration,
    /// Convergence rate `k` of display copies toward authoritative values
    pub presentation_rate: f32,
    /// How many pose snapshots are buffered per avatar
    pub pose_buffer_capacity: usize,
    /// Playback cadence of buffered poses. Should match the authority's
    /// sampling interval
    pub pose_playback_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            tick: TickConfig::default(),
            handshake_timeout: Duration::from_secs(3),
            heartbeat_interval: Duration::from_secs(1),
            disconnection_timeout: Duration::from_secs(5),
            presentation_rate: 12.0,
            pose_buffer_capacity: 6,
            pose_playback_interval: Duration::from_millis(500),
        }
    }
}
