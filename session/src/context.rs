use accord_client::{ClientConfig, Collaborators};
use accord_server::ServerConfig;
use accord_shared::LocalNetwork;

use crate::SessionConfig;

/// Everything a session manager needs from the process around it.
/// Constructed once at startup and passed down explicitly
#[derive(Clone)]
pub struct AppContext {
    pub network: LocalNetwork,
    pub player_name: String,
    pub session: SessionConfig,
    pub server: ServerConfig,
    pub client: ClientConfig,
    pub collaborators: Collaborators,
}

impl AppContext {
    pub fn new(network: LocalNetwork, player_name: impl Into<String>) -> Self {
        Self {
            network,
            player_name: player_name.into(),
            session: SessionConfig::default(),
            server: ServerConfig::default(),
            client: ClientConfig::default(),
            collaborators: Collaborators::default(),
        }
    }

    pub fn with_collaborators(mut self, collaborators: Collaborators) -> Self {
        self.collaborators = collaborators;
        self
    }

    /// Advertises hosted sessions under `region`
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.server.region = region.into();
        self
    }
}
