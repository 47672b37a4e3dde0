use std::{collections::BTreeSet, time::Duration};

use log::{debug, info};
use tokio::time::{self, Instant};

use accord_shared::{LocalNetwork, Packet, SessionDescriptor, SessionFilter, TimeoutError};

/// How long a session listing waits for hosts to answer
pub const DEFAULT_DISCOVERY_WINDOW: Duration = Duration::from_secs(2);

/// Probes every advertised session and collects the descriptors matching
/// `filter` that are answered within `window`. Returns early once every
/// advertised host has answered
pub async fn discover(
    network: &LocalNetwork,
    filter: &SessionFilter,
    window: Duration,
) -> Vec<SessionDescriptor> {
    let mut endpoint = network.bind();
    let mut probed = BTreeSet::new();
    for (session, address) in network.directory().addresses() {
        match endpoint.send(address, Packet::DiscoveryProbe) {
            Ok(()) => {
                probed.insert(address);
            }
            Err(error) => debug!("{} is advertised but unreachable: {}", session, error),
        }
    }

    let deadline = Instant::now() + window;
    let mut answered = BTreeSet::new();
    let mut found: Vec<SessionDescriptor> = Vec::new();
    while answered.len() < probed.len() {
        let Ok(Some((from, packet))) = time::timeout_at(deadline, endpoint.receive()).await else {
            break;
        };
        let Packet::DiscoveryReply { descriptor } = packet else {
            continue;
        };
        if !probed.contains(&from) || !answered.insert(from) {
            continue;
        }
        if filter.matches(&descriptor) {
            found.push(descriptor);
        }
    }

    let unanswered = probed.len() - answered.len();
    if unanswered > 0 {
        info!(
            "{}",
            TimeoutError::Discovery {
                window_ms: window.as_millis() as u64,
                unanswered,
            }
        );
    }
    found.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
    found
}
