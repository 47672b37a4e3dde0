use std::{collections::VecDeque, time::Duration};

use log::{debug, warn};
use tokio::time;

use accord_shared::{
    Address, ConnectionError, Endpoint, Packet, ParticipantId, SessionId, Tick, TimeoutError,
};

/// What the authority answered to a successful join
pub(crate) struct Accepted {
    pub participant: ParticipantId,
    pub session: SessionId,
    pub tick: Tick,
    /// Packets from the authority that arrived alongside the acceptance
    pub backlog: VecDeque<Packet>,
}

/// Sends a join request to `server` and waits for its answer
pub(crate) async fn join(
    endpoint: &mut Endpoint,
    server: Address,
    name: &str,
    timeout: Duration,
) -> Result<Accepted, ConnectionError> {
    endpoint.send(
        server,
        Packet::JoinRequest {
            name: name.to_string(),
        },
    )?;

    let mut backlog = VecDeque::new();
    let answer = time::timeout(timeout, async {
        loop {
            let Some((from, packet)) = endpoint.receive().await else {
                return Err(ConnectionError::Closed {
                    reason: "local endpoint was unbound".to_string(),
                });
            };
            if from != server {
                debug!("ignoring {} from {} during handshake", packet.name(), from);
                continue;
            }
            match packet {
                Packet::JoinAccepted {
                    participant,
                    session,
                    tick,
                } => return Ok((participant, session, tick)),
                Packet::JoinRejected { error } => return Err(error),
                other => backlog.push_back(other),
            }
        }
    })
    .await;

    match answer {
        Ok(Ok((participant, session, tick))) => Ok(Accepted {
            participant,
            session,
            tick,
            backlog,
        }),
        Ok(Err(error)) => Err(error),
        Err(_) => {
            let waited_ms = timeout.as_millis() as u64;
            warn!(
                "{}",
                TimeoutError::Handshake {
                    address: server,
                    waited_ms
                }
            );
            Err(ConnectionError::TimedOut {
                address: server,
                waited_ms,
            })
        }
    }
}
