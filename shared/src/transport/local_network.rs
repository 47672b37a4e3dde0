use std::{
    collections::HashMap,
    ops::RangeInclusive,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use log::{debug, trace};
use tokio::{
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    time::{self, Instant},
};

use crate::{
    messages::Packet,
    transport::{Address, SessionDirectory, TransportError},
};

/// Degrades delivery on a [`LocalNetwork`]. A packet may arrive more than
/// once, and may be held back for a few ticks, so that later packets
/// overtake it
#[derive(Clone, Debug)]
pub struct LinkConditionerConfig {
    /// Chance, from 0 to 1, that a packet is delivered twice
    pub duplicate_chance: f32,
    /// Ticks each copy of a packet is held back, drawn from this range
    pub delay_ticks: RangeInclusive<u16>,
    pub tick_interval: Duration,
    pub seed: u64,
}

impl LinkConditionerConfig {
    pub fn new(duplicate_chance: f32) -> Self {
        Self {
            duplicate_chance,
            delay_ticks: 0..=0,
            tick_interval: Duration::from_millis(50),
            seed: 0,
        }
    }

    /// Every packet is delivered twice
    pub fn always_duplicate() -> Self {
        Self::new(1.0)
    }

    /// Holds each copy back for up to `max_ticks` ticks, independently, so
    /// delivery order is shuffled
    pub fn with_delay(mut self, max_ticks: u16) -> Self {
        self.delay_ticks = 0..=max_ticks;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

impl Default for LinkConditionerConfig {
    fn default() -> Self {
        Self::new(0.0)
    }
}

struct Conditioner {
    config: LinkConditionerConfig,
    rng: fastrand::Rng,
}

impl Conditioner {
    fn copies(&self) -> usize {
        if self.rng.f32() < self.config.duplicate_chance {
            2
        } else {
            1
        }
    }

    fn delay(&self) -> Duration {
        let ticks = self.rng.u16(self.config.delay_ticks.clone());
        self.config.tick_interval * u32::from(ticks)
    }
}

/// A packet in flight, deliverable from `due`
struct InFlight {
    due: Instant,
    from: Address,
    packet: Packet,
}

type Mailbox = UnboundedSender<InFlight>;

struct NetworkInner {
    endpoints: HashMap<Address, Mailbox>,
    next_address: u64,
    conditioner: Option<Conditioner>,
}

/// An in-process network of endpoints exchanging typed packets. Cloning
/// yields another handle to the same network
#[derive(Clone)]
pub struct LocalNetwork {
    inner: Arc<Mutex<NetworkInner>>,
    directory: SessionDirectory,
}

impl LocalNetwork {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(NetworkInner {
                endpoints: HashMap::new(),
                next_address: 1,
                conditioner: None,
            })),
            directory: SessionDirectory::new(),
        }
    }

    pub fn with_conditioner(config: LinkConditionerConfig) -> Self {
        let network = Self::new();
        network.set_conditioner(Some(config));
        network
    }

    fn lock(&self) -> MutexGuard<'_, NetworkInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_conditioner(&self, config: Option<LinkConditionerConfig>) {
        self.lock().conditioner = config.map(|config| Conditioner {
            rng: fastrand::Rng::with_seed(config.seed),
            config,
        });
    }

    pub fn directory(&self) -> &SessionDirectory {
        &self.directory
    }

    /// Binds a new endpoint at a fresh address
    pub fn bind(&self) -> Endpoint {
        let (sender, receiver) = mpsc::unbounded_channel();
        let address = {
            let mut inner = self.lock();
            let address = Address(inner.next_address);
            inner.next_address += 1;
            inner.endpoints.insert(address, sender);
            address
        };
        debug!("bound endpoint at {}", address);
        Endpoint {
            address,
            network: self.clone(),
            receiver,
            held: Vec::new(),
        }
    }

    pub fn is_bound(&self, address: &Address) -> bool {
        self.lock().endpoints.contains_key(address)
    }

    fn unbind(&self, address: &Address) {
        if self.lock().endpoints.remove(address).is_some() {
            debug!("unbound endpoint at {}", address);
        }
    }

    pub fn send(&self, from: Address, to: Address, packet: Packet) -> Result<(), TransportError> {
        let inner = self.lock();
        let Some(mailbox) = inner.endpoints.get(&to) else {
            return Err(TransportError::Unreachable { address: to });
        };
        let now = Instant::now();
        let Some(conditioner) = inner.conditioner.as_ref() else {
            return mailbox
                .send(InFlight {
                    due: now,
                    from,
                    packet,
                })
                .map_err(|_| TransportError::Unreachable { address: to });
        };

        let copies = conditioner.copies();
        trace!("{} -> {}: {} (x{})", from, to, packet.name(), copies);
        for _ in 1..copies {
            let copy = InFlight {
                due: now + conditioner.delay(),
                from,
                packet: packet.clone(),
            };
            mailbox
                .send(copy)
                .map_err(|_| TransportError::Unreachable { address: to })?;
        }
        mailbox
            .send(InFlight {
                due: now + conditioner.delay(),
                from,
                packet,
            })
            .map_err(|_| TransportError::Unreachable { address: to })
    }
}

impl Default for LocalNetwork {
    fn default() -> Self {
        Self::new()
    }
}

/// One bound address on a [`LocalNetwork`]. Unbinds when dropped
pub struct Endpoint {
    address: Address,
    network: LocalNetwork,
    receiver: UnboundedReceiver<InFlight>,
    /// Arrived, in arrival order, but not all due yet
    held: Vec<InFlight>,
}

impl Endpoint {
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn network(&self) -> &LocalNetwork {
        &self.network
    }

    pub fn send(&self, to: Address, packet: Packet) -> Result<(), TransportError> {
        self.network.send(self.address, to, packet)
    }

    /// Returns the next due packet, if any, without suspending
    pub fn try_receive(&mut self) -> Option<(Address, Packet)> {
        while let Ok(arrived) = self.receiver.try_recv() {
            self.held.push(arrived);
        }
        self.take_due(Instant::now())
    }

    /// Waits for the next packet
    pub async fn receive(&mut self) -> Option<(Address, Packet)> {
        loop {
            if let Some(packet) = self.try_receive() {
                return Some(packet);
            }
            let next_due = self.held.iter().map(|held| held.due).min();
            match next_due {
                Some(due) => {
                    let arrived = tokio::select! {
                        arrived = self.receiver.recv() => Some(arrived),
                        _ = time::sleep_until(due) => None,
                    };
                    match arrived {
                        Some(Some(arrived)) => self.held.push(arrived),
                        // closed; what is still held becomes due eventually
                        Some(None) => {
                            time::sleep_until(due).await;
                            return self.take_due(Instant::now());
                        }
                        None => {}
                    }
                }
                None => {
                    let arrived = self.receiver.recv().await?;
                    self.held.push(arrived);
                }
            }
        }
    }

    pub fn drain(&mut self) -> Vec<(Address, Packet)> {
        let mut packets = Vec::new();
        while let Some(packet) = self.try_receive() {
            packets.push(packet);
        }
        packets
    }

    /// The earliest due packet; ties go to the one that arrived first
    fn take_due(&mut self, now: Instant) -> Option<(Address, Packet)> {
        let index = self
            .held
            .iter()
            .enumerate()
            .filter(|(_, held)| held.due <= now)
            .min_by_key(|(_, held)| held.due)
            .map(|(index, _)| index)?;
        let InFlight { from, packet, .. } = self.held.remove(index);
        Some((from, packet))
    }
}

impl Drop for Endpoint {
    fn drop(&mut self) {
        self.network.unbind(&self.address);
    }
}
