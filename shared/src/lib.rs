//! # Accord Shared
//! Common functionality shared between the accord authority, its peers and
//! the session layer: the entity replication substrate, remote invocation
//! messages, the player registry and the puzzle state machines.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

pub mod error;
mod event_bus;
pub mod interpolation;
mod key_generator;
pub mod messages;
mod participant;
mod pose;
pub mod puzzle;
mod registry;
mod scene;
mod session;
mod stream_buffer;
mod tick;
pub mod transport;
mod types;
pub mod world;
mod wrapping_number;

pub use error::{AuthorityMismatchError, ConnectionError, TimeoutError, ValidationError};
pub use event_bus::{EventBus, SubscriptionKey};
pub use interpolation::{approx_eq, DisplayValue, DEFAULT_EPSILON};
pub use key_generator::{EntityId, Key, KeyGenerator, ParticipantId, PuzzleId, SessionId};
pub use messages::{
    Envelope, Notify, OrderedReceiver, OutgoingSequence, Packet, ReceiverError, Request,
};
pub use participant::Participant;
pub use pose::PoseSnapshot;
pub use registry::{PlayerOrdering, PlayerRegistry, RegistryError};
pub use scene::{SceneId, SceneOutcome};
pub use session::{SessionDescriptor, SessionFilter};
pub use stream_buffer::{StreamBuffer, StreamPlayback};
pub use tick::{ticks_for, SimulationTick, TickClock, TickConfig};
pub use transport::{
    Address, Advertisement, Endpoint, LinkConditionerConfig, LocalNetwork, SessionDirectory,
    TransportError,
};
pub use types::{SequenceNumber, Tick};
pub use world::{
    EntityUpdate, Epoch, FieldId, FieldUpdate, FieldValue, MirrorEntity, MirrorWorld,
    ReplicaWorld, ReplicatedEntity, WorldError,
};
pub use wrapping_number::{sequence_greater_than, sequence_less_than, wrapping_diff};
