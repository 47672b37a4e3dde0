//! # Accord Server
//! The session authority. Runs the fixed-rate simulation tick, validates
//! Requests from connected peers, broadcasts Notifies in issue order, gates
//! entity spawns behind scene loads and hosts puzzle state machines.

#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces
)]

mod connection;
mod error;
mod events;
mod outbox;
mod pose_relay;
mod puzzle_host;
mod runner;
mod scene_gate;
mod server;
mod simulation;

pub use error::AccordServerError;
pub use events::{
    ConnectEvent, DisconnectEvent, DisconnectReason, ErrorEvent, Event, Events, PuzzleStateEvent,
    ReadyEvent, RejectEvent, SceneReadyEvent, TickEvent,
};
pub use pose_relay::{PoseSource, AVATAR_KIND, POSE_FIELD};
pub use runner::{spawn_loop, ServerHandle};
pub use scene_gate::{GateState, SceneGate};
pub use server::{Server, ServerConfig};
pub use simulation::Simulation;
