//! # Accord Client
//! A participant in an accord session. Connects to the session authority,
//! keeps read-only mirrors of the roster, the replicated world and the
//! puzzles refreshed by Notifies, plays back avatar poses and sends
//! Requests for everything it wants changed.

#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces
)]

mod client;
mod client_config;
mod collaborators;
mod discovery;
mod error;
mod events;
mod handshake;

pub use client::Client;
pub use client_config::ClientConfig;
pub use collaborators::{
    note_clip, Audio, Collaborators, Haptics, InstantSceneLoader, SceneLoadDone, SceneLoader,
    Silent, ACTIVATE_CLIP, DEACTIVATE_CLIP, FAIL_CLIP, SLOT_CLIP, SOLVED_CLIP,
};
pub use discovery::{discover, DEFAULT_DISCOVERY_WINDOW};
pub use error::AccordClientError;
pub use events::{ClientEvent, EntityChange};
