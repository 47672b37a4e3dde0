//! # Accord Session
//! Session lifecycle on top of the accord authority and client: hosting,
//! joining, listing and leaving sessions, coordinating scene transitions,
//! and the player commands of a lobby.

#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces
)]

mod context;
mod error;
mod manager;
mod session_config;
mod state;

pub use context::AppContext;
pub use error::{LifecycleResult, SessionError};
pub use manager::SessionManager;
pub use session_config::SessionConfig;
pub use state::SessionState;
