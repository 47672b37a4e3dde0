mod address;
mod directory;
mod error;
mod local_network;

pub use address::Address;
pub use directory::{Advertisement, SessionDirectory};
pub use error::TransportError;
pub use local_network::{Endpoint, LinkConditionerConfig, LocalNetwork};
