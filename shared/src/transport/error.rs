use thiserror::Error;

use crate::{error::ConnectionError, transport::Address};

/// Errors that can occur while sending on a local network
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("No endpoint is bound at {address}")]
    Unreachable { address: Address },
}

impl From<TransportError> for ConnectionError {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::Unreachable { address } => ConnectionError::Unreachable { address },
        }
    }
}
