use thiserror::Error;

use accord_shared::{
    AuthorityMismatchError, ConnectionError, EntityId, TransportError, ValidationError,
};

#[derive(Debug, Error)]
pub enum AccordClientError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error(transparent)]
    AuthorityMismatch(#[from] AuthorityMismatchError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("No connection to the session authority")]
    NotConnected,
    #[error("{entity} is not a grabbed lever")]
    LeverNotHeld { entity: EntityId },
}

impl AccordClientError {
    /// Whether an explicit retry by the caller could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            AccordClientError::Connection(error) => error.is_retryable(),
            AccordClientError::Transport(_) => true,
            AccordClientError::AuthorityMismatch(_)
            | AccordClientError::Validation(_)
            | AccordClientError::NotConnected
            | AccordClientError::LeverNotHeld { .. } => false,
        }
    }
}
