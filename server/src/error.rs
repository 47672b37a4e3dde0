use thiserror::Error;

use accord_shared::{
    AuthorityMismatchError, RegistryError, TimeoutError, TransportError, ValidationError,
    WorldError,
};

/// Errors surfaced by the session authority
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccordServerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    AuthorityMismatch(#[from] AuthorityMismatchError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Timeout(#[from] TimeoutError),

    #[error("The session has been closed: {reason}")]
    Closed { reason: String },
}

impl From<WorldError> for AccordServerError {
    fn from(error: WorldError) -> Self {
        match error {
            WorldError::Validation(error) => AccordServerError::Validation(error),
            WorldError::AuthorityMismatch(error) => AccordServerError::AuthorityMismatch(error),
        }
    }
}
