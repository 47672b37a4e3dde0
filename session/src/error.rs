use thiserror::Error;

use accord_client::AccordClientError;
use accord_server::AccordServerError;
use accord_shared::SessionId;

use crate::SessionState;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Cannot {operation} while {state}")]
    InvalidTransition {
        operation: &'static str,
        state: SessionState,
    },
    #[error("Only the session host may {operation}")]
    NotHost { operation: &'static str },
    #[error("Not connected to a session")]
    NotConnected,
    #[error("{session} is not advertised")]
    UnknownSession { session: SessionId },
    #[error("A session needs room for at least one participant")]
    NoCapacity,
    #[error("The scene transition ended before it completed")]
    TransitionAbandoned,
    #[error(transparent)]
    Client(#[from] AccordClientError),
    #[error(transparent)]
    Server(#[from] AccordServerError),
}

impl SessionError {
    /// Whether an explicit retry by the caller could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            SessionError::Client(error) => error.is_retryable(),
            SessionError::UnknownSession { .. } => true,
            _ => false,
        }
    }
}

/// Outcome of a lifecycle operation, for callers that only report it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LifecycleResult {
    pub ok: bool,
    pub reason: Option<String>,
}

impl LifecycleResult {
    pub fn success() -> Self {
        Self {
            ok: true,
            reason: None,
        }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            reason: Some(reason.into()),
        }
    }
}

impl From<Result<(), SessionError>> for LifecycleResult {
    fn from(result: Result<(), SessionError>) -> Self {
        match result {
            Ok(()) => Self::success(),
            Err(error) => Self::failure(error.to_string()),
        }
    }
}
