//! Shared error types for the services crate.

use thiserror::Error;

use recall_core::model::{
    FlashcardError, FlashcardId, ResponseError, SessionId, SessionStateError,
};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by the session orchestrator and registry.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no flashcards available to study")]
    NoFlashcardsAvailable,
    #[error("session references flashcard {0}, which no longer exists")]
    DanglingReference(FlashcardId),
    #[error("study session {0} not found")]
    SessionNotFound(SessionId),
    #[error(transparent)]
    State(#[from] SessionStateError),
    #[error(transparent)]
    Response(#[from] ResponseError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl SessionError {
    /// True when the caller can fix the request (bad input or wrong session state).
    ///
    /// Dangling references and storage failures are server-side problems.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::DanglingReference(_) | Self::Storage(_))
    }
}

/// Errors emitted by `FlashcardService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FlashcardServiceError {
    #[error("flashcard {0} not found")]
    NotFound(FlashcardId),
    #[error(transparent)]
    Flashcard(#[from] FlashcardError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_exclude_server_faults() {
        let id = FlashcardId::parse("a").unwrap();
        assert!(SessionError::NoFlashcardsAvailable.is_client_error());
        assert!(SessionError::SessionNotFound(SessionId::generate()).is_client_error());
        assert!(SessionError::State(SessionStateError::AtStart).is_client_error());
        assert!(SessionError::Response(ResponseError::InvalidResponseTime(0.0)).is_client_error());
        assert!(!SessionError::DanglingReference(id).is_client_error());
        assert!(!SessionError::Storage(StorageError::NotFound).is_client_error());
    }
}
