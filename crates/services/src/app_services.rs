use std::sync::Arc;

use storage::repository::{Storage, StorageError, StorageStatus};

use crate::error::AppServicesError;
use crate::flashcard_service::FlashcardService;
use crate::sessions::{SessionOrchestrator, SessionRegistry};
use crate::Clock;

/// Assembles app-facing services over one `Storage`.
#[derive(Clone)]
pub struct AppServices {
    storage: Storage,
    flashcards: Arc<FlashcardService>,
    sessions: Arc<SessionRegistry>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock))
    }

    /// Build services backed by process-local storage.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(&Storage::in_memory(), clock)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock) -> Self {
        let flashcards = Arc::new(FlashcardService::new(
            clock,
            Arc::clone(&storage.flashcards),
        ));
        let orchestrator = SessionOrchestrator::new(clock, Arc::clone(&storage.lookup));
        let sessions = Arc::new(SessionRegistry::new(
            orchestrator,
            Arc::clone(&storage.sessions),
            Arc::clone(&storage.flashcards),
        ));

        Self {
            storage: storage.clone(),
            flashcards,
            sessions,
        }
    }

    /// Flashcard and live-session counts from the underlying storage.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if either backend cannot be read.
    pub async fn status(&self) -> Result<StorageStatus, StorageError> {
        self.storage.health_check().await
    }

    #[must_use]
    pub fn flashcards(&self) -> Arc<FlashcardService> {
        Arc::clone(&self.flashcards)
    }

    #[must_use]
    pub fn sessions(&self) -> Arc<SessionRegistry> {
        Arc::clone(&self.sessions)
    }
}
