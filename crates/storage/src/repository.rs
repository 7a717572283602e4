use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use recall_core::model::{Flashcard, FlashcardId, SessionId, SessionState};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Read-only view of the flashcard collection used by study sessions.
#[async_trait]
pub trait FlashcardLookup: Send + Sync {
    /// Every flashcard, in the adapter's natural order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the collection cannot be read.
    async fn list_all(&self) -> Result<Vec<Flashcard>, StorageError>;

    /// Fetch one flashcard, `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for backend failures; a missing card is not an error.
    async fn get_by_id(&self, id: &FlashcardId) -> Result<Option<Flashcard>, StorageError>;
}

/// Repository contract for flashcard CRUD.
#[async_trait]
pub trait FlashcardRepository: Send + Sync {
    /// Persist a new flashcard.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the id is already taken.
    async fn insert_flashcard(&self, card: &Flashcard) -> Result<(), StorageError>;

    /// Overwrite an existing flashcard.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the card does not exist.
    async fn update_flashcard(&self, card: &Flashcard) -> Result<(), StorageError>;

    /// Remove a flashcard. Returns `false` when nothing was deleted.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for backend failures.
    async fn delete_flashcard(&self, id: &FlashcardId) -> Result<bool, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` for backend failures.
    async fn get_flashcard(&self, id: &FlashcardId) -> Result<Option<Flashcard>, StorageError>;

    /// All flashcards, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for backend failures.
    async fn list_flashcards(&self) -> Result<Vec<Flashcard>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` for backend failures.
    async fn count_flashcards(&self) -> Result<u64, StorageError>;
}

/// Keyed store for live study sessions.
///
/// Sessions are handed out by value; callers write them back with
/// `update_session`. Serializing concurrent writers for one id is the
/// caller's job.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if a session with the same id exists.
    async fn insert_session(
        &self,
        session: &SessionState,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` for backend failures.
    async fn get_session(
        &self,
        id: SessionId,
        now: DateTime<Utc>,
    ) -> Result<Option<SessionState>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the session was never inserted or was evicted.
    async fn update_session(
        &self,
        session: &SessionState,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Drop a session. Returns `false` if it was not present.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for backend failures.
    async fn evict_session(&self, id: SessionId) -> Result<bool, StorageError>;

    /// Number of sessions currently held.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for backend failures.
    async fn count_sessions(&self) -> Result<usize, StorageError>;

    /// Sessions ordered by `started_at`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for backend failures.
    async fn recent_sessions(&self, limit: usize) -> Result<Vec<SessionState>, StorageError>;

    /// Drop every session not touched within `max_idle` of `now`. Returns how many were dropped.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for backend failures.
    async fn evict_idle(&self, now: DateTime<Utc>, max_idle: Duration)
    -> Result<usize, StorageError>;
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

/// Simple in-memory flashcard repository for testing and prototyping.
///
/// Keeps insertion order so `list_all` is stable between calls.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    cards: Arc<Mutex<Vec<Flashcard>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cards: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl FlashcardRepository for InMemoryRepository {
    async fn insert_flashcard(&self, card: &Flashcard) -> Result<(), StorageError> {
        let mut guard = self.cards.lock().map_err(poisoned)?;
        if guard.iter().any(|c| c.id() == card.id()) {
            return Err(StorageError::Conflict);
        }
        guard.push(card.clone());
        Ok(())
    }

    async fn update_flashcard(&self, card: &Flashcard) -> Result<(), StorageError> {
        let mut guard = self.cards.lock().map_err(poisoned)?;
        let slot = guard
            .iter_mut()
            .find(|c| c.id() == card.id())
            .ok_or(StorageError::NotFound)?;
        *slot = card.clone();
        Ok(())
    }

    async fn delete_flashcard(&self, id: &FlashcardId) -> Result<bool, StorageError> {
        let mut guard = self.cards.lock().map_err(poisoned)?;
        let before = guard.len();
        guard.retain(|c| c.id() != id);
        Ok(guard.len() != before)
    }

    async fn get_flashcard(&self, id: &FlashcardId) -> Result<Option<Flashcard>, StorageError> {
        let guard = self.cards.lock().map_err(poisoned)?;
        Ok(guard.iter().find(|c| c.id() == id).cloned())
    }

    async fn list_flashcards(&self) -> Result<Vec<Flashcard>, StorageError> {
        let guard = self.cards.lock().map_err(poisoned)?;
        Ok(guard.clone())
    }

    async fn count_flashcards(&self) -> Result<u64, StorageError> {
        let guard = self.cards.lock().map_err(poisoned)?;
        Ok(guard.len() as u64)
    }
}

#[async_trait]
impl FlashcardLookup for InMemoryRepository {
    async fn list_all(&self) -> Result<Vec<Flashcard>, StorageError> {
        self.list_flashcards().await
    }

    async fn get_by_id(&self, id: &FlashcardId) -> Result<Option<Flashcard>, StorageError> {
        self.get_flashcard(id).await
    }
}

struct SessionEntry {
    session: SessionState,
    last_access: DateTime<Utc>,
}

/// Process-local session store with idle tracking.
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<Mutex<HashMap<SessionId, SessionEntry>>>,
}

impl InMemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn insert_session(
        &self,
        session: &SessionState,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut guard = self.sessions.lock().map_err(poisoned)?;
        if guard.contains_key(&session.session_id()) {
            return Err(StorageError::Conflict);
        }
        guard.insert(
            session.session_id(),
            SessionEntry {
                session: session.clone(),
                last_access: now,
            },
        );
        Ok(())
    }

    async fn get_session(
        &self,
        id: SessionId,
        now: DateTime<Utc>,
    ) -> Result<Option<SessionState>, StorageError> {
        let mut guard = self.sessions.lock().map_err(poisoned)?;
        Ok(guard.get_mut(&id).map(|entry| {
            entry.last_access = now;
            entry.session.clone()
        }))
    }

    async fn update_session(
        &self,
        session: &SessionState,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut guard = self.sessions.lock().map_err(poisoned)?;
        let entry = guard
            .get_mut(&session.session_id())
            .ok_or(StorageError::NotFound)?;
        entry.session = session.clone();
        entry.last_access = now;
        Ok(())
    }

    async fn evict_session(&self, id: SessionId) -> Result<bool, StorageError> {
        let mut guard = self.sessions.lock().map_err(poisoned)?;
        Ok(guard.remove(&id).is_some())
    }

    async fn count_sessions(&self) -> Result<usize, StorageError> {
        let guard = self.sessions.lock().map_err(poisoned)?;
        Ok(guard.len())
    }

    async fn recent_sessions(&self, limit: usize) -> Result<Vec<SessionState>, StorageError> {
        let guard = self.sessions.lock().map_err(poisoned)?;
        let mut sessions: Vec<SessionState> =
            guard.values().map(|entry| entry.session.clone()).collect();
        sessions.sort_by(|a, b| b.started_at().cmp(&a.started_at()));
        sessions.truncate(limit);
        Ok(sessions)
    }

    async fn evict_idle(
        &self,
        now: DateTime<Utc>,
        max_idle: Duration,
    ) -> Result<usize, StorageError> {
        let mut guard = self.sessions.lock().map_err(poisoned)?;
        let before = guard.len();
        guard.retain(|_, entry| now - entry.last_access <= max_idle);
        let evicted = before - guard.len();
        if evicted > 0 {
            tracing::debug!(evicted, "evicted idle study sessions");
        }
        Ok(evicted)
    }
}

/// Record counts reported by `Storage::health_check`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageStatus {
    pub flashcard_count: u64,
    pub session_count: usize,
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub flashcards: Arc<dyn FlashcardRepository>,
    pub lookup: Arc<dyn FlashcardLookup>,
    pub sessions: Arc<dyn SessionStore>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let flashcards: Arc<dyn FlashcardRepository> = Arc::new(repo.clone());
        let lookup: Arc<dyn FlashcardLookup> = Arc::new(repo);
        let sessions: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
        Self {
            flashcards,
            lookup,
            sessions,
        }
    }

    /// Count what each backend holds. Any backend failure fails the check.
    ///
    /// # Errors
    ///
    /// Returns the first `StorageError` raised by either backend.
    pub async fn health_check(&self) -> Result<StorageStatus, StorageError> {
        let status = StorageStatus {
            flashcard_count: self.flashcards.count_flashcards().await?,
            session_count: self.sessions.count_sessions().await?,
        };
        tracing::debug!(
            flashcards = status.flashcard_count,
            sessions = status.session_count,
            "storage health check"
        );
        Ok(status)
    }
}
