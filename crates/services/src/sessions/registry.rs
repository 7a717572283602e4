use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Duration;
use recall_core::model::{Flashcard, ProgressSnapshot, SessionId, SessionState, StudyResponse};
use storage::repository::{FlashcardRepository, SessionStore, StorageError};

use super::orchestrator::SessionOrchestrator;
use crate::error::SessionError;

const DEFAULT_MAX_IDLE_MINUTES: i64 = 30;

/// Session-id keyed facade over `SessionOrchestrator` and a `SessionStore`.
///
/// Each call loads the session, applies one orchestrator operation and writes
/// the session back only if the operation succeeded. Concurrent calls for the
/// same id are not serialized here.
#[derive(Clone)]
pub struct SessionRegistry {
    orchestrator: SessionOrchestrator,
    sessions: Arc<dyn SessionStore>,
    flashcards: Arc<dyn FlashcardRepository>,
    max_idle: Duration,
    // Responses already folded into flashcard stats by an unfinished `complete`.
    folded: Arc<Mutex<HashMap<SessionId, usize>>>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new(
        orchestrator: SessionOrchestrator,
        sessions: Arc<dyn SessionStore>,
        flashcards: Arc<dyn FlashcardRepository>,
    ) -> Self {
        Self {
            orchestrator,
            sessions,
            flashcards,
            max_idle: Duration::minutes(DEFAULT_MAX_IDLE_MINUTES),
            folded: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Override how long a session may sit untouched before `start` drops it.
    #[must_use]
    pub fn with_max_idle(mut self, max_idle: Duration) -> Self {
        self.max_idle = max_idle;
        self
    }

    #[must_use]
    pub fn orchestrator(&self) -> &SessionOrchestrator {
        &self.orchestrator
    }

    /// Start and register a new session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoFlashcardsAvailable` for an empty collection and
    /// `SessionError::Storage` for repository or store failures.
    pub async fn start(&self) -> Result<SessionState, SessionError> {
        self.start_with_limit(None).await
    }

    /// Start and register a session over at most `limit` cards.
    ///
    /// Sessions idle for longer than the configured maximum are dropped first.
    ///
    /// # Errors
    ///
    /// Same as `start`.
    pub async fn start_with_limit(
        &self,
        limit: Option<usize>,
    ) -> Result<SessionState, SessionError> {
        self.evict_idle(self.max_idle).await?;
        let session = self.orchestrator.start_session_with_limit(limit).await?;
        self.sessions
            .insert_session(&session, self.orchestrator.clock().now())
            .await?;
        Ok(session)
    }

    /// Fetch a registered session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::SessionNotFound` for unknown or evicted ids.
    pub async fn get(&self, id: SessionId) -> Result<SessionState, SessionError> {
        self.sessions
            .get_session(id, self.orchestrator.clock().now())
            .await?
            .ok_or(SessionError::SessionNotFound(id))
    }

    async fn save(&self, session: &SessionState) -> Result<(), SessionError> {
        self.sessions
            .update_session(session, self.orchestrator.clock().now())
            .await
            .map_err(|err| match err {
                StorageError::NotFound => SessionError::SessionNotFound(session.session_id()),
                other => other.into(),
            })
    }

    /// # Errors
    ///
    /// Returns `SessionError::SessionNotFound`, or whatever
    /// `SessionOrchestrator::current_flashcard` returns.
    pub async fn current_flashcard(&self, id: SessionId) -> Result<Option<Flashcard>, SessionError> {
        let session = self.get(id).await?;
        self.orchestrator.current_flashcard(&session).await
    }

    /// # Errors
    ///
    /// Returns `SessionError::SessionNotFound` or the orchestrator's rejection.
    pub async fn submit_response(
        &self,
        id: SessionId,
        response: StudyResponse,
    ) -> Result<SessionState, SessionError> {
        let mut session = self.get(id).await?;
        self.orchestrator.submit_response(&mut session, response)?;
        self.save(&session).await?;
        Ok(session)
    }

    /// # Errors
    ///
    /// Returns `SessionError::SessionNotFound` or the orchestrator's rejection.
    pub async fn answer_current(
        &self,
        id: SessionId,
        is_correct: bool,
        response_time_seconds: f64,
    ) -> Result<SessionState, SessionError> {
        let mut session = self.get(id).await?;
        self.orchestrator
            .answer_current(&mut session, is_correct, response_time_seconds)?;
        self.save(&session).await?;
        Ok(session)
    }

    /// # Errors
    ///
    /// Returns `SessionError::SessionNotFound` for unknown ids.
    pub async fn progress(&self, id: SessionId) -> Result<ProgressSnapshot, SessionError> {
        let session = self.get(id).await?;
        Ok(self.orchestrator.progress(&session))
    }

    /// # Errors
    ///
    /// Returns `SessionError::SessionNotFound`, or `SessionError::State` on the first card.
    pub async fn navigate_back(&self, id: SessionId) -> Result<SessionState, SessionError> {
        let mut session = self.get(id).await?;
        self.orchestrator.navigate_back(&mut session)?;
        self.save(&session).await?;
        Ok(session)
    }

    /// # Errors
    ///
    /// Returns `SessionError::SessionNotFound` for unknown ids.
    pub async fn navigate_forward(&self, id: SessionId) -> Result<SessionState, SessionError> {
        let mut session = self.get(id).await?;
        self.orchestrator.navigate_forward(&mut session);
        self.save(&session).await?;
        Ok(session)
    }

    /// Complete the session and fold its responses into flashcard statistics.
    ///
    /// Statistics are folded before the session is stored as completed, so a
    /// failed call leaves the session active. Retrying resumes after the last
    /// folded response; no answer is counted twice or lost. Later calls on an
    /// already completed session only refresh `completed_at`. Cards deleted
    /// mid-session are skipped.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::SessionNotFound` for unknown ids and
    /// `SessionError::Storage` if statistics cannot be written.
    pub async fn complete(&self, id: SessionId) -> Result<SessionState, SessionError> {
        let mut session = self.get(id).await?;
        if session.is_active() {
            self.apply_study_results(&session).await?;
        }

        self.orchestrator.complete_session(&mut session);
        self.save(&session).await?;
        self.folded_lock()?.remove(&id);
        Ok(session)
    }

    fn folded_lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<SessionId, usize>>, SessionError> {
        self.folded
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()).into())
    }

    async fn apply_study_results(&self, session: &SessionState) -> Result<(), SessionError> {
        let session_id = session.session_id();
        let start = self.folded_lock()?.get(&session_id).copied().unwrap_or(0);

        for (index, response) in session.responses().iter().enumerate().skip(start) {
            self.fold_response(session_id, response).await?;
            self.folded_lock()?.insert(session_id, index + 1);
        }
        Ok(())
    }

    async fn fold_response(
        &self,
        session_id: SessionId,
        response: &StudyResponse,
    ) -> Result<(), SessionError> {
        let card_id = response.flashcard_id();
        let Some(mut card) = self.flashcards.get_flashcard(card_id).await? else {
            tracing::warn!(
                session_id = %session_id,
                flashcard_id = %card_id,
                "skipping study result for deleted flashcard"
            );
            return Ok(());
        };

        card.record_study_result(response.is_correct());
        match self.flashcards.update_flashcard(&card).await {
            Ok(()) => Ok(()),
            Err(StorageError::NotFound) => {
                tracing::warn!(
                    session_id = %session_id,
                    flashcard_id = %card_id,
                    "skipping study result for deleted flashcard"
                );
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Drop a session. Returns `false` if it was not registered.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` for store failures.
    pub async fn evict(&self, id: SessionId) -> Result<bool, SessionError> {
        self.folded_lock()?.remove(&id);
        Ok(self.sessions.evict_session(id).await?)
    }

    /// Drop sessions nobody touched within `max_idle`.
    ///
    /// `start` runs this with the registry's own limit; call it directly to
    /// sweep on a different schedule.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` for store failures.
    pub async fn evict_idle(&self, max_idle: Duration) -> Result<usize, SessionError> {
        Ok(self
            .sessions
            .evict_idle(self.orchestrator.clock().now(), max_idle)
            .await?)
    }

    /// Registered sessions, newest first.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` for store failures.
    pub async fn recent(&self, limit: usize) -> Result<Vec<SessionState>, SessionError> {
        Ok(self.sessions.recent_sessions(limit).await?)
    }
}
