use std::fmt;
use std::sync::Arc;

use recall_core::model::{
    Flashcard, ProgressSnapshot, SessionState, SessionStateError, StudyResponse,
};
use storage::repository::FlashcardLookup;

use crate::error::SessionError;
use crate::Clock;

/// Drives study sessions against the flashcard collection.
///
/// Holds no session state of its own: every operation takes the session it
/// acts on. Only `start_session` and `current_flashcard` read the repository;
/// the rest are synchronous and either fully apply or leave the session as is.
#[derive(Clone)]
pub struct SessionOrchestrator {
    clock: Clock,
    flashcards: Arc<dyn FlashcardLookup>,
}

impl SessionOrchestrator {
    #[must_use]
    pub fn new(clock: Clock, flashcards: Arc<dyn FlashcardLookup>) -> Self {
        Self { clock, flashcards }
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Start a session over every flashcard, in repository order.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoFlashcardsAvailable` if the collection is empty.
    /// Returns `SessionError::Storage` if the collection cannot be read.
    pub async fn start_session(&self) -> Result<SessionState, SessionError> {
        self.start_session_with_limit(None).await
    }

    /// Like `start_session`, but keeps only the first `limit` cards when given.
    ///
    /// # Errors
    ///
    /// Same as `start_session`. A limit of zero leaves nothing to study.
    pub async fn start_session_with_limit(
        &self,
        limit: Option<usize>,
    ) -> Result<SessionState, SessionError> {
        let mut cards = self.flashcards.list_all().await?;
        if let Some(limit) = limit {
            cards.truncate(limit);
        }
        if cards.is_empty() {
            return Err(SessionError::NoFlashcardsAvailable);
        }

        let session = SessionState::create(
            cards.iter().map(|card| card.id().clone()),
            self.clock.now(),
        )?;
        tracing::info!(
            session_id = %session.session_id(),
            total_cards = session.total_cards(),
            "started study session"
        );
        Ok(session)
    }

    /// Resolve the card under the cursor. `None` once the session is exhausted.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::DanglingReference` if the card was deleted after the
    /// session started.
    /// Returns `SessionError::Storage` if the lookup fails.
    pub async fn current_flashcard(
        &self,
        session: &SessionState,
    ) -> Result<Option<Flashcard>, SessionError> {
        let Some(id) = session.current_flashcard_id() else {
            return Ok(None);
        };

        match self.flashcards.get_by_id(id).await? {
            Some(card) => Ok(Some(card)),
            None => {
                tracing::warn!(
                    session_id = %session.session_id(),
                    flashcard_id = %id,
                    "session references a missing flashcard"
                );
                Err(SessionError::DanglingReference(id.clone()))
            }
        }
    }

    /// Record `response` for the current card and advance.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::State` with `SessionComplete` or `MismatchedResponse`
    /// when the session rejects the response.
    pub fn submit_response<'a>(
        &self,
        session: &'a mut SessionState,
        response: StudyResponse,
    ) -> Result<&'a mut SessionState, SessionError> {
        let is_correct = response.is_correct();
        session.record_response(response)?;
        tracing::debug!(
            session_id = %session.session_id(),
            cursor = session.cursor(),
            is_correct,
            "recorded study response"
        );
        Ok(session)
    }

    /// Answer the current card, stamping the response with this orchestrator's clock.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Response` if `response_time_seconds` is not positive.
    /// Returns `SessionError::State` if the session is exhausted.
    pub fn answer_current<'a>(
        &self,
        session: &'a mut SessionState,
        is_correct: bool,
        response_time_seconds: f64,
    ) -> Result<&'a mut SessionState, SessionError> {
        let Some(id) = session.current_flashcard_id().cloned() else {
            return Err(SessionStateError::SessionComplete.into());
        };
        let response = StudyResponse::new(id, is_correct, response_time_seconds, self.clock.now())?;
        self.submit_response(session, response)
    }

    #[must_use]
    pub fn progress(&self, session: &SessionState) -> ProgressSnapshot {
        session.progress()
    }

    /// Mark the session finished. Calling it again only refreshes `completed_at`.
    pub fn complete_session<'a>(&self, session: &'a mut SessionState) -> &'a mut SessionState {
        session.complete(self.clock.now());
        let progress = session.progress();
        tracing::info!(
            session_id = %session.session_id(),
            total_cards = progress.total_cards,
            completed = progress.completed_count,
            correct = progress.correct_count,
            accuracy_percent = progress.accuracy_percent,
            "completed study session"
        );
        session
    }

    /// Step back one card without touching recorded responses.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::State` with `AtStart` on the first card.
    pub fn navigate_back<'a>(
        &self,
        session: &'a mut SessionState,
    ) -> Result<&'a mut SessionState, SessionError> {
        session.retreat()?;
        tracing::debug!(session_id = %session.session_id(), cursor = session.cursor(), "navigated back");
        Ok(session)
    }

    /// Skip ahead one card without recording a response. Stops at the end.
    pub fn navigate_forward<'a>(&self, session: &'a mut SessionState) -> &'a mut SessionState {
        session.advance();
        tracing::debug!(session_id = %session.session_id(), cursor = session.cursor(), "navigated forward");
        session
    }
}

impl fmt::Debug for SessionOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionOrchestrator")
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}
