use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

use crate::model::{FlashcardId, ProgressSnapshot, SessionId, StudyResponse};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionStateError {
    #[error("cannot create a study session from an empty flashcard list")]
    EmptyCollection,

    #[error("session is already complete")]
    SessionComplete,

    #[error("response for flashcard {actual} does not match current flashcard {expected}")]
    MismatchedResponse {
        expected: FlashcardId,
        actual: FlashcardId,
    },

    #[error("cannot go back from the first card")]
    AtStart,
}

//
// ─── PHASE ─────────────────────────────────────────────────────────────────────
//

/// Derived lifecycle position of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// The cursor points at a card.
    InProgress,
    /// The cursor has moved past the last card. `retreat` leads back to `InProgress`.
    Exhausted,
    /// `complete` was called. Terminal for `active`.
    Completed,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One learner's pass through a fixed, ordered set of flashcards.
///
/// The cursor and the response log move independently: navigation is for
/// review, `record_response` is for scoring. Only flashcard ids are held so
/// edits to a card mid-session are picked up on the next lookup.
#[derive(Clone)]
pub struct SessionState {
    session_id: SessionId,
    card_sequence: Vec<FlashcardId>,
    cursor: usize,
    responses: Vec<StudyResponse>,
    active: bool,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl SessionState {
    /// Start a session over `flashcard_ids` in the given order.
    ///
    /// `now` should come from the services layer clock to keep time deterministic.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::EmptyCollection` if no ids are provided.
    pub fn create(
        flashcard_ids: impl IntoIterator<Item = FlashcardId>,
        now: DateTime<Utc>,
    ) -> Result<Self, SessionStateError> {
        let card_sequence: Vec<FlashcardId> = flashcard_ids.into_iter().collect();
        if card_sequence.is_empty() {
            return Err(SessionStateError::EmptyCollection);
        }

        Ok(Self {
            session_id: SessionId::generate(),
            card_sequence,
            cursor: 0,
            responses: Vec::new(),
            active: true,
            started_at: now,
            completed_at: None,
        })
    }

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    #[must_use]
    pub fn card_sequence(&self) -> &[FlashcardId] {
        &self.card_sequence
    }

    #[must_use]
    pub fn total_cards(&self) -> usize {
        self.card_sequence.len()
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn responses(&self) -> &[StudyResponse] {
        &self.responses
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Id at the cursor, or `None` once the sequence is exhausted.
    #[must_use]
    pub fn current_flashcard_id(&self) -> Option<&FlashcardId> {
        self.card_sequence.get(self.cursor)
    }

    /// Most recent scored response for `id`, if any.
    #[must_use]
    pub fn response_for(&self, id: &FlashcardId) -> Option<&StudyResponse> {
        self.responses.iter().rev().find(|r| r.flashcard_id() == id)
    }

    /// Record an answer for the current card and move to the next one.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::SessionComplete` if the sequence is exhausted.
    /// Returns `SessionStateError::MismatchedResponse` if the response is for a
    /// different card than the current one.
    pub fn record_response(&mut self, response: StudyResponse) -> Result<(), SessionStateError> {
        let Some(expected) = self.current_flashcard_id() else {
            return Err(SessionStateError::SessionComplete);
        };
        if response.flashcard_id() != expected {
            return Err(SessionStateError::MismatchedResponse {
                expected: expected.clone(),
                actual: response.flashcard_id().clone(),
            });
        }

        self.responses.push(response);
        self.advance();
        Ok(())
    }

    /// Move forward one card, saturating at the end of the sequence.
    pub fn advance(&mut self) {
        if self.cursor < self.card_sequence.len() {
            self.cursor += 1;
        }
    }

    #[must_use]
    pub fn can_retreat(&self) -> bool {
        self.cursor > 0
    }

    /// Move back one card. Recorded responses are kept.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::AtStart` at the first card.
    pub fn retreat(&mut self) -> Result<(), SessionStateError> {
        if !self.can_retreat() {
            return Err(SessionStateError::AtStart);
        }
        self.cursor -= 1;
        Ok(())
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.cursor >= self.card_sequence.len()
    }

    /// Mark the session finished. Calling it again refreshes `completed_at`.
    pub fn complete(&mut self, now: DateTime<Utc>) {
        self.active = false;
        self.completed_at = Some(now);
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        if !self.active {
            SessionPhase::Completed
        } else if self.is_complete() {
            SessionPhase::Exhausted
        } else {
            SessionPhase::InProgress
        }
    }

    #[must_use]
    pub fn progress(&self) -> ProgressSnapshot {
        ProgressSnapshot::compute(
            self.cursor,
            self.card_sequence.len(),
            self.responses.iter().map(StudyResponse::is_correct),
        )
    }
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionState")
            .field("session_id", &self.session_id)
            .field("cards_len", &self.card_sequence.len())
            .field("cursor", &self.cursor)
            .field("responses_len", &self.responses.len())
            .field("active", &self.active)
            .field("started_at", &self.started_at)
            .field("completed_at", &self.completed_at)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;
    use proptest::prelude::*;

    fn ids(names: &[&str]) -> Vec<FlashcardId> {
        names.iter().map(|n| FlashcardId::parse(n).unwrap()).collect()
    }

    fn response(id: &str, correct: bool) -> StudyResponse {
        StudyResponse::new(FlashcardId::parse(id).unwrap(), correct, 2.0, fixed_now()).unwrap()
    }

    fn session(names: &[&str]) -> SessionState {
        SessionState::create(ids(names), fixed_now()).unwrap()
    }

    #[test]
    fn create_rejects_empty_sequence() {
        let err = SessionState::create(Vec::new(), fixed_now()).unwrap_err();
        assert_eq!(err, SessionStateError::EmptyCollection);
    }

    #[test]
    fn create_starts_at_first_card() {
        let s = session(&["A", "B", "C"]);
        assert_eq!(s.cursor(), 0);
        assert!(s.responses().is_empty());
        assert!(s.is_active());
        assert_eq!(s.started_at(), fixed_now());
        assert_eq!(s.completed_at(), None);
        assert_eq!(s.current_flashcard_id().unwrap().as_str(), "A");
        assert_eq!(s.phase(), SessionPhase::InProgress);
    }

    #[test]
    fn session_ids_are_unique() {
        let a = session(&["A"]);
        let b = session(&["A"]);
        assert_ne!(a.session_id(), b.session_id());
    }

    #[test]
    fn happy_path_records_and_advances() {
        let mut s = session(&["A", "B", "C"]);
        s.record_response(response("A", true)).unwrap();

        assert_eq!(s.cursor(), 1);
        assert_eq!(s.current_flashcard_id().unwrap().as_str(), "B");
        assert_eq!(s.progress().correct_count, 1);
    }

    #[test]
    fn navigation_without_recording() {
        let mut s = session(&["A", "B"]);
        s.advance();
        assert_eq!(s.current_flashcard_id().unwrap().as_str(), "B");
        s.retreat().unwrap();
        assert_eq!(s.current_flashcard_id().unwrap().as_str(), "A");
        assert!(s.responses().is_empty());
    }

    #[test]
    fn exhaustion_then_completion() {
        let mut s = session(&["A"]);
        s.record_response(response("A", false)).unwrap();
        assert!(s.is_complete());
        assert_eq!(s.current_flashcard_id(), None);
        assert_eq!(s.phase(), SessionPhase::Exhausted);

        let done_at = fixed_now() + Duration::minutes(3);
        s.complete(done_at);
        assert!(!s.is_active());
        assert_eq!(s.completed_at(), Some(done_at));
        assert_eq!(s.phase(), SessionPhase::Completed);
    }

    #[test]
    fn complete_is_idempotent_and_refreshes_timestamp() {
        let mut s = session(&["A", "B"]);
        s.complete(fixed_now());
        let later = fixed_now() + Duration::seconds(30);
        s.complete(later);
        assert!(!s.is_active());
        assert_eq!(s.completed_at(), Some(later));
        // Completing early does not move the cursor.
        assert_eq!(s.cursor(), 0);
    }

    #[test]
    fn mismatch_is_rejected_without_mutation() {
        let mut s = session(&["A", "B"]);
        let err = s.record_response(response("B", true)).unwrap_err();
        assert_eq!(
            err,
            SessionStateError::MismatchedResponse {
                expected: FlashcardId::parse("A").unwrap(),
                actual: FlashcardId::parse("B").unwrap(),
            }
        );
        assert_eq!(s.cursor(), 0);
        assert!(s.responses().is_empty());
    }

    #[test]
    fn record_after_exhaustion_fails_even_when_inactive() {
        let mut s = session(&["A"]);
        s.advance();
        assert_eq!(
            s.record_response(response("A", true)).unwrap_err(),
            SessionStateError::SessionComplete
        );

        s.complete(fixed_now());
        assert_eq!(
            s.record_response(response("A", true)).unwrap_err(),
            SessionStateError::SessionComplete
        );
    }

    #[test]
    fn advance_saturates_at_end() {
        let mut s = session(&["A", "B"]);
        for _ in 0..5 {
            s.advance();
        }
        assert_eq!(s.cursor(), 2);
        assert!(s.is_complete());
    }

    #[test]
    fn retreat_from_exhausted_returns_to_last_card() {
        let mut s = session(&["A", "B"]);
        s.advance();
        s.advance();
        assert_eq!(s.phase(), SessionPhase::Exhausted);
        s.retreat().unwrap();
        assert_eq!(s.phase(), SessionPhase::InProgress);
        assert_eq!(s.current_flashcard_id().unwrap().as_str(), "B");
    }

    #[test]
    fn retreat_at_start_fails() {
        let mut s = session(&["A"]);
        assert!(!s.can_retreat());
        assert_eq!(s.retreat().unwrap_err(), SessionStateError::AtStart);
        assert_eq!(s.cursor(), 0);
    }

    #[test]
    fn reviewing_again_keeps_scored_response() {
        let mut s = session(&["A", "B"]);
        s.record_response(response("A", true)).unwrap();
        s.retreat().unwrap();

        assert_eq!(s.responses().len(), 1);
        assert!(s.response_for(&FlashcardId::parse("A").unwrap()).unwrap().is_correct());

        // Answering the same card again appends instead of replacing.
        s.record_response(response("A", false)).unwrap();
        assert_eq!(s.responses().len(), 2);
        assert!(!s.response_for(&FlashcardId::parse("A").unwrap()).unwrap().is_correct());
        assert_eq!(s.cursor(), 1);
    }

    #[test]
    fn mismatch_applies_even_when_id_is_elsewhere_in_sequence() {
        let mut s = session(&["A", "B", "A"]);
        s.record_response(response("A", true)).unwrap();
        let err = s.record_response(response("A", true)).unwrap_err();
        assert!(matches!(err, SessionStateError::MismatchedResponse { .. }));
    }

    //
    // ─── PROPERTIES ────────────────────────────────────────────────────────────
    //

    #[derive(Debug, Clone)]
    enum Step {
        Answer(bool),
        Advance,
        Retreat,
        WrongAnswer,
    }

    fn step() -> impl Strategy<Value = Step> {
        prop_oneof![
            any::<bool>().prop_map(Step::Answer),
            Just(Step::Advance),
            Just(Step::Retreat),
            Just(Step::WrongAnswer),
        ]
    }

    fn sequence() -> impl Strategy<Value = Vec<FlashcardId>> {
        (1_usize..8).prop_map(|n| (0..n).map(|i| FlashcardId::parse(format!("c{i}")).unwrap()).collect())
    }

    proptest! {
        #[test]
        fn fresh_session_is_at_start(cards in sequence()) {
            let s = SessionState::create(cards, fixed_now()).unwrap();
            prop_assert_eq!(s.cursor(), 0);
            prop_assert!(!s.is_complete());
            prop_assert!(s.responses().is_empty());
        }

        #[test]
        fn invariants_hold_under_any_steps(cards in sequence(), steps in prop::collection::vec(step(), 0..40)) {
            let mut s = SessionState::create(cards.clone(), fixed_now()).unwrap();

            for step in steps {
                let before_cursor = s.cursor();
                let before_len = s.responses().len();

                match step {
                    Step::Answer(correct) => {
                        let result = match s.current_flashcard_id().cloned() {
                            Some(id) => s.record_response(
                                StudyResponse::new(id, correct, 1.0, fixed_now()).unwrap(),
                            ),
                            None => s.record_response(
                                StudyResponse::new(cards[0].clone(), correct, 1.0, fixed_now()).unwrap(),
                            ),
                        };
                        if before_cursor < cards.len() {
                            prop_assert!(result.is_ok());
                            prop_assert_eq!(s.cursor(), before_cursor + 1);
                            prop_assert_eq!(s.responses().len(), before_len + 1);
                        } else {
                            prop_assert_eq!(result.unwrap_err(), SessionStateError::SessionComplete);
                            prop_assert_eq!(s.cursor(), before_cursor);
                            prop_assert_eq!(s.responses().len(), before_len);
                        }
                    }
                    Step::Advance => {
                        s.advance();
                        prop_assert_eq!(s.cursor(), (before_cursor + 1).min(cards.len()));
                        prop_assert_eq!(s.responses().len(), before_len);
                    }
                    Step::Retreat => {
                        let result = s.retreat();
                        if before_cursor == 0 {
                            prop_assert_eq!(result.unwrap_err(), SessionStateError::AtStart);
                            prop_assert_eq!(s.cursor(), 0);
                        } else {
                            prop_assert!(result.is_ok());
                            prop_assert_eq!(s.cursor(), before_cursor - 1);
                        }
                        prop_assert_eq!(s.responses().len(), before_len);
                    }
                    Step::WrongAnswer => {
                        let wrong = FlashcardId::parse("not-in-session").unwrap();
                        let result = s.record_response(
                            StudyResponse::new(wrong, true, 1.0, fixed_now()).unwrap(),
                        );
                        prop_assert!(result.is_err());
                        prop_assert_eq!(s.cursor(), before_cursor);
                        prop_assert_eq!(s.responses().len(), before_len);
                    }
                }

                prop_assert!(s.cursor() <= cards.len());
                prop_assert_eq!(s.card_sequence(), cards.as_slice());
            }
        }

        #[test]
        fn accuracy_matches_correct_ratio(outcomes in prop::collection::vec(any::<bool>(), 0..20)) {
            let cards: Vec<FlashcardId> = (0..outcomes.len().max(1))
                .map(|i| FlashcardId::parse(format!("c{i}")).unwrap())
                .collect();
            let mut s = SessionState::create(cards, fixed_now()).unwrap();
            for correct in &outcomes {
                let id = s.current_flashcard_id().cloned().unwrap();
                s.record_response(StudyResponse::new(id, *correct, 1.0, fixed_now()).unwrap()).unwrap();
            }

            let p = s.progress();
            let correct = outcomes.iter().filter(|c| **c).count();
            prop_assert_eq!(p.completed_count, outcomes.len());
            prop_assert_eq!(p.correct_count, correct);
            prop_assert_eq!(p.incorrect_count, outcomes.len() - correct);
            if outcomes.is_empty() {
                prop_assert_eq!(p.accuracy_percent, 0.0);
            } else {
                #[allow(clippy::cast_precision_loss)]
                let expected = 100.0 * correct as f64 / outcomes.len() as f64;
                prop_assert!((p.accuracy_percent - expected).abs() < 1e-9);
            }
        }
    }
}
