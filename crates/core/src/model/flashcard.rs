use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::FlashcardId;
use crate::model::text::{BackText, FrontText, TextError};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FlashcardError {
    #[error("invalid front text: {0}")]
    InvalidFront(#[source] TextError),

    #[error("invalid back text: {0}")]
    InvalidBack(#[source] TextError),

    #[error("invalid persisted flashcard state: {0}")]
    InvalidPersistedState(String),
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Unvalidated user input for a new flashcard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashcardDraft {
    pub front: String,
    pub back: String,
}

impl FlashcardDraft {
    #[must_use]
    pub fn new(front: impl Into<String>, back: impl Into<String>) -> Self {
        Self {
            front: front.into(),
            back: back.into(),
        }
    }

    /// # Errors
    ///
    /// Returns `FlashcardError::InvalidFront` / `InvalidBack` when either side is
    /// blank or too long.
    pub fn validate(self, now: DateTime<Utc>) -> Result<ValidatedFlashcard, FlashcardError> {
        let front = FrontText::parse(&self.front).map_err(FlashcardError::InvalidFront)?;
        let back = BackText::parse(&self.back).map_err(FlashcardError::InvalidBack)?;
        Ok(ValidatedFlashcard {
            front,
            back,
            created_at: now,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedFlashcard {
    pub front: FrontText,
    pub back: BackText,
    pub created_at: DateTime<Utc>,
}

impl ValidatedFlashcard {
    #[must_use]
    pub fn assign_id(self, id: FlashcardId) -> Flashcard {
        Flashcard {
            id,
            front: self.front,
            back: self.back,
            created_at: self.created_at,
            updated_at: self.created_at,
            study_count: 0,
            correct_count: 0,
        }
    }
}

//
// ─── FLASHCARD ─────────────────────────────────────────────────────────────────
//

/// A front/back pair with lifetime study statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flashcard {
    id: FlashcardId,
    front: FrontText,
    back: BackText,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    study_count: u32,
    correct_count: u32,
}

impl Flashcard {
    /// Rehydrate a flashcard from storage.
    ///
    /// # Errors
    ///
    /// Returns `FlashcardError` if either text fails validation or the counters
    /// are inconsistent.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: FlashcardId,
        front: &str,
        back: &str,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        study_count: u32,
        correct_count: u32,
    ) -> Result<Self, FlashcardError> {
        if correct_count > study_count {
            return Err(FlashcardError::InvalidPersistedState(format!(
                "correct_count ({correct_count}) exceeds study_count ({study_count})"
            )));
        }
        if updated_at < created_at {
            return Err(FlashcardError::InvalidPersistedState(
                "updated_at is before created_at".into(),
            ));
        }

        Ok(Self {
            id,
            front: FrontText::parse(front).map_err(FlashcardError::InvalidFront)?,
            back: BackText::parse(back).map_err(FlashcardError::InvalidBack)?,
            created_at,
            updated_at,
            study_count,
            correct_count,
        })
    }

    #[must_use]
    pub fn id(&self) -> &FlashcardId {
        &self.id
    }

    #[must_use]
    pub fn front(&self) -> &FrontText {
        &self.front
    }

    #[must_use]
    pub fn back(&self) -> &BackText {
        &self.back
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    #[must_use]
    pub fn study_count(&self) -> u32 {
        self.study_count
    }

    #[must_use]
    pub fn correct_count(&self) -> u32 {
        self.correct_count
    }

    /// Replace either side of the card. Passing `None` keeps the current text.
    pub fn update_content(
        &mut self,
        front: Option<FrontText>,
        back: Option<BackText>,
        now: DateTime<Utc>,
    ) {
        if let Some(front) = front {
            self.front = front;
        }
        if let Some(back) = back {
            self.back = back;
        }
        self.updated_at = now.max(self.created_at);
    }

    /// Fold one scored answer into the lifetime counters.
    pub fn record_study_result(&mut self, correct: bool) {
        self.study_count = self.study_count.saturating_add(1);
        if correct {
            self.correct_count = self.correct_count.saturating_add(1);
        }
    }

    /// Fraction of correct answers in `[0, 1]`; `0.0` for a card never studied.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        if self.study_count == 0 {
            return 0.0;
        }
        f64::from(self.correct_count) / f64::from(self.study_count)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
