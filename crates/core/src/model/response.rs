use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::FlashcardId;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ResponseError {
    #[error("response time must be a positive number of seconds, got {0}")]
    InvalidResponseTime(f64),
}

/// One learner answer to one flashcard.
///
/// The response time is kept for statistics only and is never compared
/// against wall-clock bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StudyResponseRecord")]
pub struct StudyResponse {
    flashcard_id: FlashcardId,
    is_correct: bool,
    response_time_seconds: f64,
    timestamp: DateTime<Utc>,
}

/// Wire shape of `StudyResponse`; deserialized values pass through `StudyResponse::new`.
#[derive(Deserialize)]
struct StudyResponseRecord {
    flashcard_id: FlashcardId,
    is_correct: bool,
    response_time_seconds: f64,
    timestamp: DateTime<Utc>,
}

impl TryFrom<StudyResponseRecord> for StudyResponse {
    type Error = ResponseError;

    fn try_from(record: StudyResponseRecord) -> Result<Self, Self::Error> {
        Self::new(
            record.flashcard_id,
            record.is_correct,
            record.response_time_seconds,
            record.timestamp,
        )
    }
}

impl StudyResponse {
    /// # Errors
    ///
    /// Returns `ResponseError::InvalidResponseTime` unless `response_time_seconds`
    /// is finite and strictly positive.
    pub fn new(
        flashcard_id: FlashcardId,
        is_correct: bool,
        response_time_seconds: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, ResponseError> {
        if !response_time_seconds.is_finite() || response_time_seconds <= 0.0 {
            return Err(ResponseError::InvalidResponseTime(response_time_seconds));
        }
        Ok(Self {
            flashcard_id,
            is_correct,
            response_time_seconds,
            timestamp,
        })
    }

    #[must_use]
    pub fn flashcard_id(&self) -> &FlashcardId {
        &self.flashcard_id
    }

    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.is_correct
    }

    #[must_use]
    pub fn response_time_seconds(&self) -> f64 {
        self.response_time_seconds
    }

    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}
