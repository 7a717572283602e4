use thiserror::Error;

use crate::model::{FlashcardError, ParseIdError, ResponseError, SessionStateError, TextError};

/// Umbrella error for callers that do not care which domain rule was violated.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Id(#[from] ParseIdError),
    #[error(transparent)]
    Text(#[from] TextError),
    #[error(transparent)]
    Flashcard(#[from] FlashcardError),
    #[error(transparent)]
    Response(#[from] ResponseError),
    #[error(transparent)]
    Session(#[from] SessionStateError),
}
