mod flashcard;
mod ids;
mod progress;
mod response;
mod session;
pub mod text;

pub use ids::{FlashcardId, ParseIdError, SessionId};
pub use text::{BackText, CardText, FrontText, MAX_CARD_TEXT_CHARS, TextError};

pub use flashcard::{Flashcard, FlashcardDraft, FlashcardError, ValidatedFlashcard};
pub use progress::ProgressSnapshot;
pub use response::{ResponseError, StudyResponse};
pub use session::{SessionPhase, SessionState, SessionStateError};
