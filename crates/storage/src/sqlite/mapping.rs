use recall_core::model::{Flashcard, FlashcardId};
use sqlx::Row;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn count_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) const FLASHCARD_COLUMNS: &str =
    "id, front, back, created_at, updated_at, study_count, correct_count";

pub(crate) fn map_flashcard_row(row: &sqlx::sqlite::SqliteRow) -> Result<Flashcard, StorageError> {
    let id = FlashcardId::parse(row.try_get::<String, _>("id").map_err(ser)?).map_err(ser)?;
    let front: String = row.try_get("front").map_err(ser)?;
    let back: String = row.try_get("back").map_err(ser)?;

    Flashcard::from_persisted(
        id,
        &front,
        &back,
        row.try_get("created_at").map_err(ser)?,
        row.try_get("updated_at").map_err(ser)?,
        count_from_i64("study_count", row.try_get("study_count").map_err(ser)?)?,
        count_from_i64("correct_count", row.try_get("correct_count").map_err(ser)?)?,
    )
    .map_err(ser)
}
