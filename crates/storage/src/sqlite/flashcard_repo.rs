use recall_core::model::{Flashcard, FlashcardId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{FLASHCARD_COLUMNS, map_flashcard_row, ser};
use crate::repository::{FlashcardLookup, FlashcardRepository, StorageError};

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

#[async_trait::async_trait]
impl FlashcardRepository for SqliteRepository {
    async fn insert_flashcard(&self, card: &Flashcard) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO flashcards (id, front, back, created_at, updated_at, study_count, correct_count)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(card.id().as_str())
        .bind(card.front().as_str())
        .bind(card.back().as_str())
        .bind(card.created_at())
        .bind(card.updated_at())
        .bind(i64::from(card.study_count()))
        .bind(i64::from(card.correct_count()))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StorageError::Conflict
            } else {
                conn(e)
            }
        })?;

        Ok(())
    }

    async fn update_flashcard(&self, card: &Flashcard) -> Result<(), StorageError> {
        // created_at is immutable after insert.
        let res = sqlx::query(
            r"
            UPDATE flashcards SET
                front = ?2,
                back = ?3,
                updated_at = ?4,
                study_count = ?5,
                correct_count = ?6
            WHERE id = ?1
            ",
        )
        .bind(card.id().as_str())
        .bind(card.front().as_str())
        .bind(card.back().as_str())
        .bind(card.updated_at())
        .bind(i64::from(card.study_count()))
        .bind(i64::from(card.correct_count()))
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn delete_flashcard(&self, id: &FlashcardId) -> Result<bool, StorageError> {
        let res = sqlx::query("DELETE FROM flashcards WHERE id = ?1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(res.rows_affected() > 0)
    }

    async fn get_flashcard(&self, id: &FlashcardId) -> Result<Option<Flashcard>, StorageError> {
        let sql = format!("SELECT {FLASHCARD_COLUMNS} FROM flashcards WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(map_flashcard_row).transpose()
    }

    async fn list_flashcards(&self) -> Result<Vec<Flashcard>, StorageError> {
        let sql = format!(
            "SELECT {FLASHCARD_COLUMNS} FROM flashcards ORDER BY created_at ASC, rowid ASC"
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        let mut cards = Vec::with_capacity(rows.len());
        for row in rows {
            cards.push(map_flashcard_row(&row)?);
        }
        Ok(cards)
    }

    async fn count_flashcards(&self) -> Result<u64, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM flashcards")
            .fetch_one(&self.pool)
            .await
            .map_err(conn)?;
        let total: i64 = row.try_get("total").map_err(ser)?;
        u64::try_from(total).map_err(ser)
    }
}

#[async_trait::async_trait]
impl FlashcardLookup for SqliteRepository {
    async fn list_all(&self) -> Result<Vec<Flashcard>, StorageError> {
        self.list_flashcards().await
    }

    async fn get_by_id(&self, id: &FlashcardId) -> Result<Option<Flashcard>, StorageError> {
        self.get_flashcard(id).await
    }
}
