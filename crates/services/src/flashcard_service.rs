use std::sync::Arc;

use recall_core::model::{
    BackText, Flashcard, FlashcardDraft, FlashcardError, FlashcardId, FrontText,
};
use storage::repository::{FlashcardRepository, StorageError};

use crate::error::FlashcardServiceError;
use crate::Clock;

/// Orchestrates flashcard creation, editing and lookup.
#[derive(Clone)]
pub struct FlashcardService {
    clock: Clock,
    cards: Arc<dyn FlashcardRepository>,
}

impl FlashcardService {
    #[must_use]
    pub fn new(clock: Clock, cards: Arc<dyn FlashcardRepository>) -> Self {
        Self { clock, cards }
    }

    /// Validate and persist a new flashcard.
    ///
    /// # Errors
    ///
    /// Returns `FlashcardServiceError::Flashcard` for validation failures.
    /// Returns `FlashcardServiceError::Storage` if persistence fails.
    pub async fn create_flashcard(
        &self,
        front: impl Into<String>,
        back: impl Into<String>,
    ) -> Result<Flashcard, FlashcardServiceError> {
        let card = FlashcardDraft::new(front, back)
            .validate(self.clock.now())?
            .assign_id(FlashcardId::generate());
        self.cards.insert_flashcard(&card).await?;
        tracing::info!(flashcard_id = %card.id(), "created flashcard");
        Ok(card)
    }

    /// # Errors
    ///
    /// Returns `FlashcardServiceError::Storage` if repository access fails.
    pub async fn get_flashcard(
        &self,
        id: &FlashcardId,
    ) -> Result<Option<Flashcard>, FlashcardServiceError> {
        Ok(self.cards.get_flashcard(id).await?)
    }

    /// All flashcards, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `FlashcardServiceError::Storage` if repository access fails.
    pub async fn list_flashcards(&self) -> Result<Vec<Flashcard>, FlashcardServiceError> {
        Ok(self.cards.list_flashcards().await?)
    }

    /// Replace the front and/or back of an existing card.
    ///
    /// # Errors
    ///
    /// Returns `FlashcardServiceError::NotFound` if the card does not exist.
    /// Returns `FlashcardServiceError::Flashcard` if new text fails validation.
    /// Returns `FlashcardServiceError::Storage` if persistence fails.
    pub async fn update_flashcard(
        &self,
        id: &FlashcardId,
        front: Option<&str>,
        back: Option<&str>,
    ) -> Result<Flashcard, FlashcardServiceError> {
        let front = front
            .map(FrontText::parse)
            .transpose()
            .map_err(FlashcardError::InvalidFront)?;
        let back = back
            .map(BackText::parse)
            .transpose()
            .map_err(FlashcardError::InvalidBack)?;

        let mut card = self
            .cards
            .get_flashcard(id)
            .await?
            .ok_or_else(|| FlashcardServiceError::NotFound(id.clone()))?;
        card.update_content(front, back, self.clock.now());

        self.cards.update_flashcard(&card).await.map_err(|err| match err {
            StorageError::NotFound => FlashcardServiceError::NotFound(id.clone()),
            other => other.into(),
        })?;
        tracing::info!(flashcard_id = %id, "updated flashcard");
        Ok(card)
    }

    /// Delete a flashcard. Returns `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns `FlashcardServiceError::Storage` if repository access fails.
    pub async fn delete_flashcard(&self, id: &FlashcardId) -> Result<bool, FlashcardServiceError> {
        let deleted = self.cards.delete_flashcard(id).await?;
        if deleted {
            tracing::info!(flashcard_id = %id, "deleted flashcard");
        }
        Ok(deleted)
    }

    /// # Errors
    ///
    /// Returns `FlashcardServiceError::Storage` if repository access fails.
    pub async fn count(&self) -> Result<u64, FlashcardServiceError> {
        Ok(self.cards.count_flashcards().await?)
    }

    /// Case-insensitive substring match over both sides of every card.
    ///
    /// A blank query matches nothing.
    ///
    /// # Errors
    ///
    /// Returns `FlashcardServiceError::Storage` if repository access fails.
    pub async fn search(&self, query: &str) -> Result<Vec<Flashcard>, FlashcardServiceError> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let mut cards = self.cards.list_flashcards().await?;
        cards.retain(|card| {
            card.front().as_str().to_lowercase().contains(&needle)
                || card.back().as_str().to_lowercase().contains(&needle)
        });
        Ok(cards)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recall_core::model::TextError;
    use recall_core::time::fixed_clock;
    use storage::repository::InMemoryRepository;

    fn service() -> FlashcardService {
        FlashcardService::new(fixed_clock(), Arc::new(InMemoryRepository::new()))
    }

    #[tokio::test]
    async fn create_trims_and_persists() {
        let svc = service();
        let card = svc.create_flashcard("  Hola ", " Hello  ").await.unwrap();
        assert_eq!(card.front().as_str(), "Hola");
        assert_eq!(card.back().as_str(), "Hello");

        let fetched = svc.get_flashcard(card.id()).await.unwrap().unwrap();
        assert_eq!(fetched, card);
        assert_eq!(svc.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn create_rejects_blank_sides() {
        let err = service().create_flashcard("   ", "back").await.unwrap_err();
        assert!(matches!(
            err,
            FlashcardServiceError::Flashcard(FlashcardError::InvalidFront(TextError::Empty))
        ));
    }

    #[tokio::test]
    async fn update_keeps_unspecified_side() {
        let svc = service();
        let card = svc.create_flashcard("Q", "A").await.unwrap();

        let updated = svc
            .update_flashcard(card.id(), None, Some("Answer"))
            .await
            .unwrap();
        assert_eq!(updated.front().as_str(), "Q");
        assert_eq!(updated.back().as_str(), "Answer");
    }

    #[tokio::test]
    async fn update_missing_card_is_not_found() {
        let id = FlashcardId::parse("ghost").unwrap();
        let err = service()
            .update_flashcard(&id, Some("Q"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, FlashcardServiceError::NotFound(missing) if missing == id));
    }

    #[tokio::test]
    async fn search_is_case_insensitive_over_both_sides() {
        let svc = service();
        svc.create_flashcard("Perro", "Dog").await.unwrap();
        svc.create_flashcard("Gato", "Cat").await.unwrap();
        svc.create_flashcard("Caterpillar", "Oruga").await.unwrap();

        let fronts: Vec<String> = svc
            .search("CAT")
            .await
            .unwrap()
            .iter()
            .map(|c| c.front().as_str().to_owned())
            .collect();
        assert_eq!(fronts, ["Gato", "Caterpillar"]);
        assert!(svc.search("  ").await.unwrap().is_empty());
    }
}
