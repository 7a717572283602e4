use std::marker::PhantomData;
use thiserror::Error;

/// Upper bound on either side of a flashcard, in characters.
pub const MAX_CARD_TEXT_CHARS: usize = 500;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TextError {
    #[error("text must not be empty")]
    Empty,
    #[error("text too long ({len} characters, max {max})")]
    TooLong { len: usize, max: usize },
}

/// Trimmed, non-empty card text. The marker keeps front and back from being swapped.
#[derive(Debug)]
pub struct CardText<T>(String, PhantomData<T>);

#[derive(Debug)]
pub struct Front;
#[derive(Debug)]
pub struct Back;

pub type FrontText = CardText<Front>;
pub type BackText = CardText<Back>;

impl<T> CardText<T> {
    /// # Errors
    ///
    /// Returns `TextError::Empty` for blank input and `TextError::TooLong`
    /// when the trimmed text exceeds [`MAX_CARD_TEXT_CHARS`].
    pub fn parse(s: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = s.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        let len = trimmed.chars().count();
        if len > MAX_CARD_TEXT_CHARS {
            return Err(TextError::TooLong {
                len,
                max: MAX_CARD_TEXT_CHARS,
            });
        }
        Ok(Self(trimmed.to_owned(), PhantomData))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Manual impls: derives would require the marker types to implement them too.
impl<T> Clone for CardText<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone(), PhantomData)
    }
}

impl<T> PartialEq for CardText<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<T> Eq for CardText<T> {}
