#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    FlashcardLookup, FlashcardRepository, InMemoryRepository, InMemorySessionStore, SessionStore,
    Storage, StorageError, StorageStatus,
};
