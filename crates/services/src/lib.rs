#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod flashcard_service;
pub mod sessions;

pub use recall_core::Clock;

pub use app_services::AppServices;
pub use error::{AppServicesError, FlashcardServiceError, SessionError};
pub use flashcard_service::FlashcardService;
pub use sessions::{SessionOrchestrator, SessionRegistry};
