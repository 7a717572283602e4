mod orchestrator;
mod registry;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use orchestrator::SessionOrchestrator;
pub use registry::SessionRegistry;
