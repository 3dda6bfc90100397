/// Application Layer - Services
///
/// Orchestrates the domain for the two roles every peer plays: submitting
/// its own orders and answering requests from other peers. Depends on the
/// domain layer and on the infrastructure traits, never on a concrete
/// transport.
///
/// ## Modules
/// - `services`: MatchingService / EngineHandle, RequestDispatcher,
///   SubmissionOrchestrator

pub mod services;

// Re-export key services
pub use services::{EngineHandle, MatchingService, RequestDispatcher, SubmissionOrchestrator};
