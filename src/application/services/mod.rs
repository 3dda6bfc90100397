/// Application Services
///
/// - `matching_service`: the actor that owns the node's order book
/// - `dispatcher`: answers requests arriving from peers
/// - `submission`: builds local orders and fans them out to peers

pub mod dispatcher;
pub mod matching_service;
pub mod submission;

pub use dispatcher::RequestDispatcher;
pub use matching_service::{EngineCommand, EngineError, EngineHandle, MatchingService};
pub use submission::{SubmissionOrchestrator, SubmitError, Submission};
