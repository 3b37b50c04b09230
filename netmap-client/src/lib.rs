pub mod api;
pub mod error;
pub mod orchestrator;

pub use api::{ApiClient, SubmitOutcome};
pub use error::ScanError;
pub use orchestrator::{ScanOrchestrator, ScanPhase, ScanState, StateCallback};
