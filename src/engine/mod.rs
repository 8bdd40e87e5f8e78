pub mod ingest;
pub mod runtime;

pub use ingest::{DropReason, IngestSummary, IngestionLoop, PollOutcome};
pub use runtime::{IngestRuntime, RuntimeStatus};
