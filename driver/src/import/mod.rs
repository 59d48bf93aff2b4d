//! Table import orchestration and its entry point.

mod handler;
mod orchestrator;

pub use handler::TableImportHandler;
pub use orchestrator::ImportOrchestrator;
