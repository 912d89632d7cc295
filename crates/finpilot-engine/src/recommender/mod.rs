pub mod collaborative;
pub mod orchestrator;
