pub mod history;
pub mod orchestrator;
pub mod platform;
pub mod snapshot;
pub mod source;
pub mod sources;
