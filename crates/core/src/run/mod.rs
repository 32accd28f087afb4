//! Run orchestrator.
//!
//! Sequences one capture run through its states:
//! `Idle → Discovering → Loading → Budgeting → Capturing → Merging →
//! Persisted | Failed`. Only the orchestrator persists the catalog.

mod runner;
mod settings;
mod types;

pub use runner::RunOrchestrator;
pub use settings::RunSettings;
pub use types::{RunError, RunReport, RunState};
