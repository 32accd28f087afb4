//! Capture stage: decide which discovered items to capture this run, then
//! screenshot and upload them one at a time.
//!
//! - **Budget**: skips cataloged identities and enforces the per-run hard cap.
//! - **Driver**: sequential screenshot + upload with inter-capture pacing.
//!   Per-item failures are recorded and skipped; only a lost browser aborts.

mod budget;
mod driver;

pub use budget::{BudgetDecision, CaptureBudget};
pub use driver::{
    CaptureDriver, CaptureError, CaptureFailure, CaptureReport, CaptureSettings, CaptureStage,
};
