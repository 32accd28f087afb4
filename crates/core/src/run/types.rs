//! Types for the run orchestrator.

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::capture::CaptureFailure;
use crate::catalog::CatalogError;
use crate::discovery::{DiscoveryError, SkippedElement};
use crate::identity::ItemIdentity;
use crate::renderer::RenderError;

/// Lifecycle of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Discovering,
    Loading,
    Budgeting,
    Capturing,
    Merging,
    Persisted,
    Failed,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Discovering => "discovering",
            RunState::Loading => "loading",
            RunState::Budgeting => "budgeting",
            RunState::Capturing => "capturing",
            RunState::Merging => "merging",
            RunState::Persisted => "persisted",
            RunState::Failed => "failed",
        }
    }

    /// Whether this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Persisted | RunState::Failed)
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of a successful run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    /// Every state the run passed through, starting at `Idle`.
    pub states: Vec<RunState>,
    /// Elements that yielded an identity.
    pub discovered: usize,
    pub skipped: Vec<SkippedElement>,
    pub already_cataloged: usize,
    pub duplicates_in_page: usize,
    /// Left for a later run by the per-run cap.
    pub deferred: usize,
    pub eligible: usize,
    /// Identities appended to the catalog, in capture order.
    pub captured: Vec<ItemIdentity>,
    pub failures: Vec<CaptureFailure>,
    pub total_records: usize,
    pub pages: usize,
}

impl RunReport {
    pub fn final_state(&self) -> RunState {
        self.states.last().copied().unwrap_or(RunState::Idle)
    }
}

/// Run-fatal errors. Nothing is persisted when one of these is returned.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("catalog could not be loaded: {0}")]
    Catalog(#[source] CatalogError),

    /// Assets in `uploaded` reached the store but were not recorded.
    #[error("capture aborted after {} upload(s): {source}", .uploaded.len())]
    Capture {
        #[source]
        source: RenderError,
        uploaded: Vec<ItemIdentity>,
    },

    #[error("catalog invariant violated: identity {0} would be recorded twice")]
    Invariant(ItemIdentity),

    /// Assets in `uploaded` reached the store but were not recorded.
    #[error("failed to persist catalog, {} upload(s) unrecorded: {source}", .uploaded.len())]
    Persist {
        #[source]
        source: CatalogError,
        uploaded: Vec<ItemIdentity>,
    },
}

impl RunError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::Discovery(_) => 2,
            RunError::Catalog(_) => 3,
            RunError::Capture { .. } => 4,
            RunError::Persist { .. } => 5,
            RunError::Invariant(_) => 6,
        }
    }

    /// Label used for the runs metric.
    pub fn kind(&self) -> &'static str {
        match self {
            RunError::Discovery(_) => "discovery_failed",
            RunError::Catalog(_) => "catalog_failed",
            RunError::Capture { .. } => "capture_failed",
            RunError::Persist { .. } => "persist_failed",
            RunError::Invariant(_) => "invariant_violated",
        }
    }

    /// Identities uploaded to the asset store but absent from the catalog.
    pub fn unrecorded_uploads(&self) -> &[ItemIdentity] {
        match self {
            RunError::Capture { uploaded, .. } | RunError::Persist { uploaded, .. } => uploaded,
            _ => &[],
        }
    }
}
