//! Run orchestrator implementation.
//!
//! One invocation is one run: discover, load, budget, capture, merge,
//! persist. The catalog is saved exactly once, at the end.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::capture::{CaptureBudget, CaptureDriver, CaptureError, CaptureReport};
use crate::catalog::{CatalogRecord, CatalogStore};
use crate::discovery::discover;
use crate::identity::ItemIdentity;
use crate::merge::{merge_and_persist, MergeError};
use crate::metrics;
use crate::renderer::PageRenderer;
use crate::uploader::AssetUploader;

use super::settings::RunSettings;
use super::types::{RunError, RunReport, RunState};

/// Tracks state transitions for one run.
struct StateTrail {
    states: Vec<RunState>,
}

impl StateTrail {
    fn new() -> Self {
        Self {
            states: vec![RunState::Idle],
        }
    }

    fn current(&self) -> RunState {
        self.states.last().copied().unwrap_or(RunState::Idle)
    }

    fn enter(&mut self, next: RunState) {
        info!(from = %self.current(), to = %next, "Run state changed");
        self.states.push(next);
    }
}

/// Drives a single capture run against its collaborators.
pub struct RunOrchestrator {
    settings: RunSettings,
    renderer: Arc<dyn PageRenderer>,
    uploader: Arc<dyn AssetUploader>,
    store: Arc<dyn CatalogStore>,
}

impl RunOrchestrator {
    pub fn new(
        settings: RunSettings,
        renderer: Arc<dyn PageRenderer>,
        uploader: Arc<dyn AssetUploader>,
        store: Arc<dyn CatalogStore>,
    ) -> Self {
        Self {
            settings,
            renderer,
            uploader,
            store,
        }
    }

    /// Execute one run to a terminal state.
    ///
    /// The renderer is closed before returning, whatever the outcome.
    pub async fn run_once(&self) -> Result<RunReport, RunError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", run_id = %run_id);

        async {
            let started = Instant::now();
            let mut trail = StateTrail::new();

            info!(
                page_url = %self.settings.page_url,
                catalog = %self.store.location(),
                max_items_per_run = self.settings.max_items_per_run,
                "Run starting"
            );

            let result = self.execute(run_id, &mut trail).await;

            if let Err(e) = self.renderer.close().await {
                warn!(error = %e, "Failed to close renderer");
            }

            match &result {
                Ok(report) => {
                    metrics::RUNS_TOTAL.with_label_values(&["persisted"]).inc();
                    metrics::LAST_SUCCESS_TIMESTAMP.set(Utc::now().timestamp() as f64);
                    info!(
                        captured = report.captured.len(),
                        failed = report.failures.len(),
                        deferred = report.deferred,
                        total_records = report.total_records,
                        pages = report.pages,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Run persisted"
                    );
                }
                Err(e) => {
                    trail.enter(RunState::Failed);
                    metrics::RUNS_TOTAL.with_label_values(&[e.kind()]).inc();
                    let unrecorded: Vec<&str> =
                        e.unrecorded_uploads().iter().map(ItemIdentity::as_str).collect();
                    error!(
                        error = %e,
                        exit_code = e.exit_code(),
                        unrecorded = ?unrecorded,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Run failed"
                    );
                }
            }

            result
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, run_id: Uuid, trail: &mut StateTrail) -> Result<RunReport, RunError> {
        trail.enter(RunState::Discovering);
        let discovery = discover(
            self.renderer.as_ref(),
            &self.settings.page_url,
            &self.settings.item_selector,
            &self.settings.extractor,
        )
        .await?;
        metrics::ITEMS_DISCOVERED.inc_by(discovery.items.len() as u64);
        metrics::ITEMS_SKIPPED.inc_by(discovery.skipped.len() as u64);
        let discovered = discovery.items.len();

        trail.enter(RunState::Loading);
        let existing = self.store.load().await.map_err(RunError::Catalog)?;
        info!(
            records = existing.record_count(),
            pages = existing.page_count(),
            "Catalog loaded"
        );

        trail.enter(RunState::Budgeting);
        let budget = CaptureBudget::new(self.settings.max_items_per_run);
        let decision = budget.select(&existing.identities(), discovery.items);
        let eligible = decision.eligible.len();

        trail.enter(RunState::Capturing);
        let capture = if decision.eligible.is_empty() {
            info!("No new items to capture");
            CaptureReport::default()
        } else {
            let driver = CaptureDriver::new(
                self.renderer.clone(),
                self.uploader.clone(),
                self.settings.capture.clone(),
            );
            driver
                .capture_all(decision.eligible)
                .await
                .map_err(|e| match e {
                    CaptureError::RendererLost { captured, source } => RunError::Capture {
                        source,
                        uploaded: identities_of(&captured),
                    },
                })?
        };

        trail.enter(RunState::Merging);
        let captured = identities_of(&capture.captured);
        let catalog = merge_and_persist(
            self.store.as_ref(),
            &existing,
            capture.captured,
            self.settings.page_size,
        )
        .await
        .map_err(|e| match e {
            MergeError::DuplicateIdentity(identity) => RunError::Invariant(identity),
            MergeError::Persist(source) => RunError::Persist {
                source,
                uploaded: captured.clone(),
            },
        })?;
        metrics::CATALOG_RECORDS.set(catalog.record_count() as i64);
        metrics::CATALOG_PAGES.set(catalog.page_count() as i64);

        trail.enter(RunState::Persisted);

        Ok(RunReport {
            run_id,
            states: trail.states.clone(),
            discovered,
            skipped: discovery.skipped,
            already_cataloged: decision.already_cataloged,
            duplicates_in_page: decision.duplicates_in_page,
            deferred: decision.deferred,
            eligible,
            captured,
            failures: capture.failures,
            total_records: catalog.record_count(),
            pages: catalog.page_count(),
        })
    }
}

fn identities_of(records: &[CatalogRecord]) -> Vec<ItemIdentity> {
    records.iter().map(|r| r.identity.clone()).collect()
}
