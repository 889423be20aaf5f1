//! The harvest loop: scroll, settle, extract, dedup, checkpoint.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::ProgressBar;
use tracing::{debug, info, warn};

use crate::checkpoint;
use crate::config::Settings;
use crate::driver::RenderDriver;
use crate::harvest::extract::RecordExtractor;
use crate::harvest::ledger::DedupLedger;
use crate::harvest::progress::ProgressDetector;

const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.body.scrollHeight)";
const PAGE_EXTENT: &str = "document.body.scrollHeight";
const DISPATCH_ESCAPE: &str =
    "document.dispatchEvent(new KeyboardEvent('keydown', { key: 'Escape', bubbles: true }))";

/// Outcome of a single harvest run.
#[derive(Debug)]
pub struct HarvestReport {
    /// Records in the ledger at exit, including any resumed from checkpoint.
    pub total: usize,
    /// Records first seen during this run.
    pub new_this_run: usize,
    /// False when the driver failed mid-run or the run was cancelled; the
    /// checkpoint is left in place for resume.
    pub completed: bool,
}

/// Orchestrates one harvest run over a render driver.
///
/// Strictly sequential: no step overlaps another, and the driver has exactly
/// one caller. The ledger's `accept` is the only path by which a record gets
/// in.
pub struct Harvester {
    settings: Settings,
    extractor: RecordExtractor,
    ledger: DedupLedger,
    detector: ProgressDetector,
    cancel: Arc<AtomicBool>,
    progress: Option<ProgressBar>,
    checkpoint_path: PathBuf,
    output_path: PathBuf,
}

impl Harvester {
    pub fn new(settings: Settings, cancel: Arc<AtomicBool>) -> Self {
        let extractor = RecordExtractor::new(settings.source.clone());
        let detector = ProgressDetector::new(settings.scroll.max_stall_scrolls);
        let checkpoint_path = PathBuf::from(&settings.checkpoint.path);
        let output_path = PathBuf::from(&settings.checkpoint.output);
        Self {
            settings,
            extractor,
            ledger: DedupLedger::new(),
            detector,
            cancel,
            progress: None,
            checkpoint_path,
            output_path,
        }
    }

    /// Attach a spinner that is updated once per scroll tick.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Run the harvest end to end against `driver`.
    ///
    /// Driver failures inside the loop are unrecoverable for this run but
    /// never lose work: everything accepted so far is flushed to the
    /// checkpoint before returning. Promotion to the final artifact happens
    /// only on a clean, complete pass.
    pub async fn run(&mut self, driver: &mut dyn RenderDriver) -> Result<HarvestReport> {
        for record in checkpoint::load(&self.checkpoint_path) {
            self.ledger.absorb(record);
        }
        let resumed = self.ledger.len();
        if resumed > 0 {
            info!("Resuming with {} previously harvested records", resumed);
        }

        let completed = match self.drive(driver).await {
            Ok(()) => true,
            Err(err) => {
                warn!("Driver failed mid-harvest, keeping partial results: {:#}", err);
                false
            }
        };
        let cancelled = self.cancel.load(Ordering::Relaxed);

        // Unflushed records always reach disk, even on a failed or cancelled
        // run. The first-run case (nothing checkpointed yet) saves too.
        if self.ledger.unflushed() > 0
            || (!self.checkpoint_path.exists() && !self.ledger.is_empty())
        {
            match checkpoint::save(&self.checkpoint_path, self.ledger.records()) {
                Ok(()) => self.ledger.mark_checkpointed(),
                Err(err) => warn!("Final checkpoint save failed: {:#}", err),
            }
        }

        let clean = completed && !cancelled;
        if clean && !self.ledger.is_empty() {
            checkpoint::promote(&self.checkpoint_path, &self.output_path, self.ledger.records())
                .context("promoting final artifact")?;
            info!(
                "Promoted {} records to {}",
                self.ledger.len(),
                self.output_path.display()
            );
        }

        Ok(HarvestReport {
            total: self.ledger.len(),
            new_this_run: self.ledger.len() - resumed,
            completed: clean,
        })
    }

    /// Navigate, prepare the page, and scroll until the detector terminates.
    ///
    /// Any error bubbling out of here is a driver-level failure; the loop
    /// does not retry individual driver calls.
    async fn drive(&mut self, driver: &mut dyn RenderDriver) -> Result<()> {
        driver
            .navigate(
                &self.settings.source.url,
                Duration::from_millis(self.settings.scroll.navigation_timeout_ms),
            )
            .await
            .context("navigating to collection page")?;

        self.prepare_environment(driver).await;

        let settle_timeout = Duration::from_millis(self.settings.scroll.settle_timeout_ms);
        let pause = Duration::from_millis(self.settings.scroll.pause_ms);
        let item_selector = self.settings.source.item_selector.clone();

        while !self.detector.is_terminated() {
            if self.cancel.load(Ordering::Relaxed) {
                info!("Cancellation requested, stopping scroll loop");
                return Ok(());
            }

            driver.run_script(SCROLL_TO_BOTTOM).await.context("scrolling")?;
            driver.wait_for_settled(settle_timeout).await;
            tokio::time::sleep(pause).await;

            let extent_value = driver
                .run_script(PAGE_EXTENT)
                .await
                .context("reading page extent")?;
            let extent = match extent_value.as_i64() {
                Some(extent) => extent,
                None => {
                    debug!(value = %extent_value, "Non-numeric page extent, treating as 0");
                    0
                }
            };
            let items = driver
                .query_all(&item_selector)
                .await
                .context("listing visible items")?;
            let state = self.detector.observe(extent, items.len());
            debug!(extent, visible = items.len(), ?state, "Scroll tick");

            for item in &items {
                // Skip known identities before paying for a full extraction
                let Some(name) = self.extractor.identity(item.as_ref()).await else {
                    continue;
                };
                if self.ledger.contains(&name) {
                    continue;
                }
                if let Some(record) = self.extractor.extract(item.as_ref()).await {
                    self.ledger.accept(record);
                }
            }

            if let Some(pb) = &self.progress {
                pb.set_message(format!(
                    "{} products collected ({} visible)",
                    self.ledger.len(),
                    items.len()
                ));
                pb.tick();
            }

            if self
                .ledger
                .should_checkpoint(self.settings.checkpoint.save_interval)
            {
                match checkpoint::save(&self.checkpoint_path, self.ledger.records()) {
                    Ok(()) => self.ledger.mark_checkpointed(),
                    // Counter stays up so the next trigger retries the save
                    Err(err) => warn!("Checkpoint save failed, will retry: {:#}", err),
                }
            }
        }

        info!(
            "Page stopped growing; {} unique products collected",
            self.ledger.len()
        );
        Ok(())
    }

    /// Best-effort interstitial dismissal before scrolling begins.
    ///
    /// Failures here are logged and ignored; this step must never abort the
    /// harvest.
    async fn prepare_environment(&self, driver: &mut dyn RenderDriver) {
        let deadline = tokio::time::Instant::now()
            + Duration::from_millis(self.settings.scroll.popup_wait_ms);
        loop {
            match driver.query_all(&self.settings.source.popup_selector).await {
                Ok(popups) if !popups.is_empty() => {
                    debug!("Interstitial overlay detected, dismissing");
                    let clicked = match popups[0]
                        .query(&self.settings.source.popup_close_selector)
                        .await
                    {
                        Some(button) => button.click().await.is_ok(),
                        None => false,
                    };
                    if !clicked {
                        // Most overlay widgets also close on Escape
                        if let Err(err) = driver.run_script(DISPATCH_ESCAPE).await {
                            debug!("Escape fallback failed: {}", err);
                        }
                    }
                    // Let the close animation finish before sampling content
                    tokio::time::sleep(Duration::from_millis(500)).await;
                    return;
                }
                Ok(_) => {}
                Err(err) => {
                    debug!("Overlay check failed: {}", err);
                    return;
                }
            }
            if tokio::time::Instant::now() >= deadline {
                debug!("No interstitial overlay appeared");
                return;
            }
            tokio::time::sleep(Duration::from_millis(250)).await;
        }
    }
}
