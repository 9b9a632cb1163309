use tokio::time::{Duration, Instant};

use crate::contacts::ContactStore;
use crate::device::DeviceController;
use crate::vision::VisionExtractor;

use super::phash::ScreenChangeDetector;
use super::state::{CycleOutcome, HarvestLimits, LoopAction, LoopState};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

#[derive(Debug, Clone)]
pub struct HarvestConfig {
    pub limits: HarvestLimits,
    pub scroll_delay: Duration,
    /// `Some(distance)` skips the model for screens whose hash is within
    /// `distance` of the previous screen. Off by default.
    pub unchanged_screen_distance: Option<u32>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            limits: HarvestLimits::default(),
            scroll_delay: Duration::from_millis(2000),
            unchanged_screen_distance: None,
        }
    }
}

/// Run capture → extract → store → scroll cycles until the list is
/// exhausted or saturated. Every per-cycle failure is recovered here.
pub async fn harvest_loop(
    device: &dyn DeviceController,
    extractor: &VisionExtractor,
    store: &ContactStore,
    config: &HarvestConfig,
) -> LoopState {
    let mut state = LoopState::new(config.limits);
    let mut change_detector = config.unchanged_screen_distance.map(ScreenChangeDetector::new);

    while !state.status().is_terminal() {
        let cycle_start = Instant::now();
        let outcome = perform_cycle(
            state.scroll_index(),
            device,
            extractor,
            store,
            change_detector.as_mut(),
        )
        .await;

        let action = state.record_cycle(outcome);
        log_info!(
            "cycle {} done in {}ms: {:?}, total={}, empty_streak={}",
            state.cycles(),
            cycle_start.elapsed().as_millis(),
            outcome,
            state.total_extracted(),
            state.consecutive_empty_screens()
        );

        match action {
            LoopAction::ScrollAndWait => {
                if let Err(err) = device.scroll_next().await {
                    log_warn!("scroll failed after cycle {}: {err:#}", state.cycles());
                }
                tokio::time::sleep(config.scroll_delay).await;
            }
            LoopAction::WaitAndRetry => {
                tokio::time::sleep(config.scroll_delay).await;
            }
            LoopAction::Stop(status) => {
                log_info!(
                    "harvest stopped: {:?} after {} cycles, {} new contacts",
                    status,
                    state.cycles(),
                    state.total_extracted()
                );
            }
        }
    }

    state
}

async fn perform_cycle(
    scroll_index: u32,
    device: &dyn DeviceController,
    extractor: &VisionExtractor,
    store: &ContactStore,
    change_detector: Option<&mut ScreenChangeDetector>,
) -> CycleOutcome {
    let screen = match device.capture_screen().await {
        Ok(bytes) => bytes,
        Err(err) => {
            log_warn!("screen capture failed at scroll {scroll_index}: {err:#}");
            return CycleOutcome::DeviceError;
        }
    };
    log_debug!("captured {} bytes at scroll {scroll_index}", screen.len());

    if let Some(detector) = change_detector {
        if detector.is_unchanged(&screen) {
            log_info!("screen unchanged at scroll {scroll_index}, skipping extraction");
            return CycleOutcome::Screen { new_contacts: 0 };
        }
    }

    let candidates = extractor.extract(&screen).await;
    if candidates.is_empty() {
        return CycleOutcome::Screen { new_contacts: 0 };
    }

    let new_contacts = store.insert_all(&candidates).await;
    log_debug!(
        "scroll {scroll_index}: {} candidates, {} new",
        candidates.len(),
        new_contacts
    );
    CycleOutcome::Screen { new_contacts }
}
