use serde::Serialize;

use crate::db::RunStatus;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum HarvestStatus {
    Running,
    /// Hit the scroll cap.
    StoppedExhausted,
    /// Too many consecutive screens without a new contact.
    StoppedSaturated,
    /// Reserved; per-cycle failures are recovered instead.
    StoppedError,
}

impl HarvestStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, HarvestStatus::Running)
    }

    pub fn as_run_status(&self) -> RunStatus {
        match self {
            HarvestStatus::Running => RunStatus::Running,
            HarvestStatus::StoppedExhausted => RunStatus::Exhausted,
            HarvestStatus::StoppedSaturated => RunStatus::Saturated,
            HarvestStatus::StoppedError => RunStatus::Error,
        }
    }
}

/// What one cycle produced, as seen by the stopping policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Capture failed; nothing was extracted.
    DeviceError,
    /// A screen was processed and `new_contacts` of its candidates were stored.
    Screen { new_contacts: usize },
}

/// What the worker should do after a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    ScrollAndWait,
    WaitAndRetry,
    Stop(HarvestStatus),
}

#[derive(Debug, Clone, Copy)]
pub struct HarvestLimits {
    pub max_scrolls: u32,
    pub empty_screen_threshold: u32,
}

impl Default for HarvestLimits {
    fn default() -> Self {
        Self {
            max_scrolls: 200,
            empty_screen_threshold: 5,
        }
    }
}

/// Progress of one run. Owned by the harvest loop and dropped with it.
#[derive(Debug, Clone)]
pub struct LoopState {
    limits: HarvestLimits,
    status: HarvestStatus,
    scroll_index: u32,
    cycles: u32,
    total_extracted: u64,
    consecutive_empty_screens: u32,
}

impl LoopState {
    pub fn new(limits: HarvestLimits) -> Self {
        let status = if limits.max_scrolls == 0 {
            HarvestStatus::StoppedExhausted
        } else {
            HarvestStatus::Running
        };

        Self {
            limits,
            status,
            scroll_index: 0,
            cycles: 0,
            total_extracted: 0,
            consecutive_empty_screens: 0,
        }
    }

    pub fn status(&self) -> HarvestStatus {
        self.status
    }

    pub fn scroll_index(&self) -> u32 {
        self.scroll_index
    }

    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    pub fn total_extracted(&self) -> u64 {
        self.total_extracted
    }

    pub fn consecutive_empty_screens(&self) -> u32 {
        self.consecutive_empty_screens
    }

    /// Apply one cycle's outcome and decide what happens next.
    ///
    /// Only a cycle that stored at least one new contact resets the empty
    /// screen counter; device errors leave it untouched but still use up a
    /// scroll.
    pub fn record_cycle(&mut self, outcome: CycleOutcome) -> LoopAction {
        if self.status.is_terminal() {
            return LoopAction::Stop(self.status);
        }
        self.cycles += 1;

        let action = match outcome {
            CycleOutcome::DeviceError => LoopAction::WaitAndRetry,
            CycleOutcome::Screen { new_contacts: 0 } => {
                self.consecutive_empty_screens += 1;
                if self.consecutive_empty_screens >= self.limits.empty_screen_threshold {
                    self.status = HarvestStatus::StoppedSaturated;
                    return LoopAction::Stop(self.status);
                }
                LoopAction::ScrollAndWait
            }
            CycleOutcome::Screen { new_contacts } => {
                self.consecutive_empty_screens = 0;
                self.total_extracted += new_contacts as u64;
                LoopAction::ScrollAndWait
            }
        };

        self.scroll_index += 1;
        if self.scroll_index >= self.limits.max_scrolls {
            self.status = HarvestStatus::StoppedExhausted;
            return LoopAction::Stop(self.status);
        }

        action
    }
}
