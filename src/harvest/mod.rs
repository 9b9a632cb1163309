//! The extraction loop: capture, extract, dedupe, scroll, and decide when
//! to stop.

mod controller;
mod loop_worker;
mod phash;
mod state;

pub use controller::{HarvestController, HarvestReport};
pub use loop_worker::{harvest_loop, HarvestConfig};
pub use phash::ScreenChangeDetector;
pub use state::{CycleOutcome, HarvestLimits, HarvestStatus, LoopAction, LoopState};
