pub mod contacts;
pub mod db;
pub mod device;
pub mod export;
pub mod harvest;
pub mod models;
pub mod settings;
pub mod utils;
pub mod vision;

use anyhow::{Context, Result};
use log::{info, warn};

use contacts::ContactStore;
use db::Database;
use device::AdbDevice;
use harvest::{HarvestController, HarvestReport};
use settings::Settings;
use vision::{GeminiVision, VisionExtractor};

/// Wire the real adb device, Gemini model and SQLite store together and run
/// one harvest to completion.
pub async fn run(settings: Settings) -> Result<HarvestReport> {
    info!(
        "screenscout starting: device={}, role={}, max_scrolls={}, threshold={}",
        settings.device_id, settings.search_role, settings.max_scrolls, settings.empty_threshold
    );

    let database = Database::new(settings.db_path.clone())?;
    let store = ContactStore::new(database.clone(), settings.search_role.clone());

    let model = GeminiVision::new(settings.api_key.clone(), settings.model.clone())
        .context("failed to build Gemini client")?
        .with_base_url(settings.gemini_base_url.clone());
    let extractor = VisionExtractor::new(Box::new(model));

    let device = AdbDevice::new(
        settings.adb_bin.clone(),
        settings.device_id.clone(),
        settings.swipe,
    );

    let controller = HarvestController::new(
        database,
        store,
        settings.harvest_config(),
        settings.output_file.clone(),
        settings.device_id.clone(),
    );

    // Finalize runs that were in flight when a previous process was killed.
    match controller.recover_interrupted_runs().await {
        Ok(0) => {}
        Ok(count) => warn!("marked {count} interrupted runs as Error"),
        Err(err) => warn!("failed to recover interrupted runs: {err:#}"),
    }

    controller.run(&device, &extractor).await
}
