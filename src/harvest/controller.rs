use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use log::{error, info, warn};
use serde::Serialize;

use crate::contacts::ContactStore;
use crate::db::{Database, RunRecord, RunStatus};
use crate::device::DeviceController;
use crate::export::export_contacts;
use crate::vision::VisionExtractor;

use super::loop_worker::{harvest_loop, HarvestConfig};
use super::state::HarvestStatus;

/// Final counts of a finished run.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HarvestReport {
    pub run_id: String,
    pub status: HarvestStatus,
    pub cycles: u32,
    pub total_extracted: u64,
    pub exported_rows: usize,
}

/// Drives one run end to end: loop, export, run bookkeeping.
pub struct HarvestController {
    db: Database,
    store: ContactStore,
    config: HarvestConfig,
    output_path: PathBuf,
    device_id: String,
}

impl HarvestController {
    pub fn new(
        db: Database,
        store: ContactStore,
        config: HarvestConfig,
        output_path: PathBuf,
        device_id: impl Into<String>,
    ) -> Self {
        Self {
            db,
            store,
            config,
            output_path,
            device_id: device_id.into(),
        }
    }

    /// Mark runs left `Running` by a killed process as `Error`.
    pub async fn recover_interrupted_runs(&self) -> Result<usize> {
        let stale = self.db.get_unfinished_runs().await?;
        for run in &stale {
            warn!("Recovered interrupted run {}; marking as Error", run.id);
            self.db
                .finish_run(
                    &run.id,
                    RunStatus::Error,
                    run.cycles,
                    run.total_extracted,
                    None,
                    Utc::now(),
                )
                .await?;
        }
        Ok(stale.len())
    }

    pub async fn run(
        &self,
        device: &dyn DeviceController,
        extractor: &VisionExtractor,
    ) -> Result<HarvestReport> {
        let run = RunRecord::start(self.store.default_role(), &self.device_id);
        if let Err(err) = self.db.insert_run(&run).await {
            warn!("failed to record run start: {err:#}");
        }

        match self.store.count().await {
            Ok(count) => info!("run {} starting with {count} stored contacts", run.id),
            Err(err) => warn!("failed to count stored contacts: {err:#}"),
        }

        let state = harvest_loop(device, extractor, &self.store, &self.config).await;

        let exported = export_contacts(&self.store, &self.output_path).await;
        let (run_status, exported_rows) = match &exported {
            Ok(rows) => (state.status().as_run_status(), Some(*rows as u64)),
            Err(err) => {
                error!("export to {} failed: {err:#}", self.output_path.display());
                (RunStatus::Error, None)
            }
        };

        if let Err(err) = self
            .db
            .finish_run(
                &run.id,
                run_status,
                u64::from(state.cycles()),
                state.total_extracted(),
                exported_rows,
                Utc::now(),
            )
            .await
        {
            warn!("failed to record run result: {err:#}");
        }

        let exported_rows = exported.context("contact export failed")?;
        let report = HarvestReport {
            run_id: run.id,
            status: state.status(),
            cycles: state.cycles(),
            total_extracted: state.total_extracted(),
            exported_rows,
        };
        info!(
            "run {} finished: {:?}, {} cycles, {} new contacts, {} rows exported to {}",
            report.run_id,
            report.status,
            report.cycles,
            report.total_extracted,
            report.exported_rows,
            self.output_path.display()
        );
        Ok(report)
    }
}
