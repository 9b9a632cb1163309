use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, parse_optional_datetime, parse_run_status, to_i64, to_u64},
    models::{RunRecord, RunStatus},
};

fn row_to_run(row: &Row) -> Result<RunRecord> {
    let started_at: String = row.get("started_at")?;
    let stopped_at: Option<String> = row.get("stopped_at")?;
    let status: String = row.get("status")?;
    let cycles: i64 = row.get("cycles")?;
    let total_extracted: i64 = row.get("total_extracted")?;
    let exported_rows: Option<i64> = row.get("exported_rows")?;

    Ok(RunRecord {
        id: row.get("id")?,
        started_at: parse_datetime(&started_at, "started_at")?,
        stopped_at: parse_optional_datetime(stopped_at, "stopped_at")?,
        status: parse_run_status(&status)?,
        search_role: row.get("search_role")?,
        device_id: row.get("device_id")?,
        cycles: to_u64(cycles, "cycles")?,
        total_extracted: to_u64(total_extracted, "total_extracted")?,
        exported_rows: exported_rows
            .map(|rows| to_u64(rows, "exported_rows"))
            .transpose()?,
    })
}

impl Database {
    pub async fn insert_run(&self, run: &RunRecord) -> Result<()> {
        let record = run.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO runs (id, started_at, stopped_at, status, search_role, device_id, cycles, total_extracted, exported_rows)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    record.id,
                    record.started_at.to_rfc3339(),
                    record.stopped_at.as_ref().map(|dt| dt.to_rfc3339()),
                    record.status.as_str(),
                    record.search_role,
                    record.device_id,
                    to_i64(record.cycles)?,
                    to_i64(record.total_extracted)?,
                    record.exported_rows.map(to_i64).transpose()?,
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn finish_run(
        &self,
        run_id: &str,
        status: RunStatus,
        cycles: u64,
        total_extracted: u64,
        exported_rows: Option<u64>,
        stopped_at: DateTime<Utc>,
    ) -> Result<()> {
        let run_id = run_id.to_string();
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "UPDATE runs
                 SET status = ?1,
                     cycles = ?2,
                     total_extracted = ?3,
                     exported_rows = ?4,
                     stopped_at = ?5
                 WHERE id = ?6",
                params![
                    status.as_str(),
                    to_i64(cycles)?,
                    to_i64(total_extracted)?,
                    exported_rows.map(to_i64).transpose()?,
                    stopped_at.to_rfc3339(),
                    run_id,
                ],
            )?;

            if rows_affected == 0 {
                return Err(anyhow!("run {run_id} not found"));
            }
            Ok(())
        })
        .await
    }

    pub async fn get_run(&self, run_id: &str) -> Result<Option<RunRecord>> {
        let run_id = run_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, started_at, stopped_at, status, search_role, device_id, cycles, total_extracted, exported_rows
                 FROM runs
                 WHERE id = ?1",
            )?;
            let run = stmt
                .query_row(params![run_id], |row| Ok(row_to_run(row)))
                .optional()?
                .transpose()?;
            Ok(run)
        })
        .await
    }

    /// Runs left in `Running` by a process that was killed mid-run.
    pub async fn get_unfinished_runs(&self) -> Result<Vec<RunRecord>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, started_at, stopped_at, status, search_role, device_id, cycles, total_extracted, exported_rows
                 FROM runs
                 WHERE status = 'Running'
                 ORDER BY started_at DESC",
            )?;

            let mut rows = stmt.query([])?;
            let mut runs = Vec::new();
            while let Some(row) = rows.next()? {
                runs.push(row_to_run(row)?);
            }
            Ok(runs)
        })
        .await
    }
}
