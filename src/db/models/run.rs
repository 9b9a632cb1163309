//! Run history data models.
//!
//! One `RunRecord` per process invocation, inserted as `Running` and
//! finalized with the terminal status once the loop stops.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Exhausted,
    Saturated,
    Error,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "Running",
            RunStatus::Exhausted => "Exhausted",
            RunStatus::Saturated => "Saturated",
            RunStatus::Error => "Error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub status: RunStatus,
    pub search_role: String,
    pub device_id: String,
    pub cycles: u64,
    pub total_extracted: u64,
    pub exported_rows: Option<u64>,
}

impl RunRecord {
    pub fn start(search_role: &str, device_id: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            stopped_at: None,
            status: RunStatus::Running,
            search_role: search_role.to_string(),
            device_id: device_id.to_string(),
            cycles: 0,
            total_extracted: 0,
            exported_rows: None,
        }
    }
}
