use anyhow::Result;

use crate::db::{Database, StoredContact};
use crate::models::ContactCandidate;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error};

/// Durable, name-unique contact set used by the harvest loop.
///
/// `insert` never fails: duplicates and write errors both come back as
/// `false` so a bad write cannot stop a run.
#[derive(Clone)]
pub struct ContactStore {
    db: Database,
    default_role: String,
}

impl ContactStore {
    pub fn new(db: Database, default_role: impl Into<String>) -> Self {
        Self {
            db,
            default_role: default_role.into(),
        }
    }

    pub fn default_role(&self) -> &str {
        &self.default_role
    }

    pub async fn insert(&self, candidate: &ContactCandidate) -> bool {
        match self.db.insert_contact(candidate, &self.default_role).await {
            Ok(true) => true,
            Ok(false) => {
                log_debug!("contact '{}' already stored, skipping", candidate.name);
                false
            }
            Err(err) => {
                log_error!("failed to store contact '{}': {err:#}", candidate.name);
                false
            }
        }
    }

    /// Insert every candidate, returning how many were new.
    pub async fn insert_all(&self, candidates: &[ContactCandidate]) -> usize {
        let mut inserted = 0;
        for candidate in candidates {
            if self.insert(candidate).await {
                inserted += 1;
            }
        }
        inserted
    }

    pub async fn export_all(&self) -> Result<Vec<StoredContact>> {
        self.db.list_contacts_newest_first().await
    }

    pub async fn count(&self) -> Result<u64> {
        self.db.count_contacts().await
    }
}
