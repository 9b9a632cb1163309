use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use rusqlite::{ffi, params, Row};

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, to_u64},
    models::StoredContact,
};
use crate::models::ContactCandidate;

fn row_to_contact(row: &Row) -> Result<StoredContact> {
    let created_at: String = row.get("created_at")?;

    Ok(StoredContact {
        id: row.get("id")?,
        name: row.get("name")?,
        role: row.get("role")?,
        company: row.get("company")?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

/// Role stored for a candidate: its title, or `default_role` when the title
/// is missing or empty.
pub fn resolve_role(candidate: &ContactCandidate, default_role: &str) -> String {
    match candidate.title.as_deref() {
        Some(title) if !title.is_empty() => title.to_string(),
        _ => default_role.to_string(),
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(inner, _)
            if inner.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

impl Database {
    /// Insert a contact keyed by name.
    ///
    /// Returns `Ok(false)` when the name is already stored; any other
    /// failure is an error.
    pub async fn insert_contact(
        &self,
        candidate: &ContactCandidate,
        default_role: &str,
    ) -> Result<bool> {
        let name = candidate.name.clone();
        let role = resolve_role(candidate, default_role);
        let company = candidate.company.clone().unwrap_or_default();

        self.execute(move |conn| {
            let result = conn.execute(
                "INSERT INTO contacts (name, role, company, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    name,
                    role,
                    company,
                    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
                ],
            );

            match result {
                Ok(_) => Ok(true),
                Err(err) if is_unique_violation(&err) => Ok(false),
                Err(err) => Err(err).with_context(|| format!("failed to insert contact {name}")),
            }
        })
        .await
    }

    /// All contacts, newest first.
    pub async fn list_contacts_newest_first(&self) -> Result<Vec<StoredContact>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, role, company, created_at
                 FROM contacts
                 ORDER BY created_at DESC, id DESC",
            )?;

            let mut rows = stmt.query([])?;
            let mut contacts = Vec::new();
            while let Some(row) = rows.next()? {
                contacts.push(row_to_contact(row)?);
            }

            Ok(contacts)
        })
        .await
    }

    pub async fn count_contacts(&self) -> Result<u64> {
        self.execute(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM contacts", [], |row| row.get(0))?;
            to_u64(count, "contact count")
        })
        .await
    }
}
