//! Stored contact data model.
//!
//! A contact is identified by its `name` alone; the store rejects a second
//! row with the same name.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct StoredContact {
    pub id: i64,
    pub name: String,
    pub role: String,
    pub company: String,
    pub created_at: DateTime<Utc>,
}
