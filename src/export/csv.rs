use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::contacts::ContactStore;
use crate::db::StoredContact;

pub const CSV_HEADER: &str = "name,role,company";

/// Header plus one double-quoted `name,role,company` row per contact.
/// Embedded quotes are not escaped.
pub fn render_csv(contacts: &[StoredContact]) -> String {
    let mut out = String::with_capacity(CSV_HEADER.len() + 1 + contacts.len() * 48);
    out.push_str(CSV_HEADER);
    out.push('\n');
    for contact in contacts {
        out.push_str(&format!(
            "\"{}\",\"{}\",\"{}\"\n",
            contact.name, contact.role, contact.company
        ));
    }
    out
}

/// Write every stored contact, newest first, to `path` and return the row
/// count. The file is replaced atomically.
pub async fn export_contacts(store: &ContactStore, path: &Path) -> Result<usize> {
    let contacts = store
        .export_all()
        .await
        .context("failed to read contacts for export")?;

    write_atomically(path, render_csv(&contacts).as_bytes()).await?;
    log::info!("exported {} contacts to {}", contacts.len(), path.display());
    Ok(contacts.len())
}

async fn write_atomically(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create export directory {}", parent.display()))?;
    }

    let tmp_path = temp_sibling(path);
    tokio::fs::write(&tmp_path, contents)
        .await
        .with_context(|| format!("failed to write {}", tmp_path.display()))?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("failed to move export into place at {}", path.display()))?;
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "export.csv".into());
    name.push(".tmp");
    path.with_file_name(name)
}
