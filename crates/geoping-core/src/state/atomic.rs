// # Atomic JSON Documents
//
// Whole-document JSON read and replace helpers shared by the inventory store
// and the scrape-target file.
//
// - Writes go to a temporary sibling first and are renamed over the target,
//   so a concurrent reader sees the old document or the new one.
// - The previous document is optionally copied to `<name>.backup` first.
// - Output is indented with four spaces and ends with a newline, which keeps
//   documents written by older tooling diff-stable.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::Error;

/// Read and parse a JSON document
///
/// Missing, unreadable and malformed documents are all `Error::Store`.
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, Error> {
    let content = fs::read_to_string(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::store(format!("Document {} does not exist", path.display()))
        } else {
            Error::store(format!("Failed to read {}: {}", path.display(), e))
        }
    })?;

    serde_json::from_str(&content).map_err(|e| {
        Error::store(format!(
            "Failed to parse {}: {}. The document may be corrupted.",
            path.display(),
            e
        ))
    })
}

/// Serialize `value` with the four-space layout used on disk
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, Error> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut serializer)
        .map_err(|e| Error::store(format!("Failed to serialize document: {}", e)))?;
    buf.push(b'\n');
    Ok(buf)
}

/// Replace the document at `path` atomically
pub async fn write_json_atomic<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
    keep_backup: bool,
) -> Result<(), Error> {
    let json = to_pretty_json(value)?;

    let temp_path = temp_path(path);
    {
        let mut file = fs::File::create(&temp_path).await.map_err(|e| {
            Error::store(format!(
                "Failed to create temp file {}: {}",
                temp_path.display(),
                e
            ))
        })?;

        file.write_all(&json).await.map_err(|e| {
            Error::store(format!(
                "Failed to write to temp file {}: {}",
                temp_path.display(),
                e
            ))
        })?;

        file.sync_all().await.map_err(|e| {
            Error::store(format!(
                "Failed to sync temp file {}: {}",
                temp_path.display(),
                e
            ))
        })?;
    }

    if keep_backup && fs::try_exists(path).await.unwrap_or(false) {
        let backup = backup_path(path);
        if let Err(e) = fs::copy(path, &backup).await {
            tracing::warn!("Failed to create backup {}: {}", backup.display(), e);
        }
    }

    if let Err(e) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(Error::store(format!(
            "Failed to rename {} to {}: {}",
            temp_path.display(),
            path.display(),
            e
        )));
    }

    tracing::trace!("Document written: {}", path.display());
    Ok(())
}

/// Temporary sibling used for the write-then-rename
///
/// The process id keeps the editor and the daemon from sharing a temp file.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{}.tmp", std::process::id()));
    path.with_file_name(name)
}

/// Location of the copy of the previous document
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".backup");
    path.with_file_name(name)
}
