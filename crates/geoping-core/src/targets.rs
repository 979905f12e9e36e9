// # Scrape Targets
//
// Keeps the metrics collector's file-based service discovery document in step
// with the inventory.
//
// ## File Format
//
// ```json
// [
//     {
//         "labels": {
//             "job": "geoping"
//         },
//         "targets": [
//             "10.0.0.1",
//             "10.0.0.2"
//         ]
//     }
// ]
// ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::Error;
use crate::state::atomic;

/// Job label used when the file has no group yet
pub const DEFAULT_JOB: &str = "geoping";

/// One target group of the discovery document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetGroup {
    pub labels: TargetLabels,
    #[serde(default)]
    pub targets: Vec<String>,
}

/// Labels attached to a target group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetLabels {
    pub job: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl TargetGroup {
    pub fn new(job: impl Into<String>) -> Self {
        Self {
            labels: TargetLabels {
                job: job.into(),
                extra: BTreeMap::new(),
            },
            targets: Vec::new(),
        }
    }
}

/// Append `target` to the first group, creating one if needed
///
/// Returns `false` when the target was already listed in any group.
pub fn add_target(groups: &mut Vec<TargetGroup>, target: &str, job: &str) -> bool {
    if groups.iter().any(|g| g.targets.iter().any(|t| t == target)) {
        return false;
    }
    if groups.is_empty() {
        groups.push(TargetGroup::new(job));
    }
    groups[0].targets.push(target.to_string());
    true
}

/// Remove every occurrence of `target`, returning how many were removed
pub fn remove_target(groups: &mut [TargetGroup], target: &str) -> usize {
    let mut removed = 0;
    for group in groups.iter_mut() {
        let before = group.targets.len();
        group.targets.retain(|t| t != target);
        removed += before - group.targets.len();
    }
    removed
}

/// The discovery document on disk
#[derive(Debug, Clone)]
pub struct ScrapeTargetFile {
    path: PathBuf,
    job: String,
    keep_backup: bool,
}

impl ScrapeTargetFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            job: DEFAULT_JOB.to_string(),
            keep_backup: true,
        }
    }

    /// Job label for a newly created group
    pub fn with_job(mut self, job: impl Into<String>) -> Self {
        self.job = job.into();
        self
    }

    pub fn with_backup(mut self, keep_backup: bool) -> Self {
        self.keep_backup = keep_backup;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document; a missing file is an empty document
    pub async fn load(&self) -> Result<Vec<TargetGroup>, Error> {
        if !tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            tracing::debug!("Scrape target file {} does not exist yet", self.path.display());
            return Ok(Vec::new());
        }
        atomic::read_json(&self.path).await
    }

    pub async fn replace(&self, groups: &[TargetGroup]) -> Result<(), Error> {
        atomic::write_json_atomic(&self.path, groups, self.keep_backup).await
    }

    /// Add `target` and persist; returns `false` if it was already present
    pub async fn add(&self, target: &str) -> Result<bool, Error> {
        let mut groups = self.load().await?;
        if !add_target(&mut groups, target, &self.job) {
            return Ok(false);
        }
        self.replace(&groups).await?;
        Ok(true)
    }

    /// Remove `target` and persist; returns the number of entries removed
    pub async fn remove(&self, target: &str) -> Result<usize, Error> {
        let mut groups = self.load().await?;
        let removed = remove_target(&mut groups, target);
        if removed > 0 {
            self.replace(&groups).await?;
        }
        Ok(removed)
    }
}
