use std::fs;
use std::path::{Path, PathBuf};

use crate::history::{Fingerprint, Snapshot, SnapshotId};
use crate::store::{DocumentId, SnapshotStore, StoreError};

/// Directory-backed store: `<root>/<document>/<sequence>-<id>.json`, one
/// pretty JSON record per snapshot.
///
/// Records that fail to parse are skipped with a warning. Since every file
/// name carries the snapshot id, a later save never lands on a skipped file.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn document_dir(&self, document: &DocumentId) -> Result<PathBuf, StoreError> {
        let id = document.as_str();
        if id.is_empty() || id == "." || id == ".." || id.contains(['/', '\\']) {
            return Err(StoreError::InvalidDocumentId(id.to_string()));
        }
        Ok(self.root.join(id))
    }

    fn record_path(dir: &Path, snapshot: &Snapshot) -> PathBuf {
        dir.join(format!("{:020}-{}.json", snapshot.sequence, snapshot.id))
    }

    /// Every readable record file with its parsed snapshot, in file-name order.
    fn records(&self, document: &DocumentId) -> Result<Vec<(PathBuf, Snapshot)>, StoreError> {
        let dir = self.document_dir(document)?;
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_file()
                && let Some(ext) = path.extension()
                && ext == "json"
            {
                paths.push(path);
            }
        }
        paths.sort();

        let mut records = Vec::with_capacity(paths.len());
        for path in paths {
            let raw = fs::read_to_string(&path)?;
            match serde_json::from_str::<Snapshot>(&raw) {
                Ok(snapshot) => records.push((path, snapshot)),
                Err(source) => {
                    log::warn!("skipping {}", StoreError::Malformed { path, source });
                }
            }
        }
        Ok(records)
    }
}

impl SnapshotStore for FileStore {
    fn load_snapshots(&self, document: &DocumentId) -> Result<Vec<Snapshot>, StoreError> {
        let mut snapshots: Vec<Snapshot> = self
            .records(document)?
            .into_iter()
            .map(|(_, snapshot)| snapshot)
            .collect();
        snapshots.sort_by_key(|s| s.sequence);
        Ok(snapshots)
    }

    fn save_snapshot(
        &mut self,
        document: &DocumentId,
        snapshot: &Snapshot,
    ) -> Result<SnapshotId, StoreError> {
        let dir = self.document_dir(document)?;
        fs::create_dir_all(&dir)?;

        let json = serde_json::to_string_pretty(snapshot)?;
        fs::write(Self::record_path(&dir, snapshot), json)?;
        Ok(snapshot.id.clone())
    }

    fn snapshot_exists(
        &self,
        document: &DocumentId,
        fingerprint: &Fingerprint,
    ) -> Result<bool, StoreError> {
        Ok(self
            .records(document)?
            .iter()
            .any(|(_, s)| &s.fingerprint == fingerprint))
    }

    fn delete_snapshots(
        &mut self,
        document: &DocumentId,
        ids: &[SnapshotId],
    ) -> Result<(), StoreError> {
        if ids.is_empty() {
            return Ok(());
        }
        for (path, snapshot) in self.records(document)? {
            if ids.contains(&snapshot.id) {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }
}
