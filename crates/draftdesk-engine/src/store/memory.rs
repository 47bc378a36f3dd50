use std::collections::HashMap;

use crate::history::{Fingerprint, Snapshot, SnapshotId};
use crate::store::{DocumentId, SnapshotStore, StoreError};

/// Process-local store, keyed by document.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    documents: HashMap<DocumentId, Vec<Snapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held for `document`.
    pub fn count(&self, document: &DocumentId) -> usize {
        self.documents.get(document).map_or(0, Vec::len)
    }
}

impl SnapshotStore for MemoryStore {
    fn load_snapshots(&self, document: &DocumentId) -> Result<Vec<Snapshot>, StoreError> {
        let mut snapshots = self.documents.get(document).cloned().unwrap_or_default();
        snapshots.sort_by_key(|s| s.sequence);
        Ok(snapshots)
    }

    fn save_snapshot(
        &mut self,
        document: &DocumentId,
        snapshot: &Snapshot,
    ) -> Result<SnapshotId, StoreError> {
        let records = self.documents.entry(document.clone()).or_default();
        match records.iter_mut().find(|s| s.id == snapshot.id) {
            Some(existing) => *existing = snapshot.clone(),
            None => records.push(snapshot.clone()),
        }
        Ok(snapshot.id.clone())
    }

    fn snapshot_exists(
        &self,
        document: &DocumentId,
        fingerprint: &Fingerprint,
    ) -> Result<bool, StoreError> {
        Ok(self
            .documents
            .get(document)
            .is_some_and(|records| records.iter().any(|s| &s.fingerprint == fingerprint)))
    }

    fn delete_snapshots(
        &mut self,
        document: &DocumentId,
        ids: &[SnapshotId],
    ) -> Result<(), StoreError> {
        if let Some(records) = self.documents.get_mut(document) {
            records.retain(|s| !ids.contains(&s.id));
        }
        Ok(())
    }
}
