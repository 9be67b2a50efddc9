//! Scans waiting to be resubmitted.

use gymdesk_client::storage::{keys, KeyValueStore, KeyValueStoreExt};
use gymdesk_core::error::{GymError, GymResult};
use gymdesk_core::PendingScan;
use std::sync::{Arc, Mutex};

/// FIFO queue persisted under `pending_scans`.
pub struct PendingQueue {
    store: Arc<dyn KeyValueStore>,
    // Serializes read-modify-write cycles on the stored list.
    guard: Mutex<()>,
}

impl PendingQueue {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            guard: Mutex::new(()),
        }
    }

    pub fn push(&self, scan: PendingScan) -> GymResult<usize> {
        let _guard = self.lock()?;
        let mut items = self.read_or_reset()?;
        items.push(scan);
        self.store.set_json(keys::PENDING_SCANS, &items)?;
        Ok(items.len())
    }

    pub fn snapshot(&self) -> GymResult<Vec<PendingScan>> {
        let _guard = self.lock()?;
        self.read()
    }

    /// Removes and returns everything queued.
    /// An unreadable stored list is discarded and counts as empty.
    pub fn take_all(&self) -> GymResult<Vec<PendingScan>> {
        let _guard = self.lock()?;
        let items = self.read_or_reset()?;
        if !items.is_empty() {
            self.store.remove(keys::PENDING_SCANS)?;
        }
        Ok(items)
    }

    pub fn len(&self) -> usize {
        self.snapshot().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> GymResult<Vec<PendingScan>> {
        Ok(self
            .store
            .get_json(keys::PENDING_SCANS)?
            .unwrap_or_default())
    }

    /// Like `read`, but a value that no longer decodes is dropped.
    fn read_or_reset(&self) -> GymResult<Vec<PendingScan>> {
        match self.read() {
            Err(GymError::Decode(e)) => {
                tracing::warn!(error = %e, "pending scans unreadable, discarding");
                self.store.remove(keys::PENDING_SCANS)?;
                Ok(Vec::new())
            }
            other => other,
        }
    }

    fn lock(&self) -> GymResult<std::sync::MutexGuard<'_, ()>> {
        self.guard
            .lock()
            .map_err(|_| GymError::Internal("pending queue lock poisoned".into()))
    }
}
