use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::store::RecordStore;
use super::DraftingError;

/// Existence check and forced-regeneration clear-out for one intake's drafts.
pub struct IdempotencyGuard<'a> {
    store: &'a dyn RecordStore,
}

impl<'a> IdempotencyGuard<'a> {
    pub fn new(store: &'a dyn RecordStore) -> Self {
        Self { store }
    }

    /// True when a complete draft pair already exists.
    pub async fn drafts_exist(&self, intake_id: &str) -> Result<bool, DraftingError> {
        self.store.drafts_exist(intake_id).await
    }

    /// Remove existing drafts so regeneration starts clean.
    pub async fn delete_drafts(&self, intake_id: &str) -> Result<usize, DraftingError> {
        let removed = self.store.delete_drafts(intake_id).await?;
        tracing::info!(intake_id, removed, "Cleared existing drafts for regeneration");
        Ok(removed)
    }
}

/// Per-intake async locks so the exist-check, generation and write for one intake
/// never interleave with another trigger for the same intake.
#[derive(Default)]
pub struct IntakeLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

/// Held for the duration of one generation. Dropping it releases the intake.
pub struct IntakeLockGuard<'a> {
    owner: &'a IntakeLocks,
    intake_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl IntakeLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, intake_id: &str) -> IntakeLockGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(locks.entry(intake_id.to_string()).or_default())
        };
        let guard = lock.lock_owned().await;
        IntakeLockGuard {
            owner: self,
            intake_id: intake_id.to_string(),
            guard: Some(guard),
        }
    }

    /// Number of intakes with a live lock entry.
    pub fn tracked(&self) -> usize {
        self.locks.lock().map(|l| l.len()).unwrap_or_default()
    }
}

impl Drop for IntakeLockGuard<'_> {
    fn drop(&mut self) {
        // Release the async lock before checking whether anyone else still holds the Arc.
        drop(self.guard.take());
        let mut locks = self.owner.locks.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(lock) = locks.get(&self.intake_id) {
            if Arc::strong_count(lock) == 1 {
                locks.remove(&self.intake_id);
            }
        }
    }
}
