//! Per-index leases that serialise provisioning.
//!
//! `EnsureIndex` issues several remote calls that must not interleave with
//! another `EnsureIndex` on the same index. The provisioner itself holds no
//! locks, so callers share an `IndexLocks` registry and pass the lease they
//! acquired to `ensure_index`. Different index names never block each other.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::types::IndexName;

/// Registry handing out one `IndexLease` per index name at a time.
///
/// Cloning the registry shares it. Entries for names with no lease held or
/// awaited are pruned on the next acquire.
#[derive(Debug, Clone, Default)]
pub struct IndexLocks {
    locks: Arc<Mutex<HashMap<IndexName, Arc<Mutex<()>>>>>,
}

impl IndexLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other lease for `name` is held, then take it.
    pub async fn acquire(&self, name: IndexName) -> IndexLease {
        let lock = self.lock_for(&name).await;
        let guard = lock.lock_owned().await;
        debug!(index = %name, "Acquired index lease");

        IndexLease {
            name,
            _guard: guard,
        }
    }

    /// Take the lease for `name` only if nobody holds it.
    pub async fn try_acquire(&self, name: IndexName) -> Option<IndexLease> {
        let lock = self.lock_for(&name).await;
        let guard = lock.try_lock_owned().ok()?;
        Some(IndexLease {
            name,
            _guard: guard,
        })
    }

    /// Look up the lock for `name`, dropping entries nobody holds or waits on.
    ///
    /// Lock handles are only cloned under the registry mutex, so a strong
    /// count of one means the map holds the only reference.
    async fn lock_for(&self, name: &IndexName) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks
            .entry(name.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// Exclusive right to provision one index. Released on drop.
#[derive(Debug)]
pub struct IndexLease {
    name: IndexName,
    _guard: OwnedMutexGuard<()>,
}

impl IndexLease {
    /// The index this lease covers.
    pub fn name(&self) -> &IndexName {
        &self.name
    }
}
