use crate::domain::UserId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Key for serializing mutations on a pair of identities.
///
/// Friending uses the unordered form so that A->B and B->A requests contend
/// on the same lock; follows use the ordered form because the two directions
/// are independent edges.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PairKey(UserId, UserId);

impl PairKey {
    pub fn unordered(a: &UserId, b: &UserId) -> Self {
        if a <= b {
            Self(a.clone(), b.clone())
        } else {
            Self(b.clone(), a.clone())
        }
    }

    pub fn ordered(first: &UserId, second: &UserId) -> Self {
        Self(first.clone(), second.clone())
    }
}

const SWEEP_THRESHOLD: usize = 1024;

/// In-process locks keyed by identity pair. The store gives us no
/// cross-document transactions, so every check-then-act sequence in the
/// engines runs under the lock for its pair; this is what keeps a racing
/// second `send_request` from slipping between the existence check and the
/// insert.
#[derive(Default)]
pub struct PairLocks {
    entries: Mutex<HashMap<PairKey, Arc<AsyncMutex<()>>>>,
}

impl PairLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, key: PairKey) -> OwnedMutexGuard<()> {
        let lock = {
            let mut entries = self
                .entries
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());

            // Drop entries nobody is holding once the map grows past the
            // threshold, otherwise it tracks every pair ever seen.
            if entries.len() > SWEEP_THRESHOLD {
                entries.retain(|_, lock| Arc::strong_count(lock) > 1);
            }

            entries
                .entry(key)
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        lock.lock_owned().await
    }
}
