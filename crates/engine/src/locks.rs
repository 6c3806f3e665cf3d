//! Per-target serialization of balance mutations.

use std::{sync::Arc, time::Duration};

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{EngineError, PrincipalRef, ResultEngine};

/// Slots kept before idle ones are pruned.
const PRUNE_THRESHOLD: usize = 1024;

#[derive(Debug, Default)]
pub(crate) struct TargetLocks {
    slots: DashMap<PrincipalRef, Arc<Mutex<()>>>,
}

impl TargetLocks {
    /// Waits at most `timeout` for exclusive access to `target`.
    pub(crate) async fn acquire(
        &self,
        target: PrincipalRef,
        timeout: Duration,
    ) -> ResultEngine<OwnedMutexGuard<()>> {
        // Clone out of the shard before awaiting so no map lock is held.
        let slot = self.slots.entry(target).or_default().clone();
        let guard = tokio::time::timeout(timeout, slot.lock_owned())
            .await
            .map_err(|_| {
                EngineError::PersistenceFailure(format!(
                    "timed out waiting for {target} after {}ms",
                    timeout.as_millis()
                ))
            })?;
        self.prune();
        Ok(guard)
    }

    /// Drops slots nobody holds or waits on.
    fn prune(&self) {
        if self.slots.len() <= PRUNE_THRESHOLD {
            return;
        }
        self.slots.retain(|_, slot| Arc::strong_count(slot) > 1);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::PrincipalKind;

    fn target() -> PrincipalRef {
        PrincipalRef::new(PrincipalKind::Client, Uuid::new_v4())
    }

    #[tokio::test]
    async fn same_target_waits_and_times_out() {
        let locks = TargetLocks::default();
        let t = target();
        let _held = locks.acquire(t, Duration::from_millis(50)).await.unwrap();
        let err = locks
            .acquire(t, Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(err.is_persistence_failure());
    }

    #[tokio::test]
    async fn different_targets_are_independent() {
        let locks = TargetLocks::default();
        let _a = locks.acquire(target(), Duration::from_millis(50)).await.unwrap();
        let _b = locks.acquire(target(), Duration::from_millis(50)).await.unwrap();
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn released_slots_are_pruned_past_threshold() {
        let locks = TargetLocks::default();
        for _ in 0..PRUNE_THRESHOLD {
            drop(locks.acquire(target(), Duration::from_millis(50)).await.unwrap());
        }
        let _held = locks.acquire(target(), Duration::from_millis(50)).await.unwrap();
        assert_eq!(locks.len(), 1);
    }
}
