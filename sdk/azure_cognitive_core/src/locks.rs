//! Advisory mutex-by-name locks.
//!
//! Several adapters edit objects that other resources also touch: account
//! network rules reference shared virtual networks and subnets, deployments
//! and customer-managed keys mutate their parent account. ARM rejects
//! concurrent writes to those with `409 Conflict`/`AnotherOperationInProgress`,
//! so writers serialize on a process-wide lock keyed by
//! `(resource_type, name)`.
//!
//! The table only holds weak references: an entry lives as long as some
//! caller holds or waits for its lock, and dead entries are pruned on the
//! next insert.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex, PoisonError, Weak};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

static LOCKS: LazyLock<Mutex<HashMap<String, Weak<AsyncMutex<()>>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Held while a named lock is taken; releases on drop.
#[derive(Debug)]
pub struct NamedLockGuard {
    key: String,
    _guard: OwnedMutexGuard<()>,
}

impl NamedLockGuard {
    /// The `resource_type.name` key this guard holds.
    pub fn key(&self) -> &str {
        &self.key
    }
}

fn lock_key(name: &str, resource_type: &str) -> String {
    format!("{resource_type}.{name}")
}

fn mutex_for(key: &str) -> Arc<AsyncMutex<()>> {
    let mut locks = LOCKS.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(mutex) = locks.get(key).and_then(Weak::upgrade) {
        return mutex;
    }

    locks.retain(|_, mutex| mutex.strong_count() > 0);
    let mutex = Arc::new(AsyncMutex::new(()));
    locks.insert(key.to_string(), Arc::downgrade(&mutex));
    mutex
}

/// Take the lock for `name` of type `resource_type`, waiting if it is held.
pub async fn lock_by_name(name: &str, resource_type: &str) -> NamedLockGuard {
    let key = lock_key(name, resource_type);
    tracing::trace!(%key, "acquiring lock");
    let guard = mutex_for(&key).lock_owned().await;
    tracing::trace!(%key, "lock acquired");
    NamedLockGuard { key, _guard: guard }
}

/// Take the locks for every name in `names`.
///
/// Names are de-duplicated and acquired in sorted order so two callers
/// locking overlapping sets cannot deadlock.
pub async fn lock_multiple_by_name<S: AsRef<str>>(
    names: &[S],
    resource_type: &str,
) -> Vec<NamedLockGuard> {
    let mut sorted: Vec<&str> = names.iter().map(AsRef::as_ref).collect();
    sorted.sort_unstable();
    sorted.dedup();

    let mut guards = Vec::with_capacity(sorted.len());
    for name in sorted {
        guards.push(lock_by_name(name, resource_type).await);
    }
    guards
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn same_name_is_serialized() {
        let active = Arc::new(AtomicU32::new(0));
        let max_seen = Arc::new(AtomicU32::new(0));

        let tasks = (0..4).map(|_| {
            let active = active.clone();
            let max_seen = max_seen.clone();
            async move {
                let _guard = lock_by_name("vnet-serialized", "virtual_network").await;
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }
        });
        futures::future::join_all(tasks).await;

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn different_types_do_not_contend() {
        let _a = lock_by_name("shared-name", "virtual_network").await;
        let b = tokio::time::timeout(
            Duration::from_millis(100),
            lock_by_name("shared-name", "subnet"),
        )
        .await;
        assert!(b.is_ok(), "lock of a different type should not block");
    }

    #[tokio::test]
    async fn multiple_names_are_deduplicated_and_sorted() {
        let guards =
            lock_multiple_by_name(&["subnet-b", "subnet-a", "subnet-b"], "subnet-dedup").await;
        let keys: Vec<&str> = guards.iter().map(NamedLockGuard::key).collect();
        assert_eq!(keys, vec!["subnet-dedup.subnet-a", "subnet-dedup.subnet-b"]);
    }

    fn is_tracked(key: &str) -> bool {
        let locks = LOCKS.lock().unwrap_or_else(PoisonError::into_inner);
        locks.get(key).is_some_and(|mutex| mutex.strong_count() > 0)
    }

    #[tokio::test]
    async fn entry_lives_only_while_held() {
        let guard = lock_by_name("short-lived", "account").await;
        assert!(is_tracked(guard.key()));
        drop(guard);
        assert!(!is_tracked("account.short-lived"));

        let again = lock_by_name("short-lived", "account").await;
        assert!(is_tracked(again.key()));
    }

    #[tokio::test]
    async fn guard_releases_on_drop() {
        {
            let _guard = lock_by_name("released", "account").await;
        }
        let again =
            tokio::time::timeout(Duration::from_millis(100), lock_by_name("released", "account"))
                .await;
        assert!(again.is_ok());
    }
}
