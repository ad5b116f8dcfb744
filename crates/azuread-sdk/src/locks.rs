//! Process-local named locks.
//!
//! Sibling resources that mutate the same collection on one parent object
//! (owners of an application, members of a group, ...) serialise on a lock
//! named `{resourceType}:{parentId}`. Locks are advisory and only coordinate
//! tasks inside this process.

use dashmap::DashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::trace;

type Registry = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// Registry of named mutexes.
///
/// Cloning is cheap and every clone shares the same registry, so one manager
/// is created at start-up and handed to whatever needs it.
#[derive(Debug, Clone, Default)]
pub struct LockManager {
    locks: Registry,
}

impl LockManager {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Composes the conventional lock name for a parent object.
    #[must_use]
    pub fn lock_name(resource_type: &str, id: &str) -> String {
        format!("{resource_type}:{id}")
    }

    /// Waits until no other holder of `name` remains, then returns a guard
    /// that releases the lock when dropped.
    pub async fn lock(&self, name: impl Into<String>) -> LockGuard {
        let name = name.into();
        let mutex = Arc::clone(self.locks.entry(name.clone()).or_default().value());

        trace!(lock = %name, "acquiring lock");
        let mut waiter = Waiter {
            pending: Some(Box::pin(Arc::clone(&mutex).lock_owned())),
            name,
            registry: Arc::clone(&self.locks),
            mutex,
        };
        let guard = (&mut waiter).await;
        trace!(lock = %waiter.name, "lock acquired");

        LockGuard {
            name: waiter.name.clone(),
            registry: Arc::clone(&self.locks),
            guard: Some(guard),
        }
    }

    /// Shorthand for `lock(LockManager::lock_name(resource_type, id))`.
    pub async fn lock_by_name(&self, resource_type: &str, id: &str) -> LockGuard {
        self.lock(Self::lock_name(resource_type, id)).await
    }

    /// Takes the lock only if nobody holds it.
    pub fn try_lock(&self, name: impl Into<String>) -> Option<LockGuard> {
        let name = name.into();
        let mutex = Arc::clone(self.locks.entry(name.clone()).or_default().value());

        let guard = mutex.try_lock_owned().ok()?;
        Some(LockGuard {
            name,
            registry: Arc::clone(&self.locks),
            guard: Some(guard),
        })
    }

    /// Returns true if some task currently holds `name`.
    #[must_use]
    pub fn is_locked(&self, name: &str) -> bool {
        self.locks
            .get(name)
            .is_some_and(|entry| entry.value().try_lock().is_err())
    }

    /// Names that are currently held or waited on.
    #[must_use]
    pub fn held_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.locks.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

/// Scoped lock on one name. Dropping the guard releases the lock, including
/// when the owning future is cancelled or times out.
#[derive(Debug)]
pub struct LockGuard {
    name: String,
    registry: Registry,
    guard: Option<OwnedMutexGuard<()>>,
}

impl LockGuard {
    /// Name of the held lock.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Some(guard) = self.guard.take() {
            let mutex = Arc::clone(OwnedMutexGuard::mutex(&guard));
            drop(guard);
            prune(&self.registry, &self.name, &mutex);
        }
        trace!(lock = %self.name, "lock released");
    }
}

/// An acquisition in progress. Dropping it before the lock is granted, for
/// example when a deadline expires, gives the entry back to the registry.
struct Waiter {
    name: String,
    registry: Registry,
    mutex: Arc<Mutex<()>>,
    pending: Option<Pin<Box<dyn Future<Output = OwnedMutexGuard<()>> + Send>>>,
}

impl Future for Waiter {
    type Output = OwnedMutexGuard<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let Some(pending) = self.pending.as_mut() else {
            return Poll::Pending;
        };
        let guard = std::task::ready!(pending.as_mut().poll(cx));
        self.pending = None;
        Poll::Ready(guard)
    }
}

impl Drop for Waiter {
    fn drop(&mut self) {
        self.pending.take();
        prune(&self.registry, &self.name, &self.mutex);
    }
}

/// Removes `name` if the registry entry is still `mutex` and `mutex` (the
/// caller's reference aside) is referenced by nothing else: no holder and no
/// waiter.
fn prune(registry: &Registry, name: &str, mutex: &Arc<Mutex<()>>) {
    registry.remove_if(name, |_, entry| {
        Arc::ptr_eq(entry, mutex) && Arc::strong_count(entry) == 2
    });
}
