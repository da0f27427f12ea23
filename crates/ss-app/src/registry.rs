//! Listener registration guard.
//!
//! The notification listeners must exist at most once per process, survive
//! presentation remounts, and be fully released when the last owner goes
//! away. A bare "already listening" boolean cannot express overlapping
//! owners, so this is a reference-counted registration: the first `acquire`
//! installs the subscriptions, later acquires are no-ops, and dropping the
//! last guard tears everything down so a later acquire can succeed again.

use std::sync::{Arc, Mutex};

use tokio::task::AbortHandle;

use crate::channel::Subscription;

/// Resources held while the registration is active.
pub struct ActiveRegistration {
    /// Topic subscriptions; unsubscribed when dropped.
    pub subscriptions: Vec<Subscription>,
    /// Background tasks (notification router); aborted on release.
    pub tasks: Vec<AbortHandle>,
}

#[derive(Default)]
struct RegistryState {
    refs: usize,
    active: Option<ActiveRegistration>,
}

/// Process-wide registration bookkeeping.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    inner: Arc<Mutex<RegistryState>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the registration. `install` runs only when no registration is
    /// currently active; repeated acquisitions while one is active never
    /// create a second subscription and never error.
    pub fn acquire<F>(&self, install: F) -> RegistrationGuard
    where
        F: FnOnce() -> ActiveRegistration,
    {
        let mut state = self.inner.lock().unwrap();
        state.refs += 1;
        if state.active.is_none() {
            state.active = Some(install());
        }
        RegistrationGuard {
            registry: Arc::clone(&self.inner),
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.lock().unwrap().active.is_some()
    }
}

/// Keeps the registration alive. Dropping the last guard releases it.
pub struct RegistrationGuard {
    registry: Arc<Mutex<RegistryState>>,
}

impl Drop for RegistrationGuard {
    fn drop(&mut self) {
        let mut state = self.registry.lock().unwrap();
        state.refs -= 1;
        if state.refs == 0 {
            if let Some(active) = state.active.take() {
                for task in &active.tasks {
                    task.abort();
                }
                // Subscriptions unsubscribe when dropped here.
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_install(counter: &Arc<AtomicUsize>) -> impl FnOnce() -> ActiveRegistration + '_ {
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            ActiveRegistration {
                subscriptions: Vec::new(),
                tasks: Vec::new(),
            }
        }
    }

    #[test]
    fn overlapping_acquires_install_once() {
        let registry = ListenerRegistry::new();
        let installs = Arc::new(AtomicUsize::new(0));

        // Remount pattern: the new owner acquires before the old one drops.
        let first = registry.acquire(counting_install(&installs));
        let second = registry.acquire(counting_install(&installs));
        drop(first);
        let third = registry.acquire(counting_install(&installs));
        drop(second);
        drop(third);

        assert_eq!(installs.load(Ordering::SeqCst), 1);
        assert!(!registry.is_active());
    }

    #[test]
    fn full_release_allows_reinstall() {
        let registry = ListenerRegistry::new();
        let installs = Arc::new(AtomicUsize::new(0));

        let guard = registry.acquire(counting_install(&installs));
        drop(guard);
        assert!(!registry.is_active());

        let _guard = registry.acquire(counting_install(&installs));
        assert!(registry.is_active());
        assert_eq!(installs.load(Ordering::SeqCst), 2);
    }
}
