use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::foundation::sync::lock;

static NEXT_SUBSCRIPTION: AtomicU64 = AtomicU64::new(1);

/// Handle returned by `subscribe`, used to unsubscribe later.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Ordered list of event callbacks.
///
/// Callbacks run in registration order. `emit` snapshots the list before calling out, so a
/// callback may subscribe or unsubscribe without deadlocking; such changes apply to the next emit.
pub(crate) struct Subscribers<E> {
    entries: Mutex<Vec<(SubscriptionId, Callback<E>)>>,
}

impl<E> Default for Subscribers<E> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }
}

impl<E> Subscribers<E> {
    pub(crate) fn subscribe(&self, callback: impl Fn(&E) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(NEXT_SUBSCRIPTION.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, Arc::new(callback)));
        id
    }

    /// Returns `false` when `id` was not subscribed.
    pub(crate) fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|(sid, _)| *sid != id);
        entries.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    pub(crate) fn emit(&self, event: &E) {
        let snapshot: Vec<Callback<E>> = self.lock().iter().map(|(_, cb)| cb.clone()).collect();
        for cb in snapshot {
            cb(event);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(SubscriptionId, Callback<E>)>> {
        lock(&self.entries)
    }
}
