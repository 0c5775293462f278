use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::foundation::core::{Category, FrameRate, ItemId};
use crate::foundation::error::{AnimpaceError, AnimpaceResult};
use crate::foundation::events::{SubscriptionId, Subscribers};
use crate::foundation::sync::lock;
use crate::rate::category::{RateCategory, RateChanged, RatePolicy};

/// Which items a [`RateBroadcast`] is meant for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BroadcastTarget {
    /// Every item registered in the broadcast's category.
    All,
    /// One specific item.
    Item(ItemId),
}

/// Rate update delivered to coordinator subscribers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateBroadcast {
    /// Rate to apply.
    pub rate: FrameRate,
    /// Category the update originates from.
    pub category: Category,
    /// Recipients.
    pub target: BroadcastTarget,
}

impl RateBroadcast {
    /// Return `true` when an item `id` registered in `category` should apply this update.
    pub fn applies_to(&self, category: Category, id: ItemId) -> bool {
        if category == Category::None || category != self.category {
            return false;
        }
        match self.target {
            BroadcastTarget::All => true,
            BroadcastTarget::Item(target) => target == id,
        }
    }
}

/// Rate policies and the fallback rate of uncoordinated items.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CoordinatorOpts {
    /// Rate returned for [`Category::None`].
    pub default_rate: FrameRate,
    /// Policy of [`Category::Standard`].
    pub standard: RatePolicy,
    /// Policy of [`Category::Icon`].
    pub icon: RatePolicy,
}

impl Default for CoordinatorOpts {
    fn default() -> Self {
        Self {
            default_rate: FrameRate::DEFAULT,
            standard: RatePolicy::standard(),
            icon: RatePolicy::icon(),
        }
    }
}

impl CoordinatorOpts {
    /// Validate both policies.
    pub fn validate(&self) -> AnimpaceResult<()> {
        self.standard.validate()?;
        self.icon.validate()
    }
}

/// Routes registrations to rate categories and rebroadcasts their rate changes.
///
/// Constructed once by the host and shared with every item through an `Arc`. Tear it down with
/// [`Coordinator::shutdown`] after all items are gone.
pub struct Coordinator {
    default_rate: FrameRate,
    standard: Mutex<RateCategory>,
    icon: Mutex<RateCategory>,
    // Category events are queued here and delivered once the category lock is released.
    pending: Arc<Mutex<Outbox>>,
    listeners: Subscribers<RateBroadcast>,
}

impl Coordinator {
    /// Build a coordinator with its categories wired up.
    pub fn new(opts: CoordinatorOpts) -> AnimpaceResult<Arc<Self>> {
        opts.validate()?;
        let pending = Arc::new(Mutex::new(Outbox::default()));

        let make = |category: Category, policy: RatePolicy| {
            let cat = RateCategory::new(category, policy);
            let queue = pending.clone();
            cat.subscribe(move |ev: &RateChanged| {
                lock(&queue).queue.push_back(RateBroadcast {
                    rate: ev.rate,
                    category: ev.category,
                    target: BroadcastTarget::All,
                });
            });
            Mutex::new(cat)
        };

        let standard = make(Category::Standard, opts.standard);
        let icon = make(Category::Icon, opts.icon);
        tracing::debug!(default_rate = opts.default_rate.get(), "coordinator created");

        Ok(Arc::new(Self {
            default_rate: opts.default_rate,
            standard,
            icon,
            pending,
            listeners: Subscribers::default(),
        }))
    }

    /// Rate given to items outside any category.
    pub fn default_rate(&self) -> FrameRate {
        self.default_rate
    }

    /// Register `id` in `category` and return the rate it should run at.
    ///
    /// Registering twice is idempotent. [`Category::None`] returns the default rate and changes
    /// nothing.
    pub fn register(&self, category: Category, id: ItemId) -> FrameRate {
        let Some(slot) = self.slot(category) else {
            return self.default_rate;
        };
        let rate = lock(slot).add_item(id);
        tracing::debug!(%category, item = %id, rate = rate.get(), "registered");
        self.flush();
        rate
    }

    /// Remove `id` from `category`. Absent ids and [`Category::None`] are no-ops.
    pub fn unregister(&self, category: Category, id: ItemId) {
        let Some(slot) = self.slot(category) else {
            return;
        };
        lock(slot).remove_item(id);
        tracing::debug!(%category, item = %id, "unregistered");
        self.flush();
    }

    /// Deliver a rate update to subscribers.
    ///
    /// Queued category changes are delivered first. A broadcast issued from inside a subscriber
    /// is delivered after the current one completes.
    pub fn broadcast(&self, rate: FrameRate, category: Category, target: BroadcastTarget) {
        lock(&self.pending).queue.push_back(RateBroadcast {
            rate,
            category,
            target,
        });
        self.flush();
    }

    /// Number of items registered in `category`.
    pub fn population(&self, category: Category) -> usize {
        self.slot(category).map_or(0, |s| lock(s).population())
    }

    /// Rate `category` currently recommends.
    pub fn recommended_rate(&self, category: Category) -> FrameRate {
        self.slot(category)
            .map_or(self.default_rate, |s| lock(s).recommended_rate())
    }

    /// Observe rate broadcasts. Callbacks run synchronously, in subscription order.
    pub fn subscribe(
        &self,
        callback: impl Fn(&RateBroadcast) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.listeners.subscribe(callback)
    }

    /// Stop observing rate broadcasts.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// Number of live broadcast subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.listeners.len()
    }

    /// Tear the coordinator down.
    ///
    /// Fails while any item still holds a reference, is registered, or is subscribed.
    pub fn shutdown(self: Arc<Self>) -> AnimpaceResult<()> {
        let this = Arc::try_unwrap(self).map_err(|still| {
            AnimpaceError::lifecycle(format!(
                "coordinator still shared by {} other owner(s)",
                Arc::strong_count(&still) - 1
            ))
        })?;

        let registered = this.population(Category::Standard) + this.population(Category::Icon);
        if registered > 0 {
            return Err(AnimpaceError::lifecycle(format!(
                "{registered} item(s) still registered at coordinator shutdown"
            )));
        }
        if this.subscriber_count() > 0 {
            return Err(AnimpaceError::lifecycle(format!(
                "{} subscription(s) still live at coordinator shutdown",
                this.subscriber_count()
            )));
        }
        tracing::debug!("coordinator shut down");
        Ok(())
    }

    fn slot(&self, category: Category) -> Option<&Mutex<RateCategory>> {
        match category {
            Category::None => None,
            Category::Standard => Some(&self.standard),
            Category::Icon => Some(&self.icon),
        }
    }

    // One thread delivers at a time, draining in queue order; others only enqueue. Nested calls
    // from a subscriber return at once and their events are drained by the outer loop.
    fn flush(&self) {
        {
            let mut outbox = lock(&self.pending);
            if outbox.delivering {
                return;
            }
            outbox.delivering = true;
        }
        let mut guard = Delivering {
            outbox: &self.pending,
            armed: true,
        };
        loop {
            let next = {
                let mut outbox = lock(&self.pending);
                let next = outbox.queue.pop_front();
                if next.is_none() {
                    outbox.delivering = false;
                    guard.armed = false;
                }
                next
            };
            let Some(ev) = next else {
                return;
            };
            self.listeners.emit(&ev);
        }
    }
}

#[derive(Default)]
struct Outbox {
    queue: VecDeque<RateBroadcast>,
    delivering: bool,
}

// Releases the delivery flag if a subscriber panics mid-drain.
struct Delivering<'a> {
    outbox: &'a Mutex<Outbox>,
    armed: bool,
}

impl Drop for Delivering<'_> {
    fn drop(&mut self) {
        if self.armed {
            lock(self.outbox).delivering = false;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/rate/coordinator.rs"]
mod tests;
