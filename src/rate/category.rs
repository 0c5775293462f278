use std::collections::HashSet;

use crate::foundation::core::{Category, FrameRate, ItemId};
use crate::foundation::error::{AnimpaceError, AnimpaceResult};
use crate::foundation::events::{SubscriptionId, Subscribers};

/// One row of a [`RateTable`]: populations of at least `min_population` use `rate`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RateStep {
    /// Inclusive population cutoff.
    pub min_population: usize,
    /// Rate recommended from this cutoff on.
    pub rate: FrameRate,
}

/// Step function from category population to recommended frame rate.
///
/// Cutoffs are strictly ascending and rates never increase with population.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RateTable {
    /// Rate used below the first cutoff.
    pub base_rate: FrameRate,
    /// Ascending cutoffs.
    #[serde(default)]
    pub steps: Vec<RateStep>,
}

impl RateTable {
    /// Validated table.
    pub fn new(base_rate: FrameRate, steps: Vec<RateStep>) -> AnimpaceResult<Self> {
        let table = Self { base_rate, steps };
        table.validate()?;
        Ok(table)
    }

    /// The default population table: 60 below 20 items, then 45, 30 from 35, 15 from 50.
    pub fn standard() -> Self {
        fn step(min_population: usize, fps: u32) -> RateStep {
            RateStep {
                min_population,
                rate: FrameRate::at_least_one(fps),
            }
        }

        Self {
            base_rate: FrameRate::DEFAULT,
            steps: vec![step(20, 45), step(35, 30), step(50, 15)],
        }
    }

    /// Check ordering of cutoffs and monotonicity of rates.
    pub fn validate(&self) -> AnimpaceResult<()> {
        let mut prev_cutoff = None::<usize>;
        let mut prev_rate = self.base_rate;
        for step in &self.steps {
            if prev_cutoff.is_some_and(|c| step.min_population <= c) {
                return Err(AnimpaceError::validation(
                    "rate table cutoffs must be strictly ascending",
                ));
            }
            if step.rate > prev_rate {
                return Err(AnimpaceError::validation(
                    "rate table rates must not increase with population",
                ));
            }
            prev_cutoff = Some(step.min_population);
            prev_rate = step.rate;
        }
        Ok(())
    }

    /// Rate recommended for `population` members.
    pub fn rate_for(&self, population: usize) -> FrameRate {
        self.steps
            .iter()
            .rev()
            .find(|s| population >= s.min_population)
            .map_or(self.base_rate, |s| s.rate)
    }
}

/// How a category turns its population into a rate.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RatePolicy {
    /// Population-dependent rate.
    Adaptive {
        /// Threshold table.
        table: RateTable,
    },
    /// Constant rate regardless of population.
    Fixed {
        /// The rate.
        rate: FrameRate,
    },
}

impl RatePolicy {
    /// Adaptive policy over [`RateTable::standard`].
    pub fn standard() -> Self {
        Self::Adaptive {
            table: RateTable::standard(),
        }
    }

    /// Default policy of the icon category: fixed at [`FrameRate::DEFAULT`].
    pub fn icon() -> Self {
        Self::Fixed {
            rate: FrameRate::DEFAULT,
        }
    }

    /// Validate the contained table, if any.
    pub fn validate(&self) -> AnimpaceResult<()> {
        match self {
            Self::Adaptive { table } => table.validate(),
            Self::Fixed { .. } => Ok(()),
        }
    }

    /// Rate recommended for `population` members.
    pub fn rate_for(&self, population: usize) -> FrameRate {
        match self {
            Self::Adaptive { table } => table.rate_for(population),
            Self::Fixed { rate } => *rate,
        }
    }
}

/// Emitted by a [`RateCategory`] when its recommended rate changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateChanged {
    /// Category that changed.
    pub category: Category,
    /// New recommended rate.
    pub rate: FrameRate,
}

/// Membership set plus rate policy for one category.
pub struct RateCategory {
    category: Category,
    policy: RatePolicy,
    members: HashSet<ItemId>,
    current: FrameRate,
    listeners: Subscribers<RateChanged>,
}

impl RateCategory {
    /// Create an empty category.
    pub fn new(category: Category, policy: RatePolicy) -> Self {
        let current = policy.rate_for(0);
        Self {
            category,
            policy,
            members: HashSet::new(),
            current,
            listeners: Subscribers::default(),
        }
    }

    /// Which category this is.
    pub fn category(&self) -> Category {
        self.category
    }

    /// Number of registered items.
    pub fn population(&self) -> usize {
        self.members.len()
    }

    /// Return `true` when `id` is registered.
    pub fn contains(&self, id: ItemId) -> bool {
        self.members.contains(&id)
    }

    /// Rate for the current population.
    pub fn recommended_rate(&self) -> FrameRate {
        self.policy.rate_for(self.members.len())
    }

    /// Register `id` (no-op when present) and return the recommended rate.
    pub fn add_item(&mut self, id: ItemId) -> FrameRate {
        if self.members.insert(id) {
            self.refresh();
        }
        self.current
    }

    /// Unregister `id` (no-op when absent).
    pub fn remove_item(&mut self, id: ItemId) {
        if self.members.remove(&id) {
            self.refresh();
        }
    }

    /// Observe rate changes.
    pub fn subscribe(
        &self,
        callback: impl Fn(&RateChanged) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.listeners.subscribe(callback)
    }

    /// Stop observing rate changes.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    fn refresh(&mut self) {
        let next = self.recommended_rate();
        if next == self.current {
            return;
        }
        tracing::info!(
            category = %self.category,
            population = self.members.len(),
            from = self.current.get(),
            to = next.get(),
            "recommended rate changed"
        );
        self.current = next;
        self.listeners.emit(&RateChanged {
            category: self.category,
            rate: next,
        });
    }
}

#[cfg(test)]
#[path = "../../tests/unit/rate/category.rs"]
mod tests;
