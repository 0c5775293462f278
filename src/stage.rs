use std::sync::Arc;
use std::time::Instant;

use crate::config::AnimpaceConfig;
use crate::decode::AnimationLoader;
use crate::foundation::core::ItemId;
use crate::foundation::error::AnimpaceResult;
use crate::item::{AnimationItem, ItemOpts, ItemStats, PlaybackState};
use crate::rate::coordinator::Coordinator;
use crate::render::pipeline::RenderPipeline;

/// A set of items driven by one control thread.
///
/// Owns the coordinator and render pipeline the items share. [`Stage::run_until`] is the control
/// loop: it advances every item, then parks until the earliest tick deadline or until a worker
/// reports a finished frame.
pub struct Stage {
    coordinator: Arc<Coordinator>,
    pipeline: RenderPipeline,
    loader: Arc<dyn AnimationLoader>,
    item_opts: ItemOpts,
    items: Vec<AnimationItem>,
}

impl Stage {
    /// Build the coordinator and worker pool described by `config`.
    pub fn new(config: &AnimpaceConfig, loader: Arc<dyn AnimationLoader>) -> AnimpaceResult<Self> {
        config.validate()?;
        let coordinator = Coordinator::new(config.coordinator.clone())?;
        let pipeline = RenderPipeline::new(&config.pipeline)?;
        tracing::info!(
            workers = pipeline.worker_threads(),
            "stage ready"
        );
        Ok(Self {
            coordinator,
            pipeline,
            loader,
            item_opts: config.item.clone(),
            items: Vec::new(),
        })
    }

    /// The shared coordinator.
    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }

    /// The shared render pipeline.
    pub fn pipeline(&self) -> &RenderPipeline {
        &self.pipeline
    }

    /// Create an item with the stage's defaults and return it for configuration.
    pub fn add_item(&mut self) -> &mut AnimationItem {
        let item = AnimationItem::new(
            &self.coordinator,
            &self.pipeline,
            self.loader.clone(),
            &self.item_opts,
        );
        self.items.push(item);
        let last = self.items.len() - 1;
        &mut self.items[last]
    }

    /// Remove and drop an item. Waits for its outstanding render, if any.
    pub fn remove_item(&mut self, id: ItemId) -> bool {
        let Some(pos) = self.items.iter().position(|i| i.id() == id) else {
            return false;
        };
        drop(self.items.remove(pos));
        true
    }

    /// All items, in creation order.
    pub fn items(&self) -> &[AnimationItem] {
        &self.items
    }

    /// Look up an item.
    pub fn item(&self, id: ItemId) -> Option<&AnimationItem> {
        self.items.iter().find(|i| i.id() == id)
    }

    /// Look up an item for mutation.
    pub fn item_mut(&mut self, id: ItemId) -> Option<&mut AnimationItem> {
        self.items.iter_mut().find(|i| i.id() == id)
    }

    /// Advance every item to `now`.
    pub fn advance(&mut self, now: Instant) -> AnimpaceResult<()> {
        for item in &mut self.items {
            item.advance(now)?;
        }
        Ok(())
    }

    /// Earliest tick deadline over all items.
    pub fn next_wakeup(&self) -> Option<Instant> {
        self.items.iter().filter_map(|i| i.next_deadline()).min()
    }

    /// `true` when no item is playing and no render is outstanding.
    pub fn is_idle(&self) -> bool {
        self.items
            .iter()
            .all(|i| i.state() != PlaybackState::Playing && !i.is_rendering())
    }

    /// Run the control loop until `deadline`, or earlier once the stage is idle.
    pub fn run_until(&mut self, deadline: Instant) -> AnimpaceResult<()> {
        loop {
            let now = Instant::now();
            self.advance(now)?;
            if now >= deadline || self.is_idle() {
                break;
            }
            let wake = self.next_wakeup().map_or(deadline, |w| w.min(deadline));
            if wake > now {
                std::thread::park_timeout(wake - now);
            }
        }
        tracing::debug!(items = self.items.len(), "control loop stopped");
        Ok(())
    }

    /// Summed render counters of all items.
    pub fn stats(&self) -> ItemStats {
        self.items.iter().fold(ItemStats::default(), |acc, i| {
            let s = i.stats();
            ItemStats {
                frames_rendered: acc.frames_rendered + s.frames_rendered,
                frames_failed: acc.frames_failed + s.frames_failed,
                ticks_dropped: acc.ticks_dropped + s.ticks_dropped,
            }
        })
    }

    /// Drop every item, then tear the coordinator down.
    pub fn shutdown(mut self) -> AnimpaceResult<()> {
        self.items.clear();
        let Self { coordinator, .. } = self;
        coordinator.shutdown()
    }
}

#[cfg(test)]
#[path = "../tests/unit/stage.rs"]
mod tests;
