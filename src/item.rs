use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};
use std::time::Instant;

use image::RgbaImage;
use image::imageops::{self, FilterType};

use crate::decode::{AnimationHandle, AnimationLoader};
use crate::foundation::core::{Category, FrameRate, ItemId, PixelSize, Size};
use crate::foundation::error::{AnimpaceError, AnimpaceResult};
use crate::foundation::events::{SubscriptionId, Subscribers};
use crate::rate::coordinator::Coordinator;
use crate::render::buffer::{DisplaySlot, FrameBuffer};
use crate::render::pipeline::{RenderOutcome, RenderPipeline, RenderStatus, RenderTask, TaskGate};
use crate::render::scheduler::{RateHandle, RenderScheduler};

/// Playback lifecycle of an [`AnimationItem`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    /// No animation loaded yet.
    #[default]
    NotLoaded,
    /// Source loaded, not playing.
    Loaded,
    /// Scheduler armed, frames being produced.
    Playing,
    /// Stopped by the host; resumable.
    Paused,
    /// Loop limit reached. Only a new source leaves this state.
    Finished,
}

/// Notification emitted by an [`AnimationItem`].
#[derive(Clone, Debug, PartialEq)]
pub enum ItemEvent {
    /// Playback started (`true`) or stopped (`false`).
    RunningChanged(bool),
    /// The effective frame rate changed.
    FrameRateChanged(FrameRate),
    /// The loop limit was set.
    LoopsChanged(u32),
    /// A new source reported its duration in seconds.
    DurationChanged(f64),
    /// The requested source geometry changed.
    SourceSizeChanged(Size),
    /// A new source was loaded.
    SourceChanged(PathBuf),
    /// The item moved to another rate category.
    CategoryChanged(Category),
    /// Loading or rendering failed.
    ErrorOccurred,
    /// A new frame is ready to paint.
    Updated,
}

/// Per-item defaults.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ItemOpts {
    /// Rate used until a category assigns one.
    pub frame_rate: FrameRate,
    /// Start playing as soon as a source loads.
    pub autoplay: bool,
}

impl Default for ItemOpts {
    fn default() -> Self {
        Self {
            frame_rate: FrameRate::DEFAULT,
            autoplay: true,
        }
    }
}

/// Render counters of one item.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct ItemStats {
    /// Frames rendered and published.
    pub frames_rendered: u64,
    /// Frames the decoder failed to produce.
    pub frames_failed: u64,
    /// Ticks skipped because the previous frame was still rendering.
    pub ticks_dropped: u64,
}

struct Source {
    path: PathBuf,
    handle: Arc<dyn AnimationHandle>,
    total_frames: u32,
    duration: f64,
}

struct InFlight {
    cancel: Arc<AtomicBool>,
    gate: TaskGate,
}

/// One animated visual element.
///
/// Owns its playback state, render scheduler and frame buffer. Frames are rendered on the shared
/// [`RenderPipeline`]; at most one render per item is outstanding at any time. All methods are
/// called from a single control thread, which drives the item with [`AnimationItem::advance`].
pub struct AnimationItem {
    id: ItemId,
    coordinator: Arc<Coordinator>,
    pipeline: RenderPipeline,
    loader: Arc<dyn AnimationLoader>,
    autoplay: bool,

    state: PlaybackState,
    source: Option<Source>,
    generation: u64,
    current_frame: u32,
    loops: u32,
    current_loop: u32,

    source_size: Size,
    geometry: PixelSize,
    // Taken by the in-flight render task and handed back with its outcome.
    buffer: Option<FrameBuffer>,
    display: DisplaySlot,

    scheduler: RenderScheduler,
    notified_rate: FrameRate,
    category: Category,
    rate_subscription: Option<SubscriptionId>,

    completions_tx: mpsc::Sender<RenderOutcome>,
    completions: mpsc::Receiver<RenderOutcome>,
    in_flight: Option<InFlight>,

    listeners: Subscribers<ItemEvent>,
    stats: ItemStats,
}

impl AnimationItem {
    /// Create an item outside any category, with no source and an empty geometry.
    pub fn new(
        coordinator: &Arc<Coordinator>,
        pipeline: &RenderPipeline,
        loader: Arc<dyn AnimationLoader>,
        opts: &ItemOpts,
    ) -> Self {
        let (completions_tx, completions) = mpsc::channel();
        let id = ItemId::next();
        tracing::debug!(item = %id, "item created");
        Self {
            id,
            coordinator: coordinator.clone(),
            pipeline: pipeline.clone(),
            loader,
            autoplay: opts.autoplay,
            state: PlaybackState::NotLoaded,
            source: None,
            generation: 0,
            current_frame: 0,
            loops: 0,
            current_loop: 0,
            source_size: Size::ZERO,
            geometry: PixelSize::default(),
            buffer: None,
            display: DisplaySlot::default(),
            scheduler: RenderScheduler::new(RateHandle::new(opts.frame_rate)),
            notified_rate: opts.frame_rate,
            category: Category::None,
            rate_subscription: None,
            completions_tx,
            completions,
            in_flight: None,
            listeners: Subscribers::default(),
            stats: ItemStats::default(),
        }
    }

    /// Process-unique id of this item.
    pub fn id(&self) -> ItemId {
        self.id
    }

    /// Current playback state.
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// `true` while playing.
    pub fn running(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// Effective frame rate.
    pub fn frame_rate(&self) -> FrameRate {
        self.scheduler.rate().get()
    }

    /// Loop limit; 0 means unlimited.
    pub fn loops(&self) -> u32 {
        self.loops
    }

    /// Completed loops since the source was loaded.
    pub fn current_loop(&self) -> u32 {
        self.current_loop
    }

    /// Index of the next frame to render.
    pub fn current_frame(&self) -> u32 {
        self.current_frame
    }

    /// Frame count of the loaded source, 0 when none.
    pub fn total_frames(&self) -> u32 {
        self.source.as_ref().map_or(0, |s| s.total_frames)
    }

    /// Duration in seconds of the loaded source, 0 when none.
    pub fn duration(&self) -> f64 {
        self.source.as_ref().map_or(0.0, |s| s.duration)
    }

    /// Path of the loaded source.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_ref().map(|s| s.path.as_path())
    }

    /// Requested render geometry.
    pub fn source_size(&self) -> Size {
        self.source_size
    }

    /// Rate category the item is registered in.
    pub fn category(&self) -> Category {
        self.category
    }

    /// Render counters.
    pub fn stats(&self) -> ItemStats {
        self.stats
    }

    /// `true` while a render task of this item is outstanding.
    pub fn is_rendering(&self) -> bool {
        self.in_flight.is_some()
    }

    /// The last fully rendered frame.
    pub fn current_image(&self) -> Option<Arc<RgbaImage>> {
        self.display.current()
    }

    /// When the next render tick is due, if playing.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    /// Observe item notifications. Callbacks run on the control thread.
    pub fn subscribe(
        &self,
        callback: impl Fn(&ItemEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.listeners.subscribe(callback)
    }

    /// Stop observing item notifications.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// Load the animation at `path`.
    ///
    /// On failure an [`ItemEvent::ErrorOccurred`] is emitted, the error is returned and the item
    /// keeps its previous source and state. On success the frame and loop counters restart, a
    /// playing item keeps playing, and a `Loaded` item starts playing when autoplay is on.
    #[tracing::instrument(skip_all, fields(item = %self.id))]
    pub fn set_source(&mut self, path: impl AsRef<Path>) -> AnimpaceResult<()> {
        let source = match self.load(path.as_ref()) {
            Ok(source) => source,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load animation");
                self.emit(ItemEvent::ErrorOccurred);
                return Err(e);
            }
        };
        tracing::info!(
            frames = source.total_frames,
            duration = source.duration,
            "animation loaded"
        );

        let path = source.path.clone();
        let duration = source.duration;
        self.source = Some(source);
        self.generation += 1;
        if let Some(in_flight) = &self.in_flight {
            in_flight.cancel.store(true, Ordering::Release);
        }
        self.current_frame = 0;
        self.current_loop = 0;

        match self.state {
            PlaybackState::Playing | PlaybackState::Paused => {}
            PlaybackState::NotLoaded | PlaybackState::Loaded | PlaybackState::Finished => {
                self.state = PlaybackState::Loaded;
            }
        }
        self.emit(ItemEvent::SourceChanged(path));
        self.emit(ItemEvent::DurationChanged(duration));

        if self.autoplay && self.state == PlaybackState::Loaded {
            self.resume();
        }
        Ok(())
    }

    /// Start or continue playback. Only `Loaded` and `Paused` items start.
    pub fn resume(&mut self) {
        match self.state {
            PlaybackState::Loaded | PlaybackState::Paused => {
                self.state = PlaybackState::Playing;
                self.scheduler.start(Instant::now());
                self.emit(ItemEvent::RunningChanged(true));
            }
            state => tracing::debug!(item = %self.id, ?state, "resume ignored"),
        }
    }

    /// Stop producing frames. A render already in flight still completes.
    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
            self.scheduler.stop();
            self.emit(ItemEvent::RunningChanged(false));
        }
    }

    /// [`resume`](Self::resume) when `running`, else [`pause`](Self::pause).
    pub fn set_running(&mut self, running: bool) {
        if running {
            self.resume();
        } else {
            self.pause();
        }
    }

    /// Override the frame rate. Applies from the next tick; a later category broadcast may
    /// override it again.
    pub fn set_frame_rate(&mut self, rate: FrameRate) {
        self.scheduler.rate().set(rate);
        self.sync_rate();
    }

    /// Limit playback to `loops` full passes; 0 plays forever.
    pub fn set_loops(&mut self, loops: u32) {
        self.loops = loops;
        self.emit(ItemEvent::LoopsChanged(loops));
    }

    /// Set the render geometry.
    ///
    /// An empty geometry silently suppresses rendering. While a render is in flight the buffer is
    /// replaced when the task hands it back.
    pub fn set_source_size(&mut self, size: Size) -> AnimpaceResult<()> {
        self.source_size = size;
        let geometry = PixelSize::from_size(size);
        let changed = geometry != self.geometry;
        self.geometry = geometry;
        self.emit(ItemEvent::SourceSizeChanged(size));

        if !changed {
            return Ok(());
        }
        tracing::debug!(item = %self.id, width = geometry.width, height = geometry.height, "geometry changed");
        if self.in_flight.is_none() {
            self.buffer = None;
            self.ensure_buffer()?;
        }
        Ok(())
    }

    /// Move the item to `category`, registering with the coordinator and following its rate
    /// broadcasts. Moving to [`Category::None`] keeps the current rate.
    pub fn set_category(&mut self, category: Category) {
        if category == self.category {
            return;
        }
        self.leave_category();
        self.category = category;

        if category != Category::None {
            let rate = self.coordinator.register(category, self.id);
            self.scheduler.rate().set(rate);

            let cell = self.scheduler.rate().clone();
            let id = self.id;
            self.rate_subscription = Some(self.coordinator.subscribe(move |b| {
                if b.applies_to(category, id) {
                    cell.set(b.rate);
                }
            }));
        }
        tracing::debug!(item = %self.id, %category, "category changed");
        self.emit(ItemEvent::CategoryChanged(category));
        self.sync_rate();
    }

    /// Drive the item: pick up rate changes and finished renders, then dispatch a render if a
    /// tick is due.
    ///
    /// Only an allocation failure of the frame buffer is returned; render failures are reported
    /// through [`ItemEvent::ErrorOccurred`].
    pub fn advance(&mut self, now: Instant) -> AnimpaceResult<()> {
        self.sync_rate();
        while let Ok(outcome) = self.completions.try_recv() {
            self.complete(outcome)?;
        }
        if self.scheduler.poll(now) {
            self.tick()?;
        }
        Ok(())
    }

    /// Block until the outstanding render, if any, has finished and apply its outcome.
    pub fn settle(&mut self) -> AnimpaceResult<()> {
        if self.in_flight.is_none() {
            return Ok(());
        }
        match self.completions.recv() {
            Ok(outcome) => self.complete(outcome),
            Err(_) => {
                self.in_flight = None;
                Err(AnimpaceError::lifecycle("render completion channel closed"))
            }
        }
    }

    /// Paint the last rendered frame onto `target`, scaled to its size.
    ///
    /// Returns `false` when no frame has been rendered yet.
    pub fn paint(&self, target: &mut RgbaImage) -> bool {
        let Some(image) = self.display.current() else {
            return false;
        };
        if image.dimensions() == target.dimensions() {
            imageops::overlay(target, &*image, 0, 0);
        } else {
            let (w, h) = target.dimensions();
            let scaled = imageops::resize(&*image, w, h, FilterType::Triangle);
            imageops::overlay(target, &scaled, 0, 0);
        }
        true
    }

    fn load(&self, path: &Path) -> AnimpaceResult<Source> {
        let bytes = std::fs::read(path).map_err(|e| {
            AnimpaceError::source_access(format!("read '{}': {e}", path.display()))
        })?;
        if bytes.is_empty() {
            return Err(AnimpaceError::decode(format!("'{}' is empty", path.display())));
        }

        let name_hint = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let base_path = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));

        let handle = self
            .loader
            .load(&bytes, &name_hint, base_path)
            .ok_or_else(|| {
                AnimpaceError::decode(format!("'{}' is not a usable animation", path.display()))
            })?;
        let total_frames = handle.total_frames();
        if total_frames == 0 {
            return Err(AnimpaceError::decode(format!(
                "'{}' has no frames",
                path.display()
            )));
        }
        let duration = handle.duration();
        Ok(Source {
            path: path.to_path_buf(),
            handle,
            total_frames,
            duration: if duration.is_finite() { duration.max(0.0) } else { 0.0 },
        })
    }

    fn sync_rate(&mut self) {
        let rate = self.scheduler.rate().get();
        if rate != self.notified_rate {
            self.notified_rate = rate;
            tracing::debug!(item = %self.id, rate = rate.get(), "frame rate changed");
            self.emit(ItemEvent::FrameRateChanged(rate));
        }
    }

    fn ensure_buffer(&mut self) -> AnimpaceResult<()> {
        if self.geometry.is_empty() {
            self.buffer = None;
            return Ok(());
        }
        if self.buffer.as_ref().is_none_or(|b| b.size() != self.geometry) {
            self.buffer = Some(FrameBuffer::new(self.geometry)?);
        }
        Ok(())
    }

    fn tick(&mut self) -> AnimpaceResult<()> {
        if self.state != PlaybackState::Playing {
            return Ok(());
        }
        if self.in_flight.is_some() {
            self.stats.ticks_dropped += 1;
            tracing::trace!(item = %self.id, "tick dropped, render in flight");
            return Ok(());
        }
        let Some(handle) = self.source.as_ref().map(|s| s.handle.clone()) else {
            return Ok(());
        };
        self.ensure_buffer()?;
        let Some(buffer) = self.buffer.take() else {
            return Ok(());
        };

        let cancel = Arc::new(AtomicBool::new(false));
        let gate = TaskGate::default();
        gate.arm();
        self.pipeline.submit(RenderTask {
            item: self.id,
            frame: self.current_frame,
            generation: self.generation,
            handle,
            buffer,
            display: self.display.clone(),
            cancel: cancel.clone(),
            reply: self.completions_tx.clone(),
            gate: gate.clone(),
            waker: std::thread::current(),
        });
        self.in_flight = Some(InFlight { cancel, gate });
        Ok(())
    }

    // The outcome is applied even when reallocating the buffer fails; that error is returned last.
    fn complete(&mut self, outcome: RenderOutcome) -> AnimpaceResult<()> {
        self.in_flight = None;
        let realloc = if outcome.buffer.size() == self.geometry {
            self.buffer = Some(outcome.buffer);
            Ok(())
        } else {
            drop(outcome.buffer);
            self.ensure_buffer()
        };

        if outcome.generation != self.generation {
            tracing::debug!(item = %self.id, frame = outcome.frame, "stale render ignored");
            return realloc;
        }
        match outcome.status {
            RenderStatus::Rendered => {
                self.stats.frames_rendered += 1;
                self.step_frame();
                self.emit(ItemEvent::Updated);
                if self.loops > 0 && self.current_loop >= self.loops {
                    self.finish();
                }
            }
            RenderStatus::Failed(e) => {
                self.stats.frames_failed += 1;
                tracing::warn!(item = %self.id, frame = outcome.frame, error = %e, "frame render failed");
                self.emit(ItemEvent::ErrorOccurred);
            }
            RenderStatus::Abandoned => {}
        }
        realloc
    }

    fn step_frame(&mut self) {
        let total = self.total_frames();
        self.current_frame += 1;
        if self.current_frame >= total {
            self.current_frame = 0;
            if self.loops > 0 {
                self.current_loop += 1;
            }
        }
    }

    fn finish(&mut self) {
        if self.state == PlaybackState::Finished {
            return;
        }
        let was_running = self.running();
        self.state = PlaybackState::Finished;
        self.scheduler.stop();
        tracing::info!(item = %self.id, loops = self.current_loop, "playback finished");
        if was_running {
            self.emit(ItemEvent::RunningChanged(false));
        }
    }

    fn leave_category(&mut self) {
        if let Some(sub) = self.rate_subscription.take() {
            self.coordinator.unsubscribe(sub);
        }
        self.coordinator.unregister(self.category, self.id);
    }

    fn emit(&self, event: ItemEvent) {
        self.listeners.emit(&event);
    }
}

impl Drop for AnimationItem {
    fn drop(&mut self) {
        self.scheduler.stop();
        self.leave_category();
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.cancel.store(true, Ordering::Release);
            in_flight.gate.wait();
        }
        tracing::debug!(item = %self.id, "item dropped");
    }
}

impl std::fmt::Debug for AnimationItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationItem")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("category", &self.category)
            .field("frame", &self.current_frame)
            .field("loop", &self.current_loop)
            .field("geometry", &self.geometry)
            .finish_non_exhaustive()
    }
}
