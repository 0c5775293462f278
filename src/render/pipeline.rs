use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, mpsc};

use crate::decode::AnimationHandle;
use crate::foundation::core::ItemId;
use crate::foundation::error::{AnimpaceError, AnimpaceResult};
use crate::foundation::sync::lock;
use crate::render::buffer::{DisplaySlot, FrameBuffer};

/// Worker pool sizing.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PipelineOpts {
    /// Worker threads shared by all items. Small on purpose to cap CPU usage.
    pub worker_threads: usize,
}

impl Default for PipelineOpts {
    fn default() -> Self {
        Self { worker_threads: 1 }
    }
}

impl PipelineOpts {
    /// Validate the thread count.
    pub fn validate(&self) -> AnimpaceResult<()> {
        if self.worker_threads == 0 {
            return Err(AnimpaceError::validation(
                "pipeline 'worker_threads' must be >= 1",
            ));
        }
        Ok(())
    }
}

/// Bounded worker pool executing decode + composite of single frames.
///
/// Cheap to clone; clones share the pool.
#[derive(Clone)]
pub struct RenderPipeline {
    pool: Arc<rayon::ThreadPool>,
    workers: usize,
    outstanding: Arc<AtomicUsize>,
}

impl RenderPipeline {
    /// Build the worker pool.
    pub fn new(opts: &PipelineOpts) -> AnimpaceResult<Self> {
        opts.validate()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(opts.worker_threads)
            .thread_name(|i| format!("animpace-render-{i}"))
            .build()
            .map_err(|e| {
                AnimpaceError::Other(anyhow::anyhow!("failed to build render thread pool: {e}"))
            })?;
        Ok(Self {
            pool: Arc::new(pool),
            workers: opts.worker_threads,
            outstanding: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Number of worker threads.
    pub fn worker_threads(&self) -> usize {
        self.workers
    }

    /// Tasks submitted and not yet finished, across all items.
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    pub(crate) fn submit(&self, task: RenderTask) {
        self.outstanding.fetch_add(1, Ordering::AcqRel);
        let outstanding = self.outstanding.clone();
        self.pool.spawn(move || {
            task.run();
            outstanding.fetch_sub(1, Ordering::AcqRel);
        });
    }
}

/// Tracks whether a task still holds on to item resources.
///
/// Armed by the control thread at dispatch, released by the worker once it has sent its outcome.
#[derive(Clone, Default)]
pub(crate) struct TaskGate(Arc<(Mutex<bool>, Condvar)>);

impl TaskGate {
    pub(crate) fn arm(&self) {
        *lock(&self.0.0) = true;
    }

    pub(crate) fn release(&self) {
        *lock(&self.0.0) = false;
        self.0.1.notify_all();
    }

    /// Block until the task has released the gate.
    pub(crate) fn wait(&self) {
        let (busy, cv) = &*self.0;
        let mut guard = lock(busy);
        while *guard {
            guard = cv.wait(guard).unwrap_or_else(std::sync::PoisonError::into_inner);
        }
    }
}

struct GateRelease(TaskGate);

impl Drop for GateRelease {
    fn drop(&mut self) {
        self.0.release();
    }
}

/// How a render task ended.
#[derive(Debug)]
pub(crate) enum RenderStatus {
    /// Pixels were produced and published to the display slot.
    Rendered,
    /// The decoder did not produce a frame.
    Failed(AnimpaceError),
    /// The item was torn down before the task could finish.
    Abandoned,
}

/// Message sent from a worker back to the item's control thread.
#[derive(Debug)]
pub(crate) struct RenderOutcome {
    pub(crate) frame: u32,
    pub(crate) generation: u64,
    pub(crate) buffer: FrameBuffer,
    pub(crate) status: RenderStatus,
}

/// One unit of decode + composite work for a single item and frame.
///
/// Owns the item's frame buffer for its whole lifetime, so nothing else can resize or free the
/// buffer while a worker writes into it.
pub(crate) struct RenderTask {
    pub(crate) item: ItemId,
    pub(crate) frame: u32,
    pub(crate) generation: u64,
    pub(crate) handle: Arc<dyn AnimationHandle>,
    pub(crate) buffer: FrameBuffer,
    pub(crate) display: DisplaySlot,
    pub(crate) cancel: Arc<AtomicBool>,
    pub(crate) reply: mpsc::Sender<RenderOutcome>,
    pub(crate) gate: TaskGate,
    pub(crate) waker: std::thread::Thread,
}

impl RenderTask {
    fn run(self) {
        let RenderTask {
            item,
            frame,
            generation,
            handle,
            mut buffer,
            display,
            cancel,
            reply,
            gate,
            waker,
        } = self;
        let _release = GateRelease(gate);
        let _span = tracing::debug_span!("render", %item, frame).entered();

        let status = match catch_unwind(AssertUnwindSafe(|| {
            execute(handle.as_ref(), frame, &mut buffer, &display, &cancel)
        })) {
            Ok(status) => status,
            Err(_) => RenderStatus::Failed(AnimpaceError::render("decoder panicked")),
        };
        tracing::debug!(?status, "render finished");

        // The item may already be gone; its drop waits on the gate, not on this message.
        let _ = reply.send(RenderOutcome {
            frame,
            generation,
            buffer,
            status,
        });
        waker.unpark();
    }
}

fn execute(
    handle: &dyn AnimationHandle,
    frame: u32,
    buffer: &mut FrameBuffer,
    display: &DisplaySlot,
    cancel: &AtomicBool,
) -> RenderStatus {
    if cancel.load(Ordering::Acquire) {
        return RenderStatus::Abandoned;
    }
    if let Err(e) = handle.render_frame_sync(frame, buffer.surface()) {
        return RenderStatus::Failed(e);
    }
    let image = match buffer.to_image() {
        Ok(image) => image,
        Err(e) => return RenderStatus::Failed(e),
    };
    if cancel.load(Ordering::Acquire) {
        return RenderStatus::Abandoned;
    }
    display.publish(image);
    RenderStatus::Rendered
}
