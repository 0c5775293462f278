#![allow(dead_code)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Instant;

use animpace::{
    AnimationHandle, AnimationItem, AnimationLoader, AnimpaceError, AnimpaceResult, Coordinator,
    CoordinatorOpts, ItemEvent, ItemOpts, PipelineOpts, RenderPipeline, Surface,
};

/// Blocks renders until opened.
#[derive(Default)]
pub struct Hold {
    open: Mutex<bool>,
    cv: Condvar,
}

impl Hold {
    pub fn closed() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn open(&self) {
        *self.open.lock().unwrap() = true;
        self.cv.notify_all();
    }

    fn wait(&self) {
        let mut open = self.open.lock().unwrap();
        while !*open {
            open = self.cv.wait(open).unwrap();
        }
    }
}

/// Deterministic decoder: frame `n` is a solid opaque colour with blue = `n`.
#[derive(Clone, Default)]
pub struct StubLoader {
    pub frames: u32,
    pub fail_frames: HashSet<u32>,
    pub reject: bool,
    pub hold: Option<Arc<Hold>>,
    pub rendered: Arc<Mutex<Vec<u32>>>,
}

impl StubLoader {
    pub fn with_frames(frames: u32) -> Self {
        Self {
            frames,
            ..Self::default()
        }
    }

    pub fn rendered(&self) -> Vec<u32> {
        self.rendered.lock().unwrap().clone()
    }
}

struct StubAnimation {
    loader: StubLoader,
}

impl AnimationHandle for StubAnimation {
    fn total_frames(&self) -> u32 {
        self.loader.frames
    }

    fn duration(&self) -> f64 {
        f64::from(self.loader.frames) / 30.0
    }

    fn render_frame_sync(&self, frame: u32, mut surface: Surface<'_>) -> AnimpaceResult<()> {
        if let Some(hold) = &self.loader.hold {
            hold.wait();
        }
        if self.loader.fail_frames.contains(&frame) {
            return Err(AnimpaceError::render(format!("stub frame {frame} fails")));
        }
        for y in 0..surface.height {
            let row = surface.row_mut(y).unwrap();
            for px in row.chunks_exact_mut(4) {
                px.copy_from_slice(&[frame as u8, 0, 0, 255]);
            }
        }
        self.loader.rendered.lock().unwrap().push(frame);
        Ok(())
    }
}

impl AnimationLoader for StubLoader {
    fn load(&self, _bytes: &[u8], _name: &str, _base: &Path) -> Option<Arc<dyn AnimationHandle>> {
        if self.reject {
            return None;
        }
        Some(Arc::new(StubAnimation {
            loader: self.clone(),
        }))
    }
}

/// Write a non-empty placeholder source under `target/<dir>/`.
pub fn source_file(dir: &str, name: &str) -> PathBuf {
    let dir = PathBuf::from("target").join(dir);
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, b"stub animation").unwrap();
    path
}

pub fn coordinator() -> Arc<Coordinator> {
    Coordinator::new(CoordinatorOpts::default()).unwrap()
}

pub fn pipeline() -> RenderPipeline {
    RenderPipeline::new(&PipelineOpts::default()).unwrap()
}

pub fn item(
    coordinator: &Arc<Coordinator>,
    pipeline: &RenderPipeline,
    loader: &StubLoader,
) -> AnimationItem {
    AnimationItem::new(
        coordinator,
        pipeline,
        Arc::new(loader.clone()),
        &ItemOpts::default(),
    )
}

/// Collects every event an item emits.
pub fn record(item: &AnimationItem) -> Arc<Mutex<Vec<ItemEvent>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    item.subscribe(move |ev| sink.lock().unwrap().push(ev.clone()));
    seen
}

/// Test clock that moves one frame interval per step.
pub struct Clock(pub Instant);

impl Clock {
    /// Start after any deadline armed so far.
    pub fn start() -> Self {
        Self(Instant::now())
    }

    pub fn tick(&mut self, item: &AnimationItem) -> Instant {
        self.0 += item.frame_rate().interval();
        self.0
    }
}

/// Advance one interval, dispatch the due render and apply its outcome.
pub fn step(item: &mut AnimationItem, clock: &mut Clock) {
    let now = clock.tick(item);
    item.advance(now).unwrap();
    item.settle().unwrap();
}
