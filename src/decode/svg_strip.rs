use std::path::Path;
use std::sync::Arc;

use crate::decode::{AnimationHandle, AnimationLoader, Surface};
use crate::foundation::error::{AnimpaceError, AnimpaceResult};

/// Source document understood by [`SvgStripLoader`].
#[derive(Debug, serde::Deserialize)]
struct StripDoc {
    frame_rate: f64,
    #[serde(default)]
    frames: Vec<String>,
    #[serde(default)]
    frame_files: Vec<String>,
}

/// Loader for animations stored as a strip of SVG documents.
///
/// The source is JSON: `{"frame_rate": 30, "frames": ["<svg ...>", ...]}`. Frames may also be
/// listed as `"frame_files"` relative to the source directory; inline frames come first. Each frame
/// is parsed with `usvg` once at load time and rasterized with `resvg` on demand, stretched to the
/// target surface.
#[derive(Clone, Debug, Default)]
pub struct SvgStripLoader {
    _priv: (),
}

impl SvgStripLoader {
    /// Create a loader.
    pub fn new() -> Self {
        Self::default()
    }

    fn decode(&self, bytes: &[u8], base_path: &Path) -> AnimpaceResult<SvgStrip> {
        let doc: StripDoc = serde_json::from_slice(bytes)
            .map_err(|e| AnimpaceError::decode(format!("parse svg strip JSON: {e}")))?;
        if !doc.frame_rate.is_finite() || doc.frame_rate <= 0.0 {
            return Err(AnimpaceError::decode("svg strip frame_rate must be > 0"));
        }

        let opts = usvg::Options {
            resources_dir: Some(base_path.to_path_buf()),
            ..usvg::Options::default()
        };

        let mut frames = Vec::with_capacity(doc.frames.len() + doc.frame_files.len());
        for (i, svg) in doc.frames.iter().enumerate() {
            let tree = usvg::Tree::from_data(svg.as_bytes(), &opts)
                .map_err(|e| AnimpaceError::decode(format!("parse svg frame {i}: {e}")))?;
            frames.push(tree);
        }
        for rel in &doc.frame_files {
            let path = base_path.join(rel);
            let data = std::fs::read(&path).map_err(|e| {
                AnimpaceError::decode(format!("read svg frame '{}': {e}", path.display()))
            })?;
            let tree = usvg::Tree::from_data(&data, &opts).map_err(|e| {
                AnimpaceError::decode(format!("parse svg frame '{}': {e}", path.display()))
            })?;
            frames.push(tree);
        }

        if frames.is_empty() {
            return Err(AnimpaceError::decode("svg strip has no frames"));
        }
        let total_frames = u32::try_from(frames.len())
            .map_err(|_| AnimpaceError::decode("svg strip has too many frames"))?;

        Ok(SvgStrip {
            duration: f64::from(total_frames) / doc.frame_rate,
            frames,
        })
    }
}

impl AnimationLoader for SvgStripLoader {
    fn load(
        &self,
        bytes: &[u8],
        name_hint: &str,
        base_path: &Path,
    ) -> Option<Arc<dyn AnimationHandle>> {
        match self.decode(bytes, base_path) {
            Ok(strip) => {
                tracing::debug!(
                    name = name_hint,
                    frames = strip.frames.len(),
                    duration = strip.duration,
                    "svg strip decoded"
                );
                Some(Arc::new(strip))
            }
            Err(e) => {
                tracing::warn!(name = name_hint, error = %e, "svg strip rejected");
                None
            }
        }
    }
}

struct SvgStrip {
    frames: Vec<usvg::Tree>,
    duration: f64,
}

impl AnimationHandle for SvgStrip {
    fn total_frames(&self) -> u32 {
        self.frames.len() as u32
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn render_frame_sync(&self, frame: u32, mut surface: Surface<'_>) -> AnimpaceResult<()> {
        let tree = self
            .frames
            .get(frame as usize)
            .ok_or_else(|| AnimpaceError::render(format!("frame {frame} out of range")))?;

        let mut pixmap = resvg::tiny_skia::Pixmap::new(surface.width, surface.height)
            .ok_or_else(|| AnimpaceError::render("failed to allocate svg pixmap"))?;
        let sx = (surface.width as f32) / tree.size().width();
        let sy = (surface.height as f32) / tree.size().height();
        resvg::render(
            tree,
            resvg::tiny_skia::Transform::from_scale(sx, sy),
            &mut pixmap.as_mut(),
        );

        let row_len = surface.width as usize * 4;
        for (y, src) in pixmap.data().chunks_exact(row_len).enumerate() {
            let dst = surface
                .row_mut(y as u32)
                .ok_or_else(|| AnimpaceError::render("surface smaller than declared"))?;
            for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
                d.copy_from_slice(&[s[2], s[1], s[0], s[3]]);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/decode/svg_strip.rs"]
mod tests;
