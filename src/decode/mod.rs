//! Contract of the vector-animation decoding library.
//!
//! The crate never interprets animation bytes itself. A [`AnimationLoader`] turns source bytes into
//! an [`AnimationHandle`], and the handle rasterizes single frames on demand.

use std::path::Path;
use std::sync::Arc;

use crate::foundation::error::AnimpaceResult;

pub(crate) mod svg_strip;

/// Writable pixel region handed to [`AnimationHandle::render_frame_sync`].
///
/// Pixels are 32-bit BGRA with premultiplied alpha (byte order B, G, R, A). Rows are `stride`
/// bytes apart; only the first `width * 4` bytes of a row belong to the image.
pub struct Surface<'a> {
    /// Pixel bytes, at least `stride * height` long.
    pub pixels: &'a mut [u8],
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Bytes between the starts of consecutive rows.
    pub stride: usize,
}

impl Surface<'_> {
    /// Mutable view of row `y` (exactly `width * 4` bytes), or `None` when out of range.
    pub fn row_mut(&mut self, y: u32) -> Option<&mut [u8]> {
        if y >= self.height {
            return None;
        }
        let start = (y as usize).checked_mul(self.stride)?;
        let end = start.checked_add(self.width as usize * 4)?;
        self.pixels.get_mut(start..end)
    }
}

/// A decoded animation ready to rasterize frames.
///
/// Handles are shared between the control thread and render workers.
pub trait AnimationHandle: Send + Sync {
    /// Number of frames; a usable animation has at least one.
    fn total_frames(&self) -> u32;

    /// Playback duration in seconds.
    fn duration(&self) -> f64;

    /// Rasterize `frame` into `surface`, blocking until done.
    ///
    /// An `Err` means the surface was not (fully) filled.
    fn render_frame_sync(&self, frame: u32, surface: Surface<'_>) -> AnimpaceResult<()>;
}

/// Entry point of a decoding library.
pub trait AnimationLoader: Send + Sync {
    /// Decode `bytes`. `name_hint` is the source file name and `base_path` the directory external
    /// resources are resolved against. Returns `None` when the bytes are not a usable animation.
    fn load(&self, bytes: &[u8], name_hint: &str, base_path: &Path)
    -> Option<Arc<dyn AnimationHandle>>;
}

pub use svg_strip::SvgStripLoader;
