use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::foundation::error::{AnimpaceError, AnimpaceResult};

pub use kurbo::Size;

/// Bytes per pixel of every frame buffer and display image.
pub const BYTES_PER_PIXEL: usize = 4;

static NEXT_ITEM_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of an animation item.
///
/// Stable for the lifetime of the item and never reused within a process.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct ItemId(pub u64);

impl ItemId {
    /// Allocate a fresh identifier.
    pub fn next() -> Self {
        Self(NEXT_ITEM_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "item-{}", self.0)
    }
}

/// Positive integer frames-per-second.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(try_from = "u32", into = "u32")]
pub struct FrameRate(u32);

impl FrameRate {
    /// Rate used when no category applies.
    pub const DEFAULT: Self = Self(60);

    /// Create a validated frame rate.
    pub fn new(fps: u32) -> AnimpaceResult<Self> {
        if fps == 0 {
            return Err(AnimpaceError::validation("frame rate must be > 0"));
        }
        Ok(Self(fps))
    }

    /// Frame rate of at least one frame per second.
    pub const fn at_least_one(fps: u32) -> Self {
        Self(if fps == 0 { 1 } else { fps })
    }

    /// Frames per second.
    pub fn get(self) -> u32 {
        self.0
    }

    /// Tick interval, `round(1000 / fps)` milliseconds.
    ///
    /// Never shorter than one millisecond.
    pub fn interval(self) -> Duration {
        let ms = (1000.0 / f64::from(self.0)).round() as u64;
        Duration::from_millis(ms.max(1))
    }
}

impl TryFrom<u32> for FrameRate {
    type Error = AnimpaceError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FrameRate> for u32 {
    fn from(value: FrameRate) -> Self {
        value.0
    }
}

impl std::fmt::Display for FrameRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}fps", self.0)
    }
}

/// Integer pixel dimensions of a render target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct PixelSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl PixelSize {
    /// Create a pixel size.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Round a logical size to whole pixels.
    ///
    /// Negative and non-finite extents collapse to zero.
    pub fn from_size(size: Size) -> Self {
        fn to_px(v: f64) -> u32 {
            if !v.is_finite() || v <= 0.0 {
                return 0;
            }
            v.round().min(f64::from(u32::MAX)) as u32
        }

        Self {
            width: to_px(size.width),
            height: to_px(size.height),
        }
    }

    /// Return `true` when either side is zero.
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Bytes per row of a tightly packed 32-bit buffer.
    pub fn stride(self) -> usize {
        (self.width as usize).saturating_mul(BYTES_PER_PIXEL)
    }

    /// Total bytes of a tightly packed 32-bit buffer.
    pub fn byte_len(self) -> usize {
        self.stride().saturating_mul(self.height as usize)
    }
}

/// Rate-coordination group an item belongs to.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Not coordinated; the item keeps its own frame rate.
    #[default]
    None,
    /// General animations sharing a population-adaptive rate.
    Standard,
    /// Small icon animations.
    Icon,
}

impl Category {
    /// Categories that own a rate policy.
    pub const COORDINATED: [Category; 2] = [Category::Standard, Category::Icon];
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Standard => "standard",
            Self::Icon => "icon",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
