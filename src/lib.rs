//! Animpace paces and renders many vector animations at once.
//!
//! Items register with a shared [`Coordinator`] under a rate [`Category`]. Each category turns
//! its population into a recommended frame rate, so playback slows down as more animations share
//! the screen. Frames are rasterized off the control thread on a small shared
//! [`RenderPipeline`]:
//!
//! - Build a [`Coordinator`] and a [`RenderPipeline`] (or a [`Stage`] that owns both)
//! - Create [`AnimationItem`]s with an [`AnimationLoader`] and give them a source and geometry
//! - Drive them with [`AnimationItem::advance`] and paint the latest frame with
//!   [`AnimationItem::paint`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Configuration file model.
pub mod config;
/// Contract of the decoding library plus a bundled SVG frame-strip loader.
pub mod decode;
pub(crate) mod item;
pub(crate) mod rate;
pub(crate) mod render;
pub(crate) mod stage;

pub use crate::foundation::core::{Category, FrameRate, ItemId, PixelSize, Size};
pub use crate::foundation::error::{AnimpaceError, AnimpaceResult};
pub use crate::foundation::events::SubscriptionId;

pub use crate::config::AnimpaceConfig;
pub use crate::decode::{AnimationHandle, AnimationLoader, Surface, SvgStripLoader};
pub use crate::item::{AnimationItem, ItemEvent, ItemOpts, ItemStats, PlaybackState};
pub use crate::rate::category::{RateCategory, RateChanged, RatePolicy, RateStep, RateTable};
pub use crate::rate::coordinator::{BroadcastTarget, Coordinator, CoordinatorOpts, RateBroadcast};
pub use crate::render::buffer::{DisplaySlot, FrameBuffer};
pub use crate::render::pipeline::{PipelineOpts, RenderPipeline};
pub use crate::render::scheduler::{RateHandle, RenderScheduler};
pub use crate::stage::Stage;
