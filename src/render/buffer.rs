use std::sync::{Arc, Mutex};

use image::RgbaImage;

use crate::decode::Surface;
use crate::foundation::core::{BYTES_PER_PIXEL, PixelSize};
use crate::foundation::error::{AnimpaceError, AnimpaceResult};
use crate::foundation::sync::lock;

/// Pixel memory for exactly one rendered frame.
///
/// Holds `width * height * 4` bytes of BGRA premultiplied pixels. A buffer never changes size; a
/// geometry change allocates a new one.
pub struct FrameBuffer {
    size: PixelSize,
    data: Vec<u8>,
}

impl FrameBuffer {
    /// Allocate a zeroed buffer for `size`.
    ///
    /// Zero-area sizes are rejected with [`AnimpaceError::InvalidGeometry`]; a failed reservation
    /// is reported as [`AnimpaceError::Allocation`].
    pub fn new(size: PixelSize) -> AnimpaceResult<Self> {
        if size.is_empty() {
            return Err(AnimpaceError::invalid_geometry(format!(
                "frame buffer needs a non-empty size, got {}x{}",
                size.width, size.height
            )));
        }
        let len = size.byte_len();
        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|e| {
            AnimpaceError::allocation(format!(
                "{len} bytes for a {}x{} frame buffer: {e}",
                size.width, size.height
            ))
        })?;
        data.resize(len, 0);
        Ok(Self { size, data })
    }

    /// Dimensions the buffer was allocated for.
    pub fn size(&self) -> PixelSize {
        self.size
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.size.stride()
    }

    /// Raw pixel bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Writable view for the decoder.
    pub fn surface(&mut self) -> Surface<'_> {
        Surface {
            width: self.size.width,
            height: self.size.height,
            stride: self.size.stride(),
            pixels: &mut self.data,
        }
    }

    /// Convert the buffer into a display image (RGBA, straight alpha).
    pub fn to_image(&self) -> AnimpaceResult<RgbaImage> {
        let mut image = RgbaImage::new(self.size.width, self.size.height);
        let dst_stride = image.sample_layout().height_stride;
        convert_rows(
            &self.data,
            self.stride(),
            self.size,
            &mut image,
            dst_stride,
        )?;
        Ok(image)
    }
}

impl std::fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("size", &self.size)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Copy `size` worth of BGRA premultiplied rows from `src` into RGBA straight-alpha rows of `dst`.
///
/// Source and destination strides are independent; padding bytes of `dst` are left untouched.
pub(crate) fn convert_rows(
    src: &[u8],
    src_stride: usize,
    size: PixelSize,
    dst: &mut [u8],
    dst_stride: usize,
) -> AnimpaceResult<()> {
    let row_len = size.stride();
    if src_stride < row_len || dst_stride < row_len {
        return Err(AnimpaceError::render("row stride shorter than image width"));
    }

    for y in 0..size.height as usize {
        let s = src
            .get(y * src_stride..y * src_stride + row_len)
            .ok_or_else(|| AnimpaceError::render("source rows shorter than declared height"))?;
        let d = dst
            .get_mut(y * dst_stride..y * dst_stride + row_len)
            .ok_or_else(|| AnimpaceError::render("destination rows shorter than source"))?;
        for (dp, sp) in d
            .chunks_exact_mut(BYTES_PER_PIXEL)
            .zip(s.chunks_exact(BYTES_PER_PIXEL))
        {
            let a = sp[3];
            dp[0] = unpremultiply(sp[2], a);
            dp[1] = unpremultiply(sp[1], a);
            dp[2] = unpremultiply(sp[0], a);
            dp[3] = a;
        }
    }
    Ok(())
}

fn unpremultiply(c: u8, a: u8) -> u8 {
    match a {
        0 => 0,
        255 => c,
        _ => {
            let c = u16::from(c.min(a));
            let a = u16::from(a);
            ((c * 255 + a / 2) / a) as u8
        }
    }
}

/// The most recent fully rendered image of an item.
///
/// Workers publish whole images; the paint path clones the current `Arc` under a short lock and
/// never sees a partially written frame.
#[derive(Clone, Default)]
pub struct DisplaySlot {
    current: Arc<Mutex<Option<Arc<RgbaImage>>>>,
}

impl DisplaySlot {
    /// Replace the displayed image.
    pub fn publish(&self, image: RgbaImage) {
        *lock(&self.current) = Some(Arc::new(image));
    }

    /// The displayed image, if any frame has been produced.
    pub fn current(&self) -> Option<Arc<RgbaImage>> {
        lock(&self.current).clone()
    }

    /// Drop the displayed image.
    pub fn clear(&self) {
        *lock(&self.current) = None;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/buffer.rs"]
mod tests;
