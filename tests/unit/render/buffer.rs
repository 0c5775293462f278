use super::*;

#[test]
fn buffer_is_sized_to_geometry() {
    let b = FrameBuffer::new(PixelSize::new(7, 3)).unwrap();
    assert_eq!(b.as_bytes().len(), 7 * 3 * 4);
    assert_eq!(b.stride(), 28);
    assert_eq!(b.size(), PixelSize::new(7, 3));
}

#[test]
fn zero_area_is_invalid_geometry() {
    for size in [PixelSize::new(0, 10), PixelSize::new(10, 0), PixelSize::default()] {
        let err = FrameBuffer::new(size).unwrap_err();
        assert!(matches!(err, AnimpaceError::InvalidGeometry(_)));
    }
}

#[test]
fn surface_covers_whole_buffer() {
    let mut b = FrameBuffer::new(PixelSize::new(2, 2)).unwrap();
    let mut s = b.surface();
    assert_eq!((s.width, s.height, s.stride), (2, 2, 8));
    s.row_mut(1).unwrap().fill(9);
    assert!(s.row_mut(2).is_none());
    assert_eq!(&b.as_bytes()[8..], &[9; 8]);
}

#[test]
fn conversion_swizzles_and_unpremultiplies() {
    let mut b = FrameBuffer::new(PixelSize::new(2, 1)).unwrap();
    {
        let mut s = b.surface();
        let row = s.row_mut(0).unwrap();
        // opaque red, then half-transparent green (premultiplied)
        row.copy_from_slice(&[0, 0, 255, 255, 0, 64, 0, 128]);
    }
    let img = b.to_image().unwrap();
    assert_eq!(img.get_pixel(0, 0).0, [255, 0, 0, 255]);
    assert_eq!(img.get_pixel(1, 0).0, [0, 128, 0, 128]);
}

#[test]
fn conversion_respects_independent_strides() {
    let size = PixelSize::new(2, 2);
    let src_stride = 12;
    let mut src = vec![0u8; src_stride * 2];
    for y in 0..2 {
        for x in 0..2 {
            let o = y * src_stride + x * 4;
            src[o..o + 4].copy_from_slice(&[x as u8, y as u8, 10, 255]);
        }
        src[y * src_stride + 8..(y + 1) * src_stride].fill(0xEE);
    }

    let dst_stride = 16;
    let mut dst = vec![0x11u8; dst_stride * 2];
    convert_rows(&src, src_stride, size, &mut dst, dst_stride).unwrap();

    for y in 0..2usize {
        for x in 0..2usize {
            let o = y * dst_stride + x * 4;
            assert_eq!(&dst[o..o + 4], &[10, y as u8, x as u8, 255]);
        }
        assert_eq!(&dst[y * dst_stride + 8..(y + 1) * dst_stride], &[0x11; 8]);
    }
}

#[test]
fn conversion_rejects_short_inputs() {
    let size = PixelSize::new(4, 4);
    let mut dst = vec![0u8; size.byte_len()];
    assert!(convert_rows(&[0u8; 8], 16, size, &mut dst, 16).is_err());
    assert!(convert_rows(&vec![0u8; 64], 8, size, &mut dst, 16).is_err());
}

#[test]
fn display_slot_publishes_whole_images() {
    let slot = DisplaySlot::default();
    assert!(slot.current().is_none());

    let reader = slot.clone();
    slot.publish(RgbaImage::new(3, 3));
    let img = reader.current().unwrap();
    assert_eq!(img.dimensions(), (3, 3));

    slot.clear();
    assert!(reader.current().is_none());
    assert_eq!(img.dimensions(), (3, 3));
}
