use super::*;

const RED: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="4" height="4"><rect width="4" height="4" fill="#ff0000"/></svg>"##;
const BLUE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="4" height="4"><rect width="4" height="4" fill="#0000ff"/></svg>"##;

fn strip_json(frames: &[&str], frame_rate: f64) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "frame_rate": frame_rate,
        "frames": frames,
    }))
    .unwrap()
}

#[test]
fn loads_frames_and_duration() {
    let bytes = strip_json(&[RED, BLUE, RED], 30.0);
    let handle = SvgStripLoader::new()
        .load(&bytes, "strip.json", Path::new("."))
        .expect("decoded");
    assert_eq!(handle.total_frames(), 3);
    assert!((handle.duration() - 0.1).abs() < 1e-9);
}

#[test]
fn rejects_empty_and_malformed_sources() {
    let loader = SvgStripLoader::new();
    assert!(loader.load(b"", "x", Path::new(".")).is_none());
    assert!(loader.load(b"not json", "x", Path::new(".")).is_none());
    assert!(loader.load(&strip_json(&[], 30.0), "x", Path::new(".")).is_none());
    assert!(loader.load(&strip_json(&[RED], 0.0), "x", Path::new(".")).is_none());
    assert!(
        loader
            .load(&strip_json(&["<svg"], 30.0), "x", Path::new("."))
            .is_none()
    );
}

#[test]
fn renders_bgra_into_strided_surface() {
    let handle = SvgStripLoader::new()
        .load(&strip_json(&[RED, BLUE], 10.0), "x", Path::new("."))
        .unwrap();

    // 2x2 target with 4 bytes of row padding.
    let stride = 2 * 4 + 4;
    let mut pixels = vec![0xAAu8; stride * 2];
    handle
        .render_frame_sync(
            1,
            Surface {
                pixels: &mut pixels,
                width: 2,
                height: 2,
                stride,
            },
        )
        .unwrap();

    for y in 0..2 {
        let row = &pixels[y * stride..y * stride + 8];
        for px in row.chunks_exact(4) {
            assert_eq!(px, &[255, 0, 0, 255], "blue in BGRA order");
        }
        assert_eq!(&pixels[y * stride + 8..(y + 1) * stride], &[0xAA; 4]);
    }
}

#[test]
fn out_of_range_frame_is_a_render_error() {
    let handle = SvgStripLoader::new()
        .load(&strip_json(&[RED], 10.0), "x", Path::new("."))
        .unwrap();
    let mut pixels = vec![0u8; 16];
    let err = handle
        .render_frame_sync(
            5,
            Surface {
                pixels: &mut pixels,
                width: 2,
                height: 2,
                stride: 8,
            },
        )
        .unwrap_err();
    assert!(matches!(err, AnimpaceError::Render(_)));
}
