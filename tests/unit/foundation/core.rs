use super::*;

#[test]
fn item_ids_are_unique() {
    let a = ItemId::next();
    let b = ItemId::next();
    assert_ne!(a, b);
    assert!(b.0 > a.0);
}

#[test]
fn frame_rate_rejects_zero() {
    assert!(FrameRate::new(0).is_err());
    assert_eq!(FrameRate::new(45).unwrap().get(), 45);
}

#[test]
fn frame_rate_interval_rounds_to_millis() {
    assert_eq!(FrameRate::new(60).unwrap().interval(), Duration::from_millis(17));
    assert_eq!(FrameRate::new(45).unwrap().interval(), Duration::from_millis(22));
    assert_eq!(FrameRate::new(30).unwrap().interval(), Duration::from_millis(33));
    assert_eq!(FrameRate::new(15).unwrap().interval(), Duration::from_millis(67));
    assert_eq!(FrameRate::new(5000).unwrap().interval(), Duration::from_millis(1));
}

#[test]
fn frame_rate_deserializes_with_validation() {
    let r: FrameRate = serde_json::from_str("30").unwrap();
    assert_eq!(r.get(), 30);
    assert!(serde_json::from_str::<FrameRate>("0").is_err());
}

#[test]
fn pixel_size_rounds_and_clamps() {
    let px = PixelSize::from_size(Size::new(99.6, 10.2));
    assert_eq!(px, PixelSize::new(100, 10));
    assert_eq!(px.stride(), 400);
    assert_eq!(px.byte_len(), 4000);

    assert!(PixelSize::from_size(Size::new(-3.0, 10.0)).is_empty());
    assert!(PixelSize::from_size(Size::new(f64::NAN, 10.0)).is_empty());
    assert!(PixelSize::from_size(Size::ZERO).is_empty());
}

#[test]
fn category_serde_uses_snake_case() {
    let s = serde_json::to_string(&Category::Icon).unwrap();
    assert_eq!(s, "\"icon\"");
    let c: Category = serde_json::from_str("\"standard\"").unwrap();
    assert_eq!(c, Category::Standard);
}
