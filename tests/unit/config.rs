use super::*;
use crate::foundation::core::FrameRate;
use crate::rate::category::RatePolicy;

#[test]
fn empty_object_yields_defaults() {
    let cfg = AnimpaceConfig::from_json_str("{}").unwrap();
    assert_eq!(cfg, AnimpaceConfig::default());
    assert_eq!(cfg.pipeline.worker_threads, 1);
    assert_eq!(cfg.item.frame_rate, FrameRate::DEFAULT);
    assert!(cfg.item.autoplay);
    assert_eq!(cfg.coordinator.icon.rate_for(1000).get(), 60);
}

#[test]
fn sections_override_independently() {
    let cfg = AnimpaceConfig::from_json_str(
        r#"{
            "pipeline": { "worker_threads": 3 },
            "coordinator": {
                "standard": {
                    "kind": "adaptive",
                    "table": { "base_rate": 50, "steps": [{ "min_population": 4, "rate": 25 }] }
                },
                "icon": { "kind": "fixed", "rate": 24 }
            },
            "item": { "autoplay": false }
        }"#,
    )
    .unwrap();

    assert_eq!(cfg.pipeline.worker_threads, 3);
    assert!(!cfg.item.autoplay);
    assert_eq!(cfg.item.frame_rate.get(), 60);
    assert_eq!(cfg.coordinator.default_rate.get(), 60);
    assert_eq!(cfg.coordinator.standard.rate_for(3).get(), 50);
    assert_eq!(cfg.coordinator.standard.rate_for(4).get(), 25);
    assert!(matches!(cfg.coordinator.icon, RatePolicy::Fixed { rate } if rate.get() == 24));
}

#[test]
fn zero_threads_fail_validation() {
    let err = AnimpaceConfig::from_json_str(r#"{ "pipeline": { "worker_threads": 0 } }"#)
        .unwrap_err();
    assert!(matches!(err, AnimpaceError::Validation(_)));
}

#[test]
fn zero_rate_is_rejected_while_parsing() {
    let err = AnimpaceConfig::from_json_str(r#"{ "item": { "frame_rate": 0 } }"#).unwrap_err();
    assert!(err.to_string().contains("frame rate must be > 0"));
}

#[test]
fn increasing_rate_table_fails_validation() {
    let err = AnimpaceConfig::from_json_str(
        r#"{ "coordinator": { "standard": {
            "kind": "adaptive",
            "table": { "base_rate": 30, "steps": [{ "min_population": 2, "rate": 60 }] }
        } } }"#,
    )
    .unwrap_err();
    assert!(matches!(err, AnimpaceError::Validation(_)));
}

#[test]
fn from_path_reports_missing_file() {
    let err = AnimpaceConfig::from_path("target/does-not-exist/animpace.json").unwrap_err();
    assert!(err.to_string().contains("open config"));
}

#[test]
fn config_round_trips_through_json() {
    let mut cfg = AnimpaceConfig::default();
    cfg.item.frame_rate = FrameRate::new(24).unwrap();
    let text = serde_json::to_string(&cfg).unwrap();
    let back = AnimpaceConfig::from_json_str(&text).unwrap();
    assert_eq!(back, cfg);
    assert_eq!(
        back.coordinator.standard.rate_for(20),
        FrameRate::new(45).unwrap()
    );
}
