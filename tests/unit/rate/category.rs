use std::sync::{Arc, Mutex};

use super::*;

fn ids(n: usize) -> Vec<ItemId> {
    (0..n).map(|_| ItemId::next()).collect()
}

#[test]
fn standard_table_matches_population_bands() {
    let t = RateTable::standard();
    for c in 0..120usize {
        let expected = match c {
            0..20 => 60,
            20..35 => 45,
            35..50 => 30,
            _ => 15,
        };
        assert_eq!(t.rate_for(c).get(), expected, "population {c}");
    }
}

#[test]
fn standard_table_is_non_increasing() {
    let t = RateTable::standard();
    let mut prev = t.rate_for(0);
    for c in 1..200usize {
        let r = t.rate_for(c);
        assert!(r <= prev, "rate rose at population {c}");
        prev = r;
    }
}

#[test]
fn table_validation_rejects_bad_shapes() {
    let r = |v| FrameRate::new(v).unwrap();
    let unsorted = RateTable::new(
        r(60),
        vec![
            RateStep {
                min_population: 10,
                rate: r(30),
            },
            RateStep {
                min_population: 10,
                rate: r(20),
            },
        ],
    );
    assert!(unsorted.is_err());

    let rising = RateTable::new(
        r(30),
        vec![RateStep {
            min_population: 5,
            rate: r(60),
        }],
    );
    assert!(rising.is_err());

    assert!(RateTable::standard().validate().is_ok());
}

#[test]
fn add_is_idempotent_and_remove_of_absent_is_noop() {
    let mut cat = RateCategory::new(Category::Standard, RatePolicy::standard());
    let id = ItemId::next();
    cat.add_item(id);
    cat.add_item(id);
    assert_eq!(cat.population(), 1);

    cat.remove_item(ItemId::next());
    assert_eq!(cat.population(), 1);
    cat.remove_item(id);
    cat.remove_item(id);
    assert_eq!(cat.population(), 0);
}

#[test]
fn register_then_unregister_restores_rate_and_count() {
    let mut cat = RateCategory::new(Category::Standard, RatePolicy::standard());
    for id in ids(19) {
        cat.add_item(id);
    }
    let before = (cat.population(), cat.recommended_rate());

    let extra = ItemId::next();
    assert_eq!(cat.add_item(extra).get(), 45);
    cat.remove_item(extra);

    assert_eq!((cat.population(), cat.recommended_rate()), before);
}

#[test]
fn emits_only_when_rate_changes() {
    let mut cat = RateCategory::new(Category::Standard, RatePolicy::standard());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    cat.subscribe(move |ev: &RateChanged| s.lock().unwrap().push(ev.rate.get()));

    let members = ids(36);
    for id in &members {
        cat.add_item(*id);
    }
    assert_eq!(*seen.lock().unwrap(), vec![45, 30]);

    for id in members.iter().take(17) {
        cat.remove_item(*id);
    }
    // 19 left
    assert_eq!(*seen.lock().unwrap(), vec![45, 30, 45, 60]);
}

#[test]
fn fixed_policy_tracks_members_without_events() {
    let mut cat = RateCategory::new(Category::Icon, RatePolicy::icon());
    let hits = Arc::new(Mutex::new(0));
    let h = hits.clone();
    cat.subscribe(move |_| *h.lock().unwrap() += 1);

    for id in ids(80) {
        assert_eq!(cat.add_item(id), FrameRate::DEFAULT);
    }
    assert_eq!(cat.population(), 80);
    assert_eq!(*hits.lock().unwrap(), 0);
}

#[test]
fn policy_parses_from_tagged_json() {
    let p: RatePolicy = serde_json::from_str(
        r#"{"kind":"adaptive","table":{"base_rate":50,"steps":[{"min_population":4,"rate":25}]}}"#,
    )
    .unwrap();
    assert_eq!(p.rate_for(3).get(), 50);
    assert_eq!(p.rate_for(4).get(), 25);

    let p: RatePolicy = serde_json::from_str(r#"{"kind":"fixed","rate":24}"#).unwrap();
    assert_eq!(p.rate_for(1000).get(), 24);
}
