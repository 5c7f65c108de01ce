//! End-to-end resolution through the engine: lock the ring, advance the
//! head with origin passes, read the cart at each chute.

use std::time::Duration;

use rstest::rstest;
use sorter_core::mocks::MemoryRingConfigStore;
use sorter_core::{
    CartRingEngine, ChuteConfig, ChuteConfigTable, NotReadyReason, ResolveError,
    RingConfiguration, TopologySnapshot,
};

fn topology() -> TopologySnapshot {
    TopologySnapshot {
        cart_count: 100,
        total_cart_count: 0,
        cart_spacing_mm: 500.0,
        ring_total_length_mm: 50_000.0,
        chute_count: 10,
        chute_width_mm: 1_000.0,
        cart_width_mm: 480.0,
        track_length_mm: 50_000.0,
    }
}

fn chute(chute_id: u32, base: i32) -> ChuteConfig {
    ChuteConfig {
        chute_id,
        is_enabled: true,
        cart_number_at_head_one: base,
        max_open_duration: Duration::from_millis(500),
    }
}

fn engine(total: i32) -> CartRingEngine {
    CartRingEngine::builder()
        .with_store(MemoryRingConfigStore::with_config(RingConfiguration::new(total)))
        .with_chute_source(ChuteConfigTable::new([chute(1, 90), chute(3, 80)]))
        .with_topology(topology())
        .build()
        .expect("engine builds")
}

fn advance_to_head(engine: &CartRingEngine, head: u32) {
    for i in 0..head {
        engine.on_cart_passed_origin(Duration::from_millis(u64::from(i) * 500));
    }
}

#[rstest]
#[case::head_one(1, 90, 80)]
#[case::head_five(5, 94, 84)]
#[case::wraps_chute_one(12, 1, 91)]
#[case::full_rotation(101, 90, 80)]
fn resolves_cart_at_chutes(
    #[case] head: u32,
    #[case] chute_one: i32,
    #[case] chute_three: i32,
) {
    let engine = engine(100);
    advance_to_head(&engine, head);
    assert_eq!(engine.resolve_current_cart_number_for_chute(1), Ok(chute_one));
    assert_eq!(engine.resolve_current_cart_number_for_chute(3), Ok(chute_three));
}

#[test]
fn unlocked_ring_is_not_ready_even_with_head() {
    let engine = engine(0);
    advance_to_head(&engine, 5);
    assert_eq!(
        engine.resolve_current_cart_number_for_chute(1),
        Err(ResolveError::NotReady(NotReadyReason::CartCountNotLocked))
    );
}

#[test]
fn locked_ring_without_origin_pass_is_not_ready() {
    let engine = engine(100);
    assert_eq!(
        engine.get_current_head_cart_number(),
        Err(ResolveError::NotReady(NotReadyReason::HeadPositionNotReady))
    );
}

#[test]
fn head_cart_number_is_one_based() {
    let engine = engine(100);
    advance_to_head(&engine, 1);
    assert_eq!(engine.get_current_head_cart_number(), Ok(1));
    advance_to_head(&engine, 99);
    assert_eq!(engine.get_current_head_cart_number(), Ok(100));
    advance_to_head(&engine, 1);
    assert_eq!(engine.get_current_head_cart_number(), Ok(1));
}

#[test]
fn disabled_chute_still_resolves() {
    let chutes = ChuteConfigTable::new([ChuteConfig {
        is_enabled: false,
        ..chute(2, 10)
    }]);
    let engine = CartRingEngine::builder()
        .with_store(MemoryRingConfigStore::with_config(RingConfiguration::new(100)))
        .with_chute_source(chutes)
        .with_topology(topology())
        .build()
        .expect("engine builds");
    advance_to_head(&engine, 3);
    assert_eq!(engine.resolve_current_cart_number_for_chute(2), Ok(12));
}

#[test]
fn concurrent_readers_see_consistent_results() {
    let engine = std::sync::Arc::new(engine(100));
    advance_to_head(&engine, 1);

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let engine = std::sync::Arc::clone(&engine);
            std::thread::spawn(move || {
                for _ in 0..1_000 {
                    let cart = engine
                        .resolve_current_cart_number_for_chute(1)
                        .expect("ring is ready");
                    assert!((1..=100).contains(&cart));
                }
            })
        })
        .collect();

    for i in 0..500u64 {
        engine.on_cart_passed_origin(Duration::from_millis(i));
    }
    for r in readers {
        r.join().expect("reader thread");
    }
    // 1 + 500 passes -> head index 500 mod 100 = 0 -> head 1
    assert_eq!(engine.resolve_current_cart_number_for_chute(1), Ok(90));
}
