use std::time::Duration;

use sorter_core::mocks::MemoryRingConfigStore;
use sorter_core::{
    ArgumentError, BindError, CartRingEngine, ChuteConfig, ChuteConfigTable, NotFoundReason,
    NotReadyReason, ResolveError, RingConfiguration, TopologySnapshot,
};

fn engine(total: i32) -> CartRingEngine {
    let topology = TopologySnapshot {
        cart_count: 100,
        total_cart_count: 0,
        cart_spacing_mm: 500.0,
        ring_total_length_mm: 50_000.0,
        chute_count: 4,
        chute_width_mm: 1_000.0,
        cart_width_mm: 480.0,
        track_length_mm: 50_000.0,
    };
    CartRingEngine::builder()
        .with_store(MemoryRingConfigStore::with_config(RingConfiguration::new(total)))
        .with_chute_source(ChuteConfigTable::new([ChuteConfig {
            chute_id: 1,
            is_enabled: true,
            cart_number_at_head_one: 90,
            max_open_duration: Duration::from_millis(500),
        }]))
        .with_topology(topology)
        .build()
        .expect("engine builds")
}

#[test]
fn binding_matches_resolution() {
    let engine = engine(100);
    for i in 0..7 {
        engine.on_cart_passed_origin(Duration::from_millis(i * 500));
    }
    let resolved = engine.resolve_current_cart_number_for_chute(1);
    assert_eq!(resolved, Ok(96));
    assert_eq!(engine.bind_cart_for_new_package("PKG-001", 1), Ok(96));
}

#[test]
fn unlocked_ring_is_cart_state_not_ready() {
    let engine = engine(0);
    engine.on_cart_passed_origin(Duration::ZERO);
    let err = engine
        .bind_cart_for_new_package("PKG-002", 1)
        .expect_err("ring is unlocked");
    match err {
        BindError::CartStateNotReady {
            ref package_id,
            chute_id,
            source,
        } => {
            assert_eq!(package_id, "PKG-002");
            assert_eq!(chute_id, 1);
            assert_eq!(
                source,
                ResolveError::NotReady(NotReadyReason::CartCountNotLocked)
            );
        }
        other => panic!("expected CartStateNotReady, got {other:?}"),
    }
    let msg = err.to_string();
    assert!(msg.contains("PKG-002"), "{msg}");
}

#[test]
fn missing_head_is_cart_state_not_ready() {
    let engine = engine(100);
    let err = engine
        .bind_cart_for_new_package("PKG-003", 1)
        .expect_err("no origin pass yet");
    assert_eq!(
        err.resolve_error().copied(),
        Some(ResolveError::NotReady(NotReadyReason::HeadPositionNotReady))
    );
}

#[test]
fn unconfigured_chute_is_unexpected() {
    let engine = engine(100);
    engine.on_cart_passed_origin(Duration::ZERO);
    let err = engine
        .bind_cart_for_new_package("PKG-004", 3)
        .expect_err("chute 3 has no calibration");
    assert!(matches!(
        err,
        BindError::Unexpected {
            source: ResolveError::NotFound(NotFoundReason::ChuteNotConfigured { chute_id: 3 }),
            ..
        }
    ));
}

#[test]
fn blank_package_id_is_rejected() {
    let engine = engine(100);
    engine.on_cart_passed_origin(Duration::ZERO);
    for id in ["", "   "] {
        assert_eq!(
            engine.bind_cart_for_new_package(id, 1),
            Err(BindError::Argument(ArgumentError::EmptyPackageId))
        );
    }
}
